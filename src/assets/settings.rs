use bitflags::bitflags;

bitflags! {
    /// Importer post-process settings.
    ///
    /// The bit values mirror the external importer's post-process flags and
    /// must not be renumbered: [`ImportSettings::assimp_flags`] relies on
    /// the numeric ordering when masking out engine-only flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImportSettings: u32 {
        /// Calculate tangents when the model has none (needed for bump maps).
        const CALCULATE_TANGENTS = 0x1;
        /// Join identical vertices; reduces vertex count in nearly all models.
        const JOIN_IDENTICAL_VERTICES = 0x2;
        /// Triangulate meshes.
        const TRIANGULATE = 0x8;
        /// Calculate hard normals when absent.
        const CALCULATE_NORMALS = 0x20;
        /// Calculate smooth normals when absent.
        const CALCULATE_SMOOTH_NORMALS = 0x40;
        /// Limit to at most 4 bone weights per vertex.
        const LIMIT_BONE_WEIGHT = 0x200;
        /// Reorder vertex indices for cache locality.
        const IMPROVE_VERTEX_CACHE_LOCALITY = 0x800;
        /// Split meshes by primitive type.
        const SORTBY_PRIMITIVE_TYPE = 0x8000;
        /// Start the asset's animations as soon as it enters the scene.
        /// Engine-only; stripped before reaching the importer.
        const START_ANIMATIONS = 0x0010_0000;
        /// Merge meshes to reduce draw calls; combine with OPTIMIZE_GRAPH.
        const OPTIMIZE_MESHES = 0x0020_0000;
        /// Collapse nodes without bones, lights, animations or cameras.
        /// May lose node names.
        const OPTIMIZE_GRAPH = 0x0040_0000;
        /// Flip UV mapping in the y direction.
        const FLIP_UV = 0x0080_0000;
        /// Omit light sources and vertex normals.
        const NO_LIGHTING = 0x0200_0000;
        /// Omit animations, bone weights and bone indices.
        const NO_ANIMATION = 0x0400_0000;
        /// Omit textures and texture coordinates.
        const NO_TEXTURING = 0x0800_0000;
        /// Omit blend shapes.
        const NO_MORPH = 0x1000_0000;
    }
}

impl ImportSettings {
    /// Recommended settings for simple meshes.
    #[must_use]
    pub fn recommended() -> Self {
        Self::TRIANGULATE
            | Self::FLIP_UV
            | Self::JOIN_IDENTICAL_VERTICES
            | Self::LIMIT_BONE_WEIGHT
            | Self::CALCULATE_TANGENTS
            | Self::SORTBY_PRIMITIVE_TYPE
    }

    /// Recommended settings plus additional flags.
    #[must_use]
    pub fn recommended_with(extra: Self) -> Self {
        Self::recommended() | extra
    }

    /// Recommended settings for morphed meshes; keeps blend shapes aligned
    /// on vertex count.
    #[must_use]
    pub fn recommended_morph() -> Self {
        Self::TRIANGULATE | Self::FLIP_UV | Self::LIMIT_BONE_WEIGHT | Self::CALCULATE_TANGENTS
    }

    /// Recommended settings for bump-mapped meshes.
    #[must_use]
    pub fn recommended_bumpmap() -> Self {
        Self::TRIANGULATE
            | Self::FLIP_UV
            | Self::LIMIT_BONE_WEIGHT
            | Self::CALCULATE_SMOOTH_NORMALS
            | Self::CALCULATE_TANGENTS
    }

    /// Converts the settings to the importer's bitwise format.
    ///
    /// Only flags the importer understands pass through: any flag whose bit
    /// value sorts above FLIP_UV is dropped, and START_ANIMATIONS is cleared
    /// unconditionally afterwards. The order of those two steps is part of
    /// the format and must not change.
    #[must_use]
    pub fn assimp_flags(self) -> u32 {
        let mut flags = 0;
        for s in self.iter() {
            if s.bits() <= Self::FLIP_UV.bits() {
                flags |= s.bits();
            }
        }
        flags & !Self::START_ANIMATIONS.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assimp_flags_drop_engine_only_bits() {
        let settings = ImportSettings::recommended_with(
            ImportSettings::NO_ANIMATION | ImportSettings::NO_TEXTURING,
        );
        let flags = settings.assimp_flags();
        assert_eq!(flags & ImportSettings::NO_ANIMATION.bits(), 0);
        assert_eq!(flags & ImportSettings::NO_TEXTURING.bits(), 0);
        assert_ne!(flags & ImportSettings::TRIANGULATE.bits(), 0);
        assert_ne!(flags & ImportSettings::FLIP_UV.bits(), 0);
    }

    #[test]
    fn assimp_flags_strip_start_animations() {
        let settings = ImportSettings::recommended_with(ImportSettings::START_ANIMATIONS);
        assert_eq!(
            settings.assimp_flags() & ImportSettings::START_ANIMATIONS.bits(),
            0
        );
    }
}
