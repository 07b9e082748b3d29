use std::str::FromStr;
use std::sync::Arc;

use crate::errors::MarionetteError;
use crate::scene::SkeletonRef;

/// Bone-name correspondence table for retargeting.
///
/// Parsed from newline-separated `source:target` pairs; blank lines are
/// skipped. An absent map means identity mapping by bone name.
#[derive(Debug, Clone, Default)]
pub struct BoneMap {
    entries: Vec<(String, String)>,
}

impl BoneMap {
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn target_for(&self, source: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, t)| t.as_str())
    }
}

impl FromStr for BoneMap {
    type Err = MarionetteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (source, target) = line
                .split_once(':')
                .ok_or_else(|| MarionetteError::BoneMapParse(line.to_string()))?;
            entries.push((source.trim().to_string(), target.trim().to_string()));
        }
        Ok(Self { entries })
    }
}

/// Maps a pose computed on a source skeleton onto a differently-shaped
/// target skeleton.
///
/// Each mapped source bone's local transform is copied onto the
/// corresponding target bone; target bones absent from the map keep their
/// previous transform, and names missing from either skeleton are silent
/// no-ops.
#[derive(Debug, Clone)]
pub struct PoseMapper {
    target: SkeletonRef,
    source: SkeletonRef,
    duration: f32,
    bone_map: Option<BoneMap>,
}

impl PoseMapper {
    #[must_use]
    pub fn new(target: SkeletonRef, source: SkeletonRef, duration: f32) -> Self {
        Self {
            target,
            source,
            duration,
            bone_map: None,
        }
    }

    pub fn set_bone_map(&mut self, map: Option<BoneMap>) {
        self.bone_map = map;
    }

    #[must_use]
    pub fn bone_map(&self) -> Option<&BoneMap> {
        self.bone_map.as_ref()
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub fn source(&self) -> &SkeletonRef {
        &self.source
    }

    #[must_use]
    pub fn target(&self) -> &SkeletonRef {
        &self.target
    }

    /// Copies mapped source bone transforms onto the target skeleton's
    /// current pose. Time is accepted for track uniformity; the mapping
    /// itself is stateless.
    pub fn animate(&self, _t: f32) {
        // Source and target sharing one skeleton is an identity mapping.
        if Arc::ptr_eq(&self.target, &self.source) {
            return;
        }
        let source = self.source.read();
        let mut target = self.target.write();
        match &self.bone_map {
            Some(map) if !map.is_empty() => {
                for (src, dst) in map.entries() {
                    let Some(si) = source.bone_index(src) else {
                        continue;
                    };
                    let Some(di) = target.bone_index(dst) else {
                        continue;
                    };
                    let transform = source.pose().get(si);
                    target.pose_mut().set(di, transform);
                }
            }
            _ => {
                for si in 0..source.bone_count() {
                    let Some(bone) = source.bone(si) else { continue };
                    let Some(di) = target.bone_index(&bone.name) else {
                        continue;
                    };
                    let transform = source.pose().get(si);
                    target.pose_mut().set(di, transform);
                }
            }
        }
    }
}
