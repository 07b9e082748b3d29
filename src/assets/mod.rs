//! Asset-loading boundary.
//!
//! The engine never parses asset files itself; a host-provided
//! [`AssetLoader`] does, and reports typed results through
//! [`AssetObserver`] callbacks.

pub mod loader;
pub mod settings;

pub use loader::{AssetLoader, AssetObserver, LoadedModel, ModelPrefab, PrefabNode, ResourceVolume};
pub use settings::ImportSettings;
