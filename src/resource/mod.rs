//! Resources: the asset catalog, resource identity and the references a
//! program makes to its assets.

mod catalog;
mod id;
mod refs;

pub use catalog::{
    AssetReader, Catalog, DiskAssetReader, MemoryAssetReader, SkippedAsset, SpriteAsset,
    load_catalog, load_catalog_from_dir,
};
pub use id::{ResourceId, ResourceKind};
pub use refs::{RefKind, ResourceIndex, ResourceRef, resource_field_kind, sprite_context};
pub(crate) use refs::{asset_root, resolve_references};
