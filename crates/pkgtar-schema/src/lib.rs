//! Package manifest parsing, path canonicalization, and the rewritten output
//! manifest for pkgtar.
//!
//! This crate defines the schema layer: JSON package manifest parsing and
//! validation (`load_manifest`), the pure source-path normalizer
//! (`CanonicalPath::from_source`), and the `key=value` output manifest
//! (`OutputManifest`) that the store layer writes next to the blobs.

pub mod canonical;
pub mod manifest;
pub mod output;
pub mod types;

pub use canonical::{normalize, CanonicalPath};
pub use manifest::{
    is_meta_path, load_manifest, parse_manifest_file, parse_manifest_str, BlobEntry, BlobInfo,
    ManifestError, PackageManifest, PackageManifestFile, PackageMetadata, RelativeTo,
    META_NAMESPACE,
};
pub use output::{OutputManifest, META_FAR_NAME, META_PACKAGE_KEY};
pub use types::{SourcePath, VirtualPath};
