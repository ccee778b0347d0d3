use crate::types::{SourcePath, VirtualPath};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Virtual-path prefix reserved for package metadata. Entries under it come
/// from the metadata archive and are never blob-expanded.
pub const META_NAMESPACE: &str = "meta/";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported manifest version: '{0}', expected \"1\"")]
    UnsupportedVersion(String),
    #[error("blob #{index} has an empty path")]
    EmptyVirtualPath { index: usize },
    #[error("blob '{path}' has an empty source_path")]
    EmptySourcePath { path: String },
    #[error("virtual path '{0}' is listed more than once")]
    DuplicateVirtualPath(String),
    #[error("metadata archive not found: {}", .0.display())]
    MissingMetaFar(PathBuf),
}

/// Package manifest as written by the packaging frontend.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PackageManifestFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageMetadata>,
    pub blobs: Vec<BlobInfo>,
    #[serde(default)]
    pub blob_sources_relative: RelativeTo,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// One blob record. `merkle` and `size` are carried through but never checked.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BlobInfo {
    pub source_path: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// What a relative `source_path` is relative to.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum RelativeTo {
    #[default]
    #[serde(rename = "working_dir")]
    WorkingDir,
    #[serde(rename = "file")]
    File,
}

/// A retained blob: where it lives in the package and where to read it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub virtual_path: VirtualPath,
    pub source_path: SourcePath,
}

/// Validated manifest with metadata-namespace entries filtered out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub name: Option<String>,
    pub entries: Vec<BlobEntry>,
    /// Number of entries dropped because they live under [`META_NAMESPACE`].
    pub skipped_meta: usize,
}

/// True for `meta`, `meta/` and anything below it.
pub fn is_meta_path(path: &str) -> bool {
    path == "meta" || path.starts_with(META_NAMESPACE)
}

pub fn parse_manifest_str(input: &str) -> Result<PackageManifestFile, ManifestError> {
    Ok(serde_json::from_str(input)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<PackageManifestFile, ManifestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest_str(&content)
}

impl PackageManifestFile {
    /// Validate the records and drop metadata entries.
    ///
    /// `manifest_dir` is the directory holding the manifest file; it is only
    /// consulted when `blob_sources_relative` is `file`.
    pub fn into_package(self, manifest_dir: &Path) -> Result<PackageManifest, ManifestError> {
        if let Some(version) = &self.version {
            if version != "1" {
                return Err(ManifestError::UnsupportedVersion(version.clone()));
            }
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.blobs.len());
        let mut skipped_meta = 0;

        for (index, blob) in self.blobs.into_iter().enumerate() {
            if blob.path.trim().is_empty() {
                return Err(ManifestError::EmptyVirtualPath { index });
            }
            if is_meta_path(&blob.path) {
                skipped_meta += 1;
                continue;
            }
            if blob.source_path.trim().is_empty() {
                return Err(ManifestError::EmptySourcePath { path: blob.path });
            }
            if !seen.insert(blob.path.clone()) {
                return Err(ManifestError::DuplicateVirtualPath(blob.path));
            }

            let source_path = match self.blob_sources_relative {
                RelativeTo::WorkingDir => blob.source_path,
                RelativeTo::File => resolve_from_file(manifest_dir, &blob.source_path),
            };

            entries.push(BlobEntry {
                virtual_path: VirtualPath::new(blob.path),
                source_path: SourcePath::new(source_path),
            });
        }

        Ok(PackageManifest {
            name: self.package.map(|p| p.name),
            entries,
            skipped_meta,
        })
    }
}

/// Join a relative source onto the manifest directory and fold each
/// `dir/..` pair, so `out/pkg` + `../obj/app` resolves to `out/obj/app`.
/// Leading `..` segments that have nothing to cancel are kept.
fn resolve_from_file(manifest_dir: &Path, source: &str) -> String {
    if Path::new(source).is_absolute() || manifest_dir.as_os_str().is_empty() {
        return source.to_owned();
    }
    let mut resolved = PathBuf::new();
    for component in manifest_dir.join(source).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(resolved.components().next_back(), Some(Component::Normal(_))) {
                    resolved.pop();
                } else if !resolved.has_root() || resolved.parent().is_some() {
                    resolved.push("..");
                }
            }
            other => resolved.push(other),
        }
    }
    resolved.to_string_lossy().into_owned()
}

/// Read the manifest, check the metadata archive exists, and return the
/// retained blob entries. Touches nothing on disk.
pub fn load_manifest(
    manifest_path: &Path,
    meta_far: &Path,
) -> Result<PackageManifest, ManifestError> {
    let parsed = parse_manifest_file(manifest_path)?;
    if !meta_far.is_file() {
        return Err(ManifestError::MissingMetaFar(meta_far.to_path_buf()));
    }
    let manifest_dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));
    parsed.into_package(manifest_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
  "version": "1",
  "package": { "name": "example", "version": "0" },
  "blobs": [
    { "source_path": "../../out/obj/app", "path": "bin/app", "merkle": "00", "size": 4 },
    { "source_path": "ignored", "path": "meta/contents" }
  ]
}"#;

    #[test]
    fn parses_full_manifest() {
        let file = parse_manifest_str(SCENARIO).expect("should parse");
        assert_eq!(file.version.as_deref(), Some("1"));
        assert_eq!(file.blobs.len(), 2);
        assert_eq!(file.blobs[0].size, Some(4));
        assert_eq!(file.blob_sources_relative, RelativeTo::WorkingDir);
    }

    #[test]
    fn filters_meta_namespace() {
        let pkg = parse_manifest_str(SCENARIO)
            .unwrap()
            .into_package(Path::new(""))
            .unwrap();
        assert_eq!(pkg.name.as_deref(), Some("example"));
        assert_eq!(pkg.entries.len(), 1);
        assert_eq!(pkg.entries[0].virtual_path.as_str(), "bin/app");
        assert_eq!(pkg.entries[0].source_path.as_str(), "../../out/obj/app");
        assert_eq!(pkg.skipped_meta, 1);
    }

    #[test]
    fn meta_path_detection() {
        assert!(is_meta_path("meta/"));
        assert!(is_meta_path("meta"));
        assert!(is_meta_path("meta/package"));
        assert!(!is_meta_path("metadata/file"));
        assert!(!is_meta_path("bin/meta/x"));
    }

    #[test]
    fn parses_minimal_manifest() {
        let pkg = parse_manifest_str(r#"{"blobs": [{"source_path": "a", "path": "b"}]}"#)
            .unwrap()
            .into_package(Path::new(""))
            .unwrap();
        assert_eq!(pkg.entries.len(), 1);
        assert!(pkg.name.is_none());
    }

    #[test]
    fn rejects_missing_blobs() {
        assert!(parse_manifest_str(r#"{"version": "1"}"#).is_err());
    }

    #[test]
    fn rejects_blob_without_source_path() {
        assert!(parse_manifest_str(r#"{"blobs": [{"path": "bin/app"}]}"#).is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = parse_manifest_str(r#"{"version": "2", "blobs": []}"#)
            .unwrap()
            .into_package(Path::new(""))
            .unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedVersion(v) if v == "2"));
    }

    #[test]
    fn rejects_empty_fields() {
        let empty_path = parse_manifest_str(r#"{"blobs": [{"source_path": "a", "path": " "}]}"#)
            .unwrap()
            .into_package(Path::new(""));
        assert!(matches!(
            empty_path,
            Err(ManifestError::EmptyVirtualPath { index: 0 })
        ));

        let empty_source = parse_manifest_str(r#"{"blobs": [{"source_path": "", "path": "x"}]}"#)
            .unwrap()
            .into_package(Path::new(""));
        assert!(matches!(
            empty_source,
            Err(ManifestError::EmptySourcePath { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_virtual_paths() {
        let input = r#"{"blobs": [
            {"source_path": "a", "path": "bin/x"},
            {"source_path": "b", "path": "bin/x"}
        ]}"#;
        let err = parse_manifest_str(input)
            .unwrap()
            .into_package(Path::new(""))
            .unwrap_err();
        assert!(err.to_string().contains("bin/x"));
    }

    #[test]
    fn same_source_under_two_virtual_paths_is_allowed() {
        let input = r#"{"blobs": [
            {"source_path": "lib/a.so", "path": "lib/a.so"},
            {"source_path": "lib/a.so", "path": "lib/alias.so"}
        ]}"#;
        let pkg = parse_manifest_str(input)
            .unwrap()
            .into_package(Path::new(""))
            .unwrap();
        assert_eq!(pkg.entries.len(), 2);
    }

    #[test]
    fn file_relative_sources_resolve_against_manifest_dir() {
        let input = r#"{
            "blobs": [
                {"source_path": "../obj/app", "path": "bin/app"},
                {"source_path": "/abs/lib.so", "path": "lib/lib.so"}
            ],
            "blob_sources_relative": "file"
        }"#;
        let pkg = parse_manifest_str(input)
            .unwrap()
            .into_package(Path::new("out/pkg"))
            .unwrap();
        assert_eq!(pkg.entries[0].source_path.as_str(), "out/obj/app");
        assert_eq!(pkg.entries[1].source_path.as_str(), "/abs/lib.so");
    }

    #[test]
    fn file_relative_resolution_folds_parent_segments() {
        let cases = [
            ("out/pkg", "../obj/app", "out/obj/app"),
            ("out/pkg", "../../gen/./data.bin", "gen/data.bin"),
            ("out/pkg", "../../../shared/lib.so", "../shared/lib.so"),
            ("../pkg", "../../x", "../../x"),
            ("/build/out/pkg", "../../../../x", "/x"),
            ("./out", "bin/app", "out/bin/app"),
        ];
        for (dir, source, expected) in cases {
            assert_eq!(
                resolve_from_file(Path::new(dir), source),
                expected,
                "{dir} + {source}"
            );
        }
    }

    #[test]
    fn load_requires_meta_far() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package_manifest.json");
        fs::write(&manifest, SCENARIO).unwrap();

        let missing = dir.path().join("meta.far");
        let err = load_manifest(&manifest, &missing).unwrap_err();
        assert!(matches!(err, ManifestError::MissingMetaFar(_)));

        fs::write(&missing, b"far").unwrap();
        let pkg = load_manifest(&manifest, &missing).unwrap();
        assert_eq!(pkg.entries.len(), 1);
    }

    #[test]
    fn load_reports_missing_manifest_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(&dir.path().join("nope.json"), dir.path()).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
