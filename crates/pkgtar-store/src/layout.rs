use crate::StoreError;
use pkgtar_schema::{CanonicalPath, META_FAR_NAME};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the rewritten manifest inside the output directory.
pub const MANIFEST_NAME: &str = "package.manifest";
/// File name of the archive inside the output directory.
pub const ARCHIVE_NAME: &str = "package.tar";

/// Directory layout of a pkgtar output tree.
///
/// Blobs live at their canonical paths under the root; the rewritten
/// manifest, the metadata archive copy, and the final archive sit at fixed
/// names in the root itself.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    #[inline]
    pub fn meta_far_path(&self) -> PathBuf {
        self.root.join(META_FAR_NAME)
    }

    #[inline]
    pub fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_NAME)
    }

    #[inline]
    pub fn blob_path(&self, canonical: &CanonicalPath) -> PathBuf {
        self.root.join(canonical.as_str())
    }

    /// Names a blob must not take, because the layout writes them itself.
    pub fn is_reserved(canonical: &CanonicalPath) -> bool {
        matches!(
            canonical.as_str(),
            MANIFEST_NAME | ARCHIVE_NAME | META_FAR_NAME
        )
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgtar_schema::normalize;

    #[test]
    fn layout_paths_are_correct() {
        let layout = OutputLayout::new("/tmp/pkgtar-test");
        assert_eq!(
            layout.manifest_path(),
            PathBuf::from("/tmp/pkgtar-test/package.manifest")
        );
        assert_eq!(
            layout.meta_far_path(),
            PathBuf::from("/tmp/pkgtar-test/meta.far")
        );
        assert_eq!(
            layout.archive_path(),
            PathBuf::from("/tmp/pkgtar-test/package.tar")
        );
        assert_eq!(
            layout.blob_path(&normalize("../../out/obj/app")),
            PathBuf::from("/tmp/pkgtar-test/out/obj/app")
        );
    }

    #[test]
    fn reserved_names() {
        assert!(OutputLayout::is_reserved(&normalize("meta.far")));
        assert!(OutputLayout::is_reserved(&normalize("../package.tar")));
        assert!(OutputLayout::is_reserved(&normalize("/package.manifest")));
        assert!(!OutputLayout::is_reserved(&normalize("out/meta.far")));
    }

    #[test]
    fn initialize_creates_root_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path().join("out/pkg"));
        layout.initialize().unwrap();
        layout.initialize().unwrap();
        assert!(layout.root().is_dir());
    }
}
