use crate::canonical::CanonicalPath;
use crate::types::VirtualPath;
use serde::Serialize;
use std::fmt::Write;

/// Virtual path under which the metadata archive is published.
pub const META_PACKAGE_KEY: &str = "meta/package";
/// File name the metadata archive is copied to inside the output directory.
pub const META_FAR_NAME: &str = "meta.far";

/// Rewritten manifest: each retained virtual path mapped to its canonical
/// location in the output tree, in manifest order.
///
/// The trailing `meta/package=meta.far` line is implied and emitted by
/// [`OutputManifest::render`]; it is not stored among the entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputManifest {
    entries: Vec<(VirtualPath, CanonicalPath)>,
}

impl OutputManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, virtual_path: VirtualPath, canonical: CanonicalPath) {
        self.entries.push((virtual_path, canonical));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, virtual_path: &str) -> Option<&CanonicalPath> {
        self.entries
            .iter()
            .find(|(v, _)| v.as_str() == virtual_path)
            .map(|(_, c)| c)
    }

    /// Distinct output files the manifest references, including the metadata
    /// archive, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .entries
            .iter()
            .map(|(_, c)| c.as_str().to_owned())
            .chain(std::iter::once(META_FAR_NAME.to_owned()))
            .collect();
        files.sort();
        files.dedup();
        files
    }

    /// `virtual_path=canonical_path` lines in insertion order, then the fixed
    /// metadata line. Always newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (virtual_path, canonical) in &self.entries {
            let _ = writeln!(out, "{virtual_path}={canonical}");
        }
        let _ = writeln!(out, "{META_PACKAGE_KEY}={META_FAR_NAME}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::normalize;

    fn sample() -> OutputManifest {
        let mut m = OutputManifest::new();
        m.push(VirtualPath::new("bin/app"), normalize("../../out/obj/app"));
        m.push(VirtualPath::new("lib/ld.so.1"), normalize("/sysroot/lib/ld.so.1"));
        m
    }

    #[test]
    fn renders_in_insertion_order_with_meta_line() {
        assert_eq!(
            sample().render(),
            "bin/app=out/obj/app\nlib/ld.so.1=sysroot/lib/ld.so.1\nmeta/package=meta.far\n"
        );
    }

    #[test]
    fn empty_manifest_renders_only_meta_line() {
        assert_eq!(OutputManifest::new().render(), "meta/package=meta.far\n");
    }

    #[test]
    fn lookup_by_virtual_path() {
        let m = sample();
        assert_eq!(m.get("bin/app").map(CanonicalPath::as_str), Some("out/obj/app"));
        assert!(m.get("meta/package").is_none());
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn files_include_meta_far_and_dedup_shared_blobs() {
        let mut m = sample();
        m.push(VirtualPath::new("bin/alias"), normalize("../../out/obj/app"));
        assert_eq!(
            m.files(),
            vec!["meta.far", "out/obj/app", "sysroot/lib/ld.so.1"]
        );
    }
}
