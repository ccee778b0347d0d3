use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::path::Path;

/// Normalized, relative location of a blob inside the output tree and archive.
///
/// Only [`CanonicalPath::from_source`] builds one, so no segment is empty or
/// `.`, and the first segment is never `..`. The path may still be empty, or
/// carry `..` further in; [`CanonicalPath::is_contained`] tells callers
/// whether it stays inside the directory it is joined onto.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// Strip leading root separators, `.` and `..` segments from a source path,
    /// then drop empty and `.` segments from the remainder so the result is
    /// spelled the way a directory walk reports the same file.
    ///
    /// Total over any string input and idempotent:
    /// `from_source(from_source(p).as_str()) == from_source(p)`.
    pub fn from_source(source: &str) -> Self {
        let mut rest = source;
        loop {
            if let Some(stripped) = rest.strip_prefix('/') {
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("./") {
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix("../") {
                rest = stripped;
            } else if rest == "." || rest == ".." {
                rest = "";
            } else {
                break;
            }
        }
        let kept: Vec<&str> = rest
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        Self(kept.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// False when a later `..` segment would climb out of the output directory.
    pub fn is_contained(&self) -> bool {
        !self.0.split('/').any(|segment| segment == "..")
    }
}

impl Deref for CanonicalPath {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for CanonicalPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl PartialEq<str> for CanonicalPath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CanonicalPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serialize for CanonicalPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Shorthand for [`CanonicalPath::from_source`].
pub fn normalize(source: &str) -> CanonicalPath {
    CanonicalPath::from_source(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASES: &[(&str, &str)] = &[
        ("../../out/obj/app", "out/obj/app"),
        ("../out/obj/app", "out/obj/app"),
        ("/usr/lib/libc.so", "usr/lib/libc.so"),
        ("//net/share/file", "net/share/file"),
        ("out/obj/app", "out/obj/app"),
        ("./gen/data.bin", "gen/data.bin"),
        ("./../../x", "x"),
        ("/../etc/passwd", "etc/passwd"),
        ("a/../../b", "a/../../b"),
        ("dir/", "dir"),
        ("../../out//obj/app", "out/obj/app"),
        ("../out/./obj/app", "out/obj/app"),
        ("out/obj/./", "out/obj"),
        ("..hidden/file", "..hidden/file"),
        ("...", "..."),
        ("../..", ""),
        ("..", ""),
        ("/", ""),
        ("", ""),
    ];

    #[test]
    fn normalizes_known_inputs() {
        for (input, expected) in CASES {
            assert_eq!(normalize(input).as_str(), *expected, "input: {input:?}");
        }
    }

    #[test]
    fn never_starts_with_parent_or_root() {
        let extra = ["../../../../a", "/../../a", "././/../a", "..//..//a", ".../a"];
        for input in CASES.iter().map(|(i, _)| *i).chain(extra) {
            let out = normalize(input);
            assert!(!out.starts_with('/'), "{input:?} -> {out:?}");
            assert!(!out.starts_with("../"), "{input:?} -> {out:?}");
            assert_ne!(out.as_str(), "..", "{input:?}");
            assert_ne!(out.split('/').next(), Some(".."), "{input:?}");
            assert!(
                !out.split('/').any(|s| s == "." || (s.is_empty() && !out.is_empty())),
                "{input:?} -> {out:?}"
            );
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        for (input, _) in CASES {
            let once = normalize(input);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "input: {input:?}");
        }
    }

    #[test]
    fn canonical_input_is_unchanged() {
        for clean in ["out/obj/app", "meta.far", "a/b/c/d.txt"] {
            assert_eq!(normalize(clean).as_str(), clean);
        }
    }

    #[test]
    fn interior_parent_segments_are_not_contained() {
        assert!(normalize("../../out/obj/app").is_contained());
        assert!(!normalize("a/../../b").is_contained());
        assert!(normalize("..hidden/file").is_contained());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&normalize("../x/y")).unwrap();
        assert_eq!(json, "\"x/y\"");
    }
}
