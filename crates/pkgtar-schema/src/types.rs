//! Newtype wrappers for the path strings carried by a package manifest.
//!
//! Both serialize/deserialize as plain strings so they can sit directly in the
//! manifest JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<String> for $name {
            fn eq(&self, other: &String) -> bool {
                self.0 == *other
            }
        }

        impl PartialEq<$name> for String {
            fn eq(&self, other: &$name) -> bool {
                *self == other.0
            }
        }

        impl AsRef<std::path::Path> for $name {
            fn as_ref(&self) -> &std::path::Path {
                std::path::Path::new(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// In-package path a blob occupies at runtime (`bin/app`, `meta/contents`).
    VirtualPath
);

string_newtype!(
    /// Host path a blob is read from, exactly as the build system names it.
    SourcePath
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_path_display_and_as_ref() {
        let p = VirtualPath::new("bin/app");
        assert_eq!(p.to_string(), "bin/app");
        assert_eq!(p.as_str(), "bin/app");
        assert_eq!(AsRef::<str>::as_ref(&p), "bin/app");
    }

    #[test]
    fn source_path_serializes_as_plain_string() {
        let p = SourcePath::new("../../out/obj/app");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"../../out/obj/app\"");
        let back: SourcePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn source_path_as_std_path() {
        let p = SourcePath::from("/abs/file");
        let path: &std::path::Path = p.as_ref();
        assert!(path.is_absolute());
    }

    #[test]
    fn virtual_path_into_inner() {
        let p = VirtualPath::new("data/p1".to_owned());
        assert_eq!(p.into_inner(), "data/p1");
    }
}
