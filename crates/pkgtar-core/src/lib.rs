//! Packaging pipeline for pkgtar.
//!
//! This crate ties the schema and store layers together into the `Packager`:
//! load and validate a package manifest, collect its blobs into a canonical
//! output tree, fold that tree into a ustar archive, and record the original
//! inputs in a depfile. Stages run strictly in order (`lifecycle::Stage`) and
//! the first failure aborts the run before any depfile is written.

pub mod lifecycle;
pub mod packager;

pub use lifecycle::{validate_transition, Stage};
pub use packager::{pack, PackRequest, PackResult, Packager};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] pkgtar_schema::ManifestError),
    #[error("store error: {0}")]
    Store(#[from] pkgtar_store::StoreError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("archive does not match manifest: missing {missing:?}, unexpected {unexpected:?}")]
    ArchiveMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

impl CoreError {
    /// Input problems detected before anything on disk was changed.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Manifest(_) | CoreError::InvalidRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_errors_are_validation_errors() {
        let e = CoreError::from(pkgtar_schema::ManifestError::UnsupportedVersion("9".to_owned()));
        assert!(e.is_validation());
        assert!(e.to_string().starts_with("manifest error:"));
    }

    #[test]
    fn store_errors_are_not_validation_errors() {
        let e = CoreError::from(pkgtar_store::StoreError::PathTooLong("x".to_owned()));
        assert!(!e.is_validation());
        assert!(e.to_string().starts_with("store error:"));
    }

    #[test]
    fn mismatch_lists_both_sides() {
        let e = CoreError::ArchiveMismatch {
            missing: vec!["a".to_owned()],
            unexpected: vec!["b".to_owned()],
        };
        let msg = e.to_string();
        assert!(msg.contains("\"a\""));
        assert!(msg.contains("\"b\""));
    }
}
