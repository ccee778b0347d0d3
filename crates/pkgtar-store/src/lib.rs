//! Output tree collection, ustar archiving, and depfile emission for pkgtar.
//!
//! This crate provides the storage layer: `OutputLayout` for the fixed names
//! inside the output directory, `collect_outputs` to copy blobs into their
//! canonical locations, `pack_output_dir` to fold the tree into a
//! constrained-format tar archive, and `Depfile` for the build-system record.

pub mod archive;
pub mod collect;
pub mod depfile;
pub mod layout;

pub use archive::{fits_ustar_header, list_archive, pack_output_dir, ArchiveReport};
pub use collect::{collect_outputs, Collected};
pub use depfile::Depfile;
pub use layout::{OutputLayout, ARCHIVE_NAME, MANIFEST_NAME};

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Write `content` to `dest` through a temp file in the same directory, so a
/// reader never observes a half-written file.
pub(crate) fn write_atomic(dest: &Path, content: &[u8]) -> Result<(), StoreError> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("source file for '{virtual_path}' not found: {}", .source_path.display())]
    MissingSource {
        virtual_path: String,
        source_path: PathBuf,
    },
    #[error("source for '{virtual_path}' is not a regular file: {}", .source_path.display())]
    NotAFile {
        virtual_path: String,
        source_path: PathBuf,
    },
    #[error("canonical path collision on '{canonical}': '{first}' and '{second}'")]
    CanonicalCollision {
        canonical: String,
        first: String,
        second: String,
    },
    #[error("unsafe output path '{canonical}' derived from '{source_path}'")]
    UnsafePath {
        canonical: String,
        source_path: String,
    },
    #[error("path does not fit a ustar header: '{0}'")]
    PathTooLong(String),
    #[error("input '{}' lies inside the output directory '{}'", .source_path.display(), .output_dir.display())]
    SourceInsideOutput {
        source_path: PathBuf,
        output_dir: PathBuf,
    },
}
