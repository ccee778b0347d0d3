use crate::layout::OutputLayout;
use crate::StoreError;
use std::fs;
use std::io::{BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Bytes available for a path in the ustar `name` field.
const USTAR_NAME_LEN: usize = 100;
/// Bytes available in the ustar `prefix` field.
const USTAR_PREFIX_LEN: usize = 155;

/// Summary of a packed output directory.
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub archive: PathBuf,
    /// Entry paths in archive order.
    pub entries: Vec<String>,
    pub bytes: u64,
}

/// Whether `path` can be stored in a plain ustar header, without GNU
/// long-name or PAX extension records.
///
/// Paths up to 100 bytes fit the `name` field directly. Longer paths must
/// split at a `/` into a prefix of at most 155 bytes and a non-empty name of
/// at most 100 bytes.
pub fn fits_ustar_header(path: &str) -> bool {
    let bytes = path.as_bytes();
    if bytes.len() <= USTAR_NAME_LEN {
        return true;
    }
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'/')
        .any(|(i, _)| {
            let name_len = bytes.len() - i - 1;
            i <= USTAR_PREFIX_LEN && name_len > 0 && name_len <= USTAR_NAME_LEN
        })
}

/// Pack every regular file under the output directory into `package.tar`.
///
/// Entries are ustar-only, sorted by relative path, with timestamps and
/// ownership zeroed. Each loose file is deleted as soon as it is in the
/// archive, and emptied directories are removed afterwards, leaving the
/// archive as the only file in the output directory. The archive itself is
/// never packed.
///
/// Every path is checked against the ustar limits before the archive is
/// created; one that does not fit aborts the run with
/// [`StoreError::PathTooLong`].
pub fn pack_output_dir(layout: &OutputLayout) -> Result<ArchiveReport, StoreError> {
    let root = layout.root();
    let archive_path = layout.archive_path();

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    collect_entries(root, root, &archive_path, &mut files, &mut dirs)?;
    files.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some((rel, _)) = files.iter().find(|(rel, _)| !fits_ustar_header(rel)) {
        return Err(StoreError::PathTooLong(rel.clone()));
    }

    let tmp = NamedTempFile::new_in(root)?;
    let mut ar = tar::Builder::new(BufWriter::new(tmp));
    let mut entries = Vec::with_capacity(files.len());

    for (rel_path, full_path) in &files {
        append_file(&mut ar, rel_path, full_path)?;
        fs::remove_file(full_path)?;
        debug!("archived {rel_path}");
        entries.push(rel_path.clone());
    }

    let mut writer = ar.into_inner()?;
    writer.flush()?;
    let tmp = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    tmp.as_file().sync_all()?;
    let bytes = tmp.as_file().metadata()?.len();
    tmp.persist(&archive_path)
        .map_err(|e| StoreError::Io(e.error))?;

    // Children sort after their parents, so reverse order empties leaves first.
    dirs.sort();
    for dir in dirs.iter().rev() {
        if let Err(e) = fs::remove_dir(dir) {
            warn!("leaving {} in output directory: {e}", dir.display());
        }
    }

    info!(
        "packed {} file(s) into {} ({bytes} bytes)",
        entries.len(),
        archive_path.display()
    );

    Ok(ArchiveReport {
        archive: archive_path,
        entries,
        bytes,
    })
}

/// Entry paths of an existing archive, in archive order.
pub fn list_archive(path: &Path) -> Result<Vec<String>, StoreError> {
    let file = fs::File::open(path)?;
    let mut ar = tar::Archive::new(file);
    let mut out = Vec::new();
    for entry in ar.entries()? {
        let entry = entry?;
        out.push(entry.path()?.to_string_lossy().into_owned());
    }
    Ok(out)
}

/// Recursively collect regular files as (relative_path, full_path) pairs and
/// every subdirectory seen, skipping the archive being written.
fn collect_entries(
    root: &Path,
    current: &Path,
    skip: &Path,
    files: &mut Vec<(String, PathBuf)>,
    dirs: &mut Vec<PathBuf>,
) -> Result<(), StoreError> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let full = entry.path();
        if full == skip {
            continue;
        }
        let meta = full.symlink_metadata()?;
        if meta.is_dir() {
            dirs.push(full.clone());
            collect_entries(root, &full, skip, files, dirs)?;
        } else if meta.is_file() {
            files.push((relative_name(root, &full)?, full));
        } else {
            warn!("skipping non-regular file: {}", full.display());
        }
    }
    Ok(())
}

fn relative_name(root: &Path, full: &Path) -> Result<String, StoreError> {
    let rel = full
        .strip_prefix(root)
        .map_err(|e| StoreError::Io(std::io::Error::other(format!("path strip: {e}"))))?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(parts.join("/"))
}

fn append_file<W: Write>(
    ar: &mut tar::Builder<W>,
    rel_path: &str,
    full_path: &Path,
) -> Result<(), StoreError> {
    let meta = full_path.metadata()?;
    let mut header = tar::Header::new_ustar();
    header
        .set_path(rel_path)
        .map_err(|_| StoreError::PathTooLong(rel_path.to_owned()))?;
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(meta.len());
    header.set_mode(meta.permissions().mode() & 0o7777);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_cksum();
    let file = fs::File::open(full_path)?;
    ar.append(&header, file)?;
    Ok(())
}
