use crate::layout::OutputLayout;
use crate::{write_atomic, StoreError};
use pkgtar_schema::{CanonicalPath, OutputManifest, PackageManifest, SourcePath};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// Result of populating the output directory.
#[derive(Debug, Clone)]
pub struct Collected {
    /// Rewritten manifest, as written to `package.manifest`.
    pub manifest: OutputManifest,
    /// Source paths exactly as the manifest named them, first-seen order,
    /// duplicates removed. These are the real build inputs.
    pub inputs: Vec<SourcePath>,
    /// Number of files copied into the tree, excluding the metadata archive.
    pub copied: usize,
}

/// One blob that must land in the output tree.
struct Planned<'a> {
    canonical: CanonicalPath,
    source: &'a SourcePath,
    virtual_path: &'a str,
}

/// Copy every retained blob and the metadata archive into `layout`, then
/// write the rewritten manifest.
///
/// All canonical paths are computed and checked before the first copy, so a
/// collision or unsafe path leaves the output directory untouched.
pub fn collect_outputs(
    layout: &OutputLayout,
    package: &PackageManifest,
    meta_far: &Path,
) -> Result<Collected, StoreError> {
    let (manifest, planned) = plan(package)?;
    let inputs: Vec<SourcePath> = planned.iter().map(|p| p.source.clone()).collect();

    reject_inputs_inside_output(
        layout,
        planned
            .iter()
            .map(|p| Path::new(p.source.as_str()))
            .chain(std::iter::once(meta_far)),
    )?;

    layout.initialize()?;
    for p in &planned {
        copy_blob(layout, p)?;
    }
    fs::copy(meta_far, layout.meta_far_path())?;
    write_atomic(&layout.manifest_path(), manifest.render().as_bytes())?;

    info!(
        "collected {} blob(s) for {} manifest entries into {}",
        planned.len(),
        manifest.len(),
        layout.root().display()
    );

    Ok(Collected {
        manifest,
        inputs,
        copied: planned.len(),
    })
}

/// Derive the output manifest and the list of distinct files to copy.
fn plan(package: &PackageManifest) -> Result<(OutputManifest, Vec<Planned<'_>>), StoreError> {
    let mut manifest = OutputManifest::new();
    let mut planned: Vec<Planned<'_>> = Vec::new();
    let mut owners: HashMap<CanonicalPath, &SourcePath> = HashMap::new();

    for entry in &package.entries {
        let canonical = CanonicalPath::from_source(entry.source_path.as_str());
        if canonical.is_empty()
            || !canonical.is_contained()
            || OutputLayout::is_reserved(&canonical)
        {
            return Err(StoreError::UnsafePath {
                canonical: canonical.to_string(),
                source_path: entry.source_path.to_string(),
            });
        }

        match owners.get(&canonical) {
            Some(owner) if **owner != entry.source_path => {
                return Err(StoreError::CanonicalCollision {
                    canonical: canonical.to_string(),
                    first: owner.to_string(),
                    second: entry.source_path.to_string(),
                });
            }
            Some(_) => {
                debug!(
                    "{} shares {} with an earlier entry",
                    entry.virtual_path, canonical
                );
            }
            None => {
                owners.insert(canonical.clone(), &entry.source_path);
                planned.push(Planned {
                    canonical: canonical.clone(),
                    source: &entry.source_path,
                    virtual_path: entry.virtual_path.as_str(),
                });
            }
        }

        manifest.push(entry.virtual_path.clone(), canonical);
    }

    Ok((manifest, planned))
}

/// Copying a file that already lives in the output tree would truncate it
/// onto itself or pack it twice, so such inputs fail before the first copy.
fn reject_inputs_inside_output<'a>(
    layout: &OutputLayout,
    inputs: impl Iterator<Item = &'a Path>,
) -> Result<(), StoreError> {
    let Ok(root) = fs::canonicalize(layout.root()) else {
        return Ok(());
    };
    for input in inputs {
        if let Ok(resolved) = fs::canonicalize(input) {
            if resolved.starts_with(&root) {
                return Err(StoreError::SourceInsideOutput {
                    source_path: input.to_path_buf(),
                    output_dir: layout.root().to_path_buf(),
                });
            }
        }
    }
    Ok(())
}

fn copy_blob(layout: &OutputLayout, p: &Planned<'_>) -> Result<(), StoreError> {
    let source = Path::new(p.source.as_str());
    let meta = match fs::metadata(source) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::MissingSource {
                virtual_path: p.virtual_path.to_owned(),
                source_path: source.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_file() {
        return Err(StoreError::NotAFile {
            virtual_path: p.virtual_path.to_owned(),
            source_path: source.to_path_buf(),
        });
    }

    let dest = layout.blob_path(&p.canonical);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, &dest)?;
    debug!("copied {} -> {}", p.source, p.canonical);
    Ok(())
}
