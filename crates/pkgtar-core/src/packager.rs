use crate::lifecycle::{validate_transition, Stage};
use crate::CoreError;
use pkgtar_schema::{load_manifest, OutputManifest, PackageManifest};
use pkgtar_store::{
    collect_outputs, pack_output_dir, ArchiveReport, Collected, Depfile, OutputLayout,
    MANIFEST_NAME,
};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// The four inputs of one packaging run.
#[derive(Debug, Clone)]
pub struct PackRequest {
    pub manifest: PathBuf,
    pub meta_far: PathBuf,
    pub output_dir: PathBuf,
    pub depfile: PathBuf,
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PackResult {
    pub package_name: Option<String>,
    pub manifest: OutputManifest,
    pub archive: ArchiveReport,
    pub depfile: Depfile,
}

/// Runs `Load → Collect → Archive → WriteDepfile` for one package.
///
/// Each stage consumes the previous stage's output; nothing is retried and
/// the first error ends the run. The depfile is only written once every other
/// artifact exists and agrees with the rewritten manifest.
pub struct Packager {
    request: PackRequest,
    layout: OutputLayout,
    stage: Stage,
}

impl Packager {
    pub fn new(request: PackRequest) -> Self {
        let layout = OutputLayout::new(&request.output_dir);
        Self {
            request,
            layout,
            stage: Stage::Load,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn run(mut self) -> Result<PackResult, CoreError> {
        let package = self.load()?;

        self.advance(Stage::Collect)?;
        let collected = collect_outputs(&self.layout, &package, &self.request.meta_far)?;

        self.advance(Stage::Archive)?;
        let archive = pack_output_dir(&self.layout)?;
        verify_archive(&collected.manifest, &archive)?;

        self.advance(Stage::WriteDepfile)?;
        let depfile = self.write_depfile(&archive, &collected)?;

        self.advance(Stage::Done)?;
        info!(
            "packaged {} into {}",
            package.name.as_deref().unwrap_or("package"),
            archive.archive.display()
        );

        Ok(PackResult {
            package_name: package.name,
            manifest: collected.manifest,
            archive,
            depfile,
        })
    }

    fn load(&self) -> Result<PackageManifest, CoreError> {
        info!("loading manifest {}", self.request.manifest.display());
        validate_request(&self.request)?;
        let package = load_manifest(&self.request.manifest, &self.request.meta_far)?;
        debug!(
            "{} blob entries retained, {} metadata entries skipped",
            package.entries.len(),
            package.skipped_meta
        );
        Ok(package)
    }

    fn write_depfile(
        &self,
        archive: &ArchiveReport,
        collected: &Collected,
    ) -> Result<Depfile, CoreError> {
        let depfile = Depfile::new(
            &archive.archive,
            collected.inputs.iter().map(|s| s.as_str().to_owned()),
        );
        depfile.write(&self.request.depfile)?;
        info!(
            "wrote depfile {} ({} inputs)",
            self.request.depfile.display(),
            depfile.inputs().len()
        );
        Ok(depfile)
    }

    fn advance(&mut self, to: Stage) -> Result<(), CoreError> {
        validate_transition(self.stage, to)?;
        debug!("stage {} -> {}", self.stage, to);
        self.stage = to;
        Ok(())
    }
}

/// Convenience wrapper for a single run.
pub fn pack(request: PackRequest) -> Result<PackResult, CoreError> {
    Packager::new(request).run()
}

fn validate_request(request: &PackRequest) -> Result<(), CoreError> {
    for (name, path) in [
        ("manifest", &request.manifest),
        ("meta-far", &request.meta_far),
        ("output", &request.output_dir),
        ("depfile", &request.depfile),
    ] {
        if path.as_os_str().is_empty() {
            return Err(CoreError::InvalidRequest(format!("{name} path is empty")));
        }
    }
    if request.output_dir.exists() && !request.output_dir.is_dir() {
        return Err(CoreError::InvalidRequest(format!(
            "output path is not a directory: {}",
            request.output_dir.display()
        )));
    }
    if is_within(&request.depfile, &request.output_dir) {
        return Err(CoreError::InvalidRequest(format!(
            "depfile must not be written inside the output directory: {}",
            request.depfile.display()
        )));
    }
    Ok(())
}

fn is_within(path: &Path, dir: &Path) -> bool {
    let Some(parent) = path.parent() else {
        return false;
    };
    absolute(parent).starts_with(absolute(dir))
}

/// Anchor `path` at the working directory and drop `.` segments, so `./pkg`
/// and `pkg` compare equal. Existing directories are resolved on disk.
fn absolute(path: &Path) -> PathBuf {
    let path = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// The archive must hold exactly the files the rewritten manifest points at,
/// plus the manifest itself.
fn verify_archive(manifest: &OutputManifest, archive: &ArchiveReport) -> Result<(), CoreError> {
    let mut expected: BTreeSet<String> = manifest.files().into_iter().collect();
    expected.insert(MANIFEST_NAME.to_owned());
    let actual: BTreeSet<String> = archive.entries.iter().cloned().collect();

    if expected == actual {
        return Ok(());
    }
    Err(CoreError::ArchiveMismatch {
        missing: expected.difference(&actual).cloned().collect(),
        unexpected: actual.difference(&expected).cloned().collect(),
    })
}
