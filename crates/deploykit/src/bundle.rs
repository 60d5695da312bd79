//! The shared upload bundle and its scoped lifecycle.
//!
//! One batch builds one gzipped tar archive containing the project's
//! cookbook and role directories plus the two generated control files, and
//! every node uploads that same archive. The bundle's lifetime must strictly
//! contain every node's activity: [`prepare`] materializes it before the
//! first upload, and cleanup is guaranteed on every exit path — normal
//! completion, a mid-batch error, or an unwind — because the staged
//! artifacts are removed in [`Drop`].

use crate::error::{Error, Result};
use crate::layout::{APPLY_SCRIPT, ARCHIVE_NAME, RemoteLayout, STAGED_SOLO_RB};
use crate::types::DeployConfig;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A fully materialized upload bundle.
///
/// Holds the archive plus the two locally staged control files; removing
/// all three is `cleanup`'s job, and dropping the bundle without an explicit
/// `cleanup` call removes them too. At most one bundle should exist per
/// process at a time — the orchestrator creates one per batch.
#[derive(Debug)]
pub struct PreparedBundle {
    archive: PathBuf,
    staged: Vec<PathBuf>,
    cleaned: bool,
}

impl PreparedBundle {
    /// Local path of the archive every node uploads.
    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Remove all staged artifacts.
    ///
    /// Already-removed files are a no-op; calling this twice is harmless.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        for path in std::iter::once(&self.archive).chain(self.staged.iter()) {
            if let Err(err) = std::fs::remove_file(path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    log::debug!("couldn't remove staged file {}: {err}", path.display());
                }
            }
        }
        self.cleaned = true;
    }

    fn materialize(&mut self, config: &DeployConfig, layout: &RemoteLayout) -> Result<()> {
        for dir in [
            config.cookbooks_dir(),
            config.site_cookbooks_dir(),
            config.roles_dir(),
        ] {
            if !dir.is_dir() {
                return Err(Error::ProjectLayout { path: dir });
            }
        }

        let solo_rb = config.project_dir.join(STAGED_SOLO_RB);
        std::fs::write(&solo_rb, layout.solo_rb_content())
            .map_err(|err| Error::io(&solo_rb, err))?;
        self.staged.push(solo_rb);

        let apply_script = config.project_dir.join(APPLY_SCRIPT);
        std::fs::write(&apply_script, layout.apply_script_content())
            .map_err(|err| Error::io(&apply_script, err))?;
        self.staged.push(apply_script);

        self.pack(config)
    }

    /// Write the archive: the three content directories by base name plus
    /// the two control files.
    fn pack(&self, config: &DeployConfig) -> Result<()> {
        let file = File::create(&self.archive).map_err(|err| Error::io(&self.archive, err))?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let archive_err = |err: std::io::Error| Error::Archive(err.to_string());
        builder
            .append_dir_all("cookbooks", config.cookbooks_dir())
            .map_err(archive_err)?;
        builder
            .append_dir_all("site-cookbooks", config.site_cookbooks_dir())
            .map_err(archive_err)?;
        builder
            .append_dir_all("roles", config.roles_dir())
            .map_err(archive_err)?;
        builder
            .append_path_with_name(config.project_dir.join(STAGED_SOLO_RB), STAGED_SOLO_RB)
            .map_err(archive_err)?;
        builder
            .append_path_with_name(config.project_dir.join(APPLY_SCRIPT), APPLY_SCRIPT)
            .map_err(archive_err)?;

        let encoder = builder.into_inner().map_err(archive_err)?;
        encoder.finish().map_err(archive_err)?;
        Ok(())
    }
}

impl Drop for PreparedBundle {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Materialize the shared bundle for one batch.
///
/// If anything fails partway through, the staged artifacts are removed
/// before the error propagates — no partial archive is left behind.
pub fn prepare(config: &DeployConfig, layout: &RemoteLayout) -> Result<PreparedBundle> {
    log::debug!("preparing upload bundle");
    let mut bundle = PreparedBundle {
        archive: config.project_dir.join(ARCHIVE_NAME),
        staged: Vec::new(),
        cleaned: false,
    };
    match bundle.materialize(config, layout) {
        Ok(()) => Ok(bundle),
        Err(err) => {
            bundle.cleanup();
            Err(err)
        }
    }
}

/// Run `action` with a prepared bundle, cleaning up on every exit path.
pub fn with_prepared<T>(
    config: &DeployConfig,
    layout: &RemoteLayout,
    action: impl FnOnce(&PreparedBundle) -> Result<T>,
) -> Result<T> {
    let mut bundle = prepare(config, layout)?;
    let result = action(&bundle);
    bundle.cleanup();
    result
}
