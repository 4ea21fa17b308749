mod tar_gz;
mod zip;

use crate::runtime::Runtime;
use anyhow::{Context, Result, anyhow};
use log::debug;
use std::path::{Path, PathBuf};

pub use tar_gz::TarGzExtractor;
pub use zip::ZipExtractor;

/// Directory created inside the destination while an archive is unpacked.
const STAGING_DIR_NAME: &str = ".scaffold-extract";

/// Trait for format-specific archive extractors
pub trait ArchiveExtractor: Send + Sync {
    /// Check if this extractor can handle the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Extract the archive into `extract_to`, which must already exist.
    ///
    /// With `strip_root`, a single top-level directory in the archive is
    /// flattened away. Otherwise the archive layout is kept as-is.
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        strip_root: bool,
    ) -> Result<()>;
}

/// Dispatcher that selects the appropriate extractor based on archive format.
pub struct ArchiveExtractorImpl {
    tar_gz: TarGzExtractor,
    zip: ZipExtractor,
}

impl Default for ArchiveExtractorImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveExtractorImpl {
    pub fn new() -> Self {
        Self {
            tar_gz: TarGzExtractor,
            zip: ZipExtractor,
        }
    }
}

impl ArchiveExtractor for ArchiveExtractorImpl {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_gz.can_handle(archive_path) || self.zip.can_handle(archive_path)
    }

    #[tracing::instrument(skip(self, runtime, archive_path, extract_to))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        strip_root: bool,
    ) -> Result<()> {
        if self.tar_gz.can_handle(archive_path) {
            return self.tar_gz.extract(runtime, archive_path, extract_to, strip_root);
        }
        if self.zip.can_handle(archive_path) {
            return self.zip.extract(runtime, archive_path, extract_to, strip_root);
        }
        Err(anyhow!(
            "Unsupported archive format: {}",
            archive_path.display()
        ))
    }
}

/// Create a fresh staging directory inside `extract_to`.
fn prepare_staging<R: Runtime>(runtime: &R, extract_to: &Path) -> Result<PathBuf> {
    let staging = extract_to.join(STAGING_DIR_NAME);
    if runtime.exists(&staging) {
        runtime.remove_dir_all(&staging)?;
    }
    runtime.create_dir_all(&staging)?;
    debug!("Unpacking to staging dir: {:?}", staging);
    Ok(staging)
}

/// Move unpacked entries from `staging` into `extract_to`, then drop `staging`.
///
/// With `strip_root`, when the archive held exactly one top-level directory
/// its contents are moved instead of the directory itself.
fn promote_staged<R: Runtime>(
    runtime: &R,
    staging: &Path,
    extract_to: &Path,
    strip_root: bool,
) -> Result<()> {
    let entries = runtime
        .read_dir(staging)
        .context("Failed to read staging directory")?;

    let Some(first) = entries.first() else {
        runtime.remove_dir_all(staging)?;
        return Err(anyhow!("Archive appears to be empty."));
    };

    let source_dir = if strip_root && entries.len() == 1 && runtime.is_dir(first) {
        first.clone()
    } else {
        staging.to_path_buf()
    };

    debug!("Moving contents from {:?} to {:?}", source_dir, extract_to);
    for item in runtime.read_dir(&source_dir)? {
        let Some(name) = item.file_name() else {
            continue;
        };
        runtime.rename(&item, &extract_to.join(name))?;
    }

    runtime.remove_dir_all(staging)?;
    Ok(())
}
