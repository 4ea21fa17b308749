use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::{debug, info};
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::ZipArchive;

use super::{ArchiveExtractor, prepare_staging, promote_staged};

/// Extractor for .zip archives
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".zip")
    }

    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        strip_root: bool,
    ) -> Result<()> {
        debug!("Extracting zip archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        // zip crate requires Read + Seek, but Runtime::open returns Box<dyn Read + Send>
        let mut buffer = Vec::new();
        let mut reader = file;
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;
        let cursor = std::io::Cursor::new(buffer);

        let mut archive = ZipArchive::new(cursor).with_context(|| "Failed to parse ZIP archive")?;

        let staging = prepare_staging(runtime, extract_to)?;
        if let Err(e) = unpack_entries(runtime, &mut archive, &staging) {
            let _ = runtime.remove_dir_all(&staging);
            return Err(e.context(format!("Failed to extract archive {:?}", archive_path)));
        }

        promote_staged(runtime, &staging, extract_to, strip_root)?;

        info!("Extraction complete.");
        Ok(())
    }
}

fn unpack_entries<R: Runtime, S: Read + Seek>(
    runtime: &R,
    archive: &mut ZipArchive<S>,
    staging: &Path,
) -> Result<()> {
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read ZIP entry {}", i))?;

        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                debug!("Skipping entry with invalid path: {}", entry.name());
                continue;
            }
        };

        let full_path = staging.join(&entry_path);

        if entry.is_dir() {
            runtime.create_dir_all(&full_path)?;
        } else {
            if let Some(parent) = full_path.parent() {
                runtime.create_dir_all(parent)?;
            }
            let mut dest_file = runtime.create_file(&full_path)?;
            std::io::copy(&mut entry, &mut dest_file)
                .with_context(|| format!("Failed to extract file {:?}", full_path))?;
            dest_file
                .flush()
                .with_context(|| format!("Failed to write file {:?}", full_path))?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode()
                && let Err(e) = runtime.set_permissions(&full_path, mode)
            {
                debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }
        }
    }
    Ok(())
}
