use crate::runtime::Runtime;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{debug, info};
use std::io::Read;
use std::path::Path;
use tar::{Archive, EntryType};

use super::{ArchiveExtractor, prepare_staging, promote_staged};

/// Extractor for .tar.gz / .tgz archives
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_path.to_string_lossy().to_lowercase();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        strip_root: bool,
    ) -> Result<()> {
        debug!("Extracting tar.gz archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        let staging = prepare_staging(runtime, extract_to)?;

        let mut archive = Archive::new(GzDecoder::new(file));
        if let Err(e) = unpack_entries(&mut archive, &staging) {
            let _ = runtime.remove_dir_all(&staging);
            return Err(e.context(format!("Failed to extract archive {:?}", archive_path)));
        }

        promote_staged(runtime, &staging, extract_to, strip_root)?;

        info!("Extraction complete.");
        Ok(())
    }
}

fn unpack_entries<R: Read>(archive: &mut Archive<R>, staging: &Path) -> Result<()> {
    for entry in archive.entries().context("Failed to read tar entries")? {
        let mut entry = entry.context("Failed to read tar entry")?;

        // GitHub source tarballs start with a pax global header holding the commit id
        if matches!(
            entry.header().entry_type(),
            EntryType::XGlobalHeader | EntryType::XHeader
        ) {
            continue;
        }

        let entry_path = entry.path()?.to_path_buf();
        let unpacked = entry
            .unpack_in(staging)
            .with_context(|| format!("Failed to extract {:?}", entry_path))?;
        if !unpacked {
            debug!("Skipping entry outside destination: {:?}", entry_path);
        }
    }
    Ok(())
}
