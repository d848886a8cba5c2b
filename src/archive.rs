//! Finalized-campaign metadata and archival script generation.
//!
//! After a campaign directory has been verified and finalized, two files are
//! added alongside the data: `INFO-<dirname>.txt` with human-readable
//! metadata (its `Date:` line is what the downstream database generator reads
//! back), and `archive_<dirname>.sh`, a transfer script carrying the full
//! sorted file manifest. Nothing here executes a transfer; the script is
//! only written.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::chimney::ChimneyId;
use crate::config::StorageParams;
use crate::error::{CampaignError, Result};

fn dir_base_name(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("campaign")
        .to_owned()
}

/// The metadata file path for a campaign directory.
pub fn info_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("INFO-{}.txt", dir_base_name(dir)))
}

/// Writes the `INFO-<dirname>.txt` metadata file and returns its path.
pub fn write_info_file(
    dir: &Path,
    chimney: &ChimneyId,
    waveforms_per_channel: u32,
    expected_files: usize,
) -> Result<PathBuf> {
    let path = info_file_path(dir);
    let content = format!(
        "Date: {}\n\
         Chimney: {}\n\
         WaveformsPerChannel: {}\n\
         ExpectedFiles: {}\n\
         SoftwareVersion: {}\n",
        Local::now().format("%a %b %d %H:%M:%S %Y"),
        chimney,
        waveforms_per_channel,
        expected_files,
        env!("CARGO_PKG_VERSION"),
    );
    fs::write(&path, content)?;
    info!(path = %path.display(), "written campaign metadata");
    Ok(path)
}

/// The finalized, read-only file list plus the generated transfer script.
#[derive(Debug, Clone)]
pub struct ArchiveManifest {
    /// Every data file of the campaign, sorted.
    pub files: Vec<PathBuf>,
    /// The transfer script that was written.
    pub script_path: PathBuf,
}

fn transfer_target(storage: &StorageParams) -> Result<String> {
    let server = storage
        .server
        .as_deref()
        .ok_or(CampaignError::StorageNotConfigured)?;
    let mut target = match storage.remote_user.as_deref() {
        Some(user) => format!("{user}@{server}"),
        None => server.to_owned(),
    };
    target.push(':');
    if let Some(destination) = storage.destination.as_deref() {
        target.push_str(destination);
        target.push('/');
    }
    Ok(target)
}

/// Composes and writes `archive_<dirname>.sh` inside `dir`.
///
/// `files` is the expected file list of the campaign; it is sorted into the
/// script as the transfer manifest. Returns the manifest with the script
/// path; no transfer is attempted.
pub fn generate_archival_script(
    dir: &Path,
    mut files: Vec<PathBuf>,
    storage: &StorageParams,
) -> Result<ArchiveManifest> {
    files.sort();
    let target = transfer_target(storage)?;
    let script_path = dir.join(format!("archive_{}.sh", dir_base_name(dir)));

    let mut script = String::new();
    script.push_str("#!/bin/sh\n");
    script.push_str(&format!(
        "# Archival script for {} ({} data files), generated {}\n",
        dir_base_name(dir),
        files.len(),
        Local::now().format("%a %b %d %H:%M:%S %Y"),
    ));
    script.push_str(&format!("rsync -av \"{}\" \"{}\"\n", dir.display(), target));
    script.push_str("\n# Manifest:\n");
    for file in &files {
        script.push_str(&format!("# {}\n", file.display()));
    }

    fs::write(&script_path, script)?;
    info!(
        path = %script_path.display(),
        files = files.len(),
        target = %target,
        "written archival script"
    );
    Ok(ArchiveManifest { files, script_path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(server: Option<&str>, user: Option<&str>, dest: Option<&str>) -> StorageParams {
        StorageParams {
            server: server.map(str::to_owned),
            remote_user: user.map(str::to_owned),
            destination: dest.map(str::to_owned),
        }
    }

    #[test]
    fn transfer_target_composition() {
        let full = storage(Some("daq.example.org"), Some("icarus"), Some("/data"));
        assert_eq!(
            transfer_target(&full).unwrap(),
            "icarus@daq.example.org:/data/"
        );

        let no_user = storage(Some("daq.example.org"), None, Some("/data"));
        assert_eq!(transfer_target(&no_user).unwrap(), "daq.example.org:/data/");

        let no_dest = storage(Some("daq.example.org"), Some("icarus"), None);
        assert_eq!(transfer_target(&no_dest).unwrap(), "icarus@daq.example.org:");

        assert!(matches!(
            transfer_target(&storage(None, None, None)),
            Err(CampaignError::StorageNotConfigured)
        ));
    }

    #[test]
    fn script_carries_sorted_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![dir.path().join("b.csv"), dir.path().join("a.csv")];
        let manifest = generate_archival_script(
            dir.path(),
            files,
            &storage(Some("daq.example.org"), None, None),
        )
        .unwrap();

        assert_eq!(manifest.files[0].file_name().unwrap(), "a.csv");
        let body = fs::read_to_string(&manifest.script_path).unwrap();
        assert!(body.starts_with("#!/bin/sh\n"));
        assert!(body.contains("rsync -av"));
        let a = body.find("a.csv").unwrap();
        let b = body.find("b.csv").unwrap();
        assert!(a < b);
    }

    #[test]
    fn info_file_names_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let campaign = dir.path().join("CHIMNEY_EW08");
        fs::create_dir(&campaign).unwrap();
        let chimney = ChimneyId::parse("EW08").unwrap();
        let path = write_info_file(&campaign, &chimney, 10, 5760).unwrap();
        assert_eq!(path.file_name().unwrap(), "INFO-CHIMNEY_EW08.txt");
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Date: "));
        assert!(content.contains("Chimney: EW08"));
        assert!(content.contains("ExpectedFiles: 5760"));
    }
}
