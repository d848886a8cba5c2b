//! Waveform persistence: CSV files and the filesystem operations around them.
//!
//! One waveform becomes one CSV file with two numeric columns (time,
//! voltage) and no header. Writing is all-or-nothing from the engine's point
//! of view: any failure propagates and aborts the readout of the current
//! channel, so a half-written file never gets the chance to satisfy a later
//! existence check.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::acquire::Waveform;
use crate::error::{CampaignError, Result};

/// Writes `waveform` into the CSV file at `path`, two columns, no header.
pub fn write_waveform(path: &Path, waveform: &Waveform) -> Result<()> {
    if waveform.times.len() != waveform.volts.len() {
        return Err(CampaignError::WaveformShape {
            times: waveform.times.len(),
            volts: waveform.volts.len(),
        });
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    for (t, v) in waveform.times.iter().zip(&waveform.volts) {
        writer.serialize((t, v))?;
    }
    writer.flush()?;
    debug!(points = waveform.len(), path = %path.display(), "written waveform");
    Ok(())
}

/// Creates `dir` and its parents; an already existing directory is fine.
pub fn make_dirs(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Strips write permission from the file at `path`.
pub fn chmod_read_only(path: &Path) -> Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(true);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// All regular `.csv` files directly inside `dir` (extension matched
/// case-insensitively), unsorted.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_two_column_csv_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.csv");
        let waveform = Waveform {
            times: vec![0.0, 1.0e-5, 2.0e-5],
            volts: vec![0.0, 1.0e-6, 2.0e-6],
        };
        write_waveform(&path, &waveform).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let tokens: Vec<&str> = line.split(',').collect();
            assert_eq!(tokens.len(), 2);
            for token in tokens {
                token.parse::<f64>().unwrap();
            }
        }
    }

    #[test]
    fn rejects_mismatched_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.csv");
        let waveform = Waveform {
            times: vec![0.0, 1.0],
            volts: vec![0.0],
        };
        assert!(matches!(
            write_waveform(&path, &waveform),
            Err(CampaignError::WaveformShape { times: 2, volts: 1 })
        ));
    }

    #[test]
    fn lists_only_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "1,2\n").unwrap();
        fs::write(dir.path().join("b.CSV"), "1,2\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("sub.csv")).unwrap();

        let mut files = list_csv_files(dir.path()).unwrap();
        files.sort();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.csv", "b.CSV"]);
    }

    #[test]
    fn chmod_read_only_locks_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.csv");
        fs::write(&path, "1,2\n").unwrap();
        chmod_read_only(&path).unwrap();
        assert!(fs::metadata(&path).unwrap().permissions().readonly());
    }
}
