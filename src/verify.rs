//! Tiered integrity checking of a campaign output directory.
//!
//! A scan compares the CSV files on disk against the expected path set at a
//! requested [`Thoroughness`] level. The ladder is cumulative, each level
//! implying the previous:
//!
//! | Level | Check |
//! |-------|-------|
//! | 0     | the number of on-disk CSV files equals the expected count |
//! | 1     | no expected file is missing |
//! | 2     | no spurious CSV file is present |
//! | 3     | every expected file holds the expected number of data lines |
//! | 4     | every data line parses as exactly two numeric tokens |
//!
//! A failing level never stops the scan: every requested level is still
//! evaluated and reported, so one pass yields the maximum diagnostic value.
//! The result is a [`VerificationReport`], not an error: the caller decides
//! what to do with a failure.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::Result;

/// The requested rigor of a verification scan, 0 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Thoroughness(u8);

impl Thoroughness {
    /// Level 0: file count only.
    pub const COUNT: Thoroughness = Thoroughness(0);
    /// Level 1: no missing files.
    pub const MISSING: Thoroughness = Thoroughness(1);
    /// Level 2: no spurious files.
    pub const SPURIOUS: Thoroughness = Thoroughness(2);
    /// Level 3: expected line counts.
    pub const LINE_COUNT: Thoroughness = Thoroughness(3);
    /// Level 4: fully parseable content.
    pub const PARSE: Thoroughness = Thoroughness(4);

    /// A level from its numeric value, clamped to the deepest defined check.
    pub fn new(level: u8) -> Self {
        Thoroughness(level.min(4))
    }

    /// The numeric level.
    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Thoroughness {
    /// Level 1, the original default of the readout driver.
    fn default() -> Self {
        Thoroughness::MISSING
    }
}

/// Outcome of one verification scan.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// The level the scan was run at.
    pub thoroughness: Thoroughness,
    /// Number of files the campaign should have produced.
    pub expected: usize,
    /// Number of CSV files actually found.
    pub found: usize,
    /// The output directory did not exist (everything counts as missing).
    pub directory_missing: bool,
    /// Expected files not on disk, sorted.
    pub missing: Vec<PathBuf>,
    /// On-disk CSV files nothing expected, sorted.
    pub spurious: Vec<PathBuf>,
    /// Expected files with the wrong number of data lines, with the count
    /// found.
    pub wrong_line_count: Vec<(PathBuf, usize)>,
    /// Expected files with an unparseable line: path, 1-based line number,
    /// line content.
    pub malformed: Vec<(PathBuf, usize, String)>,
    /// Expected files that could not be read at all, with the error text.
    /// Their line count is unverifiable, so they fail the line-count level.
    pub unreadable: Vec<(PathBuf, String)>,
}

impl VerificationReport {
    /// Whether the single check of `level` passed, ignoring other levels.
    pub fn passed(&self, level: Thoroughness) -> bool {
        match level.level() {
            0 => !self.directory_missing && self.found == self.expected,
            1 => self.missing.is_empty(),
            2 => self.spurious.is_empty(),
            3 => self.wrong_line_count.is_empty() && self.unreadable.is_empty(),
            _ => self.malformed.is_empty(),
        }
    }

    /// Whether every check up to and including `level` passed.
    pub fn success_at(&self, level: Thoroughness) -> bool {
        (0..=level.level()).all(|l| self.passed(Thoroughness::new(l)))
    }

    /// Whether the scan passed at its requested thoroughness.
    pub fn is_success(&self) -> bool {
        self.success_at(self.thoroughness)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.directory_missing {
            return write!(f, "output directory not found");
        }
        write!(
            f,
            "verification level {}: {}/{} files",
            self.thoroughness.level(),
            self.found,
            self.expected
        )?;
        if !self.missing.is_empty() {
            write!(f, ", {} missing", self.missing.len())?;
        }
        if !self.spurious.is_empty() {
            write!(f, ", {} spurious", self.spurious.len())?;
        }
        if !self.wrong_line_count.is_empty() {
            write!(f, ", {} with wrong line count", self.wrong_line_count.len())?;
        }
        if !self.unreadable.is_empty() {
            write!(f, ", {} unreadable", self.unreadable.len())?;
        }
        if !self.malformed.is_empty() {
            write!(f, ", {} malformed", self.malformed.len())?;
        }
        if self.is_success() {
            write!(f, " (passed)")?;
        }
        Ok(())
    }
}

/// Counts data lines and finds the first malformed one of a CSV file.
///
/// Empty lines and `#` comment lines do not count; a data line must hold
/// exactly two comma-separated numeric tokens to parse.
fn inspect_file(path: &Path) -> Result<(usize, Option<(usize, String)>)> {
    let content = fs::read_to_string(path)?;
    let mut data_lines = 0;
    let mut first_malformed = None;
    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        data_lines += 1;
        if first_malformed.is_none() {
            let tokens: Vec<&str> = line.split(',').collect();
            let all_numeric = tokens
                .iter()
                .all(|t| t.trim().parse::<f64>().is_ok());
            if tokens.len() != 2 || !all_numeric {
                first_malformed = Some((line_number + 1, line.to_owned()));
            }
        }
    }
    Ok((data_lines, first_malformed))
}

/// Scans `dir` against `expected`, at the requested `thoroughness`.
///
/// `samples_per_waveform` is the data-line count every file must have for
/// level 3. The scan is read-only and re-runnable; I/O trouble while reading
/// an individual file is reported as a malformed entry rather than aborting
/// the whole scan.
pub fn scan(
    dir: &Path,
    expected: &BTreeSet<PathBuf>,
    samples_per_waveform: usize,
    thoroughness: Thoroughness,
) -> VerificationReport {
    let mut report = VerificationReport {
        thoroughness,
        expected: expected.len(),
        found: 0,
        directory_missing: false,
        missing: Vec::new(),
        spurious: Vec::new(),
        wrong_line_count: Vec::new(),
        malformed: Vec::new(),
        unreadable: Vec::new(),
    };

    if !dir.is_dir() {
        error!(
            expected = expected.len(),
            dir = %dir.display(),
            "output directory does not exist"
        );
        report.directory_missing = true;
        report.missing = expected.iter().cloned().collect();
        return report;
    }

    let on_disk: BTreeSet<PathBuf> = crate::storage::list_csv_files(dir)
        .unwrap_or_default()
        .into_iter()
        .collect();
    report.found = on_disk.len();
    debug!(found = report.found, expected = report.expected, dir = %dir.display(), "scanning");

    if report.found != report.expected {
        error!(
            expected = report.expected,
            found = report.found,
            dir = %dir.display(),
            "file count mismatch"
        );
    }

    if thoroughness >= Thoroughness::MISSING {
        report.missing = expected.difference(&on_disk).cloned().collect();
        if !report.missing.is_empty() {
            error!(
                missing = report.missing.len(),
                expected = report.expected,
                first = %report.missing[0].display(),
                "expected files missing"
            );
        }
    }

    if thoroughness >= Thoroughness::SPURIOUS {
        report.spurious = on_disk.difference(expected).cloned().collect();
        if !report.spurious.is_empty() {
            error!(
                spurious = report.spurious.len(),
                first = %report.spurious[0].display(),
                "spurious CSV files present"
            );
        }
    }

    if thoroughness >= Thoroughness::LINE_COUNT {
        for path in expected.intersection(&on_disk) {
            match inspect_file(path) {
                Ok((data_lines, first_malformed)) => {
                    if data_lines != samples_per_waveform {
                        error!(
                            path = %path.display(),
                            lines = data_lines,
                            expected = samples_per_waveform,
                            "wrong number of data lines"
                        );
                        report.wrong_line_count.push((path.clone(), data_lines));
                    }
                    if thoroughness >= Thoroughness::PARSE {
                        if let Some((line_number, content)) = first_malformed {
                            error!(
                                path = %path.display(),
                                line = line_number,
                                "unparseable data line"
                            );
                            report.malformed.push((path.clone(), line_number, content));
                        }
                    }
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "cannot inspect file");
                    report.unreadable.push((path.clone(), e.to_string()));
                }
            }
        }
    }

    info!(
        success = report.is_success(),
        level = thoroughness.level(),
        "verification scan complete"
    );
    report
}
