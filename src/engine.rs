//! Campaign orchestration: the acquire → write → advance loop and the
//! start/resume/verify/finalize/archive lifecycle.
//!
//! # State Machine
//!
//! ```text
//! ┌───────────────┐ start()/resume() ┌─────────┐ read_next() ┌─────────┐
//! │ Uninitialized │─────────────────▶│ Started │────────────▶│ Reading │
//! └───────────────┘                  └─────────┘             └────┬────┘
//!                                                 ▲               │
//!                                                 └───────────────┤
//!                                                    cursor left  │ cursor
//!                                                                 ▼ exhausted
//!      ┌───────────┐   verify() ok   ┌──────────┐   ┌───────────────────┐
//!      │ Finalized │◀────────────────│ Verified │◀──│ SequenceExhausted │
//!      └───────────┘   + finalize    └──────────┘   └───────────────────┘
//! ```
//!
//! `Verified` is re-enterable (a verification may be retried at any
//! thoroughness); `Finalized` is terminal for a working directory: its files
//! are locked read-only and the directory is renamed to its final name.
//!
//! Interruption is handled purely through idempotent resumption, not through
//! in-flight cancellation: `resume()` probes the working directory from the
//! first coordinate and advances the cursor past every coordinate whose full
//! N×4 file set already exists. A position with only some of its files never
//! counts as done.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, warn};

use crate::acquire::Acquirer;
use crate::address::{working_directory_name, AddressCodec, IN_PROGRESS_SUFFIX};
use crate::archive::{self, ArchiveManifest};
use crate::chimney::ChimneyId;
use crate::config::StorageParams;
use crate::coordinate::{CableId, Coordinate, CHANNELS_PER_POSITION};
use crate::error::{CampaignError, Result};
use crate::render::{NullRenderer, Renderer};
use crate::sequence::{SequenceCursor, SequencePolicy};
use crate::storage;
use crate::verify::{self, Thoroughness, VerificationReport};

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No campaign started yet.
    Uninitialized,
    /// Campaign started, cursor pointing at the next coordinate to read.
    Started,
    /// Acquiring the current coordinate.
    Reading,
    /// Every coordinate of the enumeration has been visited.
    SequenceExhausted,
    /// The last verification scan passed.
    Verified,
    /// Directory locked and renamed; terminal.
    Finalized,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Started => "started",
            EngineState::Reading => "reading",
            EngineState::SequenceExhausted => "sequence exhausted",
            EngineState::Verified => "verified",
            EngineState::Finalized => "finalized",
        };
        write!(f, "{label}")
    }
}

/// The per-campaign state established by `start()`/`resume()`.
struct Campaign {
    chimney: ChimneyId,
    n: u32,
    cursor: SequenceCursor,
    codec: AddressCodec,
}

/// Drives one chimney's acceptance-test campaign.
pub struct CampaignEngine {
    acquirer: Box<dyn Acquirer>,
    renderer: Box<dyn Renderer>,
    policy: SequencePolicy,
    output_root: PathBuf,
    state: EngineState,
    campaign: Option<Campaign>,
}

impl CampaignEngine {
    /// An engine writing campaigns under `output_root`, acquiring through
    /// `acquirer`, with the plain descending-cable traversal and no renderer.
    pub fn new(acquirer: Box<dyn Acquirer>, output_root: impl Into<PathBuf>) -> Self {
        CampaignEngine {
            acquirer,
            renderer: Box::new(NullRenderer),
            policy: SequencePolicy::standard(vec![String::new()]),
            output_root: output_root.into(),
            state: EngineState::Uninitialized,
            campaign: None,
        }
    }

    /// Replaces the traversal policy (e.g. paired-slot order, extra test
    /// kinds).
    pub fn with_policy(mut self, policy: SequencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attaches a renderer called after every successful position readout.
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// The current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The working/final directory of the running campaign.
    pub fn output_dir(&self) -> Option<&Path> {
        self.campaign.as_ref().map(|c| c.codec.root())
    }

    /// The coordinate the cursor currently points at, if any.
    pub fn current_coordinate(&self) -> Option<Coordinate> {
        let campaign = self.campaign.as_ref()?;
        campaign.cursor.coordinate(&campaign.chimney, campaign.n).ok()
    }

    fn campaign(&self) -> Result<&Campaign> {
        self.campaign.as_ref().ok_or(CampaignError::NotStarted)
    }

    /// Starts a fresh campaign for `chimney`, acquiring `n` waveforms per
    /// channel.
    ///
    /// The working directory is derived from the chimney name and created if
    /// needed; a pre-existing one is not an error (that is what makes
    /// resumption possible at all).
    pub fn start(&mut self, chimney: &str, n: u32) -> Result<()> {
        self.start_in(chimney, n, None)
    }

    fn start_in(&mut self, chimney: &str, n: u32, output_dir: Option<&Path>) -> Result<()> {
        let chimney = ChimneyId::parse(chimney)?;
        let working_dir = match output_dir {
            Some(dir) => dir.to_owned(),
            None => self.output_root.join(working_directory_name(&chimney)?),
        };
        storage::make_dirs(&working_dir)?;
        info!(chimney = %chimney, dir = %working_dir.display(), "campaign output directory ready");

        self.campaign = Some(Campaign {
            chimney,
            n,
            cursor: SequenceCursor::new(self.policy.clone()),
            codec: AddressCodec::standard(working_dir),
        });
        self.state = EngineState::Started;
        Ok(())
    }

    /// Starts a campaign for `chimney`, then advances the cursor past every
    /// coordinate whose complete file set already exists in the working
    /// directory (the one derived from the chimney, unless `output_dir`
    /// overrides it).
    ///
    /// The probe stops at the first coordinate with any missing file, so a
    /// partially written position is read again in full rather than being
    /// mistaken for complete.
    pub fn resume(&mut self, chimney: &str, n: u32, output_dir: Option<&Path>) -> Result<()> {
        self.start_in(chimney, n, output_dir)?;
        let campaign = self
            .campaign
            .as_mut()
            .ok_or(CampaignError::NotStarted)?;

        let mut skipped = 0usize;
        while campaign.cursor.is_valid() {
            let coordinate = campaign.cursor.coordinate(&campaign.chimney, campaign.n)?;
            let paths = campaign.codec.position_paths(&coordinate, campaign.n)?;
            if !paths.iter().all(|p| p.is_file()) {
                break;
            }
            campaign.cursor.go_next(1);
            skipped += 1;
        }

        if campaign.cursor.is_at_end() {
            info!(skipped, "every coordinate already acquired");
            self.state = EngineState::SequenceExhausted;
        } else if let Some(coordinate) = self.current_coordinate() {
            info!(skipped, next = %coordinate, "campaign resumed");
        }
        Ok(())
    }

    /// Acquires and writes all `n`×4 waveform files of the current
    /// coordinate, then advances the cursor.
    ///
    /// Returns whether further coordinates remain. Any acquisition or write
    /// failure propagates without advancing the cursor, so the same
    /// coordinate is retried (or resumed) later; a partially written
    /// position is exactly what `resume()` knows how to handle.
    pub fn read_next(&mut self) -> Result<bool> {
        let campaign = self.campaign.as_mut().ok_or(CampaignError::NotStarted)?;
        if !campaign.cursor.is_valid() {
            self.state = EngineState::SequenceExhausted;
            return Ok(false);
        }
        let mut coordinate = campaign.cursor.coordinate(&campaign.chimney, campaign.n)?;
        let span = info_span!("readout", coordinate = %coordinate).entered();
        self.state = EngineState::Reading;

        self.acquirer.setup()?;

        let first_index = coordinate.index;
        for sample in 0..campaign.n {
            coordinate.index = first_index + sample;
            for channel_index in 1..=CHANNELS_PER_POSITION {
                coordinate.channel_index = channel_index;
                let waveform = self.acquirer.read(channel_index)?;
                let path = campaign.codec.path_for(&coordinate)?;
                storage::write_waveform(&path, &waveform)?;
            }
        }
        debug!(files = campaign.n * CHANNELS_PER_POSITION, "position read out");
        drop(span);

        self.renderer.draw_position(&coordinate);

        let more = campaign.cursor.go_next(1);
        if more {
            self.state = EngineState::Started;
            if let Some(next) = self.current_coordinate() {
                info!(next = %next, "ready for next readout");
            }
        } else {
            info!("sequence exhausted");
            self.state = EngineState::SequenceExhausted;
        }
        Ok(more)
    }

    /// Steps the cursor back over the last `n` readouts and deletes their
    /// files.
    ///
    /// A file that is already gone is only warned about. Rolling under the
    /// first coordinate fails with [`CampaignError::NothingToRemove`].
    pub fn remove_last(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            let campaign = self.campaign.as_mut().ok_or(CampaignError::NotStarted)?;
            if !campaign.cursor.go_prev(1) {
                campaign.cursor.reset();
                return Err(CampaignError::NothingToRemove);
            }
            let coordinate = campaign.cursor.coordinate(&campaign.chimney, campaign.n)?;
            let paths = campaign.codec.position_paths(&coordinate, campaign.n)?;
            info!(coordinate = %coordinate, files = paths.len(), "removing last readout");
            for path in paths {
                if !path.exists() {
                    warn!(path = %path.display(), "expected data file not found");
                    continue;
                }
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to remove file");
                }
            }
            self.state = EngineState::Started;
        }
        Ok(())
    }

    /// The full expected file set of the campaign, under `dir`.
    fn expected_files(&self, dir: &Path) -> Result<BTreeSet<PathBuf>> {
        let campaign = self.campaign()?;
        let codec = campaign.codec.with_root(dir);
        let mut expected = BTreeSet::new();
        for (test, cable, position) in campaign.cursor.iter() {
            let coordinate = Coordinate {
                test,
                chimney: campaign.chimney.clone(),
                connection: CableId::for_chimney(&campaign.chimney, cable)?,
                position,
                channel_index: 1,
                index: Coordinate::first_index_of(position, campaign.n),
            };
            expected.extend(codec.position_paths(&coordinate, campaign.n)?);
        }
        Ok(expected)
    }

    /// Scans `dir` (the campaign's own directory when `None`) against the
    /// expected file set, at the requested thoroughness.
    ///
    /// Stateless and re-runnable: nothing about the campaign changes, which
    /// ever way the scan turns out.
    pub fn check_output(
        &self,
        dir: Option<&Path>,
        thoroughness: Thoroughness,
    ) -> Result<VerificationReport> {
        let campaign = self.campaign()?;
        let dir = dir.unwrap_or_else(|| campaign.codec.root()).to_owned();
        let expected = self.expected_files(&dir)?;
        Ok(verify::scan(
            &dir,
            &expected,
            self.acquirer.samples_per_waveform(),
            thoroughness,
        ))
    }

    /// Runs a verification scan and, if it passes and `finalize` is
    /// requested, promotes the directory to its final, read-only form.
    ///
    /// Finalization preflights the rename target before touching anything:
    /// an already existing final directory is a hard
    /// [`CampaignError::FinalizationConflict`], never a merge. The
    /// lock-down of the data files happens before the rename, so the
    /// directory that appears under the final name is protected from the
    /// start. A directory that is not a working directory (no in-progress
    /// suffix) is treated as already final: its files are locked and the
    /// metadata file ensured, but nothing is renamed.
    pub fn verify(
        &mut self,
        output_dir: Option<&Path>,
        thoroughness: Thoroughness,
        finalize: bool,
    ) -> Result<VerificationReport> {
        let report = self.check_output(output_dir, thoroughness)?;
        if !report.is_success() {
            return Ok(report);
        }
        self.state = EngineState::Verified;
        if finalize {
            let dir = match output_dir {
                Some(dir) => dir.to_owned(),
                None => self.campaign()?.codec.root().to_owned(),
            };
            self.finalize(&dir)?;
        }
        Ok(report)
    }

    fn finalize(&mut self, dir: &Path) -> Result<PathBuf> {
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();

        let final_dir = match name.strip_suffix(IN_PROGRESS_SUFFIX) {
            Some(final_name) => dir.with_file_name(final_name),
            None => {
                info!(dir = %dir.display(), "not a working directory, contents are already final");
                dir.to_owned()
            }
        };

        // preflight before any destructive step
        if final_dir != dir && final_dir.exists() {
            return Err(CampaignError::FinalizationConflict(final_dir));
        }

        // lock down first, then rename: the final name only ever points at
        // protected files
        for path in self.expected_files(dir)? {
            storage::chmod_read_only(&path)?;
        }
        if final_dir != dir {
            fs::rename(dir, &final_dir)?;
            info!(from = %dir.display(), to = %final_dir.display(), "campaign directory finalized");
        }

        {
            let campaign = self.campaign.as_mut().ok_or(CampaignError::NotStarted)?;
            campaign.codec = campaign.codec.with_root(final_dir.clone());
        }
        let campaign = self.campaign()?;
        archive::write_info_file(
            &final_dir,
            &campaign.chimney,
            campaign.n,
            campaign.cursor.policy().total()
                * (campaign.n * CHANNELS_PER_POSITION) as usize,
        )?;
        self.state = EngineState::Finalized;
        Ok(final_dir)
    }

    /// Writes the archival transfer script for the campaign directory and
    /// returns the manifest. Executes nothing.
    pub fn generate_archival_script(&self, storage: &StorageParams) -> Result<ArchiveManifest> {
        let campaign = self.campaign()?;
        let dir = campaign.codec.root().to_owned();
        let files = self.expected_files(&dir)?.into_iter().collect();
        archive::generate_archival_script(&dir, files, storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::FakeScope;

    fn engine(root: &Path, positions: Vec<u32>, cables: Vec<u32>) -> CampaignEngine {
        CampaignEngine::new(Box::new(FakeScope::new(16)), root)
            .with_policy(SequencePolicy::new(vec![String::new()], cables, positions))
    }

    #[test]
    fn start_creates_the_working_directory() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(root.path(), vec![1, 2], vec![2, 1]);
        engine.start("EW08", 1).unwrap();
        assert_eq!(engine.state(), EngineState::Started);
        let dir = root.path().join("CHIMNEY_EW08_inprogress");
        assert!(dir.is_dir());
        assert_eq!(engine.output_dir(), Some(dir.as_path()));

        // starting again over the existing directory is fine
        engine.start("EW08", 1).unwrap();
        assert_eq!(engine.state(), EngineState::Started);
    }

    #[test]
    fn read_next_walks_the_whole_sequence() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(root.path(), vec![1, 2], vec![2, 1]);
        engine.start("EW08", 1).unwrap();

        let mut readouts = 1;
        while engine.read_next().unwrap() {
            readouts += 1;
        }
        assert_eq!(readouts, 4);
        assert_eq!(engine.state(), EngineState::SequenceExhausted);

        let report = engine
            .check_output(None, Thoroughness::PARSE)
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.expected, 4 * 4); // 4 coordinates x 4 channels x N=1
    }

    #[test]
    fn read_next_after_exhaustion_reports_done() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(root.path(), vec![1], vec![1]);
        engine.start("EW08", 1).unwrap();
        assert!(!engine.read_next().unwrap());
        assert!(!engine.read_next().unwrap());
        assert_eq!(engine.state(), EngineState::SequenceExhausted);
    }

    #[test]
    fn requires_start_before_reading() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(root.path(), vec![1], vec![1]);
        assert!(matches!(
            engine.read_next(),
            Err(CampaignError::NotStarted)
        ));
        assert!(matches!(
            engine.check_output(None, Thoroughness::COUNT),
            Err(CampaignError::NotStarted)
        ));
    }

    #[test]
    fn rejects_bad_chimney_names() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(root.path(), vec![1], vec![1]);
        assert!(engine.start("XX99", 1).is_err());
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    #[test]
    fn remove_last_deletes_the_previous_position() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(root.path(), vec![1, 2], vec![1]);
        engine.start("EW08", 1).unwrap();
        engine.read_next().unwrap();
        let report = engine.check_output(None, Thoroughness::COUNT).unwrap();
        assert_eq!(report.found, 4);

        engine.remove_last(1).unwrap();
        let report = engine.check_output(None, Thoroughness::COUNT).unwrap();
        assert_eq!(report.found, 0);

        // nothing left to remove
        assert!(matches!(
            engine.remove_last(1),
            Err(CampaignError::NothingToRemove)
        ));
    }
}
