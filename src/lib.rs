//! # Chimney DAQ Core Library
//!
//! This crate is the core library for the `chimney_daq` acceptance-test
//! driver. A campaign reads pulse waveforms from every cable and position of
//! one detector chimney through a four-channel oscilloscope, writes each
//! waveform to its own CSV file under a deterministic naming scheme, and can
//! be interrupted and resumed at any point because completion is derived from
//! the files on disk.
//!
//! ## Crate Structure
//!
//! - **`chimney`**: Chimney identifiers in their three naming styles
//!   (geographic, alphabetic, flange) and the conversions between them.
//! - **`coordinate`**: The cable/position/channel coordinate system and the
//!   [`Coordinate`](coordinate::Coordinate) of a single waveform file.
//! - **`address`**: Template-based rendering of file and directory names,
//!   and the inverse parse of an existing path back to its coordinate.
//! - **`sequence`**: The mixed-radix [`SequenceCursor`](sequence::SequenceCursor)
//!   enumerating every test point of a campaign in a configurable order.
//! - **`acquire`**: The [`Acquirer`](acquire::Acquirer) instrument seam and
//!   the deterministic [`FakeScope`](acquire::FakeScope).
//! - **`storage`**: CSV waveform writing and the filesystem primitives the
//!   lifecycle needs (directory creation, read-only locking, listing).
//! - **`verify`**: The tiered verification scan producing a
//!   [`VerificationReport`](verify::VerificationReport).
//! - **`archive`**: The INFO metadata file and the rsync archival script.
//! - **`engine`**: The [`CampaignEngine`](engine::CampaignEngine) tying it
//!   all together: start, resume, read, undo, verify, finalize, archive.
//! - **`render`**: The fire-and-forget [`Renderer`](render::Renderer) seam
//!   for live waveform displays.
//! - **`config`**: TOML + environment configuration via `figment`.
//! - **`error`**: The consolidated [`CampaignError`](error::CampaignError)
//!   and the crate-wide [`Result`](error::Result) alias.

pub mod acquire;
pub mod address;
pub mod archive;
pub mod chimney;
pub mod config;
pub mod coordinate;
pub mod engine;
pub mod error;
pub mod render;
pub mod sequence;
pub mod storage;
pub mod verify;

pub use chimney::{ChimneyId, ChimneyStyle};
pub use coordinate::{CableId, Coordinate};
pub use engine::{CampaignEngine, EngineState};
pub use error::{CampaignError, Result};
pub use sequence::{SequenceCursor, SequencePolicy};
pub use verify::{Thoroughness, VerificationReport};
