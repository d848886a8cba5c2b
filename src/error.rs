//! Custom error types for the campaign engine.
//!
//! This module defines the primary error type, `CampaignError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of errors that can occur, from
//! I/O and configuration issues to addressing and sequencing problems.
//!
//! ## Error Hierarchy
//!
//! `CampaignError` consolidates several per-concern error enums:
//!
//! - [`AddressingError`]: a path or coordinate violates the naming contract.
//!   These are always surfaced to the caller and never silently defaulted.
//! - [`SequenceError`]: an ambiguous or invalid jump target in the test
//!   sequence. Proceeding would corrupt the enumeration, so these abort
//!   immediately.
//! - [`AcquisitionError`]: a failure reported by the instrument layer while
//!   reading one channel. The readout of the current coordinate is aborted
//!   and the cursor is left where it was.
//! - **`FinalizationConflict`**: the rename target of a finalization already
//!   exists. Raised before any destructive step is taken.
//!
//! Verification failures are *not* errors: `check_output` returns a
//! [`VerificationReport`](crate::verify::VerificationReport) and the caller
//! decides whether to retry.
//!
//! By using `#[from]`, `CampaignError` can be seamlessly created from the
//! underlying error types, simplifying error handling throughout the crate
//! with the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, CampaignError>;

/// Malformed or unparseable path/coordinate information.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressingError {
    /// A file name token expected by the naming contract is missing or broken.
    #[error("malformed address in '{path}': {reason} (token: '{token}')")]
    MalformedAddress {
        /// The path being parsed.
        path: PathBuf,
        /// The offending token, or the name of the missing field.
        token: String,
        /// What went wrong with the token.
        reason: String,
    },

    /// The chimney identifier does not match any known naming style.
    #[error("'{0}' is not a valid chimney identifier")]
    InvalidChimney(String),

    /// The cable/connection identifier is not of the form `[A-Z]?[0-9]{{1,2}}`.
    #[error("'{0}' is not a valid cable identifier")]
    InvalidCable(String),

    /// A cable identifier without a tag letter needs a chimney to derive it from.
    #[error("a chimney is required to complete cable identifier '{0}'")]
    CableNeedsChimney(String),

    /// The requested chimney naming style cannot take part in conversions.
    #[error("special chimney style '{style}' can't be converted {direction} a different style")]
    StyleNotConvertible {
        /// Name of the one-directional style.
        style: &'static str,
        /// `"from"` or `"to"`, matching the attempted direction.
        direction: &'static str,
    },

    /// No cable tag is defined for this chimney series.
    #[error("no cable tag for chimneys of series '{0}'")]
    NoCableTag(String),

    /// The naming template could not be rendered with the coordinate fields.
    #[error("naming template error: {0}")]
    Template(String),
}

/// Ambiguous or invalid relocation of a sequence digit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// The requested value occurs more than once in its digit list.
    #[error("value '{value}' is ambiguous in the {digit} sequence")]
    AmbiguousValue {
        /// Which digit the value was looked up in.
        digit: &'static str,
        /// Textual form of the requested value.
        value: String,
    },

    /// The requested value does not occur in its digit list.
    #[error("value '{value}' is not part of the {digit} sequence")]
    NotInSequence {
        /// Which digit the value was looked up in.
        digit: &'static str,
        /// Textual form of the requested value.
        value: String,
    },

    /// The cursor sits on a terminal marker and has no current coordinate.
    #[error("sequence cursor is exhausted")]
    Exhausted,
}

/// Failure from the external acquirer.
#[derive(Error, Debug, Clone)]
pub enum AcquisitionError {
    /// The per-batch calibration step failed.
    #[error("acquirer setup failed: {0}")]
    Setup(String),

    /// Reading one channel failed.
    #[error("reading channel {channel_index} failed: {message}")]
    Read {
        /// Channel index within the position (1-based).
        channel_index: u32,
        /// Driver-provided description.
        message: String,
    },
}

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum CampaignError {
    #[error("Addressing error: {0}")]
    Addressing(#[from] AddressingError),

    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Final directory '{0}' already exists; refusing to overwrite archived data")]
    FinalizationConflict(PathBuf),

    #[error("No campaign started; call start() or resume() first")]
    NotStarted,

    #[error("Waveform has {times} time samples but {volts} voltage samples")]
    WaveformShape {
        /// Length of the time column.
        times: usize,
        /// Length of the voltage column.
        volts: usize,
    },

    #[error("No storage server configured; archival script cannot be generated")]
    StorageNotConfigured,

    #[error("There is no previous reading to remove")]
    NothingToRemove,
}

impl From<figment::Error> for CampaignError {
    fn from(value: figment::Error) -> Self {
        CampaignError::Config(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressing_error_carries_offending_token() {
        let err = AddressingError::MalformedAddress {
            path: PathBuf::from("waveform_CHX.csv"),
            token: "CHX".into(),
            reason: "not a valid channel number".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CHX"));
        assert!(msg.contains("waveform_CHX.csv"));
    }

    #[test]
    fn campaign_error_wraps_sub_errors() {
        let err: CampaignError = SequenceError::Exhausted.into();
        assert!(matches!(err, CampaignError::Sequence(_)));
        let err: CampaignError = AddressingError::InvalidChimney("XY99".into()).into();
        assert!(err.to_string().contains("XY99"));
    }
}
