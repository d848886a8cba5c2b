//! The instrument seam: waveform acquisition capability.
//!
//! The campaign engine never talks to an oscilloscope directly; it is handed
//! an [`Acquirer`] at construction. The real scope driver lives outside this
//! crate. [`FakeScope`] is the deterministic stand-in used for dry runs and
//! tests: it produces the same regularly spaced ramps the fake mode of the
//! original readout produced.

use crate::error::AcquisitionError;

/// Default number of sampling points in one waveform record.
pub const DEFAULT_WAVEFORM_SAMPLES: usize = 10_000;

/// One acquired waveform: paired time and voltage samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Sampling times, seconds.
    pub times: Vec<f64>,
    /// Sampled voltages, volts.
    pub volts: Vec<f64>,
}

impl Waveform {
    /// Number of sampling points.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the waveform holds no samples.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Capability of retrieving one waveform per scope channel.
pub trait Acquirer {
    /// Optional calibration/arming step, called once per readout batch.
    fn setup(&mut self) -> Result<(), AcquisitionError>;

    /// Reads the waveform currently displayed on `channel_index` (1-based).
    fn read(&mut self, channel_index: u32) -> Result<Waveform, AcquisitionError>;

    /// Number of sampling points each waveform record carries.
    fn samples_per_waveform(&self) -> usize;
}

/// Deterministic fake acquirer.
///
/// Times ramp in 10 µs steps and voltages in 1 µV steps, whatever the
/// channel, so every produced file is identical and its content fully
/// predictable.
#[derive(Debug, Clone)]
pub struct FakeScope {
    samples: usize,
}

impl FakeScope {
    /// A fake scope producing `samples` points per waveform.
    pub fn new(samples: usize) -> Self {
        FakeScope { samples }
    }
}

impl Default for FakeScope {
    fn default() -> Self {
        Self::new(DEFAULT_WAVEFORM_SAMPLES)
    }
}

impl Acquirer for FakeScope {
    fn setup(&mut self) -> Result<(), AcquisitionError> {
        Ok(())
    }

    fn read(&mut self, _channel_index: u32) -> Result<Waveform, AcquisitionError> {
        let times = (0..self.samples).map(|i| i as f64 * 1.0e-5).collect();
        let volts = (0..self.samples).map(|i| i as f64 * 1.0e-6).collect();
        Ok(Waveform { times, volts })
    }

    fn samples_per_waveform(&self) -> usize {
        self.samples
    }
}
