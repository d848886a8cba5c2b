//! Configuration loading.
//!
//! Strongly-typed configuration for the campaign driver, loaded through
//! `figment` from a TOML file plus `CHIMNEY_DAQ_`-prefixed environment
//! variables. The sections mirror the settings of the original readout
//! driver: `[scope]` for the instrument address, `[reader]` for acquisition
//! parameters, `[storage]` for the archival transfer destination.
//!
//! # Example
//! ```no_run
//! use chimney_daq::config::CampaignConfig;
//!
//! let config = CampaignConfig::load("TestConfig.toml")?;
//! println!("waveforms per channel: {}", config.reader.waveforms_per_channel);
//! # Ok::<(), chimney_daq::error::CampaignError>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::acquire::DEFAULT_WAVEFORM_SAMPLES;
use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Oscilloscope settings.
    #[serde(default)]
    pub scope: ScopeConfig,
    /// Readout settings.
    #[serde(default)]
    pub reader: ReaderConfig,
    /// Archival transfer settings.
    #[serde(default)]
    pub storage: StorageParams,
}

/// Oscilloscope connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Instrument IP address; addressed as `TCPIP0::<address>::INSTR` by the
    /// driver. Not needed in fake mode.
    pub address: Option<String>,
}

/// Readout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Waveforms acquired on each position and channel.
    #[serde(default = "default_waveforms_per_channel")]
    pub waveforms_per_channel: u32,
    /// Sampling points per waveform record.
    #[serde(default = "default_waveform_samples")]
    pub waveform_samples: usize,
    /// With fake mode on, no instrument connection is opened and read data
    /// is made up.
    #[serde(default)]
    pub fake_mode: bool,
}

/// Where the archival script sends the data.
///
/// The generated script transfers data with a command like
/// `rsync <source> <user>@<server>:<destination>/`. Without a server no
/// script can be generated; user and destination merely shorten the command
/// when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageParams {
    /// Remote node to transfer data to.
    pub server: Option<String>,
    /// User name for logging into the remote node.
    pub remote_user: Option<String>,
    /// Directory to write into on the remote node.
    pub destination: Option<String>,
}

fn default_waveforms_per_channel() -> u32 {
    10
}

fn default_waveform_samples() -> usize {
    DEFAULT_WAVEFORM_SAMPLES
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            waveforms_per_channel: default_waveforms_per_channel(),
            waveform_samples: default_waveform_samples(),
            fake_mode: false,
        }
    }
}

impl CampaignConfig {
    /// Loads configuration from `path`, environment variables overriding the
    /// file, file values overriding the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::from(Serialized::defaults(CampaignConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("CHIMNEY_DAQ_").split("__"))
            .extract()?;
        Ok(config)
    }
}
