//! CLI entry point for chimney-daq.
//!
//! Runs one full acceptance-test campaign on a chimney: start (or resume),
//! read every cable/position coordinate, verify the output, finalize the
//! directory and write the archival script.
//!
//! # Usage
//!
//! ```bash
//! chimney_daq EW08 --fake -n 10
//! chimney_daq B13 --config chimney.toml --output-root /data
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chimney_daq::acquire::{Acquirer, FakeScope};
use chimney_daq::config::CampaignConfig;
use chimney_daq::engine::{CampaignEngine, EngineState};
use chimney_daq::verify::Thoroughness;

#[derive(Parser)]
#[command(name = "chimney_daq")]
#[command(about = "Chimney cable acceptance-test campaign driver", long_about = None)]
struct Cli {
    /// Chimney to test, in any naming style (e.g. EW08, B13, F07)
    chimney: String,

    /// Configuration file (TOML)
    #[arg(long, default_value = "chimney_daq.toml")]
    config: PathBuf,

    /// Acquire from the deterministic fake scope instead of hardware
    #[arg(long)]
    fake: bool,

    /// Waveforms per channel (overrides the configuration)
    #[arg(short)]
    n: Option<u32>,

    /// Directory the campaign directory is created under
    #[arg(long, default_value = ".")]
    output_root: PathBuf,

    /// Verification thoroughness, 0 (count) to 4 (parse)
    #[arg(long, default_value_t = 4)]
    thoroughness: u8,

    /// Verify only; do not finalize the directory
    #[arg(long)]
    no_finalize: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = CampaignConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let n = cli.n.unwrap_or(config.reader.waveforms_per_channel);

    let acquirer: Box<dyn Acquirer> = if cli.fake || config.reader.fake_mode {
        Box::new(FakeScope::new(config.reader.waveform_samples))
    } else {
        // Oscilloscope communication is carried by a separate deployment
        // layer; this binary only drives the fake acquirer.
        bail!(
            "no instrument backend available for scope {:?}; run with --fake",
            config.scope.address
        );
    };

    let mut engine = CampaignEngine::new(acquirer, &cli.output_root);
    engine.resume(&cli.chimney, n, None)?;

    if engine.state() != EngineState::SequenceExhausted {
        println!("Reading chimney {}...", cli.chimney);
        while engine.read_next()? {}
    }
    println!("All coordinates acquired.");

    let report = engine.verify(
        None,
        Thoroughness::new(cli.thoroughness),
        !cli.no_finalize,
    )?;
    println!("{report}");
    if !report.is_success() {
        bail!("verification failed");
    }

    if config.storage.server.is_some() {
        let manifest = engine.generate_archival_script(&config.storage)?;
        println!(
            "Archival script written: {} ({} files)",
            manifest.script_path.display(),
            manifest.files.len()
        );
    }
    Ok(())
}
