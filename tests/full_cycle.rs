//! End-to-end campaign run in fake mode: start, read everything, verify,
//! finalize, generate the archival script.

use std::fs;
use std::path::Path;

use chimney_daq::acquire::FakeScope;
use chimney_daq::config::StorageParams;
use chimney_daq::engine::{CampaignEngine, EngineState};
use chimney_daq::sequence::SequencePolicy;
use chimney_daq::verify::Thoroughness;
use chimney_daq::CampaignError;

const SAMPLES: usize = 32;

fn small_engine(root: &Path) -> CampaignEngine {
    CampaignEngine::new(Box::new(FakeScope::new(SAMPLES)), root).with_policy(
        SequencePolicy::new(vec![String::new()], vec![18, 1], vec![1, 2]),
    )
}

#[test]
fn full_cycle_in_fake_mode() {
    let root = tempfile::tempdir().unwrap();
    let mut engine = small_engine(root.path());
    engine.start("EW08", 2).unwrap();

    let working_dir = root.path().join("CHIMNEY_EW08_inprogress");
    assert!(working_dir.is_dir());

    while engine.read_next().unwrap() {}
    assert_eq!(engine.state(), EngineState::SequenceExhausted);

    // 2 cables x 2 positions x 4 channels x N=2
    let report = engine.check_output(None, Thoroughness::PARSE).unwrap();
    assert!(report.is_success(), "{report}");
    assert_eq!(report.expected, 32);
    assert_eq!(report.found, 32);

    let report = engine.verify(None, Thoroughness::PARSE, true).unwrap();
    assert!(report.is_success());
    assert_eq!(engine.state(), EngineState::Finalized);

    // working directory renamed to its final form
    let final_dir = root.path().join("CHIMNEY_EW08");
    assert!(!working_dir.exists());
    assert!(final_dir.is_dir());
    assert_eq!(engine.output_dir(), Some(final_dir.as_path()));

    // data files are locked read-only and hold the fake ramps
    let sample = final_dir.join("waveform_CH1_CHIMNEY_EW08_CONN_S18_POS_1_1.csv");
    assert!(sample.is_file());
    assert!(fs::metadata(&sample).unwrap().permissions().readonly());
    let content = fs::read_to_string(&sample).unwrap();
    assert_eq!(content.lines().count(), SAMPLES);
    let first: Vec<&str> = content.lines().next().unwrap().split(',').collect();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].parse::<f64>().unwrap(), 0.0);

    // metadata file written alongside the data
    let info = fs::read_to_string(final_dir.join("INFO-CHIMNEY_EW08.txt")).unwrap();
    assert!(info.lines().any(|l| l.starts_with("Date:")));
    assert!(info.contains("Chimney: EW08"));

    let storage = StorageParams {
        server: Some("daq.example.org".into()),
        remote_user: Some("tester".into()),
        destination: Some("/archive".into()),
    };
    let manifest = engine.generate_archival_script(&storage).unwrap();
    assert_eq!(manifest.files.len(), 32);
    let script = fs::read_to_string(&manifest.script_path).unwrap();
    assert!(script.contains("rsync -av"));
    assert!(script.contains("tester@daq.example.org:/archive/"));
}

#[test]
fn finalize_refuses_to_clobber_an_existing_final_directory() {
    let root = tempfile::tempdir().unwrap();
    let mut engine = small_engine(root.path());
    engine.start("EW08", 1).unwrap();
    while engine.read_next().unwrap() {}

    fs::create_dir(root.path().join("CHIMNEY_EW08")).unwrap();
    let err = engine
        .verify(None, Thoroughness::PARSE, true)
        .unwrap_err();
    assert!(matches!(err, CampaignError::FinalizationConflict(_)));

    // nothing was renamed and the data is still there
    assert!(root.path().join("CHIMNEY_EW08_inprogress").is_dir());
    let report = engine.check_output(None, Thoroughness::PARSE).unwrap();
    assert!(report.is_success());
}

#[test]
fn verification_failure_skips_finalization() {
    let root = tempfile::tempdir().unwrap();
    let mut engine = small_engine(root.path());
    engine.start("EW08", 1).unwrap();
    engine.read_next().unwrap();

    // only the first coordinate was read
    let report = engine.verify(None, Thoroughness::MISSING, true).unwrap();
    assert!(!report.is_success());
    assert_eq!(report.missing.len(), 12);
    assert_ne!(engine.state(), EngineState::Finalized);
    assert!(root.path().join("CHIMNEY_EW08_inprogress").is_dir());
}

#[test]
fn archival_script_requires_a_server() {
    let root = tempfile::tempdir().unwrap();
    let mut engine = small_engine(root.path());
    engine.start("EW08", 1).unwrap();
    while engine.read_next().unwrap() {}

    let err = engine
        .generate_archival_script(&StorageParams::default())
        .unwrap_err();
    assert!(matches!(err, CampaignError::StorageNotConfigured));
}
