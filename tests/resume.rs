//! Resumption semantics: completion is derived from the files on disk, and a
//! partially written position is never mistaken for a complete one.

use std::fs;
use std::path::Path;

use chimney_daq::acquire::FakeScope;
use chimney_daq::engine::{CampaignEngine, EngineState};
use chimney_daq::sequence::SequencePolicy;
use chimney_daq::verify::Thoroughness;

fn engine(root: &Path) -> CampaignEngine {
    CampaignEngine::new(Box::new(FakeScope::new(16)), root).with_policy(
        SequencePolicy::new(vec![String::new()], vec![2, 1], vec![1, 2]),
    )
}

#[test]
fn resume_skips_completed_coordinates() {
    let root = tempfile::tempdir().unwrap();

    // read the first two of four coordinates, then "crash"
    let mut first = engine(root.path());
    first.start("B13", 2).unwrap();
    assert!(first.read_next().unwrap());
    assert!(first.read_next().unwrap());
    let next = first.current_coordinate().unwrap();
    drop(first);

    let mut second = engine(root.path());
    second.resume("B13", 2, None).unwrap();
    assert_eq!(second.state(), EngineState::Started);
    assert_eq!(second.current_coordinate().unwrap(), next);

    while second.read_next().unwrap() {}
    let report = second.check_output(None, Thoroughness::PARSE).unwrap();
    assert!(report.is_success(), "{report}");
}

#[test]
fn resume_on_a_complete_campaign_is_exhausted() {
    let root = tempfile::tempdir().unwrap();
    let mut first = engine(root.path());
    first.start("B13", 1).unwrap();
    while first.read_next().unwrap() {}
    drop(first);

    let mut second = engine(root.path());
    second.resume("B13", 1, None).unwrap();
    assert_eq!(second.state(), EngineState::SequenceExhausted);
    assert!(!second.read_next().unwrap());
}

#[test]
fn a_partial_position_is_read_again() {
    let root = tempfile::tempdir().unwrap();
    let mut first = engine(root.path());
    first.start("B13", 1).unwrap();
    first.read_next().unwrap();
    let second_coord = first.current_coordinate().unwrap();
    first.read_next().unwrap();
    drop(first);

    // knock one file out of the second coordinate's set
    let dir = root.path().join("CHIMNEY_B13_inprogress");
    let victim = fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains("POS_2"))
        })
        .unwrap();
    fs::remove_file(&victim).unwrap();

    let mut second = engine(root.path());
    second.resume("B13", 1, None).unwrap();
    // the probe stops at the incomplete coordinate, not past it
    assert_eq!(second.current_coordinate().unwrap(), second_coord);

    while second.read_next().unwrap() {}
    let report = second.check_output(None, Thoroughness::PARSE).unwrap();
    assert!(report.is_success(), "{report}");
}

#[test]
fn resume_into_an_explicit_directory() {
    let root = tempfile::tempdir().unwrap();
    let custom = root.path().join("elsewhere");
    let mut engine = engine(root.path());
    engine.resume("B13", 1, Some(&custom)).unwrap();
    assert_eq!(engine.output_dir(), Some(custom.as_path()));
    assert!(custom.is_dir());
    engine.read_next().unwrap();
    let report = engine.check_output(None, Thoroughness::COUNT).unwrap();
    assert_eq!(report.found, 4);
}
