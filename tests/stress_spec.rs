use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

use cfb_fragments::stress::{mangle, FilteringSink, Fuzzer};
use cfb_fragments::{CfbError, DiagnosticLevel, DiagnosticSink};

fn seed_corpus(bytes: &[u8]) -> (tempfile::TempDir, Vec<PathBuf>) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("sample.doc"), bytes).unwrap();
    let dirs = vec![dir.path().to_path_buf()];
    (dir, dirs)
}

#[test]
fn mangle_changes_at_most_fifty_bytes() {
    let original = vec![0u8; 10_000];
    let mut data = original.clone();
    let mut rng = StdRng::seed_from_u64(7);
    mangle(&mut data, &mut rng);

    assert_eq!(data.len(), original.len());
    let changed = data
        .iter()
        .zip(&original)
        .filter(|(a, b)| a != b)
        .count();
    assert!(changed >= 1);
    assert!(changed <= 50);
}

#[test]
fn mangle_handles_tiny_and_empty_buffers() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut empty: Vec<u8> = Vec::new();
    mangle(&mut empty, &mut rng);
    assert!(empty.is_empty());

    for len in 1..30 {
        let mut data = vec![0u8; len];
        mangle(&mut data, &mut rng);
        assert_eq!(data.len(), len);
    }
}

#[test]
fn filtering_sink_ignores_benign_diagnostics() {
    let sink = FilteringSink::new(vec!["unknown property name".to_string()]);
    sink.report(DiagnosticLevel::Info, "anything below error is ignored");
    sink.report(
        DiagnosticLevel::Error,
        "unknown property name \"Macros\", using generic content label",
    );
    assert_eq!(sink.error_count(), 0);

    sink.report(DiagnosticLevel::Error, "allocation chain revisits unit 3");
    assert_eq!(sink.error_count(), 1);
}

#[test]
fn failing_parse_saves_hash_named_reproducer() {
    let (_seed_dir, dirs) = seed_corpus(&[0xAAu8; 300]);
    let error_dir = tempdir().unwrap();

    let mut fuzzer = Fuzzer::new(&dirs, error_dir.path(), |_data, _sink| {
        Err(CfbError::ChainCycle { unit: 3 })
    })
    .unwrap()
    .with_rng(StdRng::seed_from_u64(1));

    let report = fuzzer.run_once().unwrap();
    assert!(report.failed);
    assert!(!report.timed_out);
    assert_eq!(fuzzer.error_count(), 1);

    let path = report.reproducer.unwrap();
    assert!(path.exists());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    // 40 hex digits of ripemd-160, then the seed basename.
    let (hash, rest) = name.split_at(40);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(rest, "-sample.doc");
}

#[test]
fn identical_failures_deduplicate_by_content_hash() {
    let (_seed_dir, dirs) = seed_corpus(&[0x55u8; 300]);
    let error_dir = tempdir().unwrap();

    let fail = |_data: &[u8], _sink: &dyn DiagnosticSink| -> cfb_fragments::Result<()> {
        Err(CfbError::ChainCycle { unit: 3 })
    };

    // Same rng seed on both fuzzers: the mutation streams repeat exactly,
    // so the second failure hashes to the same reproducer name.
    let mut first = Fuzzer::new(&dirs, error_dir.path(), fail)
        .unwrap()
        .with_rng(StdRng::seed_from_u64(9));
    let mut second = Fuzzer::new(&dirs, error_dir.path(), fail)
        .unwrap()
        .with_rng(StdRng::seed_from_u64(9));

    let a = first.run_once().unwrap();
    let b = second.run_once().unwrap();
    assert_eq!(a.reproducer, b.reproducer);
    assert_eq!(fs::read_dir(error_dir.path()).unwrap().count(), 1);
}

#[test]
fn clean_run_saves_nothing() {
    let (_seed_dir, dirs) = seed_corpus(&[0x00u8; 300]);
    let error_dir = tempdir().unwrap();

    let mut fuzzer = Fuzzer::new(&dirs, error_dir.path(), |_data, _sink| Ok(())).unwrap();
    let report = fuzzer.run_once().unwrap();
    assert!(!report.failed);
    assert!(report.reproducer.is_none());
    assert_eq!(fuzzer.error_count(), 0);
    assert_eq!(fs::read_dir(error_dir.path()).unwrap().count(), 0);
}

#[test]
fn sink_errors_classify_the_run_as_failed() {
    let (_seed_dir, dirs) = seed_corpus(&[0x11u8; 300]);
    let error_dir = tempdir().unwrap();

    let mut fuzzer = Fuzzer::new(&dirs, error_dir.path(), |_data, sink| {
        sink.report(DiagnosticLevel::Error, "allocation chain revisits unit 8");
        Ok(())
    })
    .unwrap();
    let report = fuzzer.run_once().unwrap();
    assert!(report.failed);
}

#[test]
fn overlong_run_is_tagged_as_timeout() {
    let (_seed_dir, dirs) = seed_corpus(&[0x22u8; 300]);
    let error_dir = tempdir().unwrap();

    let mut fuzzer = Fuzzer::new(&dirs, error_dir.path(), |_data, _sink| {
        std::thread::sleep(Duration::from_millis(5));
        Ok(())
    })
    .unwrap()
    .with_max_duration(Duration::ZERO);

    let report = fuzzer.run_once().unwrap();
    assert!(report.failed);
    assert!(report.timed_out);
    let name = report
        .reproducer
        .unwrap()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert!(name.starts_with("timeout-"));
}

#[test]
fn empty_corpus_aborts() {
    let empty = tempdir().unwrap();
    let error_dir = tempdir().unwrap();
    let dirs = vec![empty.path().to_path_buf()];
    let err = Fuzzer::new(&dirs, error_dir.path(), |_d: &[u8], _s: &dyn DiagnosticSink| Ok(()))
        .unwrap_err();
    assert!(matches!(err, CfbError::EmptySeedCorpus(_)));
}

#[test]
fn missing_seed_directory_aborts() {
    let error_dir = tempdir().unwrap();
    let dirs = vec![PathBuf::from("/nonexistent/seed/dir")];
    let err = Fuzzer::new(&dirs, error_dir.path(), |_d: &[u8], _s: &dyn DiagnosticSink| Ok(()))
        .unwrap_err();
    assert!(matches!(err, CfbError::Io(_)));
}
