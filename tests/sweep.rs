//! End-to-end sweeps through the public API with in-process launchers.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use delay_sweep::app::pipeline::run_sweep;
use delay_sweep::domain::{ProcessOutput, RunSpec, SweepConfig};
use delay_sweep::error::{AppError, ErrorKind};
use delay_sweep::io::store::{LocalStore, MemoryStore};
use delay_sweep::sweep::ProtocolTable;

fn config(protocol: &str, deltas: &[f64], workers: usize, output_dir: PathBuf) -> SweepConfig {
    SweepConfig {
        protocol: protocol.to_string(),
        delta_values: deltas.to_vec(),
        num_nodes: 10,
        end_round: 1000,
        generation_time: None,
        output_dir,
        max_workers: workers,
    }
}

#[test]
fn ethereum_sweep_derives_delays_and_succeeds() {
    let store = MemoryStore::new();
    let seen = Mutex::new(Vec::new());
    let launcher = |spec: &RunSpec| -> Result<ProcessOutput, AppError> {
        seen.lock().unwrap().push((spec.delta_t, spec.delay, spec.output_path.clone()));
        Ok(ProcessOutput {
            exit_code: Some(0),
            ..ProcessOutput::default()
        })
    };

    let run = run_sweep(
        &config("ethereum", &[0.01, 0.1], 2, PathBuf::from("data")),
        &ProtocolTable::builtin(),
        &store,
        &launcher,
    )
    .unwrap();

    let delays: Vec<u64> = run.specs.iter().map(|s| s.delay).collect();
    assert_eq!(delays, vec![150, 1500]);
    assert_eq!(run.summary.success_count(), 2);
    assert_eq!(run.summary.failure_count(), 0);
    assert_eq!(run.summary.total, 2);

    let mut seen = seen.into_inner().unwrap();
    seen.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert_eq!(seen[0].2, PathBuf::from("data/ethereum-0.01.csv"));
    assert_eq!(seen[1].2, PathBuf::from("data/ethereum-0.1.csv"));
}

#[test]
fn unknown_protocol_never_reaches_the_launcher() {
    let store = MemoryStore::new();
    let calls = AtomicUsize::new(0);
    let launcher = |_: &RunSpec| -> Result<ProcessOutput, AppError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProcessOutput::default())
    };

    let err = run_sweep(
        &config("dogecoin", &[0.1, 0.5], 4, PathBuf::from("data")),
        &ProtocolTable::builtin(),
        &store,
        &launcher,
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.exit_code(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn partition_is_independent_of_pool_size() {
    let deltas = [0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 0.75, 1.0];
    let launcher = |spec: &RunSpec| -> Result<ProcessOutput, AppError> {
        // Deterministic: long delays fail.
        let code = if spec.delay >= 7500 { 1 } else { 0 };
        Ok(ProcessOutput {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: format!("delay {}", spec.delay),
        })
    };

    let partition = |workers: usize| {
        let store = MemoryStore::new();
        let run = run_sweep(
            &config("ethereum", &deltas, workers, PathBuf::from("data")),
            &ProtocolTable::builtin(),
            &store,
            &launcher,
        )
        .unwrap();
        assert_eq!(run.outcomes.len(), deltas.len());
        (run.summary.successful_deltas(), run.summary.failed_deltas())
    };

    let serial = partition(1);
    assert_eq!(serial.0, vec![0.001, 0.01, 0.05, 0.1, 0.25]);
    assert_eq!(serial.1, vec![0.5, 0.75, 1.0]);
    assert_eq!(partition(3), serial);
    assert_eq!(partition(8), serial);
}

#[test]
fn generation_time_override_applies_to_unknown_protocols() {
    let store = MemoryStore::new();
    let launcher = |_: &RunSpec| -> Result<ProcessOutput, AppError> {
        Ok(ProcessOutput {
            exit_code: Some(0),
            ..ProcessOutput::default()
        })
    };
    let mut cfg = config("litecoin", &[0.5], 1, PathBuf::from("data"));
    cfg.generation_time = Some(150_000);

    let run = run_sweep(&cfg, &ProtocolTable::builtin(), &store, &launcher).unwrap();
    assert_eq!(run.specs[0].delay, 75_000);
    assert!(run.summary.all_succeeded());
}

#[test]
fn sweep_creates_the_output_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("nested").join("data");
    let launcher = |_: &RunSpec| -> Result<ProcessOutput, AppError> {
        Ok(ProcessOutput {
            exit_code: Some(0),
            ..ProcessOutput::default()
        })
    };

    run_sweep(
        &config("bitcoin", &[0.1], 1, out.clone()),
        &ProtocolTable::builtin(),
        &LocalStore,
        &launcher,
    )
    .unwrap();
    assert!(out.is_dir());
}

#[cfg(unix)]
#[test]
fn real_processes_are_isolated() {
    use delay_sweep::sweep::ProcessLauncher;

    let store = MemoryStore::new();
    let ok = ProcessLauncher::new("true");
    let run = run_sweep(
        &config("ethereum", &[0.1, 0.2], 2, PathBuf::from("data")),
        &ProtocolTable::builtin(),
        &store,
        &ok,
    )
    .unwrap();
    assert!(run.summary.all_succeeded());

    let failing = ProcessLauncher::new("false");
    let run = run_sweep(
        &config("ethereum", &[0.1, 0.2], 2, PathBuf::from("data")),
        &ProtocolTable::builtin(),
        &store,
        &failing,
    )
    .unwrap();
    assert_eq!(run.summary.failure_count(), 2);
    assert!(run.summary.failed.iter().all(|o| o.failure.is_some()));
}
