//! Bounded-concurrency dispatch of simulator runs.
//!
//! A dedicated rayon pool of `W` threads pulls [`RunSpec`]s in submission
//! order; every job pushes exactly one [`RunOutcome`] into a single result
//! channel. Outcomes come back in completion order.
//!
//! Failures never cross job boundaries: a nonzero exit, a launch error or a
//! panic inside the launcher becomes a failed outcome for that run only.
//! There is no cancellation and no timeout; `dispatch` returns once every
//! submitted run has reached a terminal state.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Instant;

use crate::domain::{ProcessOutput, RunOutcome, RunSpec};
use crate::error::AppError;

/// Environment overlay applied to every simulator invocation.
pub const RUN_ENV_OVERLAY: &[(&str, &str)] = &[("RUST_LOG", "info")];

/// Runs one [`RunSpec`] to completion and returns its buffered output.
///
/// Implemented for plain closures so tests can stand in for the simulator.
pub trait Launcher: Sync {
    fn launch(&self, spec: &RunSpec) -> Result<ProcessOutput, AppError>;
}

impl<F> Launcher for F
where
    F: Fn(&RunSpec) -> Result<ProcessOutput, AppError> + Sync,
{
    fn launch(&self, spec: &RunSpec) -> Result<ProcessOutput, AppError> {
        self(spec)
    }
}

/// Launches the external simulator binary.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    binary: PathBuf,
    env: Vec<(String, String)>,
}

impl ProcessLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            env: RUN_ENV_OVERLAY
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Simulator arguments for one run.
    pub fn command_args(spec: &RunSpec) -> Vec<String> {
        vec![
            format!("--num-nodes={}", spec.num_nodes),
            format!("--end-round={}", spec.end_round),
            format!("--delay={}", spec.delay),
            format!("--generation-time={}", spec.generation_time),
            format!("--protocol={}", spec.protocol),
            format!("--output={}", spec.output_path.display()),
        ]
    }

    /// Shell-like rendering of the invocation, for logs.
    pub fn command_line(&self, spec: &RunSpec) -> String {
        let mut parts: Vec<String> = self.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        parts.push(self.binary.display().to_string());
        parts.extend(Self::command_args(spec));
        parts.join(" ")
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, spec: &RunSpec) -> Result<ProcessOutput, AppError> {
        tracing::debug!(command = %self.command_line(spec), "launching simulator");

        let output = Command::new(&self.binary)
            .args(Self::command_args(spec))
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                AppError::invocation(format!(
                    "Failed to run simulator '{}': {e}",
                    self.binary.display()
                ))
            })?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Bounded worker pool for simulator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDispatcher {
    workers: usize,
}

impl RunDispatcher {
    pub fn new(workers: usize) -> Result<Self, AppError> {
        if workers == 0 {
            return Err(AppError::config("`--max-workers` must be >= 1."));
        }
        Ok(Self { workers })
    }

    /// The degenerate `W = 1` dispatcher: completion order equals submission order.
    pub fn serial() -> Self {
        Self { workers: 1 }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every spec and return one outcome per spec, in completion order.
    pub fn dispatch<L>(&self, specs: &[RunSpec], launcher: &L) -> Result<Vec<RunOutcome>, AppError>
    where
        L: Launcher + ?Sized,
    {
        if specs.is_empty() {
            return Ok(Vec::new());
        }

        let threads = self.workers.min(specs.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("dsweep-worker-{i}"))
            .build()
            .map_err(|e| AppError::invocation(format!("Failed to start worker pool: {e}")))?;

        tracing::info!(runs = specs.len(), workers = threads, "dispatching sweep");

        let (tx, rx) = mpsc::channel::<RunOutcome>();

        // FIFO spawning keeps submission order; with one thread it is also
        // the completion order.
        pool.scope_fifo(|scope| {
            for (index, spec) in specs.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn_fifo(move |_| {
                    let outcome = execute(index, spec, launcher);
                    // The receiver lives until after the scope returns.
                    let _ = tx.send(outcome);
                });
            }
        });
        drop(tx);

        Ok(rx.into_iter().collect())
    }
}

fn execute<L>(index: usize, spec: &RunSpec, launcher: &L) -> RunOutcome
where
    L: Launcher + ?Sized,
{
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| launcher.launch(spec)));
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(Ok(output)) if output.success() => RunOutcome {
            index,
            delta_t: spec.delta_t,
            success: true,
            stdout: output.stdout,
            stderr: output.stderr,
            failure: None,
        },
        Ok(Ok(output)) => {
            let status = output
                .exit_code
                .map(|c| format!("exit code {c}"))
                .unwrap_or_else(|| "terminated by signal".to_string());
            let err = AppError::run_failure(format!(
                "Simulator failed for Δ/T={} ({status}): {}",
                spec.delta_t,
                output.stderr.trim()
            ));
            RunOutcome {
                index,
                delta_t: spec.delta_t,
                success: false,
                stdout: output.stdout,
                stderr: output.stderr,
                failure: Some(err.to_string()),
            }
        }
        Ok(Err(err)) => failed(index, spec, err.to_string()),
        Err(payload) => failed(
            index,
            spec,
            AppError::invocation(format!(
                "Launcher panicked for Δ/T={}: {}",
                spec.delta_t,
                panic_message(payload.as_ref())
            ))
            .to_string(),
        ),
    };

    if outcome.success {
        tracing::info!(delta_t = spec.delta_t, delay = spec.delay, elapsed_ms, "run complete");
    } else {
        tracing::warn!(
            delta_t = spec.delta_t,
            elapsed_ms,
            error = outcome.failure.as_deref().unwrap_or(""),
            "run failed"
        );
    }

    outcome
}

fn failed(index: usize, spec: &RunSpec, message: String) -> RunOutcome {
    RunOutcome {
        index,
        delta_t: spec.delta_t,
        success: false,
        stdout: String::new(),
        stderr: String::new(),
        failure: Some(message),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
