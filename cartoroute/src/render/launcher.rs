//! Starting render workers.
//!
//! A worker is any long-lived execution unit that reads requests and writes
//! completion lines (see [`protocol`](super::protocol)). The dispatcher only
//! sees its input and output streams, which keeps the pool testable without
//! spawning real processes.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::debug;

use super::RenderError;

/// Path of the image artifact written by worker `index`.
///
/// Keyed by worker identity so concurrent workers never collide; a worker
/// overwrites its own artifact on every task.
pub fn artifact_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("renderer_process{}_output.png", index))
}

/// Streams connected to a started worker.
pub struct WorkerChannels {
    /// Request stream (the worker's stdin).
    pub input: Box<dyn Write + Send>,

    /// Completion stream (the worker's stdout).
    pub output: Box<dyn BufRead + Send>,

    /// OS process handle, if the worker is a child process.
    pub process: Option<Child>,
}

impl std::fmt::Debug for WorkerChannels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerChannels")
            .field("pid", &self.process.as_ref().map(Child::id))
            .finish()
    }
}

/// Starts render workers for the dispatcher's pool.
pub trait WorkerLauncher: Send + Sync {
    /// Start worker `index`, which must write its images to `artifact`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::WorkerStart` if the worker cannot be started.
    fn launch(&self, index: usize, artifact: &Path) -> Result<WorkerChannels, RenderError>;
}

// =============================================================================
// Process Launcher
// =============================================================================

/// Launches workers as child processes.
///
/// The worker is invoked as `program [args...] <index> <artifact-path>` with
/// piped stdin/stdout; stderr is inherited so worker diagnostics reach the
/// parent's terminal or log.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    /// Create a launcher for `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Set extra arguments placed before the worker index.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, index: usize, artifact: &Path) -> Result<WorkerChannels, RenderError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(index.to_string())
            .arg(artifact)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RenderError::WorkerStart { index, source })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RenderError::WorkerStart {
                    index,
                    source: io::Error::new(io::ErrorKind::BrokenPipe, "worker pipes not captured"),
                });
            }
        };

        debug!(
            worker = index,
            pid = child.id(),
            program = %self.program.display(),
            "Render worker started"
        );

        Ok(WorkerChannels {
            input: Box::new(BufWriter::new(stdin)),
            output: Box::new(BufReader::new(stdout)),
            process: Some(child),
        })
    }
}
