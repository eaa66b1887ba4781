//! External bytecode decompiler integration.
//!
//! Compiled bytecode artifacts carry their strings in a marshalled format
//! the byte-level scanner can only partially see through. When a decompiler
//! binary is available, staged bytecode is handed to it and the recovered
//! source is scanned like any other text artifact.
//!
//! The collaborator is treated as optional and untrusted: every invocation
//! runs under a timeout, a failed invocation is retried once with a shorter
//! timeout, and a second failure marks the handle unavailable so a broken
//! installation costs one round trip, not one per artifact.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::{Error, Result};

/// Decompiler binary resolved from `PATH` when no explicit path is given.
pub const DEFAULT_PROGRAM: &str = "pycdc";

/// Timeout for the first decompilation attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shorter timeout for the single retry.
pub const RETRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to an external bytecode decompiler.
///
/// # Examples
///
/// ```rust,no_run
/// use std::path::Path;
/// use pyscope::decompiler::Decompiler;
///
/// let decompiler = Decompiler::new();
/// match decompiler.decompile(Path::new("/tmp/staged/artifact-0001.pyc")) {
///     Ok(source) => println!("{source}"),
///     Err(e) => eprintln!("decompilation failed: {e}"),
/// }
/// ```
#[derive(Debug)]
pub struct Decompiler {
    program: PathBuf,
    timeout: Duration,
    retry_timeout: Duration,
    unavailable: AtomicBool,
}

impl Default for Decompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Decompiler {
    fn clone(&self) -> Self {
        Self {
            program: self.program.clone(),
            timeout: self.timeout,
            retry_timeout: self.retry_timeout,
            unavailable: AtomicBool::new(self.unavailable.load(Ordering::Relaxed)),
        }
    }
}

impl Decompiler {
    /// Creates a decompiler using [`DEFAULT_PROGRAM`] from `PATH` and the
    /// default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Creates a decompiler invoking `program`.
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
            retry_timeout: RETRY_TIMEOUT,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Sets the timeout for the first attempt.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout for the retry attempt.
    #[must_use]
    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = timeout;
        self
    }

    /// The binary this decompiler invokes.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// True once the collaborator has been written off for this process.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::Relaxed)
    }

    /// Decompile the staged bytecode file at `target`.
    ///
    /// Retries once on failure; a failed retry marks the decompiler
    /// unavailable and every later call fails fast without spawning
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecompilationUnavailable`] when the binary cannot be
    /// started, exits unsuccessfully, exceeds its timeout, or has already
    /// been marked unavailable.
    pub fn decompile(&self, target: &Path) -> Result<String> {
        if self.is_unavailable() {
            return Err(Error::DecompilationUnavailable {
                message: "decompiler marked unavailable".to_string(),
            });
        }

        match run_with_timeout(&self.program, target, self.timeout) {
            Ok(source) => Ok(source),
            Err(first) => {
                debug!(error = %first, "decompiler attempt failed, retrying");
                match run_with_timeout(&self.program, target, self.retry_timeout) {
                    Ok(source) => Ok(source),
                    Err(second) => {
                        self.unavailable.store(true, Ordering::Relaxed);
                        Err(second)
                    }
                }
            }
        }
    }
}

/// Run `program target` on a worker thread, bounded by `timeout`.
///
/// On timeout the worker and its child are abandoned; the child exits on
/// its own and the worker drains into a closed channel.
fn run_with_timeout(program: &Path, target: &Path, timeout: Duration) -> Result<String> {
    let (tx, rx) = mpsc::channel();
    let program = program.to_path_buf();
    let target = target.to_path_buf();

    thread::spawn(move || {
        let result = Command::new(&program).arg(&target).output();
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(output)) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(Ok(output)) => Err(Error::DecompilationUnavailable {
            message: format!("decompiler exited with {}", output.status),
        }),
        Ok(Err(error)) => Err(Error::DecompilationUnavailable {
            message: format!("decompiler failed to start: {error}"),
        }),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::DecompilationUnavailable {
            message: format!("decompiler timed out after {timeout:?}"),
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::DecompilationUnavailable {
            message: "decompiler worker terminated".to_string(),
        }),
    }
}
