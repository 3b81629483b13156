//! Process execution abstraction.
//!
//! [`ProcessRunner`] is the seam between dispatch and the operating system.
//! [`CommandRunner`] spawns real interpreters; the `mock` module (behind the
//! `test-utils` feature) scripts responses so pipelines can be tested
//! without any interpreter installed.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::{CancelToken, ExecError};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything needed to start one interpreter process.
#[derive(Clone, Debug)]
pub struct ProcessSpec {
    /// Interpreter executable.
    pub program: String,
    /// Full argument vector (includes the source path and parameter).
    pub args: Vec<String>,
    /// Scratch file holding the program source.
    pub source_path: PathBuf,
    /// Positional parameter bound from an adjacent literal segment.
    pub param: Option<String>,
    /// Bytes for standard input; `None` connects stdin to null.
    pub stdin: Option<Bytes>,
    /// Wall-clock deadline for the run.
    pub timeout: Duration,
}

/// What a finished process produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// A successful run with the given standard output.
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A failed run with the given exit code and standard error.
    pub fn failure(status: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(status),
            success: false,
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }
}

/// Trait for running interpreter processes.
///
/// Implementations block until the process finishes, its deadline passes,
/// or the cancel token fires.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, spec: &ProcessSpec, cancel: &CancelToken) -> Result<ProcessOutput, ExecError>;
}

/// Production runner built on `std::process::Command`.
///
/// Stdin is fed and stdout/stderr are drained on helper threads so that a
/// child producing more output than a pipe buffer holds cannot deadlock the
/// wait loop. The deadline covers the drain as well as the exit: on Unix the
/// program runs in its own process group, and the group is killed when the
/// deadline passes or the run is cancelled.
#[derive(Clone, Debug, Default)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for CommandRunner {
    fn run(&self, spec: &ProcessSpec, cancel: &CancelToken) -> Result<ProcessOutput, ExecError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Background processes the program starts share its group, so the
        // whole group can be killed on expiry.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        if let (Some(mut pipe), Some(input)) = (child.stdin.take(), spec.stdin.clone()) {
            // A child that never reads its input closes the pipe early; the
            // resulting write error is not a failure of the run.
            thread::spawn(move || {
                let _ = pipe.write_all(&input);
            });
        }

        let (sender, outputs) = mpsc::channel();
        let mut pending = 0;
        if let Some(pipe) = child.stdout.take() {
            drain(Stream::Stdout, pipe, sender.clone());
            pending += 1;
        }
        if let Some(pipe) = child.stderr.take() {
            drain(Stream::Stderr, pipe, sender.clone());
            pending += 1;
        }
        drop(sender);

        let started = Instant::now();
        let mut status = None;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        // The run is over once the program has exited and both pipes hit
        // end of file. A grandchild holding a pipe open keeps it running.
        while status.is_none() || pending > 0 {
            if status.is_none() {
                status = child.try_wait()?;
            }

            if cancel.is_cancelled() {
                terminate(&mut child);
                tracing::debug!(program = %spec.program, "killed cancelled process");
                return Err(ExecError::Cancelled);
            }

            if started.elapsed() >= spec.timeout {
                terminate(&mut child);
                tracing::warn!(
                    program = %spec.program,
                    timeout_ms = spec.timeout.as_millis() as u64,
                    exited = status.is_some(),
                    "killed process after timeout"
                );
                return Err(ExecError::Timeout {
                    program: spec.program.clone(),
                    after: spec.timeout,
                });
            }

            if pending == 0 {
                thread::sleep(POLL_INTERVAL);
                continue;
            }

            match outputs.recv_timeout(POLL_INTERVAL) {
                Ok((stream, output)) => {
                    pending -= 1;
                    match stream {
                        Stream::Stdout => stdout = output?,
                        Stream::Stderr => stderr = output?,
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::other("output reader thread panicked").into());
                }
            }
        }

        let status = match status {
            Some(status) => status,
            None => child.wait()?,
        };

        Ok(ProcessOutput {
            status: status.code(),
            success: status.success(),
            stdout,
            stderr,
        })
    }
}

enum Stream {
    Stdout,
    Stderr,
}

type Drained = (Stream, io::Result<Vec<u8>>);

fn drain<R: Read + Send + 'static>(stream: Stream, mut pipe: R, sender: Sender<Drained>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf).map(|_| buf);
        // The receiver is gone once the run gave up on this process.
        let _ = sender.send((stream, result));
    });
}

fn terminate(child: &mut Child) {
    kill_group(child);
    // The child may have exited between the poll and the kill.
    let _ = child.kill();
    let _ = child.wait();
}

/// Kill every process in the child's group, closing any pipes a background
/// grandchild still holds so the reader threads finish.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let Ok(group) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: kill(2) takes no pointers; a negative pid addresses the
    // process group created at spawn.
    unsafe {
        libc::kill(-group, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

/// Scripted runner for tests.
///
/// Responses are keyed by the exact program source, so a test registers a
/// server's source text together with a closure standing in for the
/// interpreter.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Script = Arc<dyn Fn(&MockCall) -> Result<ProcessOutput, ExecError> + Send + Sync>;

    /// One recorded invocation.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct MockCall {
        pub program: String,
        pub source: String,
        pub param: Option<String>,
        pub stdin: Option<Vec<u8>>,
    }

    impl MockCall {
        /// Standard input as text (empty when there was none).
        pub fn input(&self) -> String {
            self.stdin
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default()
        }
    }

    /// A runner whose behaviour is scripted per source text.
    #[derive(Clone, Default)]
    pub struct ScriptedRunner {
        scripts: Arc<Mutex<Vec<(String, Script)>>>,
        calls: Arc<Mutex<Vec<MockCall>>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a script for a source text.
        pub fn with_script<F>(self, source: impl Into<String>, script: F) -> Self
        where
            F: Fn(&MockCall) -> Result<ProcessOutput, ExecError> + Send + Sync + 'static,
        {
            self.scripts
                .lock()
                .unwrap()
                .push((source.into(), Arc::new(script)));
            self
        }

        /// Register a script that maps its input text to an output text.
        pub fn with_text_script<F>(self, source: impl Into<String>, script: F) -> Self
        where
            F: Fn(&MockCall) -> String + Send + Sync + 'static,
        {
            self.with_script(source, move |call| Ok(ProcessOutput::success(script(call))))
        }

        /// All recorded invocations, oldest first.
        pub fn calls(&self) -> Vec<MockCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ProcessRunner for ScriptedRunner {
        fn run(
            &self,
            spec: &ProcessSpec,
            cancel: &CancelToken,
        ) -> Result<ProcessOutput, ExecError> {
            if cancel.is_cancelled() {
                return Err(ExecError::Cancelled);
            }

            let call = MockCall {
                program: spec.program.clone(),
                source: std::fs::read_to_string(&spec.source_path)?,
                param: spec.param.clone(),
                stdin: spec.stdin.as_ref().map(|b| b.to_vec()),
            };
            self.calls.lock().unwrap().push(call.clone());

            let script = self
                .scripts
                .lock()
                .unwrap()
                .iter()
                .find(|(source, _)| *source == call.source)
                .map(|(_, script)| Arc::clone(script));

            match script {
                Some(script) => script(&call),
                None => Ok(ProcessOutput::failure(
                    127,
                    format!("no script registered for source {:?}", call.source),
                )),
            }
        }
    }
}
