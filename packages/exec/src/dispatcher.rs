//! Dispatch of executable segments to their runtime.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;

use cidchain_store::{Cid, ContentStore};

use crate::error::Result;
use crate::{
    CancelToken, CommandRunner, Detector, ExecError, Language, ProcessRunner, ProcessSpec,
    RuntimeTable,
};

/// Deadline applied to each invocation unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A registered server whose source is stored under `source`.
    Server {
        name: String,
        language: Language,
        source: Cid,
    },
    /// An ad-hoc executable CID.
    Cid { cid: Cid, language: Language },
}

impl Target {
    pub fn server(name: impl Into<String>, language: Language, source: Cid) -> Self {
        Target::Server {
            name: name.into(),
            language,
            source,
        }
    }

    pub fn cid(cid: Cid, language: Language) -> Self {
        Target::Cid { cid, language }
    }

    pub fn language(&self) -> Language {
        match self {
            Target::Server { language, .. } | Target::Cid { language, .. } => *language,
        }
    }

    /// CID of the program source.
    pub fn source(&self) -> &Cid {
        match self {
            Target::Server { source, .. } => source,
            Target::Cid { cid, .. } => cid,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Server { name, .. } => write!(f, "server {}", name),
            Target::Cid { cid, .. } => write!(f, "cid {}", cid),
        }
    }
}

/// Runs targets through a [`ProcessRunner`].
///
/// The dispatcher owns nothing per request; one instance serves every
/// resolution.
pub struct Dispatcher<R = CommandRunner> {
    store: Arc<dyn ContentStore>,
    runner: R,
    runtimes: RuntimeTable,
    detector: Detector,
    timeout: Duration,
}

impl Dispatcher<CommandRunner> {
    /// A dispatcher that spawns real interpreters.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self::with_runner(store, CommandRunner::new())
    }
}

impl<R: ProcessRunner> Dispatcher<R> {
    pub fn with_runner(store: Arc<dyn ContentStore>, runner: R) -> Self {
        Self {
            store,
            runner,
            runtimes: RuntimeTable::standard(),
            detector: Detector::standard(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_runtimes(mut self, runtimes: RuntimeTable) -> Self {
        self.runtimes = runtimes;
        self
    }

    #[must_use]
    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = detector;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Detect the language of the content behind `cid`.
    pub fn detect(&self, cid: &Cid) -> Result<Option<Language>> {
        let content = self.store.get(cid)?;
        Ok(self.detector.detect(&content))
    }

    /// Run `target` to completion and return its standard output.
    ///
    /// `input` is written to the child's standard input; `param` becomes the
    /// first positional argument after the source file.
    pub fn run(
        &self,
        target: &Target,
        input: Option<&[u8]>,
        param: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Bytes> {
        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }

        let language = target.language();
        let invocation = self
            .runtimes
            .get(language)
            .ok_or(ExecError::UnknownLanguage(language))?;

        let source = self.store.get(target.source())?;

        let mut scratch = tempfile::Builder::new()
            .prefix("cidchain-")
            .suffix(&format!(".{}", language.extension()))
            .tempfile()?;
        scratch.write_all(&source)?;
        scratch.flush()?;

        let source_path = scratch.path().to_path_buf();
        let spec = ProcessSpec {
            program: invocation.program.clone(),
            args: invocation.argv(&source_path.to_string_lossy(), param),
            source_path,
            param: param.map(str::to_string),
            stdin: input.map(Bytes::copy_from_slice),
            timeout: self.timeout,
        };

        tracing::debug!(%target, %language, program = %spec.program, "dispatching");

        let started = Instant::now();
        let output = self.runner.run(&spec, cancel)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !output.success {
            tracing::debug!(%target, status = ?output.status, elapsed_ms, "execution failed");
            return Err(ExecError::Failed {
                language,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        tracing::info!(
            %target,
            %language,
            elapsed_ms,
            bytes = output.stdout.len(),
            "executed"
        );

        Ok(Bytes::from(output.stdout))
    }
}

impl<R: fmt::Debug> fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("runner", &self.runner)
            .field("runtimes", &self.runtimes)
            .field("detector", &self.detector)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedRunner;
    use crate::{Invocation, ProcessOutput};
    use cidchain_store::{InMemoryContentStore, StoreError};

    fn setup(runner: ScriptedRunner) -> (Arc<InMemoryContentStore>, Dispatcher<ScriptedRunner>) {
        let store = Arc::new(InMemoryContentStore::new());
        let dispatcher = Dispatcher::with_runner(store.clone(), runner);
        (store, dispatcher)
    }

    #[test]
    fn passes_input_and_param() {
        let runner = ScriptedRunner::new().with_text_script("grep", |call| {
            let pattern = call.param.clone().unwrap_or_default();
            call.input()
                .lines()
                .filter(|l| l.contains(&pattern))
                .collect::<Vec<_>>()
                .join("\n")
        });
        let (store, dispatcher) = setup(runner.clone());
        let source = store.put(b"grep").unwrap();

        let output = dispatcher
            .run(
                &Target::server("grep", Language::Bash, source),
                Some(b"apple\nbanana\napricot"),
                Some("ap"),
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(&output[..], b"apple\napricot");

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "bash");
        assert_eq!(calls[0].param.as_deref(), Some("ap"));
    }

    #[test]
    fn nonzero_exit_carries_stderr() {
        let runner = ScriptedRunner::new()
            .with_script("boom", |_| Ok(ProcessOutput::failure(1, "Traceback: boom\n")));
        let (store, dispatcher) = setup(runner);
        let source = store.put(b"boom").unwrap();

        let err = dispatcher
            .run(
                &Target::cid(source, Language::Python),
                None,
                None,
                &CancelToken::new(),
            )
            .unwrap_err();
        match err {
            ExecError::Failed {
                language,
                status,
                stderr,
            } => {
                assert_eq!(language, Language::Python);
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "Traceback: boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_source_is_store_error() {
        let (_store, dispatcher) = setup(ScriptedRunner::new());
        let absent = Cid::for_content(&[7u8; 100]);

        let err = dispatcher
            .run(
                &Target::server("ghost", Language::Bash, absent),
                None,
                None,
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ExecError::Store(StoreError::NotFound { .. })));
    }

    #[test]
    fn runtime_override_changes_program() {
        let runner = ScriptedRunner::new().with_text_script("print(1)", |_| "1".to_string());
        let (store, dispatcher) = setup(runner.clone());
        let dispatcher = dispatcher.with_runtimes(
            RuntimeTable::standard().with(Language::Python, Invocation::new("pypy3", &["-B"])),
        );
        let source = store.put(b"print(1)").unwrap();

        dispatcher
            .run(
                &Target::cid(source, Language::Python),
                None,
                None,
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(runner.calls()[0].program, "pypy3");
    }

    #[test]
    fn cancelled_before_start() {
        let runner = ScriptedRunner::new().with_text_script("x", |_| String::new());
        let (store, dispatcher) = setup(runner.clone());
        let source = store.put(b"x").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = dispatcher
            .run(&Target::cid(source, Language::Bash), None, None, &cancel)
            .unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn detect_reads_store() {
        let (store, dispatcher) = setup(ScriptedRunner::new());
        let script = store.put(b"#!/bin/bash\ncat").unwrap();
        let text = store.put(b"initial").unwrap();

        assert_eq!(dispatcher.detect(&script).unwrap(), Some(Language::Bash));
        assert_eq!(dispatcher.detect(&text).unwrap(), None);
    }

    #[test]
    fn target_display() {
        let cid = Cid::for_content(b"cat");
        assert_eq!(
            Target::server("echo", Language::Bash, cid.clone()).to_string(),
            "server echo"
        );
        assert_eq!(
            Target::cid(cid.clone(), Language::Bash).to_string(),
            format!("cid {}", cid)
        );
    }
}
