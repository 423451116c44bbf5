use crate::err::{OpxmlError, Result};
use crate::model::{CallData, DocumentKind, OpxmlDocument};
use crate::opxml_parser::{OpxmlParser, ParserSettings};
use crate::registry::ProcessorRegistry;

use log::{debug, trace, warn};
use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{self, BufReader, Read};
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Name of the producer looked up on `PATH` when nothing else is configured.
pub const DEFAULT_PROGRAM: &str = "opxml";

/// Environment variable overriding the producer executable.
pub const PROGRAM_ENV_VAR: &str = "OPXML_PATH";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a producer whose output failed to parse gets to report its exit status.
const EXIT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    program: OsString,
    /// Passed before the request arguments, for wrappers such as `pkexec opxml`.
    leading_args: Vec<OsString>,
    parser: ParserSettings,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        RunnerSettings {
            program: OsString::from(DEFAULT_PROGRAM),
            leading_args: Vec::new(),
            parser: ParserSettings::default(),
        }
    }
}

impl RunnerSettings {
    pub fn new() -> Self {
        RunnerSettings::default()
    }

    /// Default settings, with the program taken from `OPXML_PATH` when it is set.
    pub fn from_env() -> Self {
        let settings = RunnerSettings::new();
        match env::var_os(PROGRAM_ENV_VAR) {
            Some(program) if !program.is_empty() => {
                debug!("using producer from {}: {:?}", PROGRAM_ENV_VAR, program);
                settings.program(program)
            }
            _ => settings,
        }
    }

    pub fn program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn parser_settings(mut self, settings: ParserSettings) -> Self {
        self.parser = settings;
        self
    }

    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_leading_args(&self) -> &[OsString] {
        &self.leading_args
    }

    pub fn get_parser_settings(&self) -> &ParserSettings {
        &self.parser
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    child: Mutex<Option<Arc<Mutex<Child>>>>,
}

/// Cancels a run from another thread.
///
/// Clones share the same state. Cancelling kills the producer of the run currently using the
/// token, and every later run with this token fails with [`OpxmlError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<CancelState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);

        let registered = match self.inner.child.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(child) = registered {
            if let Ok(mut child) = child.lock() {
                debug!("cancelling producer (pid {})", child.id());
                if let Err(e) = child.kill() {
                    trace!("failed to kill producer: {}", e);
                }
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn register(&self, child: Option<Arc<Mutex<Child>>>) {
        match self.inner.child.lock() {
            Ok(mut slot) => *slot = child,
            Err(poisoned) => *poisoned.into_inner() = child,
        }
    }
}

/// Stops delivering producer output once the token is cancelled.
struct CancellableRead<R> {
    inner: R,
    token: CancellationToken,
}

impl<R: Read> Read for CancellableRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.token.is_cancelled() {
            return Err(io::Error::other("producer output abandoned, run was cancelled"));
        }
        self.inner.read(buf)
    }
}

/// Owns the producer process for the duration of a run. Dropping it kills and reaps the
/// process unless it already exited.
struct ChildGuard {
    child: Arc<Mutex<Child>>,
    token: CancellationToken,
}

impl ChildGuard {
    fn new(child: Child, token: &CancellationToken) -> Self {
        let child = Arc::new(Mutex::new(child));
        token.register(Some(Arc::clone(&child)));
        ChildGuard {
            child,
            token: token.clone(),
        }
    }

    fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        match self.child.lock() {
            Ok(mut child) => child.try_wait(),
            Err(_) => Err(io::Error::other("producer handle poisoned")),
        }
    }

    /// Polls until the producer exits. The lock is released between polls so that
    /// [`CancellationToken::cancel`] can kill it.
    fn wait(&self) -> io::Result<ExitStatus> {
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(status);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn wait_for(&self, limit: Duration) -> io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.token.register(None);

        let mut child = match self.child.lock() {
            Ok(child) => child,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Ok(None) = child.try_wait() {
            trace!("killing producer (pid {})", child.id());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Runs the producer and parses its standard output as an opxml document.
#[derive(Debug, Clone)]
pub struct OpxmlRunner<'r> {
    registry: &'r ProcessorRegistry,
    settings: RunnerSettings,
}

impl Default for OpxmlRunner<'static> {
    fn default() -> Self {
        OpxmlRunner::new(ProcessorRegistry::shared()).with_configuration(RunnerSettings::from_env())
    }
}

impl<'r> OpxmlRunner<'r> {
    pub fn new(registry: &'r ProcessorRegistry) -> Self {
        OpxmlRunner {
            registry,
            settings: RunnerSettings::default(),
        }
    }

    pub fn with_configuration(mut self, settings: RunnerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Runs the producer with `args` and returns whatever document it wrote.
    pub fn run<I, S>(&self, args: I, cancel: &CancellationToken) -> Result<CallData>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.run_expecting(args, None, cancel)
    }

    /// Runs the producer with `args`; its document must produce `T`.
    pub fn run_as<T, I, S>(&self, args: I, cancel: &CancellationToken) -> Result<T>
    where
        T: OpxmlDocument,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        T::from_call_data(self.run_expecting(args, Some(T::KIND), cancel)?)
    }

    fn run_expecting<I, S>(
        &self,
        args: I,
        expected: Option<DocumentKind>,
        cancel: &CancellationToken,
    ) -> Result<CallData>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if cancel.is_cancelled() {
            return Err(OpxmlError::Cancelled);
        }

        let args: Vec<OsString> = self
            .settings
            .leading_args
            .iter()
            .cloned()
            .chain(args.into_iter().map(|a| a.as_ref().to_owned()))
            .collect();
        let command_line = self.command_line(&args);
        debug!("spawning `{}`", command_line);

        let mut child = Command::new(&self.settings.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| OpxmlError::Launch {
                command: command_line.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("producer stdout was not captured"))?;
        let stderr = child.stderr.take();
        let guard = ChildGuard::new(child, cancel);

        let reader = BufReader::new(CancellableRead {
            inner: stdout,
            token: cancel.clone(),
        });
        let parsed = OpxmlParser::new(self.registry)
            .with_configuration(self.settings.parser.clone())
            .parse_expecting(reader, expected);

        if cancel.is_cancelled() {
            return Err(OpxmlError::Cancelled);
        }
        let data = match parsed {
            Ok(data) => data,
            Err(e) => return Err(explain_parse_failure(e, &guard, stderr, command_line, cancel)),
        };

        let stderr = drain_stderr(stderr);
        let status = guard.wait()?;
        debug!("`{}` exited with {}", command_line, status);

        if cancel.is_cancelled() {
            return Err(OpxmlError::Cancelled);
        }
        if !status.success() {
            return Err(OpxmlError::ProcessFailed {
                command: command_line,
                status,
                stderr,
            });
        }
        if !stderr.trim().is_empty() {
            warn!("`{}` wrote to stderr: {}", command_line, stderr.trim());
        }

        Ok(data)
    }

    fn command_line(&self, args: &[OsString]) -> String {
        std::iter::once(self.settings.program.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A producer that exits with an error code usually writes nothing useful to stdout, so its
/// exit status and stderr take precedence over the parse error. If it is still running after
/// [`EXIT_GRACE`] the parse error stands and the guard kills it.
fn explain_parse_failure(
    parse_error: OpxmlError,
    guard: &ChildGuard,
    stderr: Option<ChildStderr>,
    command: String,
    cancel: &CancellationToken,
) -> OpxmlError {
    let status = match guard.wait_for(EXIT_GRACE) {
        Ok(Some(status)) => status,
        Ok(None) => {
            debug!("`{}` still running after a parse error", command);
            return parse_error;
        }
        Err(e) => {
            trace!("failed to collect producer status: {}", e);
            return parse_error;
        }
    };

    if cancel.is_cancelled() {
        return OpxmlError::Cancelled;
    }
    // Death by signal (SIGPIPE once stdout is dropped) is not the producer's verdict.
    match status.code() {
        Some(code) if code != 0 => {
            debug!("`{}` exited with {}, discarding: {}", command, status, parse_error);
            OpxmlError::ProcessFailed {
                command,
                status,
                stderr: drain_stderr(stderr),
            }
        }
        _ => parse_error,
    }
}

fn drain_stderr(stderr: Option<ChildStderr>) -> String {
    let mut buffer = Vec::new();
    if let Some(mut stderr) = stderr {
        if let Err(e) = stderr.read_to_end(&mut buffer) {
            trace!("failed to read producer stderr: {}", e);
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
