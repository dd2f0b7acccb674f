//! Child-process classifier transport.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, warn};

use crate::traits::{Classifier, ClassifierError, ClassifierMetadata, ClassifierResult, RawOutput};

/// Default cap on captured standard output (1 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Configuration for [`ProcessClassifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessClassifierConfig {
    program: OsString,
    args: Vec<OsString>,
    working_dir: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
    max_output_bytes: usize,
}

impl ProcessClassifierConfig {
    /// Creates a configuration that runs `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Runs the child in `dir`.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets an environment variable for the child, on top of the inherited
    /// environment.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Caps the number of standard output bytes retained.
    #[must_use]
    pub fn with_max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }

    /// Returns the program.
    #[must_use]
    pub fn program(&self) -> &OsString {
        &self.program
    }

    /// Returns the arguments.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Returns the output cap.
    #[must_use]
    pub const fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }
}

/// Classifier backed by one child process per invocation.
pub struct ProcessClassifier {
    config: ProcessClassifierConfig,
    metadata: ClassifierMetadata,
}

impl fmt::Debug for ProcessClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessClassifier")
            .field("program", &self.config.program)
            .field("args", &self.config.args)
            .finish_non_exhaustive()
    }
}

impl ProcessClassifier {
    /// Constructs a classifier from the supplied configuration.
    #[must_use]
    pub fn new(config: ProcessClassifierConfig) -> Self {
        let name = config.program.to_string_lossy().into_owned();
        Self {
            metadata: ClassifierMetadata::new("process", name),
            config,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .envs(self.config.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait]
impl Classifier for ProcessClassifier {
    fn metadata(&self) -> &ClassifierMetadata {
        &self.metadata
    }

    async fn run(&self, input: Vec<u8>, timeout: Duration) -> ClassifierResult<RawOutput> {
        let mut child = self.command().spawn().map_err(|err| {
            ClassifierError::spawn(format!("{}: {err}", self.metadata.name()))
        })?;
        debug!(pid = child.id(), program = self.metadata.name(), "classifier spawned");
        let mut group = ProcessGroup::of(child.id());

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.config.max_output_bytes;

        // All four legs run together so a chatty child never blocks on a
        // full pipe while we wait for it.
        let exchange = async {
            let (_, stdout, stderr, status) = tokio::join!(
                feed(stdin, &input),
                drain(stdout, limit),
                drain(stderr, limit),
                child.wait(),
            );
            (stdout, stderr, status)
        };

        let finished = tokio::time::timeout(timeout, exchange).await;
        let Ok((stdout, stderr, status)) = finished else {
            warn!(program = self.metadata.name(), ?timeout, "classifier timed out; killing");
            group.kill();
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to kill timed-out classifier");
            }
            return Err(ClassifierError::Timeout { after: timeout });
        };

        group.release();
        let status = status.map_err(|err| ClassifierError::io(format!("wait failed: {err}")))?;
        let stdout = stdout.map_err(|err| ClassifierError::io(format!("stdout: {err}")))?;
        let stderr = stderr.map_err(|err| ClassifierError::io(format!("stderr: {err}")))?;
        if stdout.overflowed {
            return Err(ClassifierError::OutputTooLarge { limit });
        }
        if stderr.overflowed {
            debug!(limit, "classifier stderr truncated");
        }

        debug!(code = ?status.code(), "classifier exited");
        Ok(RawOutput::new(status.code(), stdout.bytes, stderr.bytes))
    }
}

/// The classifier's process group. Every process the classifier starts is
/// killed with it on timeout, or when the invocation is dropped mid-flight.
struct ProcessGroup {
    #[cfg(unix)]
    leader: Option<nix::unistd::Pid>,
}

impl ProcessGroup {
    #[cfg(unix)]
    fn of(pid: Option<u32>) -> Self {
        let leader = pid
            .and_then(|pid| i32::try_from(pid).ok())
            .map(nix::unistd::Pid::from_raw);
        Self { leader }
    }

    #[cfg(not(unix))]
    fn of(_pid: Option<u32>) -> Self {
        Self {}
    }

    /// Sends `SIGKILL` to the whole group, once.
    fn kill(&mut self) {
        #[cfg(unix)]
        if let Some(leader) = self.leader.take() {
            use nix::sys::signal::{Signal, killpg};
            if let Err(err) = killpg(leader, Signal::SIGKILL) {
                debug!(error = %err, "classifier process group already gone");
            }
        }
    }

    /// The leader exited and its output pipes closed.
    fn release(&mut self) {
        #[cfg(unix)]
        {
            self.leader = None;
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

async fn feed(stdin: Option<ChildStdin>, input: &[u8]) {
    let Some(mut stdin) = stdin else {
        return;
    };
    // A classifier may exit without reading its input; the exit status
    // decides the outcome, so a broken pipe here is not an error.
    if let Err(err) = stdin.write_all(input).await {
        debug!(error = %err, "classifier stopped reading input");
        return;
    }
    if let Err(err) = stdin.shutdown().await {
        debug!(error = %err, "failed to close classifier input");
    }
}

struct Captured {
    bytes: Vec<u8>,
    overflowed: bool,
}

async fn drain<R>(reader: Option<R>, limit: usize) -> io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(Captured {
            bytes: Vec::new(),
            overflowed: false,
        });
    };

    let mut bytes = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    (&mut reader).take(cap).read_to_end(&mut bytes).await?;

    let overflowed = bytes.len() > limit;
    if overflowed {
        bytes.truncate(limit);
        // Keep the pipe empty until the child exits.
        tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    }

    Ok(Captured { bytes, overflowed })
}
