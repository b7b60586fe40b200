use crate::{Error, Result};
use std::ffi::OsString;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A program plus its argument vector, ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Splits a whitespace separated command line, `None` if it is blank
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program).args(words))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// What a finished program left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl InvocationResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs external programs to completion.
///
/// A program that runs and exits non-zero is an ordinary `Ok` result. `Err` is reserved for
/// programs that could not be started (`Error::Launch`) or that were killed for running past
/// a timeout (`Error::Timeout`).
pub trait Launcher: Sync {
    fn run(&self, invocation: &Invocation) -> Result<InvocationResult>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    timeout: Option<Duration>,
}

impl SystemLauncher {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Launcher for SystemLauncher {
    fn run(&self, invocation: &Invocation) -> Result<InvocationResult> {
        log::debug!("running `{invocation}`");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // leads its own group so everything it forks can be killed along with it
            command.process_group(0);
        }

        let child = command.spawn().map_err(|source| Error::Launch {
            program: invocation.program_name(),
            source,
        })?;
        let mut child = ChildGuard::new(child);

        // both pipes are drained on their own threads so a chatty child never stalls on a full
        // pipe while we wait for it
        let stdout = drain(child.inner.stdout.take());
        let stderr = drain(child.inner.stderr.take());

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    return Err(Error::Timeout {
                        program: invocation.program_name(),
                        after: limit,
                    })
                }
            },
        };

        // leftover background descendants would keep the pipes open forever
        drop(child);

        let result = InvocationResult {
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
            exit_code: exit_code(status),
        };

        log::trace!(
            "`{}` exited with {} ({} bytes stdout, {} bytes stderr)",
            invocation.program_name(),
            result.exit_code,
            result.stdout.len(),
            result.stderr.len(),
        );

        Ok(result)
    }
}

// Owns a spawned child until it has been reaped
struct ChildGuard {
    inner: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(inner: Child) -> Self {
        Self {
            inner,
            reaped: false,
        }
    }

    fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.inner.wait()?;
        self.reaped = true;
        Ok(status)
    }

    fn wait_timeout(&mut self, limit: Duration) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = self.inner.try_wait()? {
                self.reaped = true;
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        kill_group(&mut self.inner);
        if !self.reaped {
            let _ = self.inner.wait();
        }
    }
}

// Fails with ESRCH once the whole group is gone, which is fine
#[cfg(unix)]
fn kill_group(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match i32::try_from(child.id()) {
        Ok(pgid) => {
            let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
        }
        Err(_) => {
            let _ = child.kill();
        }
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

type Drain = Option<JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            pipe.read_to_end(&mut buffer)?;
            Ok(buffer)
        })
    })
}

fn collect(drain: Drain) -> Result<Vec<u8>> {
    match drain {
        None => Ok(Vec::new()),
        Some(handle) => {
            let buffer = handle.join().map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::Other, "output reader thread panicked")
            })??;
            Ok(buffer)
        }
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
