use std::fs;
use std::io::{self, Read, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{HarnessError, Result};
use crate::fixtures::TestCase;

pub const VERBOSE_FLAG: &str = "-v";
pub const STAGE2_FLAG: &str = "-s2";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How the simulator process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    Signaled(i32),
    TimedOut(Duration),
}

impl Termination {
    fn from_status(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Exited(code),
            (None, Some(signo)) => Self::Signaled(signo),
            // Neither code nor signal only happens for stopped children,
            // which we never ask to observe.
            (None, None) => Self::Exited(-1),
        }
    }

    /// Exit code in the usual "negated signal number" convention.
    pub fn exit_code(&self) -> Option<i32> {
        match *self {
            Self::Exited(code) => Some(code),
            Self::Signaled(signo) => Some(-signo),
            Self::TimedOut(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

/// Captured output of one simulator invocation.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub termination: Termination,
}

/// Turn the configured simulator into an absolute path. Runs change
/// directory into each category, so a relative path would go stale.
pub fn resolve_simulator(path: &Path) -> Result<PathBuf> {
    let candidate = if path.is_file() {
        path.to_path_buf()
    } else if path.components().count() == 1 {
        which::which(path).map_err(|_| HarnessError::MissingSimulator(path.to_path_buf()))?
    } else {
        return Err(HarnessError::MissingSimulator(path.to_path_buf()));
    };
    fs::canonicalize(&candidate)
        .map_err(|e| HarnessError::io(format!("resolving {}", candidate.display()), e))
}

/// Arguments after argv[0] for one test case.
pub fn simulator_args(case: &TestCase, config: &Config) -> Vec<&'static str> {
    let mut args = Vec::new();
    if config.verbose_simulator {
        args.push(VERBOSE_FLAG);
    }
    if case.is_stage2() {
        args.push(STAGE2_FLAG);
    }
    args
}

/// Run the simulator once for `case`, feeding `input` on stdin from the
/// category directory. Output is captured in full; nothing is streamed.
pub fn run_simulator(
    simulator: &Path,
    case: &TestCase,
    input: &[u8],
    config: &Config,
) -> Result<ExecutionResult> {
    let args = simulator_args(case, config);
    debug!(test = %case.name, ?simulator, ?args, cwd = ?case.category_dir, "spawning simulator");

    let mut command = Command::new(simulator);
    command
        .args(&args)
        .current_dir(&case.category_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // Own group so a timeout can take down anything the simulator forked.
        .process_group(0);
    let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
        program: simulator.to_path_buf(),
        source,
    })?;

    let stdin_writer = child.stdin.take().map(|mut stdin| {
        let owned = input.to_vec();
        thread::spawn(move || -> io::Result<()> {
            match stdin.write_all(&owned) {
                // The simulator may quit without draining its input.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        })
    });
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let termination = match wait(&mut child, config.timeout) {
        Ok(termination) => termination,
        Err(e) => {
            terminate(&mut child);
            drop(stdin_writer);
            let _ = collect(stdout_reader, "stdout reader");
            let _ = collect(stderr_reader, "stderr reader");
            return Err(e);
        }
    };

    if let Some(writer) = stdin_writer {
        writer
            .join()
            .map_err(|_| HarnessError::WorkerPanicked("stdin writer"))?
            .map_err(|e| HarnessError::io("writing simulator stdin", e))?;
    }
    let stdout = collect(stdout_reader, "stdout reader")?;
    let stderr = collect(stderr_reader, "stderr reader")?;

    debug!(
        test = %case.name,
        ?termination,
        stdout = stdout.len(),
        stderr = stderr.len(),
        "simulator finished"
    );
    Ok(ExecutionResult {
        stdout,
        stderr,
        termination,
    })
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<Termination> {
    let Some(timeout) = timeout else {
        let status = child
            .wait()
            .map_err(|e| HarnessError::io("waiting for simulator", e))?;
        return Ok(Termination::from_status(status));
    };

    let start = Instant::now();
    loop {
        let polled = child
            .try_wait()
            .map_err(|e| HarnessError::io("waiting for simulator", e))?;
        if let Some(status) = polled {
            return Ok(Termination::from_status(status));
        }
        if start.elapsed() >= timeout {
            warn!(pid = child.id(), ?timeout, "simulator timed out, killing it");
            terminate(child);
            return Ok(Termination::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the simulator's whole process group and reap the child. Pipe
/// readers only see EOF once every process holding the pipes is gone.
fn terminate(child: &mut Child) {
    let pid = child.id();
    let group = Pid::from_raw(pid as i32);
    if let Err(errno) = killpg(group, Signal::SIGKILL) {
        warn!(pid, %errno, "killing simulator process group failed");
        if let Err(e) = child.kill() {
            warn!(pid, error = %e, "killing simulator failed");
        }
    }
    if let Err(e) = child.wait() {
        warn!(pid, error = %e, "reaping simulator failed");
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(
    reader: Option<JoinHandle<io::Result<Vec<u8>>>>,
    what: &'static str,
) -> Result<Vec<u8>> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| HarnessError::WorkerPanicked(what))?
            .map_err(|e| HarnessError::io(format!("simulator {what}"), e)),
        None => Ok(Vec::new()),
    }
}
