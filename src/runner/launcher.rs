use std::{
    io::{self, BufRead, BufReader, Write},
    process::{Child, Command, Stdio},
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::unbounded;
use tracing::{debug, trace, warn};

use crate::{Error, Result, ScriptLog};

#[cfg(doc)]
use crate::ScriptRunner;

/// How long [`OsLauncher`] sleeps between polls of a running process.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How long residual output is collected after a deadline kill.
///
/// A killed shell can leave grandchildren holding the pipe write ends
/// open, so draining to end-of-stream could outlive the deadline by an
/// arbitrary amount.
const KILL_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A description of one process invocation: a binary, its arguments,
/// the lines to feed to its input stream, and an optional deadline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    bin: String,
    args: Vec<String>,
    stdin_lines: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandSpec {
    /// Create a new [`CommandSpec`] for the given binary.
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            args: Vec::new(),
            stdin_lines: Vec::new(),
            timeout: None,
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a line to write to the process's input stream after launch.
    ///
    /// Lines are written in order, each followed by a newline and a flush.
    pub fn stdin_line(mut self, line: impl Into<String>) -> Self {
        self.stdin_lines.push(line.into());
        self
    }

    /// Terminate the process if it is still running after `timeout`.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The binary this spec launches.
    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// The arguments passed to the binary.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The lines fed to the process's input stream.
    pub fn stdin_lines(&self) -> &[String] {
        &self.stdin_lines
    }

    /// The deadline, if one was set.
    pub fn time_limit(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the full command line this spec describes.
    pub fn descriptor(&self) -> String {
        let mut descriptor = self.bin.to_string();
        for arg in &self.args {
            descriptor.push(' ');
            descriptor.push_str(arg);
        }
        descriptor
    }
}

/// Everything captured from one completed (or terminated) process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    /// The exit code; absent when the process died to a signal or was
    /// terminated for outliving its deadline.
    pub exit_code: Option<i32>,

    /// The lines printed to `stdout`, in emission order.
    pub stdout_lines: Vec<String>,

    /// The lines printed to `stderr`, in emission order.
    pub stderr_lines: Vec<String>,

    /// Whether the process was terminated for outliving its deadline.
    pub timed_out: bool,
}

impl ProcessOutput {
    /// Whether the process exited on its own with a zero status.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Spawns processes on behalf of a [`ScriptRunner`].
///
/// The default implementation is [`OsLauncher`]. Swap it out to fake
/// process execution in tests, or to route execution somewhere other
/// than the local machine.
pub trait ProcessLauncher: std::fmt::Debug + Send + Sync {
    /// Launch the described process, wait for it to finish, and capture
    /// its output streams as tagged line sequences.
    fn launch(&self, spec: &CommandSpec) -> Result<ProcessOutput>;
}

impl<L: ProcessLauncher + ?Sized> ProcessLauncher for Arc<L> {
    fn launch(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
        (**self).launch(spec)
    }
}

/// The [`ProcessLauncher`] backed by [`std::process::Command`].
#[derive(Clone, Copy, Debug, Default)]
pub struct OsLauncher;

impl ProcessLauncher for OsLauncher {
    fn launch(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
        let descriptor = spec.descriptor();
        debug!(command = %descriptor, "launching");

        let mut command = Command::new(spec.bin());
        command
            .args(spec.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| Error::CouldNotSpawn {
            command: descriptor.clone(),
            source,
        })?;

        let (log_sender, log_receiver) = unbounded();

        if let Some(stdout) = child.stdout.take() {
            let log_sender = log_sender.clone();
            rayon::spawn(move || {
                let stdout = BufReader::new(stdout);
                for line in stdout.lines().map_while(|line| line.ok()) {
                    if log_sender.send(ScriptLog::Stdout(line)).is_err() {
                        break;
                    }
                }
            });
        }

        if let Some(stderr) = child.stderr.take() {
            let log_sender = log_sender.clone();
            rayon::spawn(move || {
                let stderr = BufReader::new(stderr);
                for line in stderr.lines().map_while(|line| line.ok()) {
                    if log_sender.send(ScriptLog::Stderr(line)).is_err() {
                        break;
                    }
                }
            });
        }

        // The readers hold the remaining senders; once both hit
        // end-of-stream the channel closes and collection below ends.
        drop(log_sender);

        if let Err(source) = feed_stdin(&mut child, spec) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::CouldNotFeed {
                command: descriptor,
                source,
            });
        }

        let deadline = spec.time_limit().map(|limit| Instant::now() + limit);
        let mut timed_out = false;
        let exit_status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        warn!(command = %descriptor, "deadline passed, terminating");
                        if let Err(source) = child.kill() {
                            let _ = child.wait();
                            return Err(Error::CouldNotTerminate {
                                command: descriptor,
                                source,
                            });
                        }
                        child.wait().map_err(|source| Error::CouldNotWait {
                            command: descriptor.clone(),
                            source,
                        })?;
                        timed_out = true;
                        break None;
                    }
                    std::thread::sleep(WAIT_POLL_INTERVAL);
                }
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::CouldNotWait {
                        command: descriptor,
                        source,
                    });
                }
            }
        };

        let mut stdout_lines = Vec::new();
        let mut stderr_lines = Vec::new();
        if timed_out {
            let drain_deadline = Instant::now() + KILL_DRAIN_GRACE;
            loop {
                let remaining = drain_deadline.saturating_duration_since(Instant::now());
                match log_receiver.recv_timeout(remaining) {
                    Ok(ScriptLog::Stdout(line)) => stdout_lines.push(line),
                    Ok(ScriptLog::Stderr(line)) => stderr_lines.push(line),
                    Err(_) => break,
                }
            }
        } else {
            while let Ok(line) = log_receiver.recv() {
                match line {
                    ScriptLog::Stdout(line) => stdout_lines.push(line),
                    ScriptLog::Stderr(line) => stderr_lines.push(line),
                }
            }
        }

        let exit_code = exit_status.and_then(|status| status.code());
        trace!(command = %descriptor, code = ?exit_code, "captured");

        Ok(ProcessOutput {
            exit_code,
            stdout_lines,
            stderr_lines,
            timed_out,
        })
    }
}

/// Writes the spec's input lines to the child, flushing after each, and
/// closes the stream so the child sees end-of-input.
fn feed_stdin(child: &mut Child, spec: &CommandSpec) -> io::Result<()> {
    let Some(mut stdin) = child.stdin.take() else {
        return Ok(());
    };
    for line in spec.stdin_lines() {
        writeln!(stdin, "{line}")?;
        stdin.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_streams_separately() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo one; echo two >&2; echo three; exit 4");
        let output = OsLauncher.launch(&spec).unwrap();

        assert_eq!(output.exit_code, Some(4));
        assert_eq!(output.stdout_lines, vec!["one", "three"]);
        assert_eq!(output.stderr_lines, vec!["two"]);
        assert!(!output.timed_out);
        assert!(!output.success());
    }

    #[test]
    fn feeds_input_lines_in_order() {
        let spec = CommandSpec::new("sh")
            .stdin_line("echo fed")
            .stdin_line("exit 0");
        let output = OsLauncher.launch(&spec).unwrap();

        assert_eq!(output.stdout_lines, vec!["fed"]);
        assert!(output.success());
    }

    #[test]
    fn reports_spawn_failure() {
        let spec = CommandSpec::new("runsh-no-such-binary");
        let error = OsLauncher.launch(&spec).unwrap_err();

        assert!(matches!(error, Error::CouldNotSpawn { .. }));
    }

    #[test]
    fn terminates_past_the_deadline() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo started; sleep 30")
            .timeout(Some(Duration::from_millis(100)));

        let started = Instant::now();
        let output = OsLauncher.launch(&spec).unwrap();

        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
        assert_eq!(output.stdout_lines, vec!["started"]);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn descriptor_joins_the_command_line() {
        let spec = CommandSpec::new("su").arg("-c").arg("sh /tmp/main.sh");
        assert_eq!(spec.descriptor(), "su -c sh /tmp/main.sh");
    }
}
