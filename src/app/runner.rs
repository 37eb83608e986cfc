//! Child process execution with a hard timeout.
//!
//! Every systemctl invocation goes through [`CommandRunner`] so the core can
//! be driven by a scripted runner in tests. [`ProcessRunner`] is the real
//! one: no shell, captured stdout/stderr, and the child is killed once the
//! timeout expires.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::RunError;

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status 0.
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    fn from_parts(status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            success: status.success(),
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        }
    }

    /// Text to show an operator when the command failed: stderr if there is
    /// any, else stdout, else the exit status.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, RunError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, RunError> {
        (**self).run(program, args)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    poll_interval: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(20),
        }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, RunError> {
        debug!(
            program = %program,
            args = ?args,
            timeout_ms = self.timeout.as_millis(),
            "Executing subprocess"
        );

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.to_string(),
                source,
            })?;

        // Pipes are drained on their own threads so a chatty child cannot
        // block on a full pipe while we poll for its exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > self.timeout {
                        warn!(
                            program = %program,
                            timeout_ms = self.timeout.as_millis(),
                            "Process timed out, killing"
                        );
                        kill(&mut child);
                        return Err(RunError::Timeout {
                            program: program.to_string(),
                            timeout_ms: self.timeout.as_millis(),
                        });
                    }
                    thread::sleep(self.poll_interval);
                }
                Err(source) => {
                    kill(&mut child);
                    return Err(RunError::Wait {
                        program: program.to_string(),
                        source,
                    });
                }
            }
        };

        let output = CommandOutput::from_parts(status, join(stdout), join(stderr));
        debug!(
            success = output.success,
            exit_code = ?output.exit_code,
            duration_ms = start.elapsed().as_millis(),
            "Subprocess completed"
        );
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(error = %e, "Failed to kill child process");
    }
    // Reap the zombie.
    let _ = child.wait();
}
