use super::pool::CancelToken;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

/// A fully assembled external command line
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Value following `flag`, if present
    pub fn value_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Shell-quoted command line, for scripts
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .map(|token| shell_quote(&token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+^".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', "'\\''"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Failed(Option<i32>),
    Cancelled,
}

/// Runs one invocation to completion, writing its output to `log_path`
pub trait Evaluator: Send + Sync {
    fn execute(
        &self,
        invocation: &Invocation,
        log_path: &Path,
        cancel: &CancelToken,
    ) -> io::Result<ExitOutcome>;
}

/// Launches the invocation as a child process and polls it, killing the
/// child when the cancel token trips.
pub struct ProcessEvaluator {
    poll_interval: Duration,
}

impl Default for ProcessEvaluator {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
        }
    }
}

impl ProcessEvaluator {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Evaluator for ProcessEvaluator {
    fn execute(
        &self,
        invocation: &Invocation,
        log_path: &Path,
        cancel: &CancelToken,
    ) -> io::Result<ExitOutcome> {
        if cancel.is_cancelled() {
            return Ok(ExitOutcome::Cancelled);
        }

        let stdout = File::create(log_path)?;
        let stderr = stdout.try_clone()?;
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()?;

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(if status.success() {
                    ExitOutcome::Success
                } else {
                    ExitOutcome::Failed(status.code())
                });
            }
            if cancel.is_cancelled() {
                log::debug!("Killing {} (pid {})", invocation.program.display(), child.id());
                let _ = child.kill();
                let _ = child.wait();
                return Ok(ExitOutcome::Cancelled);
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

/// Find an executable either at the given path or on `PATH`
pub fn locate_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.is_file())
    })
}
