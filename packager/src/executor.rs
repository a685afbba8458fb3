//! External command execution for compile steps.
//!
//! Compilation is delegated to whatever toolchain the project configures
//! (`javac`, a Gradle task, a shell script). The [`CommandExecutor`] trait
//! keeps that boundary mockable so tests never spawn real processes.

use camino::Utf8Path;
use std::io::{self, Read, Seek, SeekFrom};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
///
/// Implementations must be shareable across variant threads.
pub trait CommandExecutor: Sync {
    /// Runs `cmd` with `args` in `cwd` and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting for the
    /// command. A command that exceeds its time limit fails with
    /// [`io::ErrorKind::TimedOut`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use camino::Utf8Path;
    /// use std::time::Duration;
    /// use trellis_packager::executor::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::new(Duration::from_secs(60));
    /// let output = executor.run("javac", &["-version"], Utf8Path::new("."))?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str], cwd: &Utf8Path) -> io::Result<Output>;
}

/// Executes commands on the host system with a wall-clock limit.
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Create an executor that kills commands running longer than `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The configured time limit.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: &Utf8Path) -> io::Result<Output> {
        // Output goes to anonymous files so a chatty compiler cannot fill a
        // pipe and stall before the timeout fires.
        let mut stdout_file = tempfile::tempfile()?;
        let mut stderr_file = tempfile::tempfile()?;

        let mut child = Command::new(cmd)
            .args(args)
            .current_dir(cwd.as_std_path())
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file.try_clone()?))
            .stderr(Stdio::from(stderr_file.try_clone()?))
            .spawn()?;

        let Some(status) = child.wait_timeout(self.timeout)? else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{cmd} timed out after {} seconds", self.timeout.as_secs()),
            ));
        };

        Ok(Output {
            status,
            stdout: read_back(&mut stdout_file)?,
            stderr: read_back(&mut stderr_file)?,
        })
    }
}

fn read_back(file: &mut std::fs::File) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_status() {
        let executor = SystemCommandExecutor::new(Duration::from_secs(10));
        let output = executor
            .run("sh", &["-c", "echo compiled; exit 3"], Utf8Path::new("."))
            .expect("sh should spawn");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "compiled");
    }

    #[test]
    fn kills_commands_that_exceed_the_timeout() {
        let executor = SystemCommandExecutor::new(Duration::from_millis(100));
        let err = executor
            .run("sh", &["-c", "sleep 5"], Utf8Path::new("."))
            .expect_err("sleep should time out");
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
