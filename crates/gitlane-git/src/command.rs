use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::error::GitError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs the git executable with an explicit argument vector; no shell is
/// involved, so `%`, quotes and spaces in arguments reach git untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCli {
    pub binary: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn run<I, S>(&self, cwd: &Path, args: I) -> Result<GitOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (rendered, output) = self.execute(cwd, args)?;

        let stdout =
            String::from_utf8(output.stdout).map_err(|source| GitError::NonUtf8Output {
                command: rendered.clone(),
                stream: "stdout",
                source,
            })?;
        let stderr =
            String::from_utf8(output.stderr).map_err(|source| GitError::NonUtf8Output {
                command: rendered.clone(),
                stream: "stderr",
                source,
            })?;

        if !output.status.success() {
            debug!(command = %rendered, status = ?output.status.code(), "git command failed");
            return Err(GitError::CommandFailed {
                command: rendered,
                status: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(GitOutput { stdout, stderr })
    }

    /// Like [`GitCli::run`], but invalid UTF-8 in either stream is replaced
    /// with U+FFFD instead of failing, so one oddly encoded path or subject
    /// only affects its own record.
    pub fn run_lossy<I, S>(&self, cwd: &Path, args: I) -> Result<GitOutput, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (rendered, output) = self.execute(cwd, args)?;
        let stdout = decode_lossy(&rendered, "stdout", output.stdout);
        let stderr = decode_lossy(&rendered, "stderr", output.stderr);

        if !output.status.success() {
            debug!(command = %rendered, status = ?output.status.code(), "git command failed");
            return Err(GitError::CommandFailed {
                command: rendered,
                status: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(GitOutput { stdout, stderr })
    }

    /// Stdout of a query whose failure is routine (no upstream, empty repo);
    /// any error collapses to an empty string. Output is decoded lossily.
    pub fn run_silent<I, S>(&self, cwd: &Path, args: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        match self.run_lossy(cwd, args) {
            Ok(output) => output.stdout,
            Err(err) => {
                debug!(error = %err, "silent git query yielded no output");
                String::new()
            }
        }
    }

    /// Raw stdout bytes, for blob content that need not be UTF-8.
    pub fn run_bytes<I, S>(&self, cwd: &Path, args: I) -> Result<Vec<u8>, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (rendered, output) = self.execute(cwd, args)?;
        if !output.status.success() {
            debug!(command = %rendered, status = ?output.status.code(), "git command failed");
            return Err(GitError::CommandFailed {
                command: rendered,
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }

    fn execute<I, S>(&self, cwd: &Path, args: I) -> Result<(String, Output), GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let owned_args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();

        let mut command = Command::new(&self.binary);
        command.current_dir(cwd);
        for arg in &owned_args {
            command.arg(arg);
        }

        let rendered = render_command(&self.binary, &owned_args);
        debug!(command = %rendered, cwd = %cwd.display(), "running git");
        let output = command.output().map_err(|source| GitError::Io {
            command: rendered.clone(),
            source,
        })?;
        Ok((rendered, output))
    }
}

fn decode_lossy(command: &str, stream: &'static str, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug!(command = %command, stream, "replacing invalid UTF-8 in git output");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    }
}

fn render_command(binary: &Path, args: &[OsString]) -> String {
    let mut rendered = binary.to_string_lossy().into_owned();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}
