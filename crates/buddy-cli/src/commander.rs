//! Allow-listed shell command execution

use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("command '{0}' is not allowed")]
    NotAllowed(String),

    #[error("failed to start command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("command execution failed (exit code {code}). Output: {output}")]
    Failed { code: i32, output: String },
}

/// First whitespace token, lowercased
pub fn command_name(command: &str) -> Option<String> {
    command.split_whitespace().next().map(str::to_lowercase)
}

/// Whether the first token of `command` is in `allowlist`
pub fn is_allowed(command: &str, allowlist: &[String]) -> bool {
    command_name(command)
        .map(|name| allowlist.iter().any(|a| a.eq_ignore_ascii_case(&name)))
        .unwrap_or(false)
}

/// Run `command` through the platform shell in `cwd` and return stdout and
/// stderr combined.
///
/// The child is killed if the returned future is dropped.
pub async fn run_command(
    command: &str,
    allowlist: &[String],
    cwd: &Path,
) -> Result<String, CommandError> {
    let command = command.trim();
    let name = command_name(command).ok_or(CommandError::Empty)?;
    if !is_allowed(command, allowlist) {
        return Err(CommandError::NotAllowed(name));
    }

    debug!(%command, cwd = %cwd.display(), "running command");

    let output = shell(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(combined)
    } else {
        Err(CommandError::Failed {
            code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}
