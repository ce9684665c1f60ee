//! Typed host commands and the single execution gatekeeper.
//!
//! Every external program kioskify runs (`systemctl`, `apt-get`,
//! `timedatectl`) is described by a struct implementing [`HostCommand`], so
//! argument lists are built in one place and checked by the compiler.
//! [`run_command_safe`] is the only place that spawns them: it isolates the
//! child in its own process group and registers it for cleanup.

use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info};

use crate::process_guard::{ChildRegistry, CommandProcessGroup};

/// Typed argument contract for an external program.
pub trait HostCommand {
    /// Executable name, resolved through `PATH`.
    fn program(&self) -> &'static str;

    /// Arguments exactly as the program expects them.
    fn to_cli_args(&self) -> Vec<String>;

    /// Extra environment for the child.
    fn get_env_vars(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Errors from running a host command.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed (exit code {code}): {stderr}")]
    Failed {
        program: &'static str,
        code: i32,
        stderr: String,
    },
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub program: &'static str,
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CommandOutput {
    /// Turn a non-zero exit into `CommandError::Failed`.
    pub fn ensure_success(self) -> Result<Self, CommandError> {
        if self.success {
            Ok(self)
        } else {
            Err(CommandError::Failed {
                program: self.program,
                code: self.exit_code.unwrap_or(-1),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }

    /// stdout and stderr joined, for showing a failure to the user.
    pub fn diagnostics(&self) -> String {
        let mut out = self.stdout.trim_end().to_string();
        if !self.stderr.trim().is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(self.stderr.trim_end());
        }
        out
    }
}

/// Run `cmd` to completion, capturing its output.
///
/// A non-zero exit is reported through `CommandOutput::success`, not as an
/// error; only a failure to spawn or wait is an `Err`.
pub fn run_command_safe<T: HostCommand + ?Sized>(cmd: &T) -> Result<CommandOutput, CommandError> {
    let program = cmd.program();
    let args = cmd.to_cli_args();
    let env_vars = cmd.get_env_vars();
    debug!("run_command_safe: {} args={:?} env={:?}", program, args, env_vars);

    let mut command = Command::new(program);
    command
        .args(&args)
        .envs(env_vars)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group();

    let child = command
        .spawn()
        .map_err(|source| CommandError::Spawn { program, source })?;
    let pid = child.id();
    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.register(pid);
    }

    let output = child.wait_with_output();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }
    let output = output.map_err(|source| CommandError::Spawn { program, source })?;

    let result = CommandOutput {
        program,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
        success: output.status.success(),
    };
    if !result.success {
        info!("{} exited with code {:?}", program, result.exit_code);
    }
    Ok(result)
}
