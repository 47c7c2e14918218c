//! Host implementation backed by the local machine

use std::path::Path;
use std::process::Command;

use super::{CommandOutput, Env, Host, command_line};
use crate::error::{Result, host::spawn_failed};

/// Production host that spawns processes directly (no shell)
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl LocalHost {
    pub fn new() -> Self {
        Self
    }
}

impl Host for LocalHost {
    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn run(&self, program: &str, args: &[&str], env: Option<&Env>) -> Result<CommandOutput> {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(env) = env {
            command.env_clear().envs(env);
        }

        let output = command
            .output()
            .map_err(|e| spawn_failed(command_line(program, args), e.to_string()))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            // Killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
