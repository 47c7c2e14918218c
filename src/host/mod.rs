//! OS interaction port
//!
//! Handlers never touch the machine directly. Every probe and mutation goes
//! through a [`Host`], which runs a program with arguments and reports whether
//! a path exists. [`LocalHost`] is the production implementation;
//! [`MockHost`] is the scripted test double.

pub mod local;
pub mod mock;

use std::collections::BTreeMap;

use crate::error::Result;

pub use local::LocalHost;
pub use mock::{Invocation, MockHost};

/// Environment passed to a command, replacing the inherited one
pub type Env = BTreeMap<String, String>;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::new(stdout, "", 0)
    }

    /// Failed output with the given stderr and exit code
    pub fn failed(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self::new("", stderr, exit_code)
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability to inspect and mutate the live machine
///
/// Calls block until the command completes. Timeouts, if any, are the
/// implementation's business.
pub trait Host {
    fn file_exists(&self, path: &str) -> bool;

    fn run(&self, program: &str, args: &[&str], env: Option<&Env>) -> Result<CommandOutput>;
}

/// Render a command the way it would be typed in a shell
pub fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}
