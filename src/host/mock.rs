//! Scripted host for testing.
//!
//! Records every invocation and serves pre-configured responses keyed by the
//! full command line, making handler tests deterministic without touching the
//! machine.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};

use super::{CommandOutput, Env, Host, command_line};
use crate::error::Result;

/// A single recorded command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Option<Env>,
}

impl Invocation {
    pub fn command_line(&self) -> String {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        command_line(&self.program, &args)
    }
}

/// A test-double host with a fake filesystem and canned command output.
///
/// Unscripted commands succeed with empty output. A response registered with
/// [`MockHost::respond`] is returned every time; responses queued with
/// [`MockHost::respond_once`] are consumed first, in order.
#[derive(Debug, Default)]
pub struct MockHost {
    files: RefCell<BTreeSet<String>>,
    responses: RefCell<HashMap<String, CommandOutput>>,
    queued: RefCell<HashMap<String, VecDeque<CommandOutput>>>,
    calls: RefCell<Vec<Invocation>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock where the given paths already exist
    pub fn with_files<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let host = Self::new();
        for path in paths {
            host.add_file(path);
        }
        host
    }

    pub fn add_file(&self, path: impl Into<String>) {
        self.files.borrow_mut().insert(path.into());
    }

    pub fn remove_file(&self, path: &str) {
        self.files.borrow_mut().remove(path);
    }

    /// Always answer `command` (full command line) with `output`
    pub fn respond(&self, command: impl Into<String>, output: CommandOutput) {
        self.responses.borrow_mut().insert(command.into(), output);
    }

    /// Answer the next call of `command` with `output`
    pub fn respond_once(&self, command: impl Into<String>, output: CommandOutput) {
        self.queued
            .borrow_mut()
            .entry(command.into())
            .or_default()
            .push_back(output);
    }

    /// All invocations, in order
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Command lines of all invocations, in order
    pub fn command_lines(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    /// Number of times `command` (full command line) was run
    pub fn count(&self, command: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.command_line() == command)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl Host for MockHost {
    fn file_exists(&self, path: &str) -> bool {
        self.files.borrow().contains(path)
    }

    fn run(&self, program: &str, args: &[&str], env: Option<&Env>) -> Result<CommandOutput> {
        let line = command_line(program, args);
        self.calls.borrow_mut().push(Invocation {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            env: env.cloned(),
        });

        if let Some(output) = self
            .queued
            .borrow_mut()
            .get_mut(&line)
            .and_then(VecDeque::pop_front)
        {
            return Ok(output);
        }

        Ok(self
            .responses
            .borrow()
            .get(&line)
            .cloned()
            .unwrap_or_default())
    }
}
