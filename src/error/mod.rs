//! Error types and handling for the convergence engine
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`resource`]: Resource discovery and validation errors
//! - [`handler`]: Mutation and handler contract errors
//! - [`registry`]: Handler lookup and dispatch errors
//! - [`host`]: OS interaction errors
//! - [`config`]: Configuration errors

mod macros;

pub(crate) use macros::impl_error_constructors;

pub mod config;
pub mod handler;
pub mod host;
pub mod registry;
pub mod resource;


use miette::Diagnostic;
use thiserror::Error;

/// Main error type for convergence operations
#[derive(Error, Diagnostic, Debug)]
pub enum ConvergeError {
    // Resource errors
    #[error("Resource {resource} does not exist: {reason}")]
    #[diagnostic(
        code(converge::resource::not_found),
        help("Create the resource on the machine (e.g. install its init script) and retry")
    )]
    ResourceNotFound { resource: String, reason: String },

    #[error("Invalid resource {resource}: {reason}")]
    #[diagnostic(code(converge::resource::invalid))]
    InvalidResource { resource: String, reason: String },

    // Handler errors
    #[error("Failed to converge {resource}: `{command}` exited with {exit_code}: {stderr}")]
    #[diagnostic(
        code(converge::handler::mutation_failed),
        help("Changes applied before this command are not rolled back; re-run to converge")
    )]
    MutationFailed {
        resource: String,
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Unsupported operation on {resource}: {operation}")]
    #[diagnostic(code(converge::handler::unsupported))]
    UnsupportedOperation { resource: String, operation: String },

    #[error("Handler '{handler}' manages {expected} resources, got {found}")]
    #[diagnostic(code(converge::handler::kind_mismatch))]
    KindMismatch {
        handler: String,
        expected: String,
        found: String,
    },

    // Registry errors
    #[error("No handler '{name}' registered for {kind}")]
    #[diagnostic(code(converge::registry::not_found))]
    HandlerNotFound { kind: String, name: String },

    #[error("No available handler for {kind} on this machine")]
    #[diagnostic(
        code(converge::registry::none_available),
        help("Install the tooling the handler probes for (e.g. dpkg and apt-get for packages)")
    )]
    NoAvailableHandler { kind: String },

    // Host errors
    #[error("Failed to execute `{command}`: {reason}")]
    #[diagnostic(code(converge::host::spawn_failed))]
    CommandSpawnFailed { command: String, reason: String },

    // Configuration errors
    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(converge::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse configuration file: {path}")]
    #[diagnostic(code(converge::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(converge::config::invalid))]
    ConfigInvalid { message: String },
}

impl From<serde_yaml::Error> for ConvergeError {
    fn from(err: serde_yaml::Error) -> Self {
        ConvergeError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConvergeError {
    fn from(err: serde_json::Error) -> Self {
        ConvergeError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, ConvergeError>;
