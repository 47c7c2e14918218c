//! Handler contract errors

use super::{ConvergeError, impl_error_constructors};

impl_error_constructors!({
    UnsupportedOperation as unsupported(resource, operation),
    KindMismatch as kind_mismatch(handler, expected, found),
});

/// Creates a mutation failed error from a failing command
pub fn mutation_failed(
    resource: impl Into<String>,
    command: impl Into<String>,
    exit_code: i32,
    stderr: impl Into<String>,
) -> ConvergeError {
    ConvergeError::MutationFailed {
        resource: resource.into(),
        command: command.into(),
        exit_code,
        stderr: stderr.into(),
    }
}
