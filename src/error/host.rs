//! OS interaction errors

use super::impl_error_constructors;

impl_error_constructors!({
    CommandSpawnFailed as spawn_failed(command, reason),
});
