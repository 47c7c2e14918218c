//! Handler registry errors

use super::impl_error_constructors;

impl_error_constructors!({
    HandlerNotFound as not_found(kind, name),
    NoAvailableHandler as none_available(kind),
});
