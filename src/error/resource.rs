//! Resource discovery and validation errors

use super::impl_error_constructors;

impl_error_constructors!({
    ResourceNotFound as not_found(resource, reason),
    InvalidResource as invalid(resource, reason),
});
