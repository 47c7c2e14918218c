//! Constructor macros for consistent error construction
//!
//! Each error domain module declares its convenience constructors with
//! [`impl_error_constructors!`] instead of spelling out struct literals.

/// Generates `fn name(field: impl Into<String>, ...) -> ConvergeError` constructors
///
/// # Example
/// ```rust,ignore
/// impl_error_constructors!({
///     HandlerNotFound as not_found(kind, name),
/// });
/// ```
macro_rules! impl_error_constructors {
    ({ $( $variant:ident as $func:ident ( $($field:ident),* ) ),+ $(,)? }) => {
        $(
            #[doc = concat!("Creates a [`ConvergeError::", stringify!($variant), "`] error")]
            pub fn $func($($field: impl Into<String>),*) -> $crate::error::ConvergeError {
                $crate::error::ConvergeError::$variant {
                    $($field: $field.into()),*
                }
            }
        )+
    };
}

pub(crate) use impl_error_constructors;
