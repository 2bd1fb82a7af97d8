use std::any::Any;

use futures::task::SpawnError;
use thiserror::Error;

/// Namespace attached to every error raised by a [`FunctionQueue`][crate::FunctionQueue].
pub const NAMESPACE: &str = "FunctionQueue";

/// Classifies a [`ContextualError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The caller provided input that the operation cannot accept.
    Validation,
}

/// An error that carries the namespace of the component that raised it.
///
/// Apart from the namespace, this behaves like any other error: the message is available via
/// [`Display`][std::fmt::Display] and the value can be propagated with `?`.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("[{namespace}] {message}")]
pub struct ContextualError {
    kind: ErrorKind,
    namespace: &'static str,
    message: String,
}

impl ContextualError {
    /// Creates an error of the given kind, attributed to `namespace`.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>, namespace: &'static str) -> Self {
        Self {
            kind,
            namespace,
            message: message.into(),
        }
    }

    /// The kind of failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The namespace of the component that raised the error.
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// The human-readable message, without the namespace.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn not_callable(received: &str) -> Self {
        Self::new(
            ErrorKind::Validation,
            format!("Cannot enqueue input of type \"{received}\", expected a function."),
            NAMESPACE,
        )
    }
}

/// Reason why a [`Promise`][crate::Promise] settled without a value.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Rejection {
    /// The callback, or the future it returned, panicked.
    #[error("callback panicked: {message}")]
    Panicked {
        /// The panic message, if the payload was a string.
        message: String,
    },

    /// The queue's spawner refused to accept the future returned by the callback.
    #[error("failed to spawn the future returned by the callback")]
    Spawn(#[from] SpawnError),

    /// The queue was dropped before the callback was ever invoked.
    #[error("function queue was dropped before the callback was invoked")]
    Abandoned,
}

impl Rejection {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string panic payload>".to_owned());

        Self::Panicked { message }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ContextualError: Send, Sync, Debug);
    assert_impl_all!(Rejection: Send, Sync, Debug);

    #[test]
    fn not_callable_names_received_type() {
        let error = ContextualError::not_callable("i32");

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.namespace(), "FunctionQueue");
        assert_eq!(
            error.message(),
            "Cannot enqueue input of type \"i32\", expected a function."
        );
    }

    #[test]
    fn display_includes_namespace() {
        let error = ContextualError::new(ErrorKind::Validation, "bad input", "Plugins");

        assert_eq!(error.to_string(), "[Plugins] bad input");
    }

    #[test]
    fn from_panic_keeps_str_payload() {
        let rejection = Rejection::from_panic(Box::new("boom"));

        assert!(matches!(rejection, Rejection::Panicked { message } if message == "boom"));
    }

    #[test]
    fn from_panic_keeps_string_payload() {
        let rejection = Rejection::from_panic(Box::new(format!("code {}", 7)));

        assert!(matches!(rejection, Rejection::Panicked { message } if message == "code 7"));
    }

    #[test]
    fn from_panic_tolerates_opaque_payload() {
        let rejection = Rejection::from_panic(Box::new(42_u64));

        assert!(matches!(rejection, Rejection::Panicked { .. }));
    }
}
