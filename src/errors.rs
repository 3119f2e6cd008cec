//! Reasons for which a promise may be rejected
//!
//! Every rejection, whether it originates from the producer, from a failed
//! transform, from a cancellation request or from a bounded wait, is reported
//! through the same `PromiseError` type. Clients tell the various kinds apart
//! by matching on it.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;


/// Shared, type-erased error, as stored in rejected promises
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;


/// Final outcome of a settled promise
pub type Outcome<T> = Result<T, PromiseError>;


/// Reason why a promise was rejected, or why waiting for it failed
#[derive(Clone, Debug, thiserror::Error)]
pub enum PromiseError {
    /// The promise was canceled by a client before it settled
    #[error("promise was canceled")]
    Canceled,

    /// A blocking wait ran out of time before the promise settled
    ///
    /// The promise itself is left untouched by this error.
    #[error("timed out waiting for the promise to settle")]
    AwaitTimeout,

    /// An initializer or transform failed while computing the promise's outcome
    #[error("transform failed: {0}")]
    TransformFailure(#[source] SharedError),

    /// The producer rejected the promise for an application-specific reason
    #[error("{0}")]
    Rejected(SharedError),

    /// A promise was asked to adopt its own outcome, which can never happen
    #[error("promise cannot adopt its own outcome")]
    ChainingCycle,
}
//
impl PromiseError {
    /// Reject with an application-specific error
    pub fn reason<E>(error: E) -> Self
        where E: Error + Send + Sync + 'static
    {
        PromiseError::Rejected(Arc::new(error))
    }

    /// Report a transform failure caused by some underlying error
    pub fn transform<E>(cause: E) -> Self
        where E: Error + Send + Sync + 'static
    {
        PromiseError::TransformFailure(Arc::new(cause))
    }

    /// Turn the payload of a caught panic into a transform failure
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        PromiseError::transform(PanicMessage::from_payload(payload))
    }

    /// Truth that this error was caused by a cancellation request
    pub fn is_canceled(&self) -> bool {
        matches!(self, PromiseError::Canceled)
    }

    /// Truth that this error comes from a bounded wait running out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, PromiseError::AwaitTimeout)
    }
}
//
impl From<&str> for PromiseError {
    fn from(message: &str) -> Self {
        PromiseError::from(message.to_owned())
    }
}
//
impl From<String> for PromiseError {
    fn from(message: String) -> Self {
        let boxed: Box<dyn Error + Send + Sync> = message.into();
        PromiseError::Rejected(Arc::from(boxed))
    }
}


/// Message of a panic which occurred inside user code
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanicMessage(String);
//
impl PanicMessage {
    /// Extract a readable message from a panic payload
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_owned(),
                Err(_) => "<non-string panic payload>".to_owned(),
            },
        };
        PanicMessage(message)
    }

    /// Access the panic message
    pub fn message(&self) -> &str {
        &self.0
    }
}
//
impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "panicked: {}", self.0)
    }
}
//
impl Error for PanicMessage {}
