use thiserror::Error;

use super::events::HandlerKey;

/// Failure raised inside a handler body.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler `{handler}` expected {expected} event arguments, got {actual}")]
    UnexpectedArgs {
        handler: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("handler failed: {message}")]
    Failed { message: String },
}

impl HandlerError {
    pub fn unexpected_args(
        handler: &'static str,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Self::UnexpectedArgs {
            handler,
            expected,
            actual,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// The handler table itself is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("handler `{name}` is registered more than once")]
    DuplicateHandler { name: &'static str },
}

#[derive(Debug, Error)]
pub enum BinderError {
    #[error("cache handler `{key}` failed: {source}")]
    Handler {
        key: HandlerKey,
        #[source]
        source: HandlerError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
