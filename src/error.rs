use thiserror::Error;

use crate::{binder::BinderError, config::LoadError, infra::error::InfraError};

/// Top-level failure of a cachebind command.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Binder(#[from] BinderError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
