use ngw_generation::GenerationError;
use thiserror::Error;

use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum NavError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Page generation timed out after {0}s")]
    Timeout(u64),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

impl NavError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, NavError::Timeout(_))
    }
}

impl From<lol_html::errors::RewritingError> for NavError {
    fn from(err: lol_html::errors::RewritingError) -> Self {
        NavError::Rewrite(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
