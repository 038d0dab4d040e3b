//! Language-model oracle access.
//!
//! An oracle takes a prompt and returns raw text. Nothing about that text
//! is trusted: callers run it through [`extract`] before parsing.

pub mod extract;
pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiOracle;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("oracle returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("oracle response had no text")]
    EmptyResponse,

    #[error("oracle response was not understood: {0}")]
    InvalidPayload(String),
}

/// Text completion service.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}
