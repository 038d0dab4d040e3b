//! Candidate listing sources.

pub mod eventbrite;

use async_trait::async_trait;
use eventsync_types::RawListing;
use thiserror::Error;

pub use eventbrite::EventbriteSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("listings request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("listings page returned {0}")]
    Status(u16),
}

/// Something that can produce this run's raw listings.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_candidates(&self) -> Result<Vec<RawListing>, SourceError>;
}
