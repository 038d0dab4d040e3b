//! Business logic between the HTTP handlers and the external adapters.

pub mod dedup;
pub mod pipeline;
pub mod recommend;
pub mod sync;

pub use pipeline::IngestionPipeline;
pub use recommend::RecommendationEngine;
pub use sync::CalendarSynchronizer;
