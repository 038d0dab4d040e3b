//! Periodic ingestion of scraped listings into the calendar.

use std::sync::Arc;
use std::time::Duration;

use crate::services::IngestionPipeline;

/// Run the ingestion pipeline every `interval`, forever.
///
/// A run that degrades to zero candidates or zero inserts is logged like any
/// other; nothing a run does stops the loop.
pub async fn start_listings_sync_task(pipeline: Arc<IngestionPipeline>, interval: Duration) {
    tracing::info!("Starting listings sync task (interval: {:?})", interval);

    loop {
        let report = pipeline.run().await;
        if report.candidates == 0 {
            tracing::warn!("Listings sync found no candidates this run");
        } else {
            tracing::debug!("Listings sync run complete: {:?}", report);
        }

        tokio::time::sleep(interval).await;
    }
}
