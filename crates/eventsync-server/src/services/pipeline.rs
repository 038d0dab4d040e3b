//! Fetch, filter and sync in one pass.

use std::sync::Arc;

use eventsync_types::PipelineReport;

use super::sync::CalendarSynchronizer;
use crate::filter::RelevanceFilter;
use crate::normalize;
use crate::sources::CandidateSource;

pub struct IngestionPipeline {
    source: Arc<dyn CandidateSource>,
    filter: RelevanceFilter,
    synchronizer: CalendarSynchronizer,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        filter: RelevanceFilter,
        synchronizer: CalendarSynchronizer,
    ) -> Self {
        Self {
            source,
            filter,
            synchronizer,
        }
    }

    /// Run one ingestion pass. A source failure counts as zero candidates.
    pub async fn run(&self) -> PipelineReport {
        self.run_for_year(normalize::current_year()).await
    }

    pub async fn run_for_year(&self, reference_year: i32) -> PipelineReport {
        let candidates = match self.source.fetch_candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("Candidate fetch failed, treating as empty: {}", e);
                Vec::new()
            }
        };

        let relevant = self.filter.filter(&candidates).await;
        let summary = self.synchronizer.sync(&relevant, reference_year).await;

        let report = PipelineReport {
            candidates: candidates.len(),
            relevant: relevant.len(),
            synced: summary.synced,
            total: summary.total,
        };
        tracing::info!(
            "Pipeline run: {} candidates, {} relevant, {}/{} synced",
            report.candidates,
            report.relevant,
            report.synced,
            report.total
        );
        report
    }
}
