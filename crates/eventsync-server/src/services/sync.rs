//! Calendar synchronization of filtered listings.
//!
//! Items are processed one at a time. A listing that cannot be dated or that
//! the calendar refuses is logged and skipped; it never stops the batch.
//!
//! There is no idempotency key: running the same batch twice inserts the
//! same events twice.

use std::sync::Arc;

use eventsync_types::{CalendarEvent, FilteredListing};

use crate::calendar::CalendarStore;
use crate::normalize::{self, NotParseable};

/// Aggregate outcome of one sync batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced: usize,
    pub total: usize,
}

pub struct CalendarSynchronizer {
    store: Arc<dyn CalendarStore>,
}

impl CalendarSynchronizer {
    pub fn new(store: Arc<dyn CalendarStore>) -> Self {
        Self { store }
    }

    /// Insert every listing that normalizes; `reference_year` dates them.
    pub async fn sync(&self, filtered: &[FilteredListing], reference_year: i32) -> SyncSummary {
        let mut summary = SyncSummary {
            synced: 0,
            total: filtered.len(),
        };

        for listing in filtered {
            let candidate = match to_calendar_event(listing, reference_year) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Skipping listing {:?}: {}", listing.name, e);
                    continue;
                }
            };

            match self.store.insert(&candidate).await {
                Ok(created) => {
                    tracing::debug!(
                        "Synced {:?} as {:?}",
                        created.title,
                        created.external_id
                    );
                    summary.synced += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to insert {:?}: {}", listing.name, e);
                }
            }
        }

        tracing::info!(
            "Calendar sync finished: {} of {} listings synced",
            summary.synced,
            summary.total
        );
        summary
    }
}

/// Build the unsynced calendar event for a filtered listing.
pub fn to_calendar_event(
    listing: &FilteredListing,
    reference_year: i32,
) -> Result<CalendarEvent, NotParseable> {
    if !listing.is_syncable() {
        return Err(NotParseable::DateShape(listing.date.clone()));
    }

    let times = normalize::normalize(&listing.date, &listing.start_time, reference_year)?;

    Ok(CalendarEvent {
        title: listing.name.trim().to_string(),
        description: listing.description.clone(),
        location: listing.location.clone(),
        start: times.start_utc(),
        end: times.end_utc(),
        external_id: None,
        html_link: None,
    })
}
