//! Access to the authoritative calendar store.

mod google;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use eventsync_types::CalendarEvent;
use thiserror::Error;

pub use google::{GoogleCalendar, GoogleCalendarConfig};

/// Upper bound on the range an upcoming-events query may span.
pub const MAX_RANGE_DAYS: i64 = 180;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar request failed: {0}")]
    Remote(String),

    #[error("calendar request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("calendar rejected the event: {0}")]
    Rejected(String),

    #[error("event {0} not found")]
    NotFound(String),
}

/// CRUD surface of the external calendar.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Events starting in `[time_min, time_max)`, ordered by start time.
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: Option<u32>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Insert an event; the returned copy carries the store-assigned id.
    async fn insert(&self, event: &CalendarEvent) -> Result<CalendarEvent, CalendarError>;

    async fn delete(&self, external_id: &str) -> Result<(), CalendarError>;
}

/// Thin wrapper that applies the facade's own range rules on top of a store.
#[derive(Clone)]
pub struct CalendarFacade {
    store: Arc<dyn CalendarStore>,
}

impl CalendarFacade {
    pub fn new(store: Arc<dyn CalendarStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn CalendarStore> {
        self.store.clone()
    }

    /// Events in the next `days` days from `now`; `days` is clamped to 1..=180.
    pub async fn upcoming(
        &self,
        now: DateTime<Utc>,
        days: i64,
        limit: Option<u32>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let days = days.clamp(1, MAX_RANGE_DAYS);
        self.store
            .list_events(now, now + Duration::days(days), limit)
            .await
    }

    pub async fn insert(&self, event: &CalendarEvent) -> Result<CalendarEvent, CalendarError> {
        self.store.insert(event).await
    }

    pub async fn delete(&self, external_id: &str) -> Result<(), CalendarError> {
        self.store.delete(external_id).await
    }
}
