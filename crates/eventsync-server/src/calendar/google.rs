//! Google Calendar implementation of [`CalendarStore`].

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use eventsync_types::CalendarEvent;
use google_calendar3::api::{Event, EventDateTime};
use google_calendar3::hyper_rustls::HttpsConnector;
use google_calendar3::CalendarHub;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use super::{CalendarError, CalendarStore};
use crate::normalize::EVENT_TIMEZONE;

#[derive(Debug, Clone)]
pub struct GoogleCalendarConfig {
    /// Service-account key file
    pub keyfile: PathBuf,
    pub calendar_id: String,
    /// Bound applied to every API call
    pub timeout: Duration,
}

/// Calendar store backed by a single Google calendar.
pub struct GoogleCalendar {
    hub: CalendarHub<HttpsConnector<HttpConnector>>,
    calendar_id: String,
    timeout: Duration,
}

impl GoogleCalendar {
    pub async fn connect(config: GoogleCalendarConfig) -> Result<Self> {
        let key = google_calendar3::yup_oauth2::read_service_account_key(&config.keyfile)
            .await
            .with_context(|| format!("Failed to read service account key {:?}", config.keyfile))?;

        let auth = google_calendar3::yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .context("Failed to build service account authenticator")?;

        let connector = google_calendar3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = CalendarHub::new(client, auth);

        tracing::info!("Google Calendar client ready for {}", config.calendar_id);

        Ok(Self {
            hub,
            calendar_id: config.calendar_id,
            timeout: config.timeout,
        })
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, CalendarError>
    where
        F: Future<Output = Result<T, google_calendar3::Error>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(map_google_error),
            Err(_) => Err(CalendarError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl CalendarStore for GoogleCalendar {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: Option<u32>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut call = self
            .hub
            .events()
            .list(&self.calendar_id)
            .time_min(time_min)
            .time_max(time_max)
            .single_events(true)
            .order_by("startTime");
        if let Some(max) = max_results {
            call = call.max_results(max.min(i32::MAX as u32) as i32);
        }

        let (_, events) = self.bounded(call.doit()).await?;

        Ok(events
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(from_google)
            .collect())
    }

    async fn insert(&self, event: &CalendarEvent) -> Result<CalendarEvent, CalendarError> {
        let call = self
            .hub
            .events()
            .insert(to_google(event), &self.calendar_id)
            .doit();

        let (_, created) = self.bounded(call).await?;

        tracing::info!("Created calendar event: {} (id: {:?})", event.title, created.id);

        Ok(CalendarEvent {
            external_id: created.id,
            html_link: created.html_link,
            ..event.clone()
        })
    }

    async fn delete(&self, external_id: &str) -> Result<(), CalendarError> {
        let call = self
            .hub
            .events()
            .delete(&self.calendar_id, external_id)
            .doit();

        match self.bounded(call).await {
            Ok(_) => {
                tracing::info!("Deleted calendar event {}", external_id);
                Ok(())
            }
            Err(CalendarError::NotFound(_)) => Err(CalendarError::NotFound(external_id.to_string())),
            Err(e) => Err(e),
        }
    }
}

fn map_google_error(err: google_calendar3::Error) -> CalendarError {
    match err {
        google_calendar3::Error::BadRequest(body) => CalendarError::Rejected(body.to_string()),
        google_calendar3::Error::Failure(response) if response.status().as_u16() == 404 => {
            CalendarError::NotFound(String::new())
        }
        other => CalendarError::Remote(other.to_string()),
    }
}

fn to_google(event: &CalendarEvent) -> Event {
    Event {
        summary: Some(event.title.clone()),
        description: non_empty(&event.description),
        location: non_empty(&event.location),
        start: Some(EventDateTime {
            date_time: Some(event.start),
            time_zone: Some(EVENT_TIMEZONE.name().to_string()),
            ..Default::default()
        }),
        end: Some(EventDateTime {
            date_time: Some(event.end),
            time_zone: Some(EVENT_TIMEZONE.name().to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Convert a Google event; events without a usable start or end are dropped.
fn from_google(event: Event) -> Option<CalendarEvent> {
    let start = event.start.as_ref().and_then(instant_of)?;
    let end = event.end.as_ref().and_then(instant_of)?;

    Some(CalendarEvent {
        title: event.summary.unwrap_or_default(),
        description: event.description.unwrap_or_default(),
        location: event.location.unwrap_or_default(),
        start,
        end,
        external_id: event.id,
        html_link: event.html_link,
    })
}

// All-day events only carry a date; they start at local midnight.
fn instant_of(when: &EventDateTime) -> Option<DateTime<Utc>> {
    if let Some(date_time) = when.date_time {
        return Some(date_time);
    }
    when.date.and_then(local_midnight)
}

fn local_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    EVENT_TIMEZONE
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
