//! In-memory collaborators for unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventsync_types::{CalendarEvent, RawListing};

use crate::calendar::{CalendarError, CalendarFacade, CalendarStore};
use crate::filter::RelevanceFilter;
use crate::oracle::{Oracle, OracleError};
use crate::services::{CalendarSynchronizer, IngestionPipeline, RecommendationEngine};
use crate::sources::{CandidateSource, SourceError};
use crate::AppState;

/// Oracle that replays canned replies and records every prompt.
pub struct FakeOracle {
    replies: Mutex<VecDeque<Option<String>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeOracle {
    /// Always answer `reply`.
    pub fn replying(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always fail.
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer from `replies` in order (`None` is a failure), then fail.
    pub fn scripted(replies: Vec<Option<&str>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for FakeOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(OracleError::EmptyResponse),
            None => self.fallback.clone().ok_or(OracleError::Api {
                status: 503,
                message: "unavailable".to_string(),
            }),
        }
    }
}

type ListCall = (DateTime<Utc>, DateTime<Utc>, Option<u32>);

/// Calendar that keeps events in memory.
pub struct FakeCalendar {
    events: Mutex<Vec<CalendarEvent>>,
    reject_titles: HashSet<String>,
    fail_list: bool,
    list_calls: Mutex<Vec<ListCall>>,
}

impl FakeCalendar {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            reject_titles: HashSet::new(),
            fail_list: false,
            list_calls: Mutex::new(Vec::new()),
        }
    }

    /// Inserts of events with this title fail.
    pub fn rejecting(mut self, title: &str) -> Self {
        self.reject_titles.insert(title.to_string());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn with_events(self, events: Vec<CalendarEvent>) -> Self {
        *self.events.lock().unwrap() = events;
        self
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<ListCall> {
        self.list_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarStore for FakeCalendar {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: Option<u32>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((time_min, time_max, max_results));

        if self.fail_list {
            return Err(CalendarError::Remote("list unavailable".to_string()));
        }

        let mut events: Vec<_> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.start >= time_min && e.start < time_max)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        if let Some(max) = max_results {
            events.truncate(max as usize);
        }
        Ok(events)
    }

    async fn insert(&self, event: &CalendarEvent) -> Result<CalendarEvent, CalendarError> {
        if self.reject_titles.contains(&event.title) {
            return Err(CalendarError::Rejected(format!("bad event {}", event.title)));
        }

        let mut events = self.events.lock().unwrap();
        let stored = CalendarEvent {
            external_id: Some(format!("evt{}", events.len() + 1)),
            ..event.clone()
        };
        events.push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, external_id: &str) -> Result<(), CalendarError> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.external_id.as_deref() != Some(external_id));
        if events.len() == before {
            return Err(CalendarError::NotFound(external_id.to_string()));
        }
        Ok(())
    }
}

/// Source with a fixed result.
pub struct FakeSource {
    listings: Option<Vec<RawListing>>,
}

impl FakeSource {
    pub fn with(listings: Vec<RawListing>) -> Self {
        Self {
            listings: Some(listings),
        }
    }

    pub fn failing() -> Self {
        Self { listings: None }
    }
}

#[async_trait]
impl CandidateSource for FakeSource {
    async fn fetch_candidates(&self) -> Result<Vec<RawListing>, SourceError> {
        self.listings.clone().ok_or(SourceError::Status(503))
    }
}

/// Handler state wired entirely from fakes.
pub fn test_state(
    calendar: Arc<FakeCalendar>,
    oracle: Arc<FakeOracle>,
    source: FakeSource,
    admin_token: Option<&str>,
) -> AppState {
    let facade = CalendarFacade::new(calendar);
    let pipeline = IngestionPipeline::new(
        Arc::new(source),
        RelevanceFilter::new(oracle.clone()),
        CalendarSynchronizer::new(facade.store()),
    );

    AppState {
        admin_token: admin_token.map(String::from),
        calendar: facade.clone(),
        pipeline: Arc::new(pipeline),
        engine: Arc::new(RecommendationEngine::new(oracle, facade)),
    }
}
