//! Free-text recommendation queries over the upcoming calendar.
//!
//! The engine never fails toward its caller. Oracle errors, unparseable
//! output and unknown response types all become a chat apology.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use eventsync_types::{tolerant_vec, CalendarEvent, QueryResponse, RecommendationItem};
use serde::{Deserialize, Serialize};

use super::dedup::DedupCache;
use crate::calendar::CalendarFacade;
use crate::normalize::EVENT_TIMEZONE;
use crate::oracle::extract::{extract_json_object, strip_code_fences};
use crate::oracle::Oracle;

pub const DUPLICATE_MESSAGE: &str = "Please wait a moment...";
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't come up with an answer right now. Please try again.";

/// How far ahead the engine looks for candidate events.
pub const CONTEXT_DAYS: i64 = 30;
pub const MAX_RECOMMENDATIONS: usize = 5;

pub struct RecommendationEngine {
    oracle: Arc<dyn Oracle>,
    calendar: CalendarFacade,
    dedup: DedupCache,
}

impl RecommendationEngine {
    pub fn new(oracle: Arc<dyn Oracle>, calendar: CalendarFacade) -> Self {
        Self {
            oracle,
            calendar,
            dedup: DedupCache::default(),
        }
    }

    pub async fn recommend(&self, message: &str, now: DateTime<Utc>) -> QueryResponse {
        if self.dedup.check_and_record(message, now) {
            tracing::debug!("Suppressing duplicate query");
            return QueryResponse::chat(DUPLICATE_MESSAGE);
        }

        let events = match self.calendar.upcoming(now, CONTEXT_DAYS, None).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Failed to load calendar context: {}", e);
                return QueryResponse::chat(FALLBACK_MESSAGE);
            }
        };

        let prompt = match build_prompt(message, &events) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!("Failed to serialize calendar context: {}", e);
                return QueryResponse::chat(FALLBACK_MESSAGE);
            }
        };

        let raw = match self.oracle.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Recommendation oracle call failed: {}", e);
                return QueryResponse::chat(FALLBACK_MESSAGE);
            }
        };
        tracing::debug!("Recommendation oracle returned {} bytes", raw.len());

        parse_query_response(&raw).unwrap_or_else(|| {
            tracing::warn!("Unusable recommendation output, falling back to chat");
            QueryResponse::chat(FALLBACK_MESSAGE)
        })
    }
}

#[derive(Serialize)]
struct ContextEvent<'a> {
    name: &'a str,
    date: String,
    start_time: String,
    end_time: String,
    location: &'a str,
    description: &'a str,
}

impl<'a> From<&'a CalendarEvent> for ContextEvent<'a> {
    fn from(event: &'a CalendarEvent) -> Self {
        let start = event.start.with_timezone(&EVENT_TIMEZONE);
        let end = event.end.with_timezone(&EVENT_TIMEZONE);
        Self {
            name: &event.title,
            date: start.format("%a, %b %-d").to_string(),
            start_time: start.format("%-I:%M %p").to_string(),
            end_time: end.format("%-I:%M %p").to_string(),
            location: &event.location,
            description: &event.description,
        }
    }
}

fn build_prompt(message: &str, events: &[CalendarEvent]) -> serde_json::Result<String> {
    let context: Vec<ContextEvent> = events.iter().map(ContextEvent::from).collect();
    let events = serde_json::to_string_pretty(&context)?;

    Ok(format!(
        r#"You are an assistant for a community events calendar.

Upcoming events (next {days} days):
{events}

User message:
{message}

Respond with exactly one JSON object and nothing else. No markdown, no code fences, no prose.
Use one of these three shapes:

1. Casual conversation or questions that need no event list:
{{"type": "chat", "message": "your reply"}}

2. Requests unrelated to finding events:
{{"type": "declined", "message": "short explanation"}}

3. Requests for event suggestions:
{{"type": "recommendations", "recommendations": [
  {{"name": "...", "date": "...", "start_time": "...", "end_time": "...", "location": "...", "reason": "why it fits"}}
]}}

Only recommend events from the list above, copying their fields exactly. Recommend at most {max} events.
If nothing fits, use "chat" and say so."#,
        days = CONTEXT_DAYS,
        max = MAX_RECOMMENDATIONS,
    ))
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawQueryResponse {
    Chat {
        #[serde(default)]
        message: String,
    },
    Declined {
        #[serde(default)]
        message: String,
    },
    Recommendations {
        #[serde(default, deserialize_with = "tolerant_vec")]
        recommendations: Vec<RecommendationItem>,
    },
}

/// Decode oracle output into a validated response, or `None` if it does not
/// contain a recognized JSON object.
pub fn parse_query_response(raw: &str) -> Option<QueryResponse> {
    let stripped = strip_code_fences(raw);
    let object = extract_json_object(&stripped)?;
    let parsed: RawQueryResponse = serde_json::from_str(object).ok()?;

    let response = match parsed {
        RawQueryResponse::Chat { message } if !message.trim().is_empty() => {
            QueryResponse::Chat { message }
        }
        RawQueryResponse::Declined { message } if !message.trim().is_empty() => {
            QueryResponse::Declined { message }
        }
        RawQueryResponse::Recommendations {
            mut recommendations,
        } => {
            recommendations.retain(|item| !item.name.trim().is_empty());
            recommendations.truncate(MAX_RECOMMENDATIONS);
            QueryResponse::Recommendations { recommendations }
        }
        _ => return None,
    };
    Some(response)
}
