//! Shared data model for the listings pipeline and the recommendation API.
//!
//! A listing moves through three shapes: [`RawListing`] as scraped,
//! [`FilteredListing`] as returned by the relevance oracle, and
//! [`CalendarEvent`] once its date text has been normalized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

mod lenient;

pub use lenient::lenient_string;

/// Event listing as scraped from the candidate source.
///
/// `url` is the only natural identity a listing has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,
    pub url: String,
    /// Free text such as "Sat, Jun 14 • 7:00 PM"
    pub date_time: String,
    pub venue: String,
    pub organizer: String,
}

/// A listing the relevance oracle kept.
///
/// Every field is optional on the wire: missing, null or non-string values
/// deserialize to an empty string instead of failing the whole batch. Both
/// `name` and `title`, and both snake and camel case times, are accepted;
/// when an object carries both spellings the first non-blank one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "lenient::FilteredListingWire")]
pub struct FilteredListing {
    pub name: String,
    pub date: String,
    pub start_time: String,
    /// Always empty at the filter stage; kept for shape parity with submissions.
    pub end_time: String,
    pub location: String,
    pub description: String,
}

impl FilteredListing {
    /// A listing needs a name and something to date it by.
    pub fn is_syncable(&self) -> bool {
        !self.name.trim().is_empty()
            && (!self.date.trim().is_empty() || !self.start_time.trim().is_empty())
    }
}

/// Calendar-native event. `external_id` is assigned by the calendar store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub external_id: Option<String>,
    pub html_link: Option<String>,
}

impl CalendarEvent {
    pub fn is_synced(&self) -> bool {
        self.external_id.is_some()
    }
}

/// One event suggested by the recommendation oracle. Decoded as leniently
/// as [`FilteredListing`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "lenient::RecommendationItemWire")]
pub struct RecommendationItem {
    pub name: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub reason: String,
}

/// Validated answer to a free-text user query. Exactly one case is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryResponse {
    Chat { message: String },
    Declined { message: String },
    Recommendations { recommendations: Vec<RecommendationItem> },
}

impl QueryResponse {
    pub fn chat(message: impl Into<String>) -> Self {
        QueryResponse::Chat {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            QueryResponse::Chat { .. } => "chat",
            QueryResponse::Declined { .. } => "declined",
            QueryResponse::Recommendations { .. } => "recommendations",
        }
    }
}

// ============================================================================
// HTTP request/response types
// ============================================================================

/// Body of `POST /api/events/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitEventRequest {
    #[serde(default)]
    pub name: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// `HH:MM`, 24-hour
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitEventResponse {
    pub ok: bool,
    pub event: UpcomingEvent,
}

/// Query parameters for `GET /api/events/upcoming`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
    pub limit: Option<u32>,
}

/// Calendar event as exposed to API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingEvent {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub html_link: Option<String>,
}

impl From<CalendarEvent> for UpcomingEvent {
    fn from(event: CalendarEvent) -> Self {
        UpcomingEvent {
            id: event.external_id,
            name: event.title,
            description: event.description,
            location: event.location,
            start_time: event.start,
            end_time: event.end,
            html_link: event.html_link,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingResponse {
    pub ok: bool,
    pub events: Vec<UpcomingEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteEventResponse {
    pub ok: bool,
    pub deleted: String,
}

/// Counts reported by one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Listings returned by the candidate source
    pub candidates: usize,
    /// Listings the relevance oracle kept
    pub relevant: usize,
    /// Events inserted into the calendar
    pub synced: usize,
    /// Listings the synchronizer attempted
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: PipelineReport,
}

/// Body of `POST /api/assistant/recommend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub response: QueryResponse,
}

/// Failure envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: Option<String>) -> Self {
        ErrorResponse {
            ok: false,
            error: error.into(),
            details,
        }
    }
}

/// Deserialize a list, dropping elements that do not fit `T`.
pub fn tolerant_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filtered_listing_tolerates_missing_and_null_fields() {
        let json = r#"{"name": "Drag Brunch", "date": null, "start_time": "11:00 AM"}"#;
        let listing: FilteredListing = serde_json::from_str(json).unwrap();

        assert_eq!(listing.name, "Drag Brunch");
        assert_eq!(listing.date, "");
        assert_eq!(listing.start_time, "11:00 AM");
        assert_eq!(listing.location, "");
    }

    #[test]
    fn test_filtered_listing_accepts_title_alias() {
        let json = r#"{"title": "Pride Mixer", "date": "Fri, Jun 13"}"#;
        let listing: FilteredListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.name, "Pride Mixer");
    }

    #[test]
    fn test_is_syncable() {
        let mut listing = FilteredListing {
            name: "Parade".to_string(),
            ..Default::default()
        };
        assert!(!listing.is_syncable());

        listing.start_time = "7:00 PM".to_string();
        assert!(listing.is_syncable());

        listing.name = "   ".to_string();
        assert!(!listing.is_syncable());
    }

    #[test]
    fn test_query_response_is_tagged_by_type() {
        let response = QueryResponse::Declined {
            message: "I can only help with events.".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "declined");
        assert_eq!(json["message"], "I can only help with events.");
        assert_eq!(response.kind(), "declined");
    }

    #[test]
    fn test_recommend_response_flattens_query_response() {
        let body = RecommendResponse {
            ok: true,
            response: QueryResponse::Recommendations {
                recommendations: vec![RecommendationItem {
                    name: "Film Night".to_string(),
                    ..Default::default()
                }],
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["type"], "recommendations");
        assert_eq!(json["recommendations"][0]["name"], "Film Night");
    }

    #[test]
    fn test_upcoming_event_from_calendar_event() {
        let start = Utc.with_ymd_and_hms(2026, 6, 14, 2, 0, 0).unwrap();
        let event = CalendarEvent {
            title: "Dance Party".to_string(),
            description: "https://example.com/e/1".to_string(),
            location: "The Abbey".to_string(),
            start,
            end: start + chrono::Duration::hours(2),
            external_id: Some("abc123".to_string()),
            html_link: None,
        };
        assert!(event.is_synced());

        let upcoming = UpcomingEvent::from(event);
        assert_eq!(upcoming.id.as_deref(), Some("abc123"));
        assert_eq!(upcoming.name, "Dance Party");
        assert_eq!(upcoming.start_time, start);
    }

    #[test]
    fn test_tolerant_vec_drops_non_object_items() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "tolerant_vec")]
            items: Vec<RecommendationItem>,
        }

        let json = r#"{"items": [{"name": "A"}, 42, "junk", {"name": "B"}]}"#;
        let wrapper: Wrapper = serde_json::from_str(json).unwrap();
        let names: Vec<_> = wrapper.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
