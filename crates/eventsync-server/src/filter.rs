//! Relevance filtering of scraped listings.
//!
//! The whole batch goes to the oracle in one prompt; the oracle answers
//! with the relevant subset as a JSON array. Anything that is not a JSON
//! array yields an empty result: the filter fails closed.

use std::sync::Arc;

use eventsync_types::{FilteredListing, RawListing};
use serde_json::Value;

use crate::oracle::{extract::strip_code_fences, Oracle};

/// Topic the oracle is asked to filter for.
pub const DEFAULT_TOPIC: &str = "LGBTQ+ and Pride-related events";

pub struct RelevanceFilter {
    oracle: Arc<dyn Oracle>,
    topic: String,
}

impl RelevanceFilter {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            topic: DEFAULT_TOPIC.to_string(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Return the relevant subset of `listings`.
    ///
    /// Never fails: oracle errors and unparseable output both produce an
    /// empty list.
    pub async fn filter(&self, listings: &[RawListing]) -> Vec<FilteredListing> {
        if listings.is_empty() {
            return Vec::new();
        }

        let prompt = match self.build_prompt(listings) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!("Failed to serialize listings for relevance prompt: {}", e);
                return Vec::new();
            }
        };

        let raw = match self.oracle.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Relevance oracle call failed: {}", e);
                return Vec::new();
            }
        };

        let filtered = parse_filter_response(&raw);
        tracing::info!(
            "Relevance filter kept {} of {} listings",
            filtered.len(),
            listings.len()
        );
        filtered
    }

    fn build_prompt(&self, listings: &[RawListing]) -> serde_json::Result<String> {
        let events = serde_json::to_string_pretty(listings)?;
        Ok(format!(
            r#"Filter these events to find {topic}.

Events:
{events}

Return ONLY a JSON array of matching events. Each element must use this EXACT format:
{{
  "name": "event title",
  "date": "date string",
  "start_time": "time string",
  "end_time": "",
  "location": "venue",
  "description": "url"
}}

CRITICAL: Use "name" not "title", keep "date" and "start_time" separate, not combined.
If none match, return []
"#,
            topic = self.topic,
            events = events,
        ))
    }
}

/// Parse the oracle's answer into listings.
///
/// Fences are stripped, then the remaining text must be exactly one JSON
/// array. Array elements that are not objects are skipped; object fields
/// are not validated.
pub fn parse_filter_response(raw: &str) -> Vec<FilteredListing> {
    let stripped = strip_code_fences(raw);

    let items = match serde_json::from_str::<Value>(&stripped) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            tracing::warn!("Relevance oracle returned JSON that is not an array");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("Relevance oracle returned unparseable JSON: {}", e);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeOracle;

    fn listing(title: &str) -> RawListing {
        RawListing {
            title: title.to_string(),
            url: format!("https://example.com/{}", title.replace(' ', "-")),
            date_time: "Sat, Jun 14 • 7:00 PM".to_string(),
            venue: "West Hollywood Park".to_string(),
            organizer: "WeHo Pride".to_string(),
        }
    }

    #[test]
    fn test_bare_empty_array() {
        assert!(parse_filter_response("[]").is_empty());
    }

    #[test]
    fn test_malformed_json_fails_closed() {
        assert!(parse_filter_response("[{\"name\": \"Parade\",").is_empty());
        assert!(parse_filter_response("Here are the events you asked for").is_empty());
        assert!(parse_filter_response(r#"{"name": "not an array"}"#).is_empty());
    }

    #[test]
    fn test_fenced_and_unfenced_parse_identically() {
        let json = r#"[{"name": "Pride Parade", "date": "Sun, Jun 8", "start_time": "10:00 AM", "end_time": "", "location": "Hollywood Blvd", "description": "https://example.com/parade"}]"#;
        let fenced = format!("```json\n{}\n```", json);

        let plain = parse_filter_response(json);
        assert_eq!(plain.len(), 1);
        assert_eq!(plain, parse_filter_response(&fenced));
        assert_eq!(plain[0].start_time, "10:00 AM");
    }

    #[test]
    fn test_partial_items_are_kept() {
        let parsed = parse_filter_response(r#"[{"name": "Only a name"}, 7, {"date": "Fri, Jun 6"}]"#);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Only a name");
        assert_eq!(parsed[1].name, "");
        assert_eq!(parsed[1].date, "Fri, Jun 6");
    }

    #[test]
    fn test_items_with_both_field_spellings_are_kept() {
        let parsed = parse_filter_response(
            r#"[
                {"name": "Pride Parade", "title": "Pride Parade", "date": "Sun, Jun 8", "start_time": "10:00 AM", "startTime": "10:00 AM"},
                {"title": "Dyke March", "date": "Sat, Jun 7", "startTime": "5:00 PM", "endTime": null}
            ]"#,
        );

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Pride Parade");
        assert_eq!(parsed[0].date, "Sun, Jun 8");
        assert_eq!(parsed[0].start_time, "10:00 AM");
        assert_eq!(parsed[1].name, "Dyke March");
        assert_eq!(parsed[1].start_time, "5:00 PM");
        assert_eq!(parsed[1].end_time, "");
    }

    #[tokio::test]
    async fn test_filter_sends_batch_in_one_prompt() {
        let oracle = Arc::new(FakeOracle::replying(
            r#"```json
[{"name": "Queer Book Club", "date": "Tue, Jun 10", "start_time": "6:30 PM", "end_time": "", "location": "Library", "description": "https://example.com/club"}]
```"#,
        ));
        let filter = RelevanceFilter::new(oracle.clone());

        let result = filter
            .filter(&[listing("Queer Book Club"), listing("Tax Seminar")])
            .await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Queer Book Club");

        let prompts = oracle.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Queer Book Club"));
        assert!(prompts[0].contains("Tax Seminar"));
        assert!(prompts[0].contains(r#""start_time""#));
    }

    #[tokio::test]
    async fn test_filter_oracle_failure_is_empty() {
        let oracle = Arc::new(FakeOracle::failing());
        let filter = RelevanceFilter::new(oracle);

        assert!(filter.filter(&[listing("Anything")]).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_run_does_not_affect_next_run() {
        let oracle = Arc::new(FakeOracle::scripted(vec![
            None,
            Some(r#"[{"name": "Trans Joy Picnic", "date": "Sat, Jun 21"}]"#),
        ]));
        let filter = RelevanceFilter::new(oracle.clone()).with_topic("outdoor community events");

        assert!(filter.filter(&[listing("Trans Joy Picnic")]).await.is_empty());
        let second = filter.filter(&[listing("Trans Joy Picnic")]).await;

        assert_eq!(second.len(), 1);
        assert!(oracle.prompts()[1].contains("outdoor community events"));
    }

    #[tokio::test]
    async fn test_filter_skips_oracle_for_empty_batch() {
        let oracle = Arc::new(FakeOracle::replying("[]"));
        let filter = RelevanceFilter::new(oracle.clone());

        assert!(filter.filter(&[]).await.is_empty());
        assert!(oracle.prompts().is_empty());
    }
}
