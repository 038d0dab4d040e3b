//! Forgiving field decoding for oracle-produced JSON.
//!
//! Model output is not trusted to use the right JSON types: a date may come
//! back as `null`, a day number as `14`. Text fields decode any scalar into
//! a string so one odd field never discards the whole record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{FilteredListing, RecommendationItem};

/// Deserialize any JSON value into a `String`.
///
/// `null` becomes empty, numbers and booleans use their JSON text, and
/// arrays or objects keep their serialized form.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

fn first_non_blank(preferred: String, fallback: String) -> String {
    if preferred.trim().is_empty() {
        fallback
    } else {
        preferred
    }
}

// Every accepted spelling is its own field so an object carrying two of
// them still decodes.
#[derive(Deserialize)]
pub(crate) struct FilteredListingWire {
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    start_time: String,
    #[serde(default, rename = "startTime", deserialize_with = "lenient_string")]
    start_time_camel: String,
    #[serde(default, deserialize_with = "lenient_string")]
    end_time: String,
    #[serde(default, rename = "endTime", deserialize_with = "lenient_string")]
    end_time_camel: String,
    #[serde(default, deserialize_with = "lenient_string")]
    location: String,
    #[serde(default, deserialize_with = "lenient_string")]
    description: String,
}

impl From<FilteredListingWire> for FilteredListing {
    fn from(wire: FilteredListingWire) -> Self {
        FilteredListing {
            name: first_non_blank(wire.name, wire.title),
            date: wire.date,
            start_time: first_non_blank(wire.start_time, wire.start_time_camel),
            end_time: first_non_blank(wire.end_time, wire.end_time_camel),
            location: wire.location,
            description: wire.description,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RecommendationItemWire {
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    start_time: String,
    #[serde(default, rename = "startTime", deserialize_with = "lenient_string")]
    start_time_camel: String,
    #[serde(default, deserialize_with = "lenient_string")]
    end_time: String,
    #[serde(default, rename = "endTime", deserialize_with = "lenient_string")]
    end_time_camel: String,
    #[serde(default, deserialize_with = "lenient_string")]
    location: String,
    #[serde(default, deserialize_with = "lenient_string")]
    reason: String,
}

impl From<RecommendationItemWire> for RecommendationItem {
    fn from(wire: RecommendationItemWire) -> Self {
        RecommendationItem {
            name: first_non_blank(wire.name, wire.title),
            date: wire.date,
            start_time: first_non_blank(wire.start_time, wire.start_time_camel),
            end_time: first_non_blank(wire.end_time, wire.end_time_camel),
            location: wire.location,
            reason: wire.reason,
        }
    }
}
