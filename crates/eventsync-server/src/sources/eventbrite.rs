//! Eventbrite "discover" page scraper.
//!
//! Extracts event cards from the listings page HTML. Card markup uses
//! generated class names, so a layout change upstream shows up here as zero
//! cards rather than an error.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use eventsync_types::RawListing;
use regex::Regex;

use super::{CandidateSource, SourceError};

pub const DEFAULT_LISTINGS_URL: &str = "https://www.eventbrite.com/d/ca--los-angeles/events/";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

const CARD_CLASS: &str = "discover-vertical-event-card";
const LINK_CLASS: &str = "event-card-link";
const TITLE_CLASS: &str = "Typography_body-lg__487rx";
const BOLD_CLASS: &str = "Typography_body-md-bold__487rx";
const URGENCY_CLASS: &str = "EventCardUrgencySignal__label";
const VENUE_CLASSES: [&str; 2] = ["Typography_body-md__487rx", "event-card__clamp-line--one"];

pub struct EventbriteSource {
    http: reqwest::Client,
    url: String,
}

impl EventbriteSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CandidateSource for EventbriteSource {
    async fn fetch_candidates(&self) -> Result<Vec<RawListing>, SourceError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        let listings = parse_listings(&html);
        tracing::info!("Scraped {} listings from {}", listings.len(), self.url);
        Ok(listings)
    }
}

fn section_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)<(/?)section\b([^>]*)>"#).unwrap())
}

fn entity_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap())
}

fn element_regex(tag: &'static str) -> Regex {
    Regex::new(&format!(r#"(?is)<{tag}\b([^>]*)>(.*?)</{tag}>"#)).unwrap()
}

fn anchor_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| element_regex("a"))
}

fn heading_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| element_regex("h3"))
}

fn paragraph_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| element_regex("p"))
}

fn class_attr_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)\bclass\s*=\s*"([^"]*)""#).unwrap())
}

fn href_attr_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?i)\bhref\s*=\s*"([^"]*)""#).unwrap())
}

fn tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap())
}

/// Extract listings from a discover page. Cards missing a title or link are
/// dropped; repeated cards for the same url are kept once.
pub fn parse_listings(html: &str) -> Vec<RawListing> {
    let mut seen = HashSet::new();

    card_bodies(html)
        .into_iter()
        .filter_map(parse_card)
        .filter(|listing| seen.insert(listing.url.clone()))
        .collect()
}

struct SectionTag<'a> {
    closing: bool,
    attrs: &'a str,
    start: usize,
    end: usize,
}

/// Inner HTML of every card section, up to its matching close tag. Sections
/// nested inside a card are part of its body. An unclosed card runs to the
/// end of the document.
fn card_bodies(html: &str) -> Vec<&str> {
    let tags: Vec<SectionTag> = section_tag_regex()
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(SectionTag {
                closing: !caps[1].is_empty(),
                attrs: caps.get(2).map_or("", |m| m.as_str()),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect();

    let mut bodies = Vec::new();
    for (i, open) in tags.iter().enumerate() {
        if open.closing || !has_class(open.attrs, CARD_CLASS) {
            continue;
        }

        let mut depth = 0usize;
        let mut body_end = html.len();
        for tag in &tags[i + 1..] {
            if !tag.closing {
                depth += 1;
            } else if depth == 0 {
                body_end = tag.start;
                break;
            } else {
                depth -= 1;
            }
        }
        bodies.push(&html[open.end..body_end]);
    }
    bodies
}

fn parse_card(card: &str) -> Option<RawListing> {
    let url = anchor_regex()
        .captures_iter(card)
        .find(|caps| has_class(&caps[1], LINK_CLASS))
        .and_then(|caps| {
            href_attr_regex()
                .captures(&caps[1])
                .map(|href| decode_entities(&href[1]))
        })
        .filter(|url| !url.is_empty())?;

    let title = heading_regex()
        .captures_iter(card)
        .find(|caps| has_class(&caps[1], TITLE_CLASS))
        .map(|caps| element_text(&caps[2]))
        .filter(|title| !title.is_empty())?;

    let mut bold = Vec::new();
    let mut venue = String::new();
    for caps in paragraph_regex().captures_iter(card) {
        let attrs = &caps[1];
        if has_class(attrs, BOLD_CLASS) && !has_class(attrs, URGENCY_CLASS) {
            bold.push(element_text(&caps[2]));
        } else if venue.is_empty() && VENUE_CLASSES.iter().all(|c| has_class(attrs, c)) {
            venue = element_text(&caps[2]);
        }
    }

    let mut bold = bold.into_iter();
    let date_time = bold.next().unwrap_or_default();
    let organizer = bold.next().unwrap_or_default();

    Some(RawListing {
        title,
        url,
        date_time,
        venue,
        organizer,
    })
}

fn has_class(attrs: &str, class: &str) -> bool {
    class_attr_regex()
        .captures(attrs)
        .map(|caps| caps[1].split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

fn element_text(inner: &str) -> String {
    let text = tag_regex().replace_all(inner, " ");
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Single pass, so `&amp;lt;` decodes to `&lt;` and not `<`. Unknown named
/// entities are left as written.
fn decode_entities(text: &str) -> String {
    entity_regex()
        .replace_all(text, |caps: &regex::Captures| {
            decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(entity: &str) -> Option<String> {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let decoded = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => " ",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        _ => return None,
    };
    Some(decoded.to_string())
}
