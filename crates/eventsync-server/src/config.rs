use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::filter::DEFAULT_TOPIC;
use crate::oracle::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::sources::eventbrite::DEFAULT_LISTINGS_URL;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub google_keyfile: PathBuf,
    pub calendar_id: String,
    /// Shared secret for admin routes; admin routes refuse everything when unset
    pub admin_token: Option<String>,
    pub listings_url: String,
    /// What the relevance filter keeps
    pub filter_topic: String,
    /// Bound on every outbound oracle, calendar and listings call
    pub outbound_timeout: Duration,
    /// Enables the background ingestion task
    pub sync_interval: Option<Duration>,
    /// Comma-separated origins; permissive CORS when unset
    pub cors_allowed_origins: Option<String>,
    pub frontend_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            gemini_api_key: env::var("GEMINI_API_KEY").context("GEMINI_API_KEY must be set")?,
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            gemini_api_base: env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            google_keyfile: env::var("GOOGLE_KEYFILE")
                .context("GOOGLE_KEYFILE must be set")?
                .into(),
            calendar_id: env::var("CALENDAR_ID").context("CALENDAR_ID must be set")?,
            admin_token: env::var("ADMIN_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            listings_url: env::var("LISTINGS_URL")
                .unwrap_or_else(|_| DEFAULT_LISTINGS_URL.to_string()),
            filter_topic: env::var("FILTER_TOPIC").unwrap_or_else(|_| DEFAULT_TOPIC.to_string()),
            outbound_timeout: Duration::from_secs(
                env::var("OUTBOUND_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("OUTBOUND_TIMEOUT_SECS must be a valid number")?,
            ),
            sync_interval: parse_sync_interval(env::var("SYNC_INTERVAL_SECS").ok())?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
            frontend_dir: env::var("FRONTEND_DIR").unwrap_or_else(|_| "public".to_string()),
        })
    }
}

/// A zero interval would spin the ingestion loop, so it is rejected.
fn parse_sync_interval(raw: Option<String>) -> Result<Option<Duration>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .context("SYNC_INTERVAL_SECS must be a valid number")?;
    if secs == 0 {
        bail!("SYNC_INTERVAL_SECS must be greater than zero");
    }
    Ok(Some(Duration::from_secs(secs)))
}
