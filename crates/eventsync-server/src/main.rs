use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod calendar;
mod config;
mod error;
mod filter;
mod handlers;
mod normalize;
mod oracle;
mod pollers;
mod routes;
mod services;
mod sources;

#[cfg(test)]
mod test_support;

use crate::calendar::{CalendarFacade, GoogleCalendar, GoogleCalendarConfig};
use crate::config::AppConfig;
use crate::filter::RelevanceFilter;
use crate::oracle::GeminiOracle;
use crate::services::{CalendarSynchronizer, IngestionPipeline, RecommendationEngine};
use crate::sources::EventbriteSource;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub admin_token: Option<String>,
    pub calendar: CalendarFacade,
    pub pipeline: Arc<IngestionPipeline>,
    pub engine: Arc<RecommendationEngine>,
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install crypto provider"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventsync_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    tracing::info!("Starting eventsync server");

    let oracle = Arc::new(
        GeminiOracle::new(config.gemini_api_key.clone(), config.outbound_timeout)
            .context("Failed to build Gemini client")?
            .with_model(&config.gemini_model)
            .with_api_base(&config.gemini_api_base),
    );

    let store = Arc::new(
        GoogleCalendar::connect(GoogleCalendarConfig {
            keyfile: config.google_keyfile.clone(),
            calendar_id: config.calendar_id.clone(),
            timeout: config.outbound_timeout,
        })
        .await?,
    );
    let calendar = CalendarFacade::new(store);

    let source = Arc::new(
        EventbriteSource::new(&config.listings_url, config.outbound_timeout)
            .context("Failed to build listings client")?,
    );

    let pipeline = Arc::new(IngestionPipeline::new(
        source,
        RelevanceFilter::new(oracle.clone()).with_topic(&config.filter_topic),
        CalendarSynchronizer::new(calendar.store()),
    ));
    let engine = Arc::new(RecommendationEngine::new(oracle, calendar.clone()));

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin routes will refuse every request");
    }

    if let Some(interval) = config.sync_interval {
        let poll_pipeline = pipeline.clone();
        tokio::spawn(async move {
            pollers::start_listings_sync_task(poll_pipeline, interval).await;
        });
    }

    let state = AppState {
        admin_token: config.admin_token.clone(),
        calendar,
        pipeline,
        engine,
    };

    let app = routes::with_frontend(
        routes::build_app(state, config.cors_allowed_origins.as_deref()),
        &config.frontend_dir,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
