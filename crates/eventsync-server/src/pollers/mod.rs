//! Background tasks run alongside the HTTP server.

pub mod listings;

pub use listings::start_listings_sync_task;
