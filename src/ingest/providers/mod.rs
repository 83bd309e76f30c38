// src/ingest/providers/mod.rs
pub mod fixture;
pub mod http_feed;

pub use fixture::FixtureFeedProvider;
pub use http_feed::HttpFeedProvider;
