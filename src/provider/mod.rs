//! Access to the external advanced-statistics provider.
//!
//! - `types`: the [`StatsSource`] seam, raw page shape and record validation
//! - `http`: the `reqwest`-backed production source
//! - `client`: pagination, rate limiting and retry on top of any source

pub mod client;
pub mod http;
pub mod types;


pub use client::{GameFeed, ProviderClient, RateLimiter, RetryPolicy};
pub use http::HttpStatsSource;
pub use types::{parse_game, RawPage, SourceError, StatsSource};
