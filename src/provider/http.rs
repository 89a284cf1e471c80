use super::types::{RawPage, SourceError, StatsSource};
use crate::cli::types::{DateRange, TeamCode};
use crate::error::Result;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// `StatsSource` backed by the provider's paginated JSON endpoint:
/// `GET {base}/teams/{team}/games?start_date=..&end_date=..&page=..`
#[derive(Debug, Clone)]
pub struct HttpStatsSource {
    client: Client,
    base_url: String,
}

impl HttpStatsSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mlb-pitchers/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn games_url(&self, team: &TeamCode) -> String {
        format!("{}/teams/{}/games", self.base_url.trim_end_matches('/'), team)
    }
}

impl StatsSource for HttpStatsSource {
    async fn fetch_page(
        &self,
        team: &TeamCode,
        range: &DateRange,
        page: u32,
    ) -> std::result::Result<RawPage, SourceError> {
        let params = [
            ("start_date", range.start().to_string()),
            ("end_date", range.end().to_string()),
            ("page", page.to_string()),
        ];

        let res = self
            .client
            .get(self.games_url(team))
            .query(&params)
            .send()
            .await
            .map_err(|e| classify_request_error(&e))?;

        if let Some(err) = classify_status(res.status()) {
            return Err(err);
        }

        res.json::<RawPage>()
            .await
            .map_err(|e| classify_request_error(&e))
    }
}

/// Map a non-success status onto a [`SourceError`]; `None` for success.
pub fn classify_status(status: StatusCode) -> Option<SourceError> {
    match status {
        StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Some(SourceError::NoData),
        StatusCode::TOO_MANY_REQUESTS => Some(SourceError::RateLimited),
        s if s.is_server_error() || s == StatusCode::REQUEST_TIMEOUT => {
            Some(SourceError::Transient(format!("HTTP {s}")))
        }
        s if s.is_success() => None,
        s => Some(SourceError::Fatal(format!("HTTP {s}"))),
    }
}

fn classify_request_error(error: &reqwest::Error) -> SourceError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        SourceError::Transient(error.to_string())
    } else {
        SourceError::Fatal(error.to_string())
    }
}
