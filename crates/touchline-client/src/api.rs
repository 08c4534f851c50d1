//! REST collaborator client.
//!
//! Fetches the initial listing and match details that views open with. Live
//! updates arrive over the transport afterwards.

use std::time::Duration;

use reqwest::{
    Url,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use touchline_proto::{ApiResponse, DetailedMatch, Match, MatchesResponse};

/// Request timeout for every call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// REST errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Base URL could not be parsed or extended.
    #[error("invalid api url {url}: {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Request failed, timed out, or returned a non-success status.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with `success: false` or without data.
    #[error("server reported failure for {0}")]
    Unsuccessful(String),
}

/// Client for the match read API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Create a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|err| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, base })
    }

    /// Current match listing.
    pub async fn matches(&self) -> Result<Vec<Match>, ApiError> {
        let listing: MatchesResponse = self.get(&["api", "matches"]).await?;
        Ok(listing.matches)
    }

    /// Detail record of one match.
    pub async fn match_detail(&self, match_id: &str) -> Result<DetailedMatch, ApiError> {
        self.get(&["api", "matches", match_id]).await
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "fetching");

        let response = self.http.get(url.clone()).send().await?.error_for_status()?;
        let body: ApiResponse<Option<T>> = response.json().await?;
        unwrap_envelope(url.path(), body)
    }

    /// Base URL joined with percent-encoded path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl {
                url: self.base.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn unwrap_envelope<T>(path: &str, body: ApiResponse<Option<T>>) -> Result<T, ApiError> {
    match body {
        ApiResponse { success: true, data: Some(data) } => Ok(data),
        _ => Err(ApiError::Unsuccessful(path.to_string())),
    }
}
