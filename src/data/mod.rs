//! Upstream data access.
//!
//! Defines the `JsonSource` trait, the single seam through which every
//! upstream request passes, plus the reqwest-backed implementation and the
//! source-specific clients built on top of it.

pub mod cities;
pub mod indicators;
pub mod normalize;
pub mod open_meteo;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SourcesConfig;
use crate::types::{FetchError, FetchResult};

/// Scalar query parameters, already formatted for the wire.
pub type QueryParams = Vec<(String, String)>;

/// Build one query parameter.
pub fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Abstraction over an HTTP endpoint that answers with JSON.
///
/// Implementations never panic and never retry: a request yields either the
/// decoded body or a `FetchError` describing what went wrong.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JsonSource: Send + Sync {
    /// GET `url` with `query` and decode the body as JSON.
    async fn get_json(&self, url: &str, query: QueryParams) -> FetchResult<Value>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// `JsonSource` over a shared reqwest client with a fixed per-call timeout.
pub struct HttpSource {
    http: Client,
}

impl HttpSource {
    pub fn new(cfg: &SourcesConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.as_str())
            .build()
            .context("Failed to build upstream HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl JsonSource for HttpSource {
    async fn get_json(&self, url: &str, query: QueryParams) -> FetchResult<Value> {
        debug!(url, ?query, "Upstream request");

        let resp = self
            .http
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Upstream returned error status");
            return Err(FetchError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| transport_error(url, &e))?;

        serde_json::from_str(&body).map_err(|e| FetchError::Parse {
            endpoint: url.to_string(),
            message: format!("invalid JSON: {e}"),
        })
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> FetchError {
    let message = if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    FetchError::Transport {
        endpoint: url.to_string(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
