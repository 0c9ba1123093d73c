//! HTTP client for the matching backend.
//!
//! One [`ApiClient`] serves both collaborator roles: it is the
//! [`ProfileSource`](crate::io::profile_source::ProfileSource) and the
//! [`MatchingService`](crate::io::matching::MatchingService).

use anyhow::{Context, Result};
use reqwest::header::{COOKIE, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::types::{Decision, Profile};
use crate::io::config::FeedConfig;
use crate::io::credentials::SessionCredentials;

/// Failure talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected feed payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session_cookie: Option<HeaderValue>,
    user_id: Option<String>,
}

impl ApiClient {
    pub fn new(config: &FeedConfig, credentials: SessionCredentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("build http client")?;
        let session_cookie = credentials
            .cookie_header()
            .map(|cookie| HeaderValue::from_str(&cookie))
            .transpose()
            .context("session token is not a valid header value")?;
        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            session_cookie,
            user_id: credentials.user_id,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Signed-in user the session belongs to, if the config names one.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn feed_url(&self) -> String {
        format!("{}/feed", self.base_url)
    }

    pub fn decision_url(&self, profile_id: &str, decision: Decision) -> String {
        format!(
            "{}/request/send/{}/{}",
            self.base_url,
            decision.as_str(),
            profile_id
        )
    }

    /// `GET /feed?page=&limit=`.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn get_feed(&self, page: u32, limit: usize) -> Result<Vec<Profile>> {
        let url = self.feed_url();
        let request = self
            .http
            .get(&url)
            .query(&[("page", page.to_string()), ("limit", limit.to_string())]);
        let response = self
            .with_session(request)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("read GET {} body", url))?;
        if !status.is_success() {
            warn!(%status, "feed request rejected");
            return Err(ApiError::Status {
                method: "GET",
                url,
                status,
                body,
            }
            .into());
        }

        let payload: Value =
            serde_json::from_str(&body).with_context(|| format!("parse GET {} body", url))?;
        let profiles = parse_feed_payload(payload)?;
        debug!(count = profiles.len(), "feed page received");
        Ok(profiles)
    }

    /// `POST /request/send/{interested|ignored}/{id}`.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn send_request(&self, profile_id: &str, decision: Decision) -> Result<()> {
        let url = self.decision_url(profile_id, decision);
        let request = self.http.post(&url).json(&serde_json::json!({}));
        let response = self
            .with_session(request)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "match request rejected");
            return Err(ApiError::Status {
                method: "POST",
                url,
                status,
                body,
            }
            .into());
        }
        debug!("match request sent");
        Ok(())
    }

    fn with_session(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_cookie {
            Some(cookie) => request.header(COOKIE, cookie.clone()),
            None => request,
        }
    }
}

/// Accept either a bare profile array or `{ "data": [...] }`.
pub fn parse_feed_payload(payload: Value) -> Result<Vec<Profile>> {
    let list = match payload {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Array(_)) => data,
            _ => return Err(ApiError::Payload("object without a `data` array".to_string()).into()),
        },
        other => return Err(ApiError::Payload(format!("expected array, got {}", other)).into()),
    };
    serde_json::from_value(list).context("decode profiles")
}
