//! Schedule service client — the two network calls the pipeline makes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::PlannerConfig;
use crate::error::{ConfigError, PipelineError};

use super::types::{RawResponse, Stage, SubmissionRequest};

const FUNCTION_TOKEN_HEADER: &str = "x-function-token";
const REQUEST_ID_HEADER: &str = "x-platform-request-id";

/// Remote schedule generation.
///
/// Implementations map transport failures onto the pipeline taxonomy:
/// `submit` fails with `Service`/`Timeout`, `fetch_artifact` with
/// `ArtifactFetch`/`Timeout`.
#[async_trait]
pub trait ScheduleService: Send + Sync {
    /// `POST` the request and return the raw 2xx response.
    async fn submit(&self, request: &SubmissionRequest) -> Result<RawResponse, PipelineError>;

    /// `GET` the document at `url`.
    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, PipelineError>;
}

/// reqwest-backed [`ScheduleService`].
///
/// The routing/authentication headers go on the submission only; the
/// artifact host is an arbitrary URL and never sees them.
pub struct HttpScheduleService {
    endpoint: String,
    auth_headers: HeaderMap,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpScheduleService {
    pub fn new(config: &PlannerConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(FUNCTION_TOKEN_HEADER),
            header_value("PLANNER_FUNCTION_TOKEN", config.function_token.expose_secret())?,
        );
        headers.insert(
            HeaderName::from_static(REQUEST_ID_HEADER),
            header_value("PLANNER_REQUEST_ID", &config.request_id)?,
        );

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            auth_headers: headers,
            timeout: config.request_timeout,
            client,
        })
    }
}

#[async_trait]
impl ScheduleService for HttpScheduleService {
    async fn submit(&self, request: &SubmissionRequest) -> Result<RawResponse, PipelineError> {
        debug!(endpoint = %self.endpoint, "Submitting study preferences");

        let resp = self
            .client
            .post(&self.endpoint)
            .headers(self.auth_headers.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, Stage::Submission, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Service {
                status: Some(status.as_u16()),
                body,
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = resp
            .bytes()
            .await
            .map_err(|e| transport_error(e, Stage::Submission, self.timeout))?;

        Ok(RawResponse {
            content_type,
            body: body.to_vec(),
        })
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        debug!(url = %url, "Fetching generated document");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e, Stage::ArtifactFetch, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(PipelineError::ArtifactFetch {
                status: Some(status.as_u16()),
                reason: if reason.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    reason
                },
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| transport_error(e, Stage::ArtifactFetch, self.timeout))?;
        Ok(bytes.to_vec())
    }
}

fn header_value(key: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    let mut value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Map a reqwest failure onto the taxonomy for `stage`.
fn transport_error(err: reqwest::Error, stage: Stage, timeout: Duration) -> PipelineError {
    if err.is_timeout() {
        return PipelineError::Timeout { stage, timeout };
    }
    match stage {
        Stage::ArtifactFetch => PipelineError::ArtifactFetch {
            status: None,
            reason: err.to_string(),
        },
        _ => PipelineError::Service {
            status: None,
            body: err.to_string(),
        },
    }
}
