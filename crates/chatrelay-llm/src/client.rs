//! HTTP transport to OpenAI-compatible upstreams.
//!
//! [`UpstreamClient`] POSTs a [`WireRequest`] to `{base_url}/chat/completions`
//! and turns non-success statuses into classified [`RelayError`]s. The
//! blocking path parses the whole envelope; the streaming path hands the
//! still-open response back so the relay can consume its body.

use std::time::Duration;

use tracing::{debug, warn};

use chatrelay_types::{CompletionResult, SecretString};

use crate::classify::{classify, describe_transport};
use crate::error::{RelayError, Result};
use crate::extract::extract_result;
use crate::types::{WireRequest, WireResponse};

/// Upper bound on how much of an error body is logged.
const MAX_LOGGED_BODY: usize = 512;

/// Thin wrapper over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl UpstreamClient {
    /// Build a client whose connect phase, and whole blocking exchange, are
    /// bounded by `timeout`. Streams are only bounded at connect time.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Ok(Self { http, timeout })
    }

    /// Blocking completion: send, wait for the full envelope, extract the
    /// answer and reasoning.
    pub async fn complete(
        &self,
        base_url: &str,
        credential: &SecretString,
        request: &WireRequest,
    ) -> Result<CompletionResult> {
        debug!(
            url = %completions_url(base_url),
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .post(base_url, credential, false)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| RelayError::Transport(describe_transport(&e)))?;
        let response = check_status(response, &request.model).await?;

        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Transport(describe_transport(&e)))?;
        let envelope: WireResponse = serde_json::from_str(&body).map_err(|e| {
            RelayError::InvalidResponse(format!("failed to parse response: {e}"))
        })?;

        debug!(
            model = envelope.model.as_deref().unwrap_or(&request.model),
            choices = envelope.choices.len(),
            "chat completion response received"
        );

        let choice = envelope.choices.first().ok_or(RelayError::EmptyResponse)?;
        Ok(extract_result(&choice.message))
    }

    /// Open a streaming completion. On success the returned response's
    /// body is the upstream event stream; rejections surface here, before
    /// any event is relayed.
    pub async fn open_stream(
        &self,
        base_url: &str,
        credential: &SecretString,
        request: &WireRequest,
    ) -> Result<reqwest::Response> {
        debug!(
            url = %completions_url(base_url),
            model = %request.model,
            messages = request.messages.len(),
            "sending streaming chat completion request"
        );

        let response = self
            .post(base_url, credential, true)
            .json(request)
            .send()
            .await
            .map_err(|e| RelayError::Transport(describe_transport(&e)))?;
        check_status(response, &request.model).await
    }

    fn post(&self, base_url: &str, credential: &SecretString, streaming: bool) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .post(completions_url(base_url))
            .header("Content-Type", "application/json");
        if !credential.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", credential.expose()));
        }
        if streaming {
            req = req.header("Accept", "text/event-stream");
        }
        req
    }
}

/// `{base}/chat/completions`, tolerating a trailing slash on `base`.
pub fn completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/chat/completions")
}

async fn check_status(response: reqwest::Response, model: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let logged: String = body.chars().take(MAX_LOGGED_BODY).collect();
    warn!(status = status.as_u16(), model = %model, body = %logged, "upstream rejected request");

    Err(RelayError::UpstreamRejected {
        status: status.as_u16(),
        model: model.to_owned(),
        message: classify(status.as_u16(), model),
    })
}
