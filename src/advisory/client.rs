//! HTTP advisory client speaking the OpenAI-compatible chat completions API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryError, RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::prompt::{SYSTEM_PROMPT, build_user_prompt};
use super::{AdvisoryProvider, AdvisoryResult, AdvisoryUnavailable, parse_advisory};
use crate::config::AdvisoryConfig;
use crate::models::{Package, Requirement, Service};
use crate::{Result, TripMatchError};

pub struct HttpAdvisoryClient {
    client: ClientWithMiddleware,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    timeout_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

impl HttpAdvisoryClient {
    /// Build a client with a bounded timeout and at most one transient retry
    pub fn new(config: &AdvisoryConfig) -> Result<Self> {
        let timeout_seconds = u64::from(config.timeout_seconds);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("tripmatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TripMatchError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(50), Duration::from_millis(250))
            .build_with_max_retries(config.max_retries.min(1));
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_seconds,
        })
    }

    fn headers(&self) -> std::result::Result<HeaderMap, AdvisoryUnavailable> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| AdvisoryUnavailable::transport(format!("invalid API key header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn map_send_error(&self, error: reqwest_middleware::Error) -> AdvisoryUnavailable {
        if is_timeout(&error) {
            AdvisoryUnavailable::Timeout {
                seconds: self.timeout_seconds,
            }
        } else {
            AdvisoryUnavailable::transport(error.to_string())
        }
    }
}

/// Timeouts surface wrapped in the retry middleware's error
fn is_timeout(error: &reqwest_middleware::Error) -> bool {
    match error {
        reqwest_middleware::Error::Reqwest(e) => e.is_timeout(),
        reqwest_middleware::Error::Middleware(e) => e.chain().any(|cause| {
            if let Some(retry) = cause.downcast_ref::<RetryError>() {
                let (RetryError::WithRetries { err, .. } | RetryError::Error(err)) = retry;
                return is_timeout(err);
            }
            cause
                .downcast_ref::<reqwest::Error>()
                .is_some_and(reqwest::Error::is_timeout)
                || cause
                    .downcast_ref::<reqwest_middleware::Error>()
                    .is_some_and(is_timeout)
        }),
    }
}

#[async_trait]
impl AdvisoryProvider for HttpAdvisoryClient {
    #[tracing::instrument(
        name = "advisory_request",
        skip_all,
        fields(package = %package.id, model = %self.model)
    )]
    async fn advise(
        &self,
        requirement: &Requirement,
        package: &Package,
        candidates: &[Service],
    ) -> std::result::Result<AdvisoryResult, AdvisoryUnavailable> {
        let user = build_user_prompt(requirement, package, candidates);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let payload = serde_json::to_vec(&body)
            .map_err(|e| AdvisoryUnavailable::transport(format!("failed to encode request: {e}")))?;

        debug!(prompt_len = user.len(), "Sending advisory request");
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .body(payload)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Advisory service returned an error status");
            return Err(AdvisoryUnavailable::transport(format!(
                "advisory service returned {status}"
            )));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AdvisoryUnavailable::Timeout {
                    seconds: self.timeout_seconds,
                }
            } else {
                AdvisoryUnavailable::transport(e.to_string())
            }
        })?;
        let chat: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| AdvisoryUnavailable::malformed(format!("unexpected response body: {e}")))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AdvisoryUnavailable::malformed("response has no message content"))?;

        let result = parse_advisory(&content)?;
        info!(
            alignment_score = result.alignment_score,
            recommendations = result.customization_recommendations.len(),
            "Advisory received"
        );
        Ok(result)
    }
}
