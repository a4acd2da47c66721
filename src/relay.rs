use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::logging::{LogLevel, SharedLogger};
use crate::translate::glm_types::GlmChatRequest;
use crate::translate::openai_types::{ChatCompletionResponse, InboundChatRequest};
use crate::translate::{passthrough, rebuild, to_upstream};

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;

/// Body of a streamed upstream response, relayed chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Outcome of relaying one chat completion request
pub enum RelayOutcome {
    Completion(ChatCompletionResponse),
    Stream(ByteStream),
    /// Upstream answered with something other than 200.
    UpstreamError { status: u16, body: String },
}

/// Owns the outbound connection pool and the upstream credential.
///
/// The credential is always the configured one; whatever the caller put in
/// its own `Authorization` header is never forwarded. The proxy is meant to
/// sit in front of a single tenant.
#[derive(Clone)]
pub struct Relay {
    client: reqwest::Client,
    url: String,
    api_key: String,
    user_agent: String,
    default_model: String,
}

impl Relay {
    pub fn new(client: reqwest::Client, config: &ProxyConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: config.chat_completions_url(),
            api_key: api_key.into(),
            user_agent: config.upstream.user_agent.clone(),
            default_model: config.upstream.default_model.clone(),
        }
    }

    /// Build the shared client and resolve the API key from the environment.
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::new(client, config, api_key))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Translate a caller request, send it upstream, and translate the answer.
    pub async fn chat_completions(
        &self,
        req: InboundChatRequest,
        logger: &SharedLogger,
    ) -> Result<RelayOutcome> {
        let glm_req = to_upstream(req, &self.default_model);
        let is_streaming = glm_req.is_streaming();

        logger.log_with_context(
            LogLevel::Info,
            "relay",
            format!(
                "POST {} model={} stream={}",
                self.url, glm_req.model, is_streaming
            ),
            serde_json::to_value(&glm_req)?,
        );

        let response = self.send(&glm_req).await?;
        let status = response.status().as_u16();

        if status == 200 && is_streaming {
            logger.info("relay", format!("Upstream response status={status} (streaming)"));
            let stream = relay_stream(response.bytes_stream(), logger.clone());
            return Ok(RelayOutcome::Stream(Box::pin(stream)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::upstream(format!("Failed to read response body: {}", e)))?;

        logger.info(
            "relay",
            format!(
                "Upstream response status={} body={}",
                status,
                String::from_utf8_lossy(&body)
            ),
        );

        if status != 200 {
            logger.warn("relay", format!("Upstream returned status {status}"));
            return Ok(RelayOutcome::UpstreamError {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(RelayOutcome::Completion(rebuild(&body, &self.default_model)?))
    }

    async fn send(&self, glm_req: &GlmChatRequest) -> Result<reqwest::Response> {
        self.client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("User-Agent", &self.user_agent)
            .json(glm_req)
            .send()
            .await
            .map_err(|e| ProxyError::upstream(format!("Request failed: {}", e)))
    }
}

/// Forward upstream event-stream bytes as they arrive, without re-framing.
fn relay_stream(
    byte_stream: impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
    logger: SharedLogger,
) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
    async_stream::stream! {
        let mut chunks = 0usize;
        let mut total = 0usize;

        tokio::pin!(byte_stream);

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    logger.error("stream", format!("Byte stream error: {}", e));
                    yield Err(ProxyError::upstream(format!("Stream interrupted: {}", e)));
                    break;
                }
            };

            chunks += 1;
            total += chunk.len();
            logger.debug("stream", String::from_utf8_lossy(&chunk).into_owned());

            yield Ok(passthrough(chunk));
        }

        logger.info("stream", format!("Stream completed: chunks={} bytes={}", chunks, total));
    }
}
