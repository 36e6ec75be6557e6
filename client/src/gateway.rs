//! AI response gateway.
//!
//! One question in, one answer out. The HTTP implementation keeps transport
//! failures, bad statuses, and malformed reply bodies distinct so callers
//! can report them differently.

use async_trait::async_trait;
use serde_json::{json, Value};

/// A single gateway answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    /// Answer text.
    pub text: String,
}

/// Gateway failure taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("gateway returned HTTP {status}")]
    Http { status: u16 },

    #[error("gateway reply carried no usable text")]
    InvalidShape,
}

/// Something that can answer a clinical question within a session.
#[async_trait]
pub trait ResponseGateway: Send + Sync {
    /// Request an answer to `question` in the context of `session_id`.
    async fn request(&self, question: &str, session_id: &str)
        -> Result<GatewayReply, GatewayError>;
}

/// HTTP gateway client.
pub struct HttpGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpGateway {
    /// Create a gateway client posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ResponseGateway for HttpGateway {
    async fn request(
        &self,
        question: &str,
        session_id: &str,
    ) -> Result<GatewayReply, GatewayError> {
        let body = json!({
            "question": question,
            "sessionId": session_id,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Gateway request rejected");
            return Err(GatewayError::Http {
                status: status.as_u16(),
            });
        }

        // A 2xx with an unreadable body is a shape problem, not transport
        let payload: Value = response
            .json()
            .await
            .map_err(|_| GatewayError::InvalidShape)?;
        parse_reply(&payload)
    }
}

/// Extract the answer text from a reply body. Empty counts as missing.
fn parse_reply(payload: &Value) -> Result<GatewayReply, GatewayError> {
    match payload.get("text").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Ok(GatewayReply {
            text: text.to_string(),
        }),
        _ => Err(GatewayError::InvalidShape),
    }
}
