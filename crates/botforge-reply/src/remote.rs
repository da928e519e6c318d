use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("response had no reply text")]
    MalformedResponse,
}

/// Client for an OpenAI-compatible chat-completion endpoint. Exactly one
/// attempt per message, bounded by a fixed timeout. No retries, no
/// streaming.
pub struct RemoteReplyClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl RemoteReplyClient {
    pub fn new(
        api_key: String,
        api_base: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ReplyError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_key,
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub async fn complete(&self, messages: &[Value]) -> Result<String, ReplyError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": messages,
        });

        debug!("Chat completion request to {} with model {}", url, self.model);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ReplyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response.json().await?;
        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(ReplyError::MalformedResponse)?;

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botforge_types::Turn;

    use crate::context::build_context;

    fn client_for(server: &mockito::ServerGuard) -> RemoteReplyClient {
        RemoteReplyClient::new("test-key".to_string(), Some(server.url()), None).unwrap()
    }

    #[tokio::test]
    async fn complete_extracts_reply_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"42"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let messages = build_context(None, &[], &[Turn::user("meaning of life?")]);
        let reply = client.complete(&messages).await.unwrap();

        assert_eq!(reply, "42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.complete(&[]).await.unwrap_err();
        match err {
            ReplyError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_content_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.complete(&[]).await.unwrap_err();
        assert!(matches!(err, ReplyError::MalformedResponse));
    }
}
