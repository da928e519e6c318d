use tracing::debug;

use botforge_types::Turn;

use crate::context::{ReferenceFile, build_context};
use crate::remote::RemoteReplyClient;

/// Two-branch reply strategy: one remote attempt when a credential is
/// configured, otherwise (or on any remote failure) a deterministic echo
/// reply. The remote error is consumed here, never shown to the end user.
pub struct ReplyGenerator {
    remote: Option<RemoteReplyClient>,
}

impl ReplyGenerator {
    pub fn unconfigured() -> Self {
        Self { remote: None }
    }

    pub fn with_remote(client: RemoteReplyClient) -> Self {
        Self {
            remote: Some(client),
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// `history` already ends with the new user turn; `user_message` is
    /// that turn's text, used verbatim by the fallback template.
    pub async fn generate(
        &self,
        system_prompt: Option<&str>,
        reference_files: &[ReferenceFile],
        history: &[Turn],
        user_message: &str,
    ) -> String {
        if let Some(remote) = &self.remote {
            let messages = build_context(system_prompt, reference_files, history);
            match remote.complete(&messages).await {
                Ok(text) => return text,
                Err(e) => debug!("Remote reply failed, using fallback: {}", e),
            }
        }

        fallback_reply(user_message)
    }
}

/// Deterministic reply used when no external service is configured or the
/// call failed. Embeds the user's message verbatim.
pub fn fallback_reply(message: &str) -> String {
    format!(
        "You said: \"{}\". No language model is connected right now, so this is an echo reply.",
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_remote_tracks_configuration() {
        assert!(!ReplyGenerator::unconfigured().has_remote());

        let client = RemoteReplyClient::new("k".to_string(), None, None).unwrap();
        assert!(ReplyGenerator::with_remote(client).has_remote());
    }

    #[test]
    fn fallback_embeds_message_verbatim() {
        let reply = fallback_reply("hi");
        assert!(reply.contains("hi"));
        assert_eq!(reply, fallback_reply("hi"));
    }

    #[tokio::test]
    async fn unconfigured_generator_echoes() {
        let generator = ReplyGenerator::unconfigured();
        let history = vec![Turn::user("ping")];
        let reply = generator.generate(None, &[], &history, "ping").await;
        assert!(reply.contains("ping"));
    }

    #[tokio::test]
    async fn remote_failure_falls_back_silently() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .create_async()
            .await;

        let client =
            RemoteReplyClient::new("k".to_string(), Some(server.url()), None).unwrap();
        let generator = ReplyGenerator::with_remote(client);

        let history = vec![Turn::user("hello there")];
        let reply = generator
            .generate(Some("Be terse."), &[], &history, "hello there")
            .await;
        assert!(reply.contains("hello there"));
    }

    #[tokio::test]
    async fn remote_success_is_used() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"remote says hi"}}]}"#)
            .create_async()
            .await;

        let client =
            RemoteReplyClient::new("k".to_string(), Some(server.url()), None).unwrap();
        let generator = ReplyGenerator::with_remote(client);

        let history = vec![Turn::user("hi")];
        let reply = generator.generate(None, &[], &history, "hi").await;
        assert_eq!(reply, "remote says hi");
    }
}
