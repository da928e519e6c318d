use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

use botforge_types::Turn;

/// Session-scoped conversation history, one list per chatbot id.
///
/// `append` owns the whole load-push-store sequence. Two concurrent sends
/// on the same session can still interleave at the session store (last
/// write wins); that race is accepted, not accidental.
pub struct ConversationStore {
    session: Session,
}

impl ConversationStore {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    fn key(chatbot_id: &str) -> String {
        format!("history:{}", chatbot_id)
    }

    /// The history for this chatbot, empty if none exists yet.
    pub async fn history(&self, chatbot_id: &str) -> Result<Vec<Turn>, SessionError> {
        Ok(self
            .session
            .get::<Vec<Turn>>(&Self::key(chatbot_id))
            .await?
            .unwrap_or_default())
    }

    pub async fn append(&self, chatbot_id: &str, turn: Turn) -> Result<(), SessionError> {
        let key = Self::key(chatbot_id);
        let mut turns = self
            .session
            .get::<Vec<Turn>>(&key)
            .await?
            .unwrap_or_default();
        turns.push(turn);
        self.session.insert(&key, turns).await
    }

    /// Drop this chatbot's history entirely. Other chatbots' histories in
    /// the same session are untouched.
    pub async fn reset(&self, chatbot_id: &str) -> Result<(), SessionError> {
        self.session
            .remove::<Vec<Turn>>(&Self::key(chatbot_id))
            .await?;
        Ok(())
    }
}
