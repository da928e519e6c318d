/// Database row types — these map directly to SQLite rows.
/// API-facing shapes live in botforge-types; the DB layer stays independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub salt: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn is_admin(&self) -> bool {
        self.username == crate::migrations::ADMIN_USERNAME
    }
}

#[derive(Debug, Clone)]
pub struct ChatbotRow {
    pub id: String,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub system_prompt: Option<String>,
    pub welcome_message: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct TextFileRow {
    pub id: String,
    pub chatbot_id: String,
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CssFileRow {
    pub id: String,
    pub chatbot_id: String,
    pub filename: String,
    pub content: String,
}

/// A decoded upload waiting to be attached to a chatbot.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: String,
}
