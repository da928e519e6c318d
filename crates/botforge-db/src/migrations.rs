use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use botforge_credentials::{hash_password, new_user_id};

/// Default bootstrap credentials. Well-known on purpose; change after
/// first login on anything that is not a dev box.
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_DEFAULT_PASSWORD: &str = "hss";

/// Create-if-missing schema. Never destructive.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            salt        TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS chatbots (
            id              TEXT PRIMARY KEY,
            user_id         TEXT REFERENCES users(id) ON DELETE CASCADE,
            name            TEXT,
            system_prompt   TEXT,
            welcome_message TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_chatbots_user
            ON chatbots(user_id);

        CREATE TABLE IF NOT EXISTS text_files (
            id          TEXT PRIMARY KEY,
            chatbot_id  TEXT NOT NULL REFERENCES chatbots(id) ON DELETE CASCADE,
            filename    TEXT NOT NULL,
            content     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_text_files_chatbot
            ON text_files(chatbot_id);

        CREATE TABLE IF NOT EXISTS css_files (
            id          TEXT PRIMARY KEY,
            chatbot_id  TEXT NOT NULL REFERENCES chatbots(id) ON DELETE CASCADE,
            filename    TEXT NOT NULL,
            content     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_css_files_chatbot
            ON css_files(chatbot_id);
        ",
    )?;

    info!("Database schema ensured");
    Ok(())
}

/// Ensure the bootstrap admin account exists. Returns true if it was
/// created by this call. The caller decides what a failure means; at
/// startup it is logged and ignored.
pub fn seed_admin(conn: &Connection) -> Result<bool> {
    let exists: bool = conn
        .prepare("SELECT 1 FROM users WHERE username = ?1")?
        .exists([ADMIN_USERNAME])?;

    if exists {
        return Ok(false);
    }

    let (hash, salt) = hash_password(ADMIN_DEFAULT_PASSWORD, None);
    conn.execute(
        "INSERT INTO users (id, username, password, salt) VALUES (?1, ?2, ?3, ?4)",
        (new_user_id(), ADMIN_USERNAME, hash, salt),
    )?;

    info!("Bootstrap admin account created");
    Ok(true)
}
