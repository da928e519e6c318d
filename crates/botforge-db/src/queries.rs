use anyhow::Result;
use rusqlite::Connection;

use botforge_credentials::{new_chatbot_id, new_file_id, new_user_id};

use crate::Database;
use crate::models::{ChatbotRow, CssFileRow, TextFileRow, UploadedFile, UserRow};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let id = new_user_id();
            tx.execute(
                "INSERT INTO users (id, username, password, salt) VALUES (?1, ?2, ?3, ?4)",
                (&id, username, password_hash, salt),
            )?;
            let row = query_user(&tx, "id", &id)?
                .ok_or_else(|| anyhow::anyhow!("User vanished inside its own transaction"))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Cascades through chatbots down to attached files.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let n = tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(n > 0)
        })
    }

    // -- Chatbots --

    /// Insert a chatbot together with its initial uploads in one transaction.
    pub fn create_chatbot(
        &self,
        user_id: &str,
        name: &str,
        system_prompt: &str,
        welcome_message: &str,
        text_files: &[UploadedFile],
        css_file: Option<&UploadedFile>,
    ) -> Result<ChatbotRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let id = new_chatbot_id();
            tx.execute(
                "INSERT INTO chatbots (id, user_id, name, system_prompt, welcome_message)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (&id, user_id, name, system_prompt, welcome_message),
            )?;
            for file in text_files {
                insert_text_file(&tx, &id, file)?;
            }
            if let Some(css) = css_file {
                replace_css_file(&tx, &id, css)?;
            }
            let row = query_chatbot(&tx, &id)?
                .ok_or_else(|| anyhow::anyhow!("Chatbot vanished inside its own transaction"))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn get_chatbot(&self, id: &str) -> Result<Option<ChatbotRow>> {
        self.with_conn(|conn| query_chatbot(conn, id))
    }

    /// Admin catalog: every chatbot, newest first.
    pub fn list_all_chatbots(&self) -> Result<Vec<ChatbotRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, system_prompt, welcome_message, created_at
                 FROM chatbots ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], chatbot_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_chatbots_for_user(&self, user_id: &str) -> Result<Vec<ChatbotRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, system_prompt, welcome_message, created_at
                 FROM chatbots WHERE user_id = ?1",
            )?;
            let rows = stmt
                .query_map([user_id], chatbot_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_chatbots_for_user(&self, user_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM chatbots WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Update the chatbot's fields and attach any new uploads, atomically.
    /// A css upload replaces the existing one; text uploads append.
    pub fn update_chatbot(
        &self,
        id: &str,
        name: &str,
        system_prompt: &str,
        welcome_message: &str,
        new_text_files: &[UploadedFile],
        new_css_file: Option<&UploadedFile>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE chatbots SET name = ?2, system_prompt = ?3, welcome_message = ?4
                 WHERE id = ?1",
                (id, name, system_prompt, welcome_message),
            )?;
            for file in new_text_files {
                insert_text_file(&tx, id, file)?;
            }
            if let Some(css) = new_css_file {
                replace_css_file(&tx, id, css)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Cascades to attached text and css files.
    pub fn delete_chatbot(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let n = tx.execute("DELETE FROM chatbots WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(n > 0)
        })
    }

    // -- Attached files --

    /// Text files in insertion order.
    pub fn list_text_files(&self, chatbot_id: &str) -> Result<Vec<TextFileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chatbot_id, filename, content
                 FROM text_files WHERE chatbot_id = ?1 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([chatbot_id], |row| {
                    Ok(TextFileRow {
                        id: row.get(0)?,
                        chatbot_id: row.get(1)?,
                        filename: row.get(2)?,
                        content: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn add_text_file(&self, chatbot_id: &str, file: &UploadedFile) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_text_file(&tx, chatbot_id, file)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn delete_text_file(&self, chatbot_id: &str, file_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let n = tx.execute(
                "DELETE FROM text_files WHERE id = ?1 AND chatbot_id = ?2",
                (file_id, chatbot_id),
            )?;
            tx.commit()?;
            Ok(n > 0)
        })
    }

    pub fn get_css_file(&self, chatbot_id: &str) -> Result<Option<CssFileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chatbot_id, filename, content
                 FROM css_files WHERE chatbot_id = ?1",
            )?;
            let row = stmt
                .query_row([chatbot_id], |row| {
                    Ok(CssFileRow {
                        id: row.get(0)?,
                        chatbot_id: row.get(1)?,
                        filename: row.get(2)?,
                        content: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Replace semantics: the old css row is deleted in the same
    /// transaction, keeping at most one per chatbot.
    pub fn set_css_file(&self, chatbot_id: &str, file: &UploadedFile) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            replace_css_file(&tx, chatbot_id, file)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn delete_css_file(&self, chatbot_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let n = tx.execute("DELETE FROM css_files WHERE chatbot_id = ?1", [chatbot_id])?;
            tx.commit()?;
            Ok(n > 0)
        })
    }
}

fn insert_text_file(conn: &Connection, chatbot_id: &str, file: &UploadedFile) -> Result<()> {
    conn.execute(
        "INSERT INTO text_files (id, chatbot_id, filename, content) VALUES (?1, ?2, ?3, ?4)",
        (new_file_id(), chatbot_id, &file.filename, &file.content),
    )?;
    Ok(())
}

fn replace_css_file(conn: &Connection, chatbot_id: &str, file: &UploadedFile) -> Result<()> {
    conn.execute("DELETE FROM css_files WHERE chatbot_id = ?1", [chatbot_id])?;
    conn.execute(
        "INSERT INTO css_files (id, chatbot_id, filename, content) VALUES (?1, ?2, ?3, ?4)",
        (new_file_id(), chatbot_id, &file.filename, &file.content),
    )?;
    Ok(())
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is a compile-time constant in all callers, never user input.
    let sql = format!(
        "SELECT id, username, password, salt, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                salt: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn query_chatbot(conn: &Connection, id: &str) -> Result<Option<ChatbotRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, system_prompt, welcome_message, created_at
         FROM chatbots WHERE id = ?1",
    )?;
    let row = stmt.query_row([id], chatbot_from_row).optional()?;
    Ok(row)
}

fn chatbot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatbotRow> {
    Ok(ChatbotRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        system_prompt: row.get(3)?,
        welcome_message: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::ADMIN_USERNAME;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn upload(name: &str, content: &str) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn admin_is_seeded_once() {
        let db = db();
        let admin = db.get_user_by_username(ADMIN_USERNAME).unwrap().unwrap();
        assert!(admin.is_admin());

        // Seeding again is a no-op
        db.with_conn(|conn| {
            assert!(!crate::migrations::seed_admin(conn).unwrap());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = db();
        db.create_user("alice", "h", "s").unwrap();
        assert!(db.create_user("alice", "h2", "s2").is_err());

        let alice = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(alice.password, "h");
    }

    #[test]
    fn user_ids_are_short() {
        let db = db();
        let user = db.create_user("bob", "h", "s").unwrap();
        assert_eq!(user.id.len(), 6);

        let bot = db
            .create_chatbot(&user.id, "Bot", "", "", &[], None)
            .unwrap();
        assert_eq!(bot.id.len(), 8);
    }

    #[test]
    fn deleting_user_cascades_to_chatbots_and_files() {
        let db = db();
        let user = db.create_user("carol", "h", "s").unwrap();
        let bot = db
            .create_chatbot(
                &user.id,
                "Bot",
                "prompt",
                "hello",
                &[upload("notes.txt", "notes")],
                Some(&upload("theme.css", "body{}")),
            )
            .unwrap();

        assert!(db.delete_user(&user.id).unwrap());
        assert!(db.get_chatbot(&bot.id).unwrap().is_none());
        assert!(db.list_text_files(&bot.id).unwrap().is_empty());
        assert!(db.get_css_file(&bot.id).unwrap().is_none());
    }

    #[test]
    fn deleting_chatbot_cascades_to_files() {
        let db = db();
        let user = db.create_user("dave", "h", "s").unwrap();
        let bot = db
            .create_chatbot(&user.id, "Bot", "", "", &[upload("a.txt", "a")], None)
            .unwrap();

        assert!(db.delete_chatbot(&bot.id).unwrap());
        assert!(db.get_chatbot(&bot.id).unwrap().is_none());
        assert!(db.list_text_files(&bot.id).unwrap().is_empty());
    }

    #[test]
    fn css_upload_replaces_prior_file() {
        let db = db();
        let user = db.create_user("erin", "h", "s").unwrap();
        let bot = db
            .create_chatbot(&user.id, "Bot", "", "", &[], Some(&upload("one.css", "a{}")))
            .unwrap();

        db.set_css_file(&bot.id, &upload("two.css", "b{}")).unwrap();

        let css = db.get_css_file(&bot.id).unwrap().unwrap();
        assert_eq!(css.filename, "two.css");
        assert_eq!(css.content, "b{}");

        let count: u32 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM css_files WHERE chatbot_id = ?1",
                    [&bot.id],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn text_files_keep_insertion_order() {
        let db = db();
        let user = db.create_user("frank", "h", "s").unwrap();
        let bot = db
            .create_chatbot(&user.id, "Bot", "", "", &[upload("first.txt", "1")], None)
            .unwrap();
        db.add_text_file(&bot.id, &upload("second.txt", "2")).unwrap();
        db.add_text_file(&bot.id, &upload("third.txt", "3")).unwrap();

        let names: Vec<String> = db
            .list_text_files(&bot.id)
            .unwrap()
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(names, ["first.txt", "second.txt", "third.txt"]);
    }

    #[test]
    fn admin_listing_is_newest_first() {
        let db = db();
        let user = db.create_user("gwen", "h", "s").unwrap();
        let b1 = db.create_chatbot(&user.id, "One", "", "", &[], None).unwrap();
        let b2 = db.create_chatbot(&user.id, "Two", "", "", &[], None).unwrap();

        let all = db.list_all_chatbots().unwrap();
        let ids: Vec<&str> = all.iter().map(|b| b.id.as_str()).collect();
        let pos1 = ids.iter().position(|id| *id == b1.id).unwrap();
        let pos2 = ids.iter().position(|id| *id == b2.id).unwrap();
        assert!(pos2 < pos1);
    }

    #[test]
    fn user_listing_is_scoped_to_owner() {
        let db = db();
        let a = db.create_user("heidi", "h", "s").unwrap();
        let b = db.create_user("ivan", "h", "s").unwrap();
        db.create_chatbot(&a.id, "A-bot", "", "", &[], None).unwrap();
        db.create_chatbot(&b.id, "B-bot", "", "", &[], None).unwrap();

        let mine = db.list_chatbots_for_user(&a.id).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name.as_deref(), Some("A-bot"));
        assert_eq!(db.count_chatbots_for_user(&a.id).unwrap(), 1);
    }

    #[test]
    fn deleting_one_text_file_leaves_others() {
        let db = db();
        let user = db.create_user("judy", "h", "s").unwrap();
        let bot = db
            .create_chatbot(
                &user.id,
                "Bot",
                "",
                "",
                &[upload("keep.txt", "k"), upload("drop.txt", "d")],
                None,
            )
            .unwrap();

        let files = db.list_text_files(&bot.id).unwrap();
        let drop_id = &files.iter().find(|f| f.filename == "drop.txt").unwrap().id;
        assert!(db.delete_text_file(&bot.id, drop_id).unwrap());

        let left = db.list_text_files(&bot.id).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].filename, "keep.txt");

        // Wrong chatbot id does not delete
        assert!(!db.delete_text_file("nope", &left[0].id).unwrap());
    }
}
