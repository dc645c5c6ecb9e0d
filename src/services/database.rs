use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;
use uuid::Uuid;

use crate::models::{Chat, Message, PromptTemplate, Role};

/// Durable store for chats, messages and prompt templates. Operations return
/// `Result` at this layer; fail-soft defaults are applied by the session
/// boundary so faults stay inspectable in tests.
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub async fn new() -> Result<Self> {
        let path = Self::db_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA synchronous=OFF;",
        )?;

        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Create an in-memory database (used for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn db_path() -> Result<PathBuf> {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").expect("HOME not set");
                PathBuf::from(home).join(".local/share")
            });
        Ok(data_dir.join("solace").join("solace.db"))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );",
        )?;

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE chats (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    last_message TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chat_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
                );

                CREATE TABLE prompts (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    content TEXT NOT NULL,
                    description TEXT,
                    is_default INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX idx_chats_last_message ON chats(last_message DESC);
                CREATE INDEX idx_messages_chat ON messages(chat_id);

                INSERT INTO schema_version (version) VALUES (1);",
            )?;
        }

        Ok(())
    }

    // --- Chat CRUD ---

    pub async fn create_chat(&self, title: &str) -> Result<String> {
        let conn = self.conn.clone();
        let title = title.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let id = Uuid::new_v4().to_string();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO chats (id, title, last_message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3, ?3)",
                params![id, title, now],
            )?;
            Ok(id)
        })
        .await?
    }

    /// Persist one transcript entry. Creates a chat when `chat_id` is absent,
    /// and mints a replacement chat when the referenced one no longer exists
    /// (message durability over strict referential integrity). Callers must
    /// continue with the returned id.
    pub async fn save_message(
        &self,
        chat_id: Option<&str>,
        role: Role,
        content: &str,
    ) -> Result<String> {
        let conn = self.conn.clone();
        let chat_id = chat_id.map(|s| s.to_string());
        let content = content.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let now = Utc::now().to_rfc3339();

            let effective_id = match chat_id {
                Some(id) => {
                    let exists: bool = conn
                        .query_row(
                            "SELECT COUNT(*) FROM chats WHERE id = ?1",
                            params![id],
                            |row| row.get::<_, i64>(0),
                        )
                        .map(|n| n > 0)?;
                    if exists {
                        id
                    } else {
                        tracing::warn!("Chat {} not found, creating new chat", id);
                        Self::insert_chat_for(&conn, &content, &now)?
                    }
                }
                None => Self::insert_chat_for(&conn, &content, &now)?,
            };

            conn.execute(
                "UPDATE chats SET last_message = ?1, updated_at = ?1 WHERE id = ?2",
                params![now, effective_id],
            )?;

            conn.execute(
                "INSERT INTO messages (chat_id, role, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![effective_id, role.as_str(), content, now],
            )?;

            Ok(effective_id)
        })
        .await?
    }

    fn insert_chat_for(conn: &Connection, content: &str, now: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO chats (id, title, last_message, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3, ?3)",
            params![id, title_from_content(content), now],
        )?;
        Ok(id)
    }

    /// Full transcript for a chat, in sequence order.
    pub async fn get_history(&self, chat_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn.clone();
        let chat_id = chat_id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, role, content, created_at, updated_at
                 FROM messages WHERE chat_id = ?1 ORDER BY id ASC",
            )?;
            let messages = stmt
                .query_map(params![chat_id], |row| Ok(Self::row_to_message(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await?
    }

    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, title, last_message, created_at, updated_at
                 FROM chats ORDER BY last_message DESC",
            )?;
            let chats = stmt
                .query_map([], |row| Ok(Self::row_to_chat(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(chats)
        })
        .await?
    }

    /// Delete a chat and, via cascade, its messages. Returns false when the
    /// chat does not exist.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<bool> {
        let conn = self.conn.clone();
        let chat_id = chat_id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let deleted = conn.execute("DELETE FROM chats WHERE id = ?1", params![chat_id])?;
            Ok(deleted > 0)
        })
        .await?
    }

    // --- Prompt template CRUD ---

    /// Insert a named template. Names are unique; saving a duplicate violates
    /// the constraint and surfaces as an error.
    pub async fn save_prompt(
        &self,
        name: &str,
        content: &str,
        description: Option<&str>,
        is_default: bool,
    ) -> Result<()> {
        let conn = self.conn.clone();
        let name = name.to_string();
        let content = content.to_string();
        let description = description.map(|s| s.to_string());
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO prompts (id, name, content, description, is_default, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    name,
                    content,
                    description,
                    is_default as i32,
                    now,
                ],
            )
            .with_context(|| format!("Failed to save prompt {}", name))?;
            Ok(())
        })
        .await?
    }

    pub async fn get_prompt(&self, name: &str) -> Result<Option<PromptTemplate>> {
        let conn = self.conn.clone();
        let name = name.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, name, content, description, is_default, created_at, updated_at
                 FROM prompts WHERE name = ?1",
            )?;
            let result = stmt
                .query_row(params![name], |row| Ok(Self::row_to_prompt(row)))
                .optional()?;
            match result {
                Some(Ok(prompt)) => Ok(Some(prompt)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        })
        .await?
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptTemplate>> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, name, content, description, is_default, created_at, updated_at
                 FROM prompts ORDER BY name",
            )?;
            let prompts = stmt
                .query_map([], |row| Ok(Self::row_to_prompt(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(prompts)
        })
        .await?
    }

    pub async fn delete_prompt(&self, name: &str) -> Result<bool> {
        let conn = self.conn.clone();
        let name = name.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let deleted = conn.execute("DELETE FROM prompts WHERE name = ?1", params![name])?;
            Ok(deleted > 0)
        })
        .await?
    }

    // --- Row helpers ---

    fn row_to_chat(row: &rusqlite::Row) -> Result<Chat> {
        let last_str: String = row.get(2)?;
        let created_str: String = row.get(3)?;
        let updated_str: String = row.get(4)?;

        Ok(Chat {
            id: row.get(0)?,
            title: row.get(1)?,
            last_message: DateTime::parse_from_rfc3339(&last_str)?.with_timezone(&Utc),
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_str)?.with_timezone(&Utc),
        })
    }

    fn row_to_message(row: &rusqlite::Row) -> Result<Message> {
        let role_str: String = row.get(2)?;
        let created_str: String = row.get(4)?;
        let updated_str: String = row.get(5)?;

        Ok(Message {
            id: row.get(0)?,
            chat_id: row.get(1)?,
            role: Role::from_str(&role_str)
                .ok_or_else(|| anyhow::anyhow!("Unknown role: {}", role_str))?,
            content: row.get(3)?,
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_str)?.with_timezone(&Utc),
        })
    }

    fn row_to_prompt(row: &rusqlite::Row) -> Result<PromptTemplate> {
        let is_default_int: i32 = row.get(4)?;
        let created_str: String = row.get(5)?;
        let updated_str: String = row.get(6)?;

        Ok(PromptTemplate {
            id: row.get(0)?,
            name: row.get(1)?,
            content: row.get(2)?,
            description: row.get(3)?,
            is_default: is_default_int != 0,
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_str)?.with_timezone(&Utc),
        })
    }
}

/// Derive a chat title from message content: first line, truncated to at
/// most 50 characters with an ellipsis.
fn title_from_content(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or(content);
    if first_line.len() > 50 {
        let boundary = first_line
            .char_indices()
            .take_while(|(i, _)| *i < 47)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(47);
        format!("{}...", &first_line[..boundary])
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn schema_initialization() {
        let db = Database::new_in_memory().unwrap();
        assert!(db.list_chats().await.unwrap().is_empty());
        assert!(db.list_prompts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_message_without_chat_creates_one() {
        let db = Database::new_in_memory().unwrap();

        let chat_id = db.save_message(None, Role::User, "hi").await.unwrap();

        let chats = db.list_chats().await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, chat_id);
        assert_eq!(chats[0].title, "hi");

        let history = db.get_history(&chat_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "hi");
    }

    #[tokio::test]
    async fn save_message_recovers_from_missing_chat() {
        let db = Database::new_in_memory().unwrap();

        let chat_id = db
            .save_message(Some("gone-missing"), Role::User, "still here")
            .await
            .unwrap();

        assert_ne!(chat_id, "gone-missing");
        let history = db.get_history(&chat_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "still here");
        // Nothing was filed under the dead id
        assert!(db.get_history("gone-missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_preserves_save_order() {
        let db = Database::new_in_memory().unwrap();
        let chat_id = db.save_message(None, Role::User, "one").await.unwrap();
        db.save_message(Some(&chat_id), Role::Assistant, "two")
            .await
            .unwrap();
        db.save_message(Some(&chat_id), Role::User, "three")
            .await
            .unwrap();

        let history = db.get_history(&chat_id).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert!(history[0].id < history[1].id && history[1].id < history[2].id);
    }

    #[tokio::test]
    async fn consecutive_same_role_entries_are_tolerated() {
        let db = Database::new_in_memory().unwrap();
        let chat_id = db.save_message(None, Role::User, "first").await.unwrap();
        db.save_message(Some(&chat_id), Role::User, "second try")
            .await
            .unwrap();

        let history = db.get_history(&chat_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::User);
    }

    #[tokio::test]
    async fn chats_are_listed_by_recency() {
        let db = Database::new_in_memory().unwrap();
        let first = db.save_message(None, Role::User, "older chat").await.unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let second = db.save_message(None, Role::User, "newer chat").await.unwrap();

        let chats = db.list_chats().await.unwrap();
        assert_eq!(chats[0].id, second);
        assert_eq!(chats[1].id, first);

        // Appending to the older chat moves it back to the front
        std::thread::sleep(Duration::from_millis(5));
        db.save_message(Some(&first), Role::Assistant, "reply")
            .await
            .unwrap();
        let chats = db.list_chats().await.unwrap();
        assert_eq!(chats[0].id, first);
        assert!(chats[0].last_message >= chats[1].last_message);
    }

    #[tokio::test]
    async fn delete_chat_cascades_to_messages() {
        let db = Database::new_in_memory().unwrap();
        let chat_id = db.save_message(None, Role::User, "hello").await.unwrap();
        db.save_message(Some(&chat_id), Role::Assistant, "hi there")
            .await
            .unwrap();

        assert!(db.delete_chat(&chat_id).await.unwrap());
        assert!(db.get_history(&chat_id).await.unwrap().is_empty());
        assert!(db.list_chats().await.unwrap().is_empty());

        // Deleting again reports absence rather than erroring
        assert!(!db.delete_chat(&chat_id).await.unwrap());
    }

    #[tokio::test]
    async fn prompt_crud_round_trip() {
        let db = Database::new_in_memory().unwrap();

        db.save_prompt("default", "You are helpful.", Some("Default system prompt"), true)
            .await
            .unwrap();

        let prompt = db.get_prompt("default").await.unwrap().unwrap();
        assert_eq!(prompt.content, "You are helpful.");
        assert!(prompt.is_default);
        assert_eq!(prompt.description.as_deref(), Some("Default system prompt"));

        assert!(db.get_prompt("missing").await.unwrap().is_none());

        db.save_prompt("other", "Other.", None, false).await.unwrap();
        assert_eq!(db.list_prompts().await.unwrap().len(), 2);

        assert!(db.delete_prompt("other").await.unwrap());
        assert!(!db.delete_prompt("other").await.unwrap());
        assert_eq!(db.list_prompts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_prompt_name_is_rejected() {
        let db = Database::new_in_memory().unwrap();
        db.save_prompt("default", "first", None, true).await.unwrap();
        assert!(db.save_prompt("default", "second", None, false).await.is_err());

        // The original row is untouched
        let prompt = db.get_prompt("default").await.unwrap().unwrap();
        assert_eq!(prompt.content, "first");
    }

    #[test]
    fn titles_are_truncated_to_fifty_chars() {
        let long = "a".repeat(80);
        let title = title_from_content(&long);
        assert_eq!(title.len(), 50);
        assert!(title.ends_with("..."));

        assert_eq!(title_from_content("short"), "short");
        assert_eq!(title_from_content("line one\nline two"), "line one");
    }
}
