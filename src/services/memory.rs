//! Per-chat conversational memory: a sliding window of the most recent
//! exchanges, held in process memory and independent of the durable
//! transcript. Storage keeps the full history; the window keeps only the
//! tail used for prompting and is never resynced after creation.

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::models::Role;
use crate::providers::ChatMessage;

/// Retained exchanges (user/assistant pairs) per chat.
pub const WINDOW_EXCHANGES: usize = 5;

/// Window key used when no chat id has been assigned yet.
const FALLBACK_CHAT_KEY: &str = "default";

#[derive(Debug, Default)]
pub struct ChatWindow {
    entries: VecDeque<(Role, String)>,
}

impl ChatWindow {
    fn append(&mut self, role: Role, content: String) {
        self.entries.push_back((role, content));
        // Evict the oldest pair once more than WINDOW_EXCHANGES exchanges
        // are retained
        while self.entries.len() > WINDOW_EXCHANGES * 2 {
            self.entries.pop_front();
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Window contents as the message list handed to prompt assembly.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .map(|(role, content)| ChatMessage {
                role: *role,
                content: content.clone(),
            })
            .collect()
    }
}

/// The chat-id → window map owned by a session. Windows are created lazily
/// on first reference and live for the session lifetime.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    windows: HashMap<String, ChatWindow>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&mut self, chat_id: Option<&str>) -> &mut ChatWindow {
        let key = chat_id.unwrap_or(FALLBACK_CHAT_KEY);
        self.windows.entry(key.to_string()).or_default()
    }

    pub fn append_user(&mut self, chat_id: Option<&str>, content: &str) {
        self.window(chat_id).append(Role::User, content.to_string());
    }

    pub fn append_assistant(&mut self, chat_id: Option<&str>, content: &str) {
        self.window(chat_id)
            .append(Role::Assistant, content.to_string());
    }
}
