//! Prompt assembly: persona, windowed history, new user turn. Pure and
//! deterministic; the wire adapter serializes `system` as the leading
//! system-role message.

use crate::models::Role;
use crate::providers::ChatMessage;
use crate::services::memory::ChatWindow;

/// Appended to every persona so the model leans on the supplied history
/// instead of disclaiming memory.
const MEMORY_INSTRUCTION: &str =
    "You have access to the conversation history and should use it to maintain context.";

#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

pub fn build(persona: &str, window: &ChatWindow, user_turn: &str) -> AssembledPrompt {
    let system = format!("{}\n\n{}", persona, MEMORY_INSTRUCTION);

    let mut messages = window.to_messages();
    messages.push(ChatMessage {
        role: Role::User,
        content: user_turn.to_string(),
    });

    AssembledPrompt { system, messages }
}
