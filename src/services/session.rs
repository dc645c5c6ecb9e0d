//! Per-turn orchestration: classify, persist, assemble, stream, persist,
//! remember. Session state is an explicit context object passed by reference
//! so multiple isolated sessions can share one process.
//!
//! No fault here may abort a user-visible turn. Storage and classification
//! problems degrade to defaults; only a completion-service failure changes
//! what the user sees (the streamer's fallback reply).

use std::sync::Arc;

use uuid::Uuid;

use crate::config::{self, GenerationParams};
use crate::models::{Chat, Message, PromptTemplate, Role};
use crate::providers::{ChatRequest, CompletionProvider};
use crate::services::database::Database;
use crate::services::memory::ConversationMemory;
use crate::services::prompt;
use crate::services::sentiment::{self, Mood, MoodSummary, Resource, SentimentReading};
use crate::services::streamer::ResponseStreamer;

/// Mutable state scoped to one logical user session.
pub struct Session {
    pub chat_id: Option<String>,
    /// Model registry key (not the wire name).
    pub model: String,
    /// Personality registry key.
    pub personality: String,
    pub params: GenerationParams,
    /// Latched once a turn crosses the support threshold.
    pub show_resources: bool,
    memory: ConversationMemory,
    sentiment_log: Vec<SentimentReading>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            chat_id: None,
            model: config::DEFAULT_MODEL.to_string(),
            personality: config::DEFAULT_PERSONALITY.to_string(),
            params: GenerationParams::default(),
            show_resources: false,
            memory: ConversationMemory::new(),
            sentiment_log: Vec::new(),
        }
    }

    /// Start over: detach from the current chat and clear per-chat session
    /// state. Existing memory windows are left in place; a new chat gets a
    /// fresh window under its own id.
    pub fn reset(&mut self) {
        self.chat_id = None;
        self.sentiment_log.clear();
        self.show_resources = false;
    }

    pub fn sentiment_log(&self) -> &[SentimentReading] {
        &self.sentiment_log
    }

    pub fn mood_summary(&self) -> MoodSummary {
        sentiment::summarize(&self.sentiment_log)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the presentation boundary needs to render one completed turn.
pub struct TurnOutcome {
    pub chat_id: String,
    pub reply: String,
    pub sentiment: SentimentReading,
    /// Present when this turn's reading crossed the support threshold.
    pub resources: Option<&'static [Resource]>,
}

pub struct SessionController {
    db: Database,
    streamer: ResponseStreamer,
    api_key: String,
    base_url: Option<String>,
}

impl SessionController {
    pub fn new(db: Database, provider: Arc<dyn CompletionProvider>, api_key: String) -> Self {
        Self {
            db,
            streamer: ResponseStreamer::new(provider),
            api_key,
            base_url: config::base_url(),
        }
    }

    /// Insert the default template and the personality templates unless they
    /// already exist (stored rows override the static registry).
    pub async fn seed_templates(&self) -> anyhow::Result<()> {
        if self.db.get_prompt("default").await?.is_none() {
            self.db
                .save_prompt(
                    "default",
                    "You are a helpful AI assistant.",
                    Some("Default system prompt"),
                    true,
                )
                .await?;
        }

        for personality in config::personalities() {
            let name = format!("personality_{}", personality.key);
            if self.db.get_prompt(&name).await?.is_none() {
                self.db
                    .save_prompt(
                        &name,
                        personality.prompt,
                        Some(&format!("{} personality prompt", personality.name)),
                        personality.key == config::DEFAULT_PERSONALITY,
                    )
                    .await?;
            }
        }

        Ok(())
    }

    async fn resolve_personality(&self, key: &str) -> String {
        let spec = config::current_personality(key);
        let name = format!("personality_{}", spec.key);
        match self.db.get_prompt(&name).await {
            Ok(Some(template)) => template.content,
            Ok(None) => spec.prompt.to_string(),
            Err(e) => {
                tracing::error!("Failed to load personality template {}: {}", name, e);
                spec.prompt.to_string()
            }
        }
    }

    /// Start a new titled chat. On a storage fault a fresh id is still
    /// handed out; the save path recovers by minting the chat on first use.
    pub async fn create_chat(&self, title: &str) -> String {
        match self.db.create_chat(title).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to create chat: {}", e);
                Uuid::new_v4().to_string()
            }
        }
    }

    /// Run one user turn to completion. Fragments are handed to
    /// `on_fragment` in arrival order while the reply accumulates; the user
    /// turn is persisted before the completion call is issued so a mid-stream
    /// crash leaves it recoverable.
    pub async fn process_turn<F>(
        &self,
        session: &mut Session,
        text: &str,
        mut on_fragment: F,
    ) -> TurnOutcome
    where
        F: FnMut(&str),
    {
        let sentiment = sentiment::analyze(text);
        session.sentiment_log.push(sentiment);
        tracing::debug!(mood = sentiment.mood.as_str(), "classified user turn");

        let resources = if sentiment::needs_support(&sentiment) {
            session.show_resources = true;
            Some(sentiment::resources_for(Mood::Negative))
        } else {
            None
        };

        let chat_id = match self
            .db
            .save_message(session.chat_id.as_deref(), Role::User, text)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // Keep the conversation going on a best-effort id
                tracing::error!("Failed to persist user message: {}", e);
                session
                    .chat_id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string())
            }
        };
        session.chat_id = Some(chat_id.clone());

        // Assemble from the window as it stood before this turn, then let
        // the window catch up
        let persona = self.resolve_personality(&session.personality).await;
        let assembled = prompt::build(&persona, session.memory.window(Some(&chat_id)), text);
        session.memory.append_user(Some(&chat_id), text);

        let model = config::current_model(&session.model);
        let request = ChatRequest {
            api_key: self.api_key.clone(),
            model: model.name.to_string(),
            messages: assembled.messages,
            base_url: self.base_url.clone(),
            system_prompt: Some(assembled.system),
            temperature: Some(session.params.temperature),
            max_tokens: Some(session.params.max_tokens),
            top_p: session.params.top_p,
        };

        let mut rx = self.streamer.stream(request);
        let mut reply = String::new();
        while let Some(fragment) = rx.recv().await {
            on_fragment(&fragment);
            reply.push_str(&fragment);
        }

        let effective_id = match self
            .db
            .save_message(Some(&chat_id), Role::Assistant, &reply)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to persist assistant message: {}", e);
                chat_id
            }
        };
        session.chat_id = Some(effective_id.clone());
        session.memory.append_assistant(Some(&effective_id), &reply);
        tracing::debug!(chat_id = %effective_id, "turn complete");

        TurnOutcome {
            chat_id: effective_id,
            reply,
            sentiment,
            resources,
        }
    }

    // Fail-soft read surface for the presentation boundary: absence of data
    // is the error signal.

    pub async fn list_chats(&self) -> Vec<Chat> {
        match self.db.list_chats().await {
            Ok(chats) => chats,
            Err(e) => {
                tracing::error!("Failed to list chats: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn history(&self, chat_id: &str) -> Vec<Message> {
        match self.db.get_history(chat_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!("Failed to load history for {}: {}", chat_id, e);
                Vec::new()
            }
        }
    }

    pub async fn delete_chat(&self, chat_id: &str) -> bool {
        match self.db.delete_chat(chat_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!("Failed to delete chat {}: {}", chat_id, e);
                false
            }
        }
    }

    pub async fn list_prompts(&self) -> Vec<PromptTemplate> {
        match self.db.list_prompts().await {
            Ok(prompts) => prompts,
            Err(e) => {
                tracing::error!("Failed to list prompts: {}", e);
                Vec::new()
            }
        }
    }
}
