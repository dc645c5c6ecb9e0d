mod config;
mod models;
mod providers;
mod services;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use providers::GroqProvider;
use services::sentiment;
use services::{Database, Session, SessionController};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let api_key = config::api_key().context("GROQ_API_KEY is not set")?;

    let db = Database::new().await?;
    let controller = SessionController::new(db, Arc::new(GroqProvider::new()), api_key);
    controller.seed_templates().await?;

    let mut session = Session::new();

    println!("Mental health chat assistant. How are you feeling today?");
    println!("Commands: /new /chats /history /delete <id> /mood /models /model <key> /personality <key> /prompts /quit");

    let stdin = std::io::stdin();
    loop {
        print!("\nyou> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        if handle_command(&controller, &mut session, text).await? {
            continue;
        }
        if text == "/quit" || text == "/exit" {
            break;
        }

        if session.chat_id.is_none() {
            session.chat_id = Some(controller.create_chat("New Conversation").await);
        }

        print!("assistant> ");
        std::io::stdout().flush()?;
        let outcome = controller
            .process_turn(&mut session, text, |fragment| {
                print!("{}", fragment);
                let _ = std::io::stdout().flush();
            })
            .await;
        println!();

        println!(
            "[mood: {} ({:.0}%)]",
            outcome.sentiment.mood.as_str(),
            outcome.sentiment.confidence * 100.0
        );

        if let Some(resources) = outcome.resources {
            println!("\nIt sounds like things are heavy right now. These may help:");
            for resource in resources {
                match resource.contact {
                    Some(contact) => println!(
                        "  - {}: {} ({}) {}",
                        resource.title, resource.description, contact, resource.url
                    ),
                    None => println!(
                        "  - {}: {} {}",
                        resource.title, resource.description, resource.url
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Handle a slash command. Returns true when the input was consumed.
async fn handle_command(
    controller: &SessionController,
    session: &mut Session,
    text: &str,
) -> Result<bool> {
    match text {
        "/new" => {
            session.reset();
            println!("Started a new conversation.");
        }
        "/chats" => {
            for chat in controller.list_chats().await {
                println!("{}  {}", chat.id, chat.title);
            }
        }
        "/history" => match session.chat_id.as_deref() {
            Some(chat_id) => {
                for message in controller.history(chat_id).await {
                    println!("{}: {}", message.role.as_str(), message.content);
                }
            }
            None => println!("No active conversation."),
        },
        "/mood" => {
            let summary = session.mood_summary();
            println!(
                "positive {} / neutral {} / negative {}",
                summary.positive, summary.neutral, summary.negative
            );
            println!(
                "average polarity {:.2}, subjectivity {:.2}",
                summary.average_polarity, summary.average_subjectivity
            );
            if let Some(last) = session.sentiment_log().last() {
                println!("{}", sentiment::supportive_preamble(last));
            }
        }
        "/models" => {
            for model in config::models() {
                println!(
                    "{}  {} ({:?}, context {}, api: {})",
                    model.key, model.description, model.size, model.context_length, model.api
                );
            }
        }
        "/prompts" => {
            for prompt in controller.list_prompts().await {
                let marker = if prompt.is_default { " (default)" } else { "" };
                println!(
                    "{}{}  {}",
                    prompt.name,
                    marker,
                    prompt.description.as_deref().unwrap_or("")
                );
            }
        }
        _ => {
            if let Some(chat_id) = text.strip_prefix("/delete ") {
                let chat_id = chat_id.trim();
                if controller.delete_chat(chat_id).await {
                    if session.chat_id.as_deref() == Some(chat_id) {
                        session.reset();
                    }
                    println!("Deleted {}", chat_id);
                } else {
                    println!("No such chat: {}", chat_id);
                }
            } else if let Some(key) = text.strip_prefix("/model ") {
                session.model = key.trim().to_string();
                let spec = config::current_model(&session.model);
                println!("Using {}: {}", spec.key, spec.description);
            } else if let Some(key) = text.strip_prefix("/personality ") {
                session.personality = key.trim().to_string();
                let spec = config::current_personality(&session.personality);
                println!("Using {}: {}", spec.name, spec.description);
            } else {
                return Ok(false);
            }
        }
    }
    Ok(true)
}
