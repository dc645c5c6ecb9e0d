pub mod chat;
pub mod message;
pub mod prompt;

pub use chat::Chat;
pub use message::{Message, Role};
pub use prompt::PromptTemplate;
