use rag_core::domain::ConversationHistory;
use rag_core::error::AppError;

/// Chat-style text generation. Implementations send exactly the history they are given and
/// never modify it; growing a conversation is the caller's job.
pub trait Llm {
    fn generate(&self, history: &ConversationHistory, temperature: f32) -> Result<String, AppError>;
}

pub mod openai_chat;

pub use openai_chat::OpenAiChatLlm;
