use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Largest `top_k` the core will send to the retrieval backend.
pub const MAX_TOP_K: u32 = 50;

/// Document path used when the backend omits one.
pub const UNKNOWN_DOCUMENT_PATH: &str = "unknown";

/// Snapshot of one collection as reported by the retrieval backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    pub document_count: u64,
    pub chunk_count: u64,
}

/// One retrievable excerpt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    #[serde(default)]
    pub text: String,
}

/// A chunk with its relevance score and originating document.
///
/// Higher scores are more relevant. The core never re-sorts sources; whatever order the
/// retrieval backend returns is the order callers observe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub document_path: String,
    pub score: f64,
    pub chunk: Chunk,
}

impl Source {
    pub fn new(document_path: impl Into<String>, score: f64, text: impl Into<String>) -> Self {
        Self {
            document_path: document_path.into(),
            score,
            chunk: Chunk { text: text.into() },
        }
    }
}

/// A validated question against one collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    pub collection_id: String,
    pub question: String,
    pub top_k: u32,
    pub return_sources: bool,
}

impl Query {
    /// Build a query that asks for sources. Rejects blank fields and `top_k` outside
    /// `1..=MAX_TOP_K`.
    pub fn new(
        collection_id: impl Into<String>,
        question: impl Into<String>,
        top_k: u32,
    ) -> Result<Self, AppError> {
        let q = Self {
            collection_id: collection_id.into(),
            question: question.into(),
            top_k,
            return_sources: true,
        };
        crate::validate::validate_query(&q)?;
        Ok(q)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Backend performs retrieval and generation in one call.
    Managed,
    /// Local retrieve, assemble, generate.
    Composed,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Managed => "managed",
            Strategy::Composed => "composed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerWithSources {
    pub answer: String,
    pub sources: Vec<Source>,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chronological, append-only conversation.
///
/// Messages can only be added at the end; there is no way to edit, remove or reorder an
/// earlier entry through this type.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConversationHistory {
    messages: Vec<ConversationMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a system message.
    pub fn with_system(prompt: impl Into<String>) -> Self {
        let mut h = Self::new();
        h.append(ConversationMessage::system(prompt));
        h
    }

    pub fn append(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        self.append(ConversationMessage::user(content));
    }

    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.append(ConversationMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_only_grows_at_the_end() {
        let mut h = ConversationHistory::with_system("be brief");
        h.append_user("What is 15% of 80?");
        let before = h.messages().to_vec();

        h.append_assistant("12");
        h.append_user("Now calculate 20% of 150");

        assert_eq!(h.len(), 4);
        assert_eq!(&h.messages()[..2], before.as_slice());
        assert_eq!(h.messages().last().map(|m| m.role), Some(Role::User));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let v = serde_json::to_value(ConversationMessage::assistant("hi")).unwrap();
        assert_eq!(v["role"], "assistant");
        assert_eq!(serde_json::to_value(Strategy::Composed).unwrap(), "composed");
    }
}
