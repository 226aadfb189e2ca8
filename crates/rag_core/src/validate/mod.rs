use crate::domain::{ConversationHistory, Query, MAX_TOP_K};
use crate::error::{codes, AppError};

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new(codes::QUERY_INVALID, message)
}

pub fn validate_top_k(top_k: u32) -> Result<(), AppError> {
    if top_k == 0 {
        return Err(invalid("top_k must be greater than zero"));
    }
    if top_k > MAX_TOP_K {
        return Err(invalid(format!("top_k must be at most {MAX_TOP_K}"))
            .with_details(format!("top_k={top_k}")));
    }
    Ok(())
}

pub fn validate_collection_id(collection_id: &str) -> Result<(), AppError> {
    if collection_id.trim().is_empty() {
        return Err(invalid("collection_id must not be empty"));
    }
    Ok(())
}

pub fn validate_question(question: &str) -> Result<(), AppError> {
    if question.trim().is_empty() {
        return Err(invalid("question must not be empty"));
    }
    Ok(())
}

/// Checks every precondition of a retrieval/answer request before it leaves the process.
pub fn validate_query(q: &Query) -> Result<(), AppError> {
    validate_collection_id(&q.collection_id)?;
    validate_question(&q.question)?;
    validate_top_k(q.top_k)
}

pub fn validate_history(history: &ConversationHistory) -> Result<(), AppError> {
    if history.is_empty() {
        return Err(invalid("conversation history must contain at least one message"));
    }
    Ok(())
}
