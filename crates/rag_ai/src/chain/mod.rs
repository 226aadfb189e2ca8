use rag_core::domain::{AnswerWithSources, ConversationHistory, Query, Strategy};
use rag_core::error::AppError;

use crate::context::assemble_within;
use crate::llm::Llm;
use crate::retrieve::Retriever;

mod prompts;

pub use prompts::{rag_user_prompt, DEFAULT_SYSTEM_PROMPT};

/// Answer text used when retrieval finds nothing to ground an answer in.
pub const NO_RELEVANT_MATERIAL: &str = "No relevant documents found.";

#[derive(Debug, Clone, PartialEq)]
pub struct ChainOptions {
    pub temperature: f32,
    pub max_context_chars: usize,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_context_chars: 24_000,
        }
    }
}

/// Stateless orchestrator over a retriever and an LLM. Holds no conversation between calls.
pub struct ChainRunner<'a> {
    retriever: &'a dyn Retriever,
    llm: &'a dyn Llm,
    options: ChainOptions,
}

impl<'a> ChainRunner<'a> {
    pub fn new(retriever: &'a dyn Retriever, llm: &'a dyn Llm, options: ChainOptions) -> Self {
        Self {
            retriever,
            llm,
            options,
        }
    }

    /// One call to the backend's combined retrieve-and-answer endpoint. The local LLM is
    /// not used.
    pub fn run_managed(
        &self,
        question: &str,
        collection_id: &str,
        top_k: u32,
    ) -> Result<AnswerWithSources, AppError> {
        let query = Query::new(collection_id, question, top_k)?;
        let managed = self.retriever.ask(&query)?;
        tracing::info!(
            strategy = Strategy::Managed.as_str(),
            sources = managed.sources.len(),
            "answer ready"
        );
        Ok(AnswerWithSources {
            answer: managed.answer,
            sources: managed.sources,
            strategy: Strategy::Managed,
        })
    }

    /// Retrieve, assemble context, then generate. Returns without calling the LLM when
    /// retrieval comes back empty.
    pub fn run_composed(
        &self,
        question: &str,
        collection_id: &str,
        system_prompt: &str,
        top_k: u32,
    ) -> Result<AnswerWithSources, AppError> {
        Query::new(collection_id, question, top_k)?;
        let sources = self.retriever.retrieve(collection_id, question, top_k)?;
        if sources.is_empty() {
            tracing::info!(strategy = Strategy::Composed.as_str(), "no sources; skipping generation");
            return Ok(AnswerWithSources {
                answer: NO_RELEVANT_MATERIAL.to_string(),
                sources: Vec::new(),
                strategy: Strategy::Composed,
            });
        }

        let context = assemble_within(&sources, top_k as usize, self.options.max_context_chars);
        let history = rag_history(system_prompt, question, &context);
        let answer = self.llm.generate(&history, self.options.temperature)?;

        tracing::info!(
            strategy = Strategy::Composed.as_str(),
            sources = sources.len(),
            context_chars = context.len(),
            "answer ready"
        );
        Ok(AnswerWithSources {
            answer,
            sources,
            strategy: Strategy::Composed,
        })
    }
}

/// The two-message conversation sent for a composed answer.
pub fn rag_history(system_prompt: &str, question: &str, context: &str) -> ConversationHistory {
    let mut history = ConversationHistory::with_system(system_prompt);
    history.append_user(rag_user_prompt(question, context));
    history
}
