pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided context.
If the answer is not in the context, say so clearly.
Always cite which source(s) you used to answer the question.";

pub fn rag_user_prompt(question: &str, context: &str) -> String {
    // Context first so the question is the last thing the model reads.
    format!(
        r#"Context:
{context}

Question: {question}

Please provide a detailed answer based on the context above."#
    )
}
