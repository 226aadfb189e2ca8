use rag_core::domain::{Chunk, Query, Source, UNKNOWN_DOCUMENT_PATH};
use rag_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::backend::{BackendCall, BackendClient};

pub const RAG_QUERY_PATH: &str = "/v1/rag/query";

/// Answer and sources returned together by the backend's combined endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

pub trait Retriever {
    /// Ranked excerpts for `question`, in the order the backend returned them.
    fn retrieve(&self, collection_id: &str, question: &str, top_k: u32) -> Result<Vec<Source>, AppError>;

    /// One round trip in which the backend retrieves and generates.
    fn ask(&self, query: &Query) -> Result<ManagedAnswer, AppError>;
}

#[derive(Debug, Clone)]
pub struct HttpRetriever {
    client: BackendClient,
}

impl HttpRetriever {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    fn post_query(&self, query: &Query) -> Result<QueryResponse, AppError> {
        let call = BackendCall::Retrieval;
        let url = self.client.endpoint(RAG_QUERY_PATH);
        let req = QueryRequest {
            collection_id: &query.collection_id,
            question: &query.question,
            top_k: query.top_k,
            return_sources: query.return_sources,
        };
        tracing::debug!(%url, collection = %query.collection_id, top_k = query.top_k, "rag query");

        let resp = ureq::post(&url)
            .timeout(self.client.timeout())
            .send_json(call.encode(&req)?);
        let body = call.read_body(&url, resp)?;
        parse_query_response(&body)
    }
}

impl Retriever for HttpRetriever {
    fn retrieve(&self, collection_id: &str, question: &str, top_k: u32) -> Result<Vec<Source>, AppError> {
        let query = Query::new(collection_id, question, top_k)?;
        let parsed = self.post_query(&query)?;
        tracing::debug!(hits = parsed.sources.len(), "rag query returned sources");
        Ok(parsed.sources)
    }

    fn ask(&self, query: &Query) -> Result<ManagedAnswer, AppError> {
        rag_core::validate::validate_query(query)?;
        let parsed = self.post_query(query)?;
        let answer = match parsed.answer {
            Some(a) if !a.trim().is_empty() => a,
            _ => {
                return Err(BackendCall::Retrieval.invalid("RAG query response had no answer"))
            }
        };
        Ok(ManagedAnswer {
            answer,
            sources: parsed.sources,
        })
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    collection_id: &'a str,
    question: &'a str,
    top_k: u32,
    return_sources: bool,
}

#[derive(Debug, Deserialize)]
struct WireQueryResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    sources: Option<Vec<WireSource>>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    #[serde(default)]
    document_path: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    chunk: Option<WireChunk>,
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryResponse {
    pub answer: Option<String>,
    pub sources: Vec<Source>,
}

/// Decode a RAG query body. Missing per-source fields fall back to an empty chunk text, a
/// score of 0.0 and the `unknown` document path; the source order is kept as sent.
pub(crate) fn parse_query_response(body: &str) -> Result<QueryResponse, AppError> {
    let wire: WireQueryResponse = BackendCall::Retrieval.decode(body)?;
    let mut defaulted = 0usize;
    let sources = wire
        .sources
        .unwrap_or_default()
        .into_iter()
        .map(|s| {
            if s.document_path.is_none() || s.score.is_none() || s.chunk.is_none() {
                defaulted += 1;
            }
            Source {
                document_path: s
                    .document_path
                    .unwrap_or_else(|| UNKNOWN_DOCUMENT_PATH.to_string()),
                score: s.score.unwrap_or(0.0),
                chunk: Chunk {
                    text: s.chunk.and_then(|c| c.text).unwrap_or_default(),
                },
            }
        })
        .collect::<Vec<_>>();
    if defaulted > 0 {
        tracing::warn!(defaulted, "rag query sources were missing fields; defaults applied");
    }
    Ok(QueryResponse {
        answer: wire.answer,
        sources,
    })
}
