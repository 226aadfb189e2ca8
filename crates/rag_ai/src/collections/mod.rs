use rag_core::domain::Collection;
use rag_core::error::AppError;
use serde::Deserialize;

use crate::backend::{BackendCall, BackendClient};

pub const COLLECTIONS_PATH: &str = "/v1/rag/collections";

pub trait CollectionLister {
    /// Collections in whatever order the backend reports them.
    fn list(&self) -> Result<Vec<Collection>, AppError>;
}

/// The collection used when a caller names none: simply the first one listed.
pub fn default_collection(collections: &[Collection]) -> Option<&Collection> {
    collections.first()
}

#[derive(Debug, Clone)]
pub struct HttpCollectionDirectory {
    client: BackendClient,
}

impl HttpCollectionDirectory {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct WireCollection {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    document_count: Option<u64>,
    #[serde(default)]
    chunk_count: Option<u64>,
}

impl CollectionLister for HttpCollectionDirectory {
    fn list(&self) -> Result<Vec<Collection>, AppError> {
        let call = BackendCall::Collections;
        let url = self.client.endpoint(COLLECTIONS_PATH);
        tracing::debug!(%url, "list collections");

        let resp = ureq::get(&url).timeout(self.client.timeout()).call();
        let body = call.read_body(&url, resp)?;
        parse_collections(&body)
    }
}

fn parse_collections(body: &str) -> Result<Vec<Collection>, AppError> {
    let call = BackendCall::Collections;
    let wire: Vec<WireCollection> = call.decode(body)?;
    let mut out = Vec::with_capacity(wire.len());
    for (idx, c) in wire.into_iter().enumerate() {
        // A collection without a name cannot be queried.
        let name = match c.name {
            Some(n) if !n.trim().is_empty() => n,
            _ => {
                return Err(call
                    .invalid("Collection entry is missing a name")
                    .with_details(format!("index={idx}")))
            }
        };
        out.push(Collection {
            name,
            document_count: c.document_count.unwrap_or(0),
            chunk_count: c.chunk_count.unwrap_or(0),
        });
    }
    Ok(out)
}
