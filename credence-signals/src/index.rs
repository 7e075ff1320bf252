//! Reference vector index backends
//!
//! Exactly one backend serves a process. [`IndexBackend::select`] tries the
//! remote Qdrant collection once at startup and falls back to the local
//! in-memory index on any failure; the choice is never revisited.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use credence_core::VectorMatch;
use credence_net::{create_client, HttpConfig};

use crate::embedder::cosine_similarity;
use crate::{Embedder, SignalError, VectorIndex};

/// Which backend is serving queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Remote,
    Local,
}

/// A reference claim used to seed the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceClaim {
    pub id: String,
    pub text: String,
}

/// Read reference claims from a JSON array of `{id, text}`
pub fn load_reference_claims<P: AsRef<Path>>(path: P) -> Result<Vec<ReferenceClaim>, SignalError> {
    let content = std::fs::read_to_string(path.as_ref())
        .map_err(|e| SignalError::Index(format!("{}: {}", path.as_ref().display(), e)))?;
    serde_json::from_str(&content).map_err(|e| SignalError::Index(e.to_string()))
}

#[derive(Debug, Clone)]
struct LocalEntry {
    vector: Vec<f32>,
    text: String,
}

/// In-memory brute-force cosine index
#[derive(Debug, Default)]
pub struct LocalIndex {
    entries: DashMap<String, LocalEntry>,
}

impl LocalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, SignalError> {
        let mut matches: Vec<VectorMatch> = self
            .entries
            .iter()
            .map(|entry| VectorMatch {
                id: entry.key().clone(),
                score: cosine_similarity(vector, &entry.value().vector).clamp(0.0, 1.0),
                text: Some(entry.value().text.clone()),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn upsert(&self, id: &str, vector: Vec<f32>, text: &str) -> Result<(), SignalError> {
        self.entries.insert(
            id.to_string(),
            LocalEntry {
                vector,
                text: text.to_string(),
            },
        );
        Ok(())
    }
}

/// Remote Qdrant collection settings
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
}

/// Qdrant REST client scoped to one collection
#[derive(Debug, Clone)]
pub struct QdrantIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

impl QdrantIndex {
    pub fn new(config: &QdrantConfig, http: &HttpConfig) -> Result<Self, SignalError> {
        let base_url = config.url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SignalError::Index(format!("Qdrant URL must be http(s): {}", base_url)));
        }
        if config.collection.trim().is_empty() {
            return Err(SignalError::Index("missing Qdrant collection".to_string()));
        }
        Ok(Self {
            client: create_client(http)?,
            base_url: base_url.to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            collection: config.collection.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/collections/{}{}", self.base_url, self.collection, path);
        let mut request = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }
        request
    }

    /// Succeeds only if the collection exists and answers
    pub async fn health_check(&self) -> Result<(), SignalError> {
        let response = self
            .request(reqwest::Method::GET, "")
            .send()
            .await
            .map_err(|e| SignalError::Index(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SignalError::Index(format!(
                "collection {} returned status {}",
                self.collection,
                response.status()
            )));
        }
        Ok(())
    }
}

/// Qdrant accepts unsigned integer or UUID point ids
fn point_id(id: &str) -> u64 {
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, SignalError> {
        let body = serde_json::json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });

        let response = self
            .request(reqwest::Method::POST, "/points/search")
            .json(&body)
            .send()
            .await
            .map_err(|e| SignalError::Index(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SignalError::Index(format!(
                "search returned status {}",
                response.status()
            )));
        }

        let parsed: QdrantSearchResponse = response
            .json()
            .await
            .map_err(|e| SignalError::Index(e.to_string()))?;

        Ok(parsed.into_matches(top_k))
    }

    async fn upsert(&self, id: &str, vector: Vec<f32>, text: &str) -> Result<(), SignalError> {
        let body = serde_json::json!({
            "points": [{
                "id": point_id(id),
                "vector": vector,
                "payload": { "ref_id": id, "text": text },
            }]
        });

        let response = self
            .request(reqwest::Method::PUT, "/points?wait=true")
            .json(&body)
            .send()
            .await
            .map_err(|e| SignalError::Index(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SignalError::Index(format!(
                "upsert returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct QdrantSearchResponse {
    #[serde(default)]
    result: Vec<QdrantPoint>,
}

#[derive(Debug, Deserialize)]
struct QdrantPoint {
    id: serde_json::Value,
    score: f64,
    #[serde(default)]
    payload: Option<QdrantPayload>,
}

#[derive(Debug, Deserialize)]
struct QdrantPayload {
    #[serde(default)]
    ref_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl QdrantSearchResponse {
    fn into_matches(self, top_k: usize) -> Vec<VectorMatch> {
        self.result
            .into_iter()
            .take(top_k)
            .map(|point| {
                let (ref_id, text) = match point.payload {
                    Some(payload) => (payload.ref_id, payload.text),
                    None => (None, None),
                };
                VectorMatch {
                    id: ref_id.unwrap_or_else(|| match point.id {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    }),
                    score: point.score.clamp(0.0, 1.0),
                    text,
                }
            })
            .collect()
    }
}

/// The active index backend, fixed at startup
#[derive(Debug)]
pub enum IndexBackend {
    Remote(QdrantIndex),
    Local(LocalIndex),
}

impl IndexBackend {
    /// Try the remote collection once; any failure selects the local index
    pub async fn select(remote: Option<&QdrantConfig>, http: &HttpConfig) -> Self {
        let Some(config) = remote else {
            info!("No remote vector index configured, using local index");
            return IndexBackend::Local(LocalIndex::new());
        };

        let attempt = async {
            let index = QdrantIndex::new(config, http)?;
            index.health_check().await?;
            Ok::<_, SignalError>(index)
        };

        match tokio::time::timeout(http.timeout(), attempt).await {
            Ok(Ok(index)) => {
                info!("Using remote vector index {}/{}", config.url, config.collection);
                IndexBackend::Remote(index)
            }
            Ok(Err(e)) => {
                warn!("Remote vector index unavailable ({}), falling back to local", e);
                IndexBackend::Local(LocalIndex::new())
            }
            Err(_) => {
                warn!("Remote vector index timed out, falling back to local");
                IndexBackend::Local(LocalIndex::new())
            }
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            IndexBackend::Remote(_) => IndexKind::Remote,
            IndexBackend::Local(_) => IndexKind::Local,
        }
    }

    /// Embed and insert reference claims; returns how many were stored
    pub async fn seed(&self, embedder: &Arc<dyn Embedder>, claims: &[ReferenceClaim]) -> usize {
        let mut stored = 0;
        for claim in claims {
            let vector = match embedder.embed(&claim.text).await {
                Ok(v) => v,
                Err(e) => {
                    warn!("Skipping reference claim {}: {}", claim.id, e);
                    continue;
                }
            };
            match self.upsert(&claim.id, vector, &claim.text).await {
                Ok(()) => stored += 1,
                Err(e) => warn!("Failed to index reference claim {}: {}", claim.id, e),
            }
        }
        debug!("Seeded {} of {} reference claims", stored, claims.len());
        stored
    }
}

#[async_trait]
impl VectorIndex for IndexBackend {
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, SignalError> {
        match self {
            IndexBackend::Remote(index) => index.search(vector, top_k).await,
            IndexBackend::Local(index) => index.search(vector, top_k).await,
        }
    }

    async fn upsert(&self, id: &str, vector: Vec<f32>, text: &str) -> Result<(), SignalError> {
        match self {
            IndexBackend::Remote(index) => index.upsert(id, vector, text).await,
            IndexBackend::Local(index) => index.upsert(id, vector, text).await,
        }
    }
}
