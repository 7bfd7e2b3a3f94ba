//! Vector Index Manager
//!
//! Owns named collections in a vector store and keeps each collection's
//! configured dimension in line with the active embedder. A collection is
//! in one of four states relative to an embedder of dimension `D`:
//!
//! - absent: created with `D` and cosine distance
//! - compatible (existing == `D`, same or unrecorded model): nothing to do
//! - incompatible (existing != `D`): dropped and recreated when auto-recreate
//!   is enabled, otherwise [`Error::DimensionMismatch`]
//! - model changed (existing == `D`, points written by another model):
//!   dropped and recreated when auto-recreate is enabled, otherwise
//!   [`Error::EmbeddingModelMismatch`]
//!
//! Every point written through the manager records its embedding model in
//! metadata under [`EMBEDDING_MODEL_KEY`].
//!
//! Reconciliation for a given collection name runs under a per-name lock.
//! The compatibility check runs first, before the lock is taken, so a
//! compatible collection never waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use wxr_core::{
    DistanceMetric, DocumentChunk, Embedder, Error, Metadata, Result, ScoredChunk, StoreSettings,
    VectorPoint, VectorStore, EMBEDDING_MODEL_KEY,
};

/// What a collection looks like for a given embedder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CollectionState {
    Absent,
    Compatible { dimension: u64 },
    Incompatible { existing: u64, expected: u64 },
    ModelChanged { dimension: u64, existing: String, expected: String },
}

/// Outcome of a successful reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Reconciliation {
    Created { dimension: u64 },
    Unchanged { dimension: u64 },
    /// Prior contents were deleted
    Recreated { previous: u64, dimension: u64 },
}

impl Reconciliation {
    pub fn dimension(&self) -> u64 {
        match self {
            Reconciliation::Created { dimension }
            | Reconciliation::Unchanged { dimension }
            | Reconciliation::Recreated { dimension, .. } => *dimension,
        }
    }
}

/// Snapshot of a collection for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStatus {
    pub collection: String,
    pub endpoint: String,
    pub exists: bool,
    pub dimension: Option<u64>,
    pub points: Option<u64>,
    pub auto_recreate: bool,
}

pub struct IndexManager {
    store: Arc<dyn VectorStore>,
    default_collection: String,
    auto_recreate: bool,
    metric: DistanceMetric,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IndexManager {
    pub fn new(store: Arc<dyn VectorStore>, settings: &StoreSettings) -> Self {
        Self {
            store,
            default_collection: settings.collection.clone(),
            auto_recreate: settings.auto_recreate,
            metric: DistanceMetric::Cosine,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn auto_recreate(&self) -> bool {
        self.auto_recreate
    }

    /// The requested collection, or the configured default when none or blank
    pub fn collection_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested.map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.default_collection,
        }
    }

    fn collection_lock(&self, collection: &str) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(locks.entry(collection.to_string()).or_default().clone())
    }

    /// Classify `collection` against an embedding dimension and, when given,
    /// the name of the model producing the vectors
    pub async fn state(&self, collection: &str, dimension: u64, model: Option<&str>) -> Result<CollectionState> {
        let existing = match self.store.collection_dimension(collection).await? {
            None => return Ok(CollectionState::Absent),
            Some(existing) => existing,
        };
        if existing != dimension {
            return Ok(CollectionState::Incompatible {
                existing,
                expected: dimension,
            });
        }

        let Some(model) = model else {
            return Ok(CollectionState::Compatible { dimension });
        };
        Ok(match self.store.collection_model(collection).await? {
            Some(recorded) if recorded != model => CollectionState::ModelChanged {
                dimension,
                existing: recorded,
                expected: model.to_string(),
            },
            _ => CollectionState::Compatible { dimension },
        })
    }

    async fn ensure_reachable(&self) -> Result<()> {
        self.store.health_check().await.map_err(|e| match e {
            Error::StoreUnreachable { .. } => e,
            other => Error::StoreUnreachable {
                endpoint: self.store.endpoint().to_string(),
                reason: other.to_string(),
            },
        })
    }

    /// Reconcile `collection` with the embedder's probed dimension and model
    pub async fn ensure_collection(&self, collection: &str, embedder: &dyn Embedder) -> Result<Reconciliation> {
        self.ensure_reachable().await?;
        let dimension = embedder.probe_dimension().await? as u64;
        self.reconcile(collection, dimension, Some(embedder.name())).await
    }

    /// Reconcile `collection` with a known dimension, ignoring model identity
    pub async fn ensure_dimension(&self, collection: &str, dimension: u64) -> Result<Reconciliation> {
        self.ensure_reachable().await?;
        self.reconcile(collection, dimension, None).await
    }

    async fn reconcile(&self, collection: &str, dimension: u64, model: Option<&str>) -> Result<Reconciliation> {
        if dimension == 0 {
            return Err(Error::InvalidInput("embedding dimension must be greater than zero".to_string()));
        }

        if let CollectionState::Compatible { .. } = self.state(collection, dimension, model).await? {
            debug!(target: "index", collection, dimension, "collection compatible");
            return Ok(Reconciliation::Unchanged { dimension });
        }

        let lock = self.collection_lock(collection)?;
        let _guard = lock.lock().await;

        // Re-read under the lock; another task may have won the race
        match self.state(collection, dimension, model).await? {
            CollectionState::Compatible { .. } => Ok(Reconciliation::Unchanged { dimension }),
            CollectionState::Absent => self.create(collection, dimension).await,
            CollectionState::Incompatible { existing, expected } => {
                if !self.auto_recreate {
                    return Err(Error::DimensionMismatch {
                        collection: collection.to_string(),
                        existing,
                        expected,
                    });
                }

                warn!(
                    target: "index",
                    collection,
                    existing,
                    expected,
                    "dimension mismatch, dropping collection and its contents"
                );
                self.recreate(collection, existing, expected).await
            }
            CollectionState::ModelChanged {
                dimension,
                existing,
                expected,
            } => {
                if !self.auto_recreate {
                    return Err(Error::EmbeddingModelMismatch {
                        collection: collection.to_string(),
                        existing,
                        expected,
                    });
                }

                warn!(
                    target: "index",
                    collection,
                    existing = %existing,
                    expected = %expected,
                    "embedding model changed, dropping collection and its contents"
                );
                self.recreate(collection, dimension, dimension).await
            }
        }
    }

    async fn recreate(&self, collection: &str, previous: u64, dimension: u64) -> Result<Reconciliation> {
        self.store.delete_collection(collection).await?;
        self.create(collection, dimension).await?;
        Ok(Reconciliation::Recreated { previous, dimension })
    }

    async fn create(&self, collection: &str, dimension: u64) -> Result<Reconciliation> {
        match self.store.create_collection(collection, dimension, self.metric).await {
            Ok(()) => {
                info!(target: "index", collection, dimension, "collection created");
                Ok(Reconciliation::Created { dimension })
            }
            // Another process may have created it between our check and create
            Err(e) => match self.store.collection_dimension(collection).await {
                Ok(Some(existing)) if existing == dimension => Ok(Reconciliation::Unchanged { dimension }),
                Ok(Some(existing)) => Err(Error::DimensionMismatch {
                    collection: collection.to_string(),
                    existing,
                    expected: dimension,
                }),
                _ => Err(e),
            },
        }
    }

    /// Write pre-embedded chunks under fresh UUIDs, recording `model` on each
    pub async fn upsert(
        &self,
        collection: &str,
        model: &str,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Vec<String>> {
        if chunks.len() != vectors.len() {
            return Err(Error::InvalidInput(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let points = chunks
            .into_iter()
            .zip(vectors)
            .map(|(mut chunk, vector)| {
                chunk
                    .metadata
                    .insert(EMBEDDING_MODEL_KEY.to_string(), Value::String(model.to_string()));
                VectorPoint {
                    id: Uuid::new_v4().to_string(),
                    vector,
                    chunk,
                }
            })
            .collect();

        let ids = self.store.upsert(collection, points).await?;
        debug!(target: "index", collection, count = ids.len(), "points upserted");
        Ok(ids)
    }

    /// Reconcile, embed and write free-standing texts
    pub async fn add_texts(
        &self,
        collection: &str,
        embedder: &dyn Embedder,
        texts: Vec<(String, Metadata)>,
    ) -> Result<Vec<String>> {
        self.ensure_collection(collection, embedder).await?;
        let inputs: Vec<String> = texts.iter().map(|(text, _)| text.clone()).collect();
        let vectors = embedder.embed_batch(&inputs).await?;
        let chunks = texts
            .into_iter()
            .map(|(text, metadata)| DocumentChunk::new(text, metadata))
            .collect();
        self.upsert(collection, embedder.name(), chunks, vectors).await
    }

    /// Reconcile, then return the `k` chunks nearest to `question`
    pub async fn query(
        &self,
        collection: &str,
        embedder: &dyn Embedder,
        question: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        self.ensure_collection(collection, embedder).await?;
        let vector = embedder.embed(question).await?;
        self.store.query_similar(collection, vector, k).await
    }

    pub async fn describe(&self, collection: &str) -> Result<CollectionStatus> {
        self.ensure_reachable().await?;
        let dimension = self.store.collection_dimension(collection).await?;
        let points = match dimension {
            Some(_) => Some(self.store.count(collection).await?),
            None => None,
        };

        Ok(CollectionStatus {
            collection: collection.to_string(),
            endpoint: self.store.endpoint().to_string(),
            exists: dimension.is_some(),
            dimension,
            points,
            auto_recreate: self.auto_recreate,
        })
    }
}
