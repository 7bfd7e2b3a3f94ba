//! Vector store implementations

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfig;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointId, PointStruct,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::{json, Value};

use wxr_core::{
    DistanceMetric, DocumentChunk, Error, Metadata, Result, ScoredChunk, StoreSettings,
    VectorPoint, VectorStore, EMBEDDING_MODEL_KEY,
};

/// Payload key holding the chunk text
pub const CONTENT_KEY: &str = "page_content";
/// Payload key holding the chunk metadata map
pub const METADATA_KEY: &str = "metadata";

struct StoredPoint {
    id: String,
    vector: Vec<f32>,
    chunk: DocumentChunk,
}

struct LocalCollection {
    dimension: u64,
    metric: DistanceMetric,
    points: Vec<StoredPoint>,
}

/// In-memory vector store
///
/// Follows the same contract as Qdrant: collections must exist before
/// writes, and vectors must match the collection dimension.
pub struct LocalVectorStore {
    collections: RwLock<HashMap<String, LocalCollection>>,
    mutations: AtomicUsize,
}

impl LocalVectorStore {
    /// Create a new local vector store
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            mutations: AtomicUsize::new(0),
        }
    }

    /// Number of create/delete/upsert calls that changed state
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }

    /// Simple cosine similarity calculation
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
        match metric {
            DistanceMetric::Cosine => Self::cosine_similarity(a, b),
            DistanceMetric::Dot => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
            // Higher is better everywhere, so report the negated distance
            DistanceMetric::Euclid => -a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }
}

impl Default for LocalVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> Error {
    Error::VectorStore(format!("Lock error: {}", e))
}

fn missing_collection(collection: &str) -> Error {
    Error::VectorStore(format!("Collection '{}' not found", collection))
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let collections = self.collections.read().map_err(lock_error)?;
        Ok(collections.contains_key(collection))
    }

    async fn collection_dimension(&self, collection: &str) -> Result<Option<u64>> {
        let collections = self.collections.read().map_err(lock_error)?;
        Ok(collections.get(collection).map(|c| c.dimension))
    }

    async fn collection_model(&self, collection: &str) -> Result<Option<String>> {
        let collections = self.collections.read().map_err(lock_error)?;
        Ok(collections.get(collection).and_then(|c| {
            c.points
                .iter()
                .find_map(|p| p.chunk.metadata.get(EMBEDDING_MODEL_KEY)?.as_str().map(str::to_string))
        }))
    }

    async fn create_collection(&self, collection: &str, dimension: u64, metric: DistanceMetric) -> Result<()> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        if collections.contains_key(collection) {
            return Err(Error::VectorStore(format!("Collection '{}' already exists", collection)));
        }
        collections.insert(
            collection.to_string(),
            LocalCollection {
                dimension,
                metric,
                points: Vec::new(),
            },
        );
        self.record_mutation();
        Ok(())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        if collections.remove(collection).is_some() {
            self.record_mutation();
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<Vec<String>> {
        let mut collections = self.collections.write().map_err(lock_error)?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() as u64 != target.dimension) {
            return Err(Error::VectorStore(format!(
                "Wrong input: vector dimension error: expected dim: {}, got {}",
                target.dimension,
                bad.vector.len()
            )));
        }

        let mut ids = Vec::with_capacity(points.len());
        for point in points {
            ids.push(point.id.clone());
            let stored = StoredPoint {
                id: point.id,
                vector: point.vector,
                chunk: point.chunk,
            };
            match target.points.iter_mut().find(|p| p.id == stored.id) {
                Some(existing) => *existing = stored,
                None => target.points.push(stored),
            }
        }
        self.record_mutation();
        Ok(ids)
    }

    async fn query_similar(&self, collection: &str, vector: Vec<f32>, k: usize) -> Result<Vec<ScoredChunk>> {
        let collections = self.collections.read().map_err(lock_error)?;
        let target = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;

        if vector.len() as u64 != target.dimension {
            return Err(Error::VectorStore(format!(
                "Wrong input: vector dimension error: expected dim: {}, got {}",
                target.dimension,
                vector.len()
            )));
        }

        let mut results: Vec<ScoredChunk> = target
            .points
            .iter()
            .map(|point| ScoredChunk {
                id: point.id.clone(),
                text: point.chunk.text.clone(),
                metadata: point.chunk.metadata.clone(),
                score: Self::score(target.metric, &vector, &point.vector),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let collections = self.collections.read().map_err(lock_error)?;
        collections
            .get(collection)
            .map(|c| c.points.len() as u64)
            .ok_or_else(|| missing_collection(collection))
    }

    fn endpoint(&self) -> &str {
        "memory"
    }
}

/// Qdrant vector store over gRPC
pub struct QdrantVectorStore {
    client: Qdrant,
    url: String,
}

impl QdrantVectorStore {
    pub fn new(settings: &StoreSettings) -> Result<Self> {
        let mut config = Qdrant::from_url(&settings.url).timeout(Duration::from_secs(settings.timeout_secs));
        if !settings.api_key.is_empty() {
            config = config.api_key(settings.api_key.clone());
        }
        let client = config
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build Qdrant client for {}: {}", settings.url, e)))?;

        Ok(Self {
            client,
            url: settings.url.clone(),
        })
    }
}

fn store_error(e: qdrant_client::QdrantError) -> Error {
    Error::VectorStore(e.to_string())
}

fn to_qdrant_distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Dot => Distance::Dot,
        DistanceMetric::Euclid => Distance::Euclid,
    }
}

fn to_json(value: QdrantValue) -> Value {
    match value.kind {
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => json!(i),
        Some(Kind::DoubleValue(d)) => json!(d),
        Some(Kind::ListValue(list)) => Value::Array(list.values.into_iter().map(to_json).collect()),
        Some(Kind::StructValue(s)) => Value::Object(s.fields.into_iter().map(|(k, v)| (k, to_json(v))).collect()),
        Some(Kind::NullValue(_)) | None => Value::Null,
    }
}

fn point_id_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => "unknown".to_string(),
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn health_check(&self) -> Result<()> {
        self.client
            .health_check()
            .await
            .map(|_| ())
            .map_err(|e| Error::StoreUnreachable {
                endpoint: self.url.clone(),
                reason: e.to_string(),
            })
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        self.client.collection_exists(collection).await.map_err(store_error)
    }

    async fn collection_dimension(&self, collection: &str) -> Result<Option<u64>> {
        if !self.collection_exists(collection).await? {
            return Ok(None);
        }

        let info = self.client.collection_info(collection).await.map_err(store_error)?;
        let vectors = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config);

        match vectors {
            Some(VectorsConfig::Params(params)) => Ok(Some(params.size)),
            // Named vectors: report the first one, which is all this crate writes
            Some(VectorsConfig::ParamsMap(map)) => Ok(map.map.values().next().map(|p| p.size)),
            None => Err(Error::VectorStore(format!(
                "Collection '{}' has no vector configuration",
                collection
            ))),
        }
    }

    async fn collection_model(&self, collection: &str) -> Result<Option<String>> {
        let key = format!("{}.{}", METADATA_KEY, EMBEDDING_MODEL_KEY);
        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(collection)
                    .filter(Filter::must_not([Condition::is_empty(key)]))
                    .limit(1)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(store_error)?;

        Ok(response
            .result
            .into_iter()
            .next()
            .and_then(|mut point| point.payload.remove(METADATA_KEY))
            .and_then(|metadata| match to_json(metadata) {
                Value::Object(mut map) => map.remove(EMBEDDING_MODEL_KEY),
                _ => None,
            })
            .and_then(|model| model.as_str().map(str::to_string)))
    }

    async fn create_collection(&self, collection: &str, dimension: u64, metric: DistanceMetric) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(dimension, to_qdrant_distance(metric))),
            )
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.client
            .delete_collection(collection)
            .await
            .map(|_| ())
            .map_err(store_error)
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(points.len());
        let mut structs = Vec::with_capacity(points.len());

        for point in points {
            let payload = Payload::try_from(json!({
                CONTENT_KEY: point.chunk.text,
                METADATA_KEY: Value::Object(point.chunk.metadata),
            }))
            .map_err(store_error)?;
            ids.push(point.id.clone());
            structs.push(PointStruct::new(point.id, point.vector, payload));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, structs).wait(true))
            .await
            .map_err(store_error)?;

        Ok(ids)
    }

    async fn query_similar(&self, collection: &str, vector: Vec<f32>, k: usize) -> Result<Vec<ScoredChunk>> {
        let response = self
            .client
            .search_points(SearchPointsBuilder::new(collection, vector, k as u64).with_payload(true))
            .await
            .map_err(store_error)?;

        let chunks = response
            .result
            .into_iter()
            .map(|point| {
                let mut payload = point.payload;
                let text = payload
                    .remove(CONTENT_KEY)
                    .map(to_json)
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                let metadata = match payload.remove(METADATA_KEY).map(to_json) {
                    Some(Value::Object(map)) => map,
                    _ => Metadata::new(),
                };
                ScoredChunk {
                    id: point_id_string(point.id),
                    text,
                    metadata,
                    score: point.score,
                }
            })
            .collect();

        Ok(chunks)
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(collection).exact(true))
            .await
            .map_err(store_error)?;
        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
