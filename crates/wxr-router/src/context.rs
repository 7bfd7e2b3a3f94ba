//! Process-wide application context
//!
//! Built once from a resolved [`AppConfig`] and shared by reference with
//! every pipeline. Holds the only long-lived state: the cached embedding
//! choice and the vector index.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use wxr_core::{AppConfig, IngestStage, Result, StoreBackend, TextGenerator, VectorStore, WeatherProvider};
use wxr_providers::{build_text_generator, EmbeddingSelector, ResolvedEmbedder};
use wxr_rag::{
    CollectionStatus, FileLoader, IndexManager, IngestReport, IngestionPipeline, LocalVectorStore,
    QdrantVectorStore, TextSplitter,
};
use wxr_weather::OpenWeatherClient;

pub struct AppContext {
    config: AppConfig,
    embeddings: EmbeddingSelector,
    index: Arc<IndexManager>,
    generator: Option<Arc<dyn TextGenerator>>,
    weather: Option<Arc<dyn WeatherProvider>>,
}

impl AppContext {
    /// Build every backend the configuration names
    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.rag.validate()?;

        let store: Arc<dyn VectorStore> = match config.store.backend {
            StoreBackend::Qdrant => Arc::new(QdrantVectorStore::new(&config.store)?),
            StoreBackend::Memory => Arc::new(LocalVectorStore::new()),
        };

        let generator = build_text_generator(&config.llm)?;

        let weather: Option<Arc<dyn WeatherProvider>> = if config.weather.api_key.is_empty() {
            warn!(target: "weather", "OPENWEATHER_API_KEY not set; weather questions will get a degraded answer");
            None
        } else {
            Some(Arc::new(OpenWeatherClient::new(&config.weather)?))
        };

        info!(
            target: "router",
            store = store.endpoint(),
            collection = %config.store.collection,
            "application context ready"
        );

        let embeddings = EmbeddingSelector::new(config.embeddings.clone());
        Ok(Self::new(config, embeddings, store, generator, weather))
    }

    /// Assemble a context from already-built parts
    pub fn new(
        config: AppConfig,
        embeddings: EmbeddingSelector,
        store: Arc<dyn VectorStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        weather: Option<Arc<dyn WeatherProvider>>,
    ) -> Self {
        let index = Arc::new(IndexManager::new(store, &config.store));
        Self {
            config,
            embeddings,
            index,
            generator,
            weather,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<IndexManager> {
        &self.index
    }

    pub fn generator(&self) -> Option<Arc<dyn TextGenerator>> {
        self.generator.clone()
    }

    pub fn weather(&self) -> Option<Arc<dyn WeatherProvider>> {
        self.weather.clone()
    }

    /// Active embedder, selected on first call and cached afterwards
    pub async fn embedder(&self) -> Result<Arc<ResolvedEmbedder>> {
        self.embeddings.resolve().await
    }

    /// Drop the cached embedding choice
    pub async fn reset_embeddings(&self) {
        self.embeddings.reset().await;
        info!(target: "embeddings", "embedding backend choice reset");
    }

    pub async fn ingest(&self, path: &Path, collection: Option<&str>) -> Result<IngestReport> {
        let embedder = self.embedder().await.map_err(|e| e.at_stage(IngestStage::Embed))?;
        let splitter = TextSplitter::from_settings(&self.config.rag).map_err(|e| e.at_stage(IngestStage::Split))?;
        IngestionPipeline::new(self.index.clone(), splitter)
            .ingest(&FileLoader::new(), path, embedder.as_ref(), collection)
            .await
    }

    pub async fn status(&self, collection: Option<&str>) -> Result<CollectionStatus> {
        let collection = self.index.collection_name(collection);
        self.index.describe(collection).await
    }
}
