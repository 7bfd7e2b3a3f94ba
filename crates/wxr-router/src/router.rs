//! Question router

use std::sync::Arc;

use tracing::{info, warn};

use wxr_core::{Embedder, Question, ResponseRecord, Route};
use wxr_rag::{RagAnswer, RagPipeline};
use wxr_weather::{LocationExtractor, WeatherPipeline, WeatherSummarizer};

use crate::classifier::KeywordClassifier;
use crate::context::AppContext;

/// Classifies questions and hands each one to exactly one pipeline.
///
/// Built once per process and shared; it holds no per-request state.
pub struct Router {
    context: Arc<AppContext>,
    classifier: KeywordClassifier,
    rag: RagPipeline,
    weather: WeatherPipeline,
}

impl Router {
    pub fn new(context: Arc<AppContext>) -> Self {
        let config = context.config();
        let rag = RagPipeline::new(context.index().clone(), context.generator(), config.rag.top_k);
        let weather = WeatherPipeline::new(
            context.weather(),
            LocationExtractor::new(config.weather.default_location.clone()),
            WeatherSummarizer::new(context.generator(), config.weather.units),
            config.weather.units,
            context.index().clone(),
        );

        Self {
            classifier: KeywordClassifier::new(),
            rag,
            weather,
            context,
        }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    pub fn classify(&self, question: &Question) -> Route {
        self.classifier.classify(question.as_str())
    }

    /// Route `question` and return the pipeline's record unchanged
    pub async fn dispatch(&self, question: impl Into<Question>) -> ResponseRecord {
        let question = question.into();
        let route = self.classify(&question);
        info!(target: "router", %route, "question routed");

        match route {
            Route::Weather => self.answer_weather(&question).await,
            Route::Rag => self.answer_rag(&question, None).await,
        }
    }

    /// Answer from a specific collection, skipping classification
    pub async fn ask_documents(&self, question: impl Into<Question>, collection: Option<&str>) -> ResponseRecord {
        let question = question.into();
        self.answer_rag(&question, collection).await
    }

    async fn answer_weather(&self, question: &Question) -> ResponseRecord {
        let embedder = match self.context.embedder().await {
            Ok(embedder) => Some(embedder),
            Err(e) => {
                warn!(target: "weather", error = %e, "no embedder for storing weather summaries");
                None
            }
        };

        let answer = self
            .weather
            .answer(question.as_str(), embedder.as_deref().map(|e| e as &dyn Embedder))
            .await;
        ResponseRecord::weather(question, answer)
    }

    async fn answer_rag(&self, question: &Question, collection: Option<&str>) -> ResponseRecord {
        let result = match self.context.embedder().await {
            Ok(embedder) => self.rag.answer(embedder.as_ref(), question.as_str(), collection).await,
            Err(e) => {
                warn!(target: "rag", error = %e, "embedding backend unavailable");
                RagAnswer::unavailable(&e)
            }
        };
        ResponseRecord::rag(question, result.answer, result.sources)
    }
}
