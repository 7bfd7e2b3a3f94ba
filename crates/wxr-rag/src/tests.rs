//! Snapshot and scenario tests for index reconciliation and the pipelines

#[cfg(test)]
mod snapshot_tests {
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use insta::assert_yaml_snapshot;
    use wxr_core::{Embedder, TextGenerator};
    use wxr_providers::LocalEmbedder;

    use crate::{
        CollectionState, DocumentSource, Error, FileLoader, IndexManager, IngestStage, IngestionPipeline,
        LocalVectorStore, Metadata, Page, RagPipeline, Reconciliation, Result, StoreSettings, TextSplitter,
        VectorStore,
    };

    fn manager(store: Arc<LocalVectorStore>, auto_recreate: bool) -> Arc<IndexManager> {
        let settings = StoreSettings {
            collection: "pdf_documents".to_string(),
            auto_recreate,
            ..Default::default()
        };
        Arc::new(IndexManager::new(store, &settings))
    }

    fn texts(items: &[&str]) -> Vec<(String, Metadata)> {
        items.iter().map(|t| (t.to_string(), Metadata::new())).collect()
    }

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, _system: &str, context: &str, _question: &str) -> Result<String> {
            Ok(format!("Based on the context: {}", context.lines().next().unwrap_or("")))
        }

        fn model_id(&self) -> &str {
            "echo"
        }
    }

    /// Hash embeddings reported under another model's name
    struct Renamed(&'static str, LocalEmbedder);

    #[async_trait]
    impl Embedder for Renamed {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.1.embed(text).await
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DocumentSource for FailingSource {
        async fn load_pages(&self, _path: &Path) -> Result<Vec<Page>> {
            Err(Error::InvalidInput("corrupt file".to_string()))
        }
    }

    #[tokio::test]
    async fn test_reconciliation_is_idempotent() {
        let store = Arc::new(LocalVectorStore::new());
        let index = manager(store.clone(), false);
        let embedder = LocalEmbedder::new(8).unwrap();

        let first = index.ensure_collection("pdf_documents", &embedder).await.unwrap();
        let mutations = store.mutation_count();
        let second = index.ensure_collection("pdf_documents", &embedder).await.unwrap();

        assert_eq!(store.mutation_count(), mutations);
        assert_yaml_snapshot!(vec![first, second], @r###"
        - action: created
          dimension: 8
        - action: unchanged
          dimension: 8
        "###);
    }

    #[tokio::test]
    async fn test_mismatch_without_recreate_leaves_collection_untouched() {
        let store = Arc::new(LocalVectorStore::new());
        let index = manager(store.clone(), false);
        let small = LocalEmbedder::new(8).unwrap();
        let large = LocalEmbedder::new(16).unwrap();

        index
            .add_texts("pdf_documents", &small, texts(&["inverter manual", "battery wiring"]))
            .await
            .unwrap();
        let before = store.query_similar("pdf_documents", vec![1.0; 8], 10).await.unwrap();
        let mutations = store.mutation_count();

        let err = index.ensure_collection("pdf_documents", &large).await.unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch { existing: 8, expected: 16, .. }
        ));
        assert_eq!(
            index.state("pdf_documents", 16, None).await.unwrap(),
            CollectionState::Incompatible { existing: 8, expected: 16 }
        );

        let after = store.query_similar("pdf_documents", vec![1.0; 8], 10).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(store.mutation_count(), mutations);
    }

    #[tokio::test]
    async fn test_mismatch_with_recreate_empties_collection() {
        let store = Arc::new(LocalVectorStore::new());
        let index = manager(store.clone(), true);
        let small = LocalEmbedder::new(8).unwrap();
        let large = LocalEmbedder::new(16).unwrap();

        index
            .add_texts("pdf_documents", &small, texts(&["inverter manual"]))
            .await
            .unwrap();

        let outcome = index.ensure_collection("pdf_documents", &large).await.unwrap();
        assert_eq!(outcome, Reconciliation::Recreated { previous: 8, dimension: 16 });
        assert_eq!(store.collection_dimension("pdf_documents").await.unwrap(), Some(16));
        assert_eq!(store.count("pdf_documents").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_model_switch_at_same_dimension_is_incompatible() {
        let store = Arc::new(LocalVectorStore::new());
        let index = manager(store.clone(), false);
        let remote = Renamed("BAAI/bge-small-en-v1.5", LocalEmbedder::new(384).unwrap());
        let fallback = LocalEmbedder::new(384).unwrap();

        index
            .add_texts("pdf_documents", &remote, texts(&["inverter manual"]))
            .await
            .unwrap();
        assert_eq!(
            index.ensure_collection("pdf_documents", &remote).await.unwrap(),
            Reconciliation::Unchanged { dimension: 384 }
        );

        let err = index.ensure_collection("pdf_documents", &fallback).await.unwrap_err();
        assert!(matches!(
            err,
            Error::EmbeddingModelMismatch { ref existing, ref expected, .. }
                if existing == "BAAI/bge-small-en-v1.5" && expected == "local-hash"
        ));
        assert_eq!(store.count("pdf_documents").await.unwrap(), 1);

        let recreating = manager(store.clone(), true);
        let outcome = recreating.ensure_collection("pdf_documents", &fallback).await.unwrap();
        assert_eq!(outcome, Reconciliation::Recreated { previous: 384, dimension: 384 });
        assert_eq!(store.count("pdf_documents").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_path_reconciles_first() {
        let store = Arc::new(LocalVectorStore::new());
        let index = manager(store.clone(), false);
        let embedder = LocalEmbedder::new(8).unwrap();

        let hits = index.query("fresh", &embedder, "anything", 4).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(store.collection_dimension("fresh").await.unwrap(), Some(8));
    }

    #[tokio::test]
    async fn test_ingest_then_query() {
        let store = Arc::new(LocalVectorStore::new());
        let index = manager(store.clone(), false);
        let embedder = LocalEmbedder::new(384).unwrap();

        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        write!(
            file,
            "# Introduction\n\nThe solar array charges a 10 kWh battery bank.\n\n\
             # Maintenance\n\nClean the panels every spring."
        )
        .unwrap();
        let source = file.path().display().to_string();

        let pipeline = IngestionPipeline::new(index.clone(), TextSplitter::new(60, 10).unwrap());
        let report = pipeline
            .ingest(&FileLoader::new(), file.path(), &embedder, Some("manuals"))
            .await
            .unwrap();

        assert_eq!(report.collection, "manuals");
        assert_eq!(report.chunk_count, report.chunk_ids.len());
        assert!(report.chunk_count >= 2);
        assert_eq!(report.reconciliation, Reconciliation::Created { dimension: 384 });
        assert_eq!(store.count("manuals").await.unwrap(), report.chunk_count as u64);

        let rag = RagPipeline::new(index.clone(), Some(Arc::new(EchoGenerator)), 4);
        let answer = rag
            .answer(&embedder, "How big is the battery bank?", Some("manuals"))
            .await;

        assert!(answer.answer.starts_with("Based on the context:"));
        assert!(!answer.sources.is_empty());
        assert!(answer.sources.iter().all(|s| s["source"] == source.as_str()));
    }

    #[tokio::test]
    async fn test_ingest_failures_name_their_stage() {
        let store = Arc::new(LocalVectorStore::new());
        let pipeline = IngestionPipeline::new(manager(store.clone(), false), TextSplitter::new(100, 10).unwrap());
        let embedder = LocalEmbedder::new(8).unwrap();

        let err = pipeline
            .ingest(&FailingSource, Path::new("broken.pdf"), &embedder, None)
            .await
            .unwrap_err();
        assert_eq!(err.ingest_stage(), Some(IngestStage::Load));

        let empty = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let err = pipeline
            .ingest(&FileLoader::new(), empty.path(), &embedder, None)
            .await
            .unwrap_err();
        assert_eq!(err.ingest_stage(), Some(IngestStage::Split));

        // Existing collection at another dimension
        store.create_collection("pdf_documents", 4, Default::default()).await.unwrap();
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "some content").unwrap();
        let err = pipeline
            .ingest(&FileLoader::new(), file.path(), &embedder, None)
            .await
            .unwrap_err();
        assert_eq!(err.ingest_stage(), Some(IngestStage::Reconcile));
        assert_eq!(store.count("pdf_documents").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rag_degrades_without_documents_or_generator() {
        let index = manager(Arc::new(LocalVectorStore::new()), false);
        let embedder = LocalEmbedder::new(8).unwrap();
        let rag = RagPipeline::new(index, None, 4);

        let answer = rag
            .answer(&embedder, "Summarize the introduction of the uploaded PDF.", None)
            .await;

        assert!(answer.answer.starts_with("RAG unavailable. Details:"));
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_collection_status_snapshot() {
        let store = Arc::new(LocalVectorStore::new());
        let index = manager(store, false);
        let embedder = LocalEmbedder::new(8).unwrap();
        index
            .add_texts("pdf_documents", &embedder, texts(&["one", "two"]))
            .await
            .unwrap();

        let status = index.describe("pdf_documents").await.unwrap();
        assert_yaml_snapshot!(status, @r###"
        collection: pdf_documents
        endpoint: memory
        exists: true
        dimension: 8
        points: 2
        auto_recreate: false
        "###);
    }
}
