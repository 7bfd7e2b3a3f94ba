//! Snapshot tests for core types

#[cfg(test)]
mod snapshot_tests {
    use crate::{AppConfig, Question, ResponseRecord, Route};
    use insta::assert_yaml_snapshot;
    use std::collections::HashMap;

    #[test]
    fn test_rag_settings_snapshot() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CHUNK_SIZE", "800"),
            ("CHUNK_OVERLAP", "100"),
            ("RAG_TOP_K", "6"),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_yaml_snapshot!(config.rag, @r###"
        chunk_size: 800
        chunk_overlap: 100
        top_k: 6
        "###);
    }

    #[test]
    fn test_store_settings_snapshot_hides_api_key() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("QDRANT_API_KEY", "secret_value"),
            ("QDRANT_COLLECTION", "manuals"),
            ("QDRANT_AUTO_RECREATE", "true"),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.store.api_key, "secret_value");

        assert_yaml_snapshot!(config.store, @r###"
        backend: qdrant
        url: "http://localhost:6334"
        collection: manuals
        auto_recreate: true
        timeout_secs: 30
        "###);
    }

    #[test]
    fn test_route_serialization() {
        assert_yaml_snapshot!(vec![Route::Weather, Route::Rag], @r###"
        - weather
        - rag
        "###);
    }

    #[test]
    fn test_response_record_snapshot() {
        let record = ResponseRecord::rag(&Question::from("summarize section two"), "It covers setup".into(), Vec::new());

        assert_yaml_snapshot!(record, @r###"
        question: summarize section two
        route: rag
        answer: It covers setup
        sources: []
        "###);
    }
}
