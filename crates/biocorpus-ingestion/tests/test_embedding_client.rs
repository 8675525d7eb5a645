//! HTTP embedding backends against a local mock server.

use biocorpus_common::Embedder;
use biocorpus_ingestion::embedding::{EmbeddingBackend, EmbeddingClient, EmbeddingConfig};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(backend: EmbeddingBackend, base_url: String) -> EmbeddingConfig {
    EmbeddingConfig {
        backend,
        base_url: Some(base_url),
        model: "test-embed".into(),
        dim: 3,
        timeout_secs: 5,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_openai_compatible_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(serde_json::json!({"model": "test-embed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"index": 0, "embedding": [1.0, 0.0, 0.0]},
                {"index": 1, "embedding": [0.0, 1.0, 0.0]}
            ]
        })))
        .mount(&server)
        .await;

    let mut cfg = config(EmbeddingBackend::OpenAiCompatible, server.uri());
    cfg.api_key = Some("secret".into());
    let client = EmbeddingClient::new(cfg).await.unwrap();

    let out = client.embed(&["a".to_string(), "b".to_string()]).await.unwrap();
    assert_eq!(out, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    assert_eq!(client.dimension(), 3);
}

#[tokio::test]
async fn test_ollama_backend_one_request_per_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [3.0, 4.0, 0.0]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut cfg = config(EmbeddingBackend::Ollama, server.uri());
    cfg.normalize = true;
    let client = EmbeddingClient::new(cfg).await.unwrap();

    let out = client.embed(&["x".to_string(), "y".to_string()]).await.unwrap();
    assert_eq!(out.len(), 2);
    assert!((out[0][0] - 0.6).abs() < 1e-6);
    assert!((out[0][1] - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = EmbeddingClient::new(config(EmbeddingBackend::OpenAiCompatible, server.uri()))
        .await
        .unwrap();
    assert!(client.embed(&["a".to_string()]).await.is_err());
}

#[tokio::test]
async fn test_count_mismatch_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]
        })))
        .mount(&server)
        .await;

    let client = EmbeddingClient::new(config(EmbeddingBackend::OpenAiCompatible, server.uri()))
        .await
        .unwrap();
    assert!(client.embed(&["a".to_string(), "b".to_string()]).await.is_err());
}

#[tokio::test]
async fn test_openai_backend_requires_key() {
    let client = EmbeddingClient::new(config(EmbeddingBackend::OpenAi, "http://127.0.0.1:9".into()))
        .await
        .unwrap();
    assert!(client.embed(&["a".to_string()]).await.is_err());
}
