//! The embedding collaborator: any model that maps text to a fixed-length vector.

use async_trait::async_trait;

use crate::{CorpusError, Result};

/// Maps texts to vectors of a fixed dimensionality.
///
/// Implementations must return exactly one vector per input text, in input
/// order, each with `dimension()` elements.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Output dimensionality for the configured model.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Short human-readable model name, used in logs.
    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Run synchronous model work on the blocking thread pool.
///
/// The calling task stays free to be polled, so a `tokio::time::timeout`
/// around it fires on schedule. A timed-out call is abandoned, not aborted.
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CorpusError::Embedding(format!("inference task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn dimension(&self) -> usize { 1 }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let embedder: Box<dyn Embedder> = Box::new(LengthEmbedder);
        let out = embedder.embed(&["abc".to_string(), "de".to_string()]).await.unwrap();
        assert_eq!(out, vec![vec![3.0], vec![2.0]]);
        assert_eq!(embedder.model_name(), "unknown");
    }

    #[tokio::test]
    async fn test_run_blocking_lets_timeout_fire() {
        let start = std::time::Instant::now();
        let slow = run_blocking(|| {
            std::thread::sleep(std::time::Duration::from_millis(500));
            Ok(1)
        });
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(50), slow).await;
        assert!(outcome.is_err());
        assert!(start.elapsed() < std::time::Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_run_blocking_propagates_errors() {
        let err = run_blocking::<(), _>(|| Err(CorpusError::Embedding("bad".into()))).await.unwrap_err();
        assert!(matches!(err, CorpusError::Embedding(_)));
    }
}
