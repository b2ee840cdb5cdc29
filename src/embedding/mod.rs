//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a remote implementation backed by
//! the OpenAI embeddings API. The provider is built once via [`create_provider`]
//! and handed to whatever needs it; nothing here holds global client state.

pub mod openai;

use std::sync::Arc;

use anyhow::Result;

/// Trait for embedding text into vectors.
///
/// Implementations reject empty or whitespace-only input with an error; callers
/// substitute a fallback phrase or leave the embedding absent instead. All
/// methods are blocking, so async callers should use `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched requests.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Model identifier, recorded alongside stored vectors.
    fn model(&self) -> &str;
}

/// Create an embedding provider from config.
///
/// Currently only `"openai"` is supported. Must not be called on an async
/// worker thread; see [`create_shared_provider`].
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => {
            let provider = openai::OpenAiEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: openai"),
    }
}

/// Build the provider on the blocking pool and wrap it for sharing.
pub async fn create_shared_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let config = config.clone();
    let provider = tokio::task::spawn_blocking(move || create_provider(&config)).await??;
    Ok(Arc::from(provider))
}

/// Embed `text`, treating every provider failure as "no embedding".
///
/// Empty text is never sent. Errors (network, auth, rate limit, timeout, or a
/// vector of the wrong size) are logged and swallowed; there are no retries.
pub fn embed_or_absent(provider: &dyn EmbeddingProvider, text: &str) -> Option<Vec<f32>> {
    if text.trim().is_empty() {
        return None;
    }

    match provider.embed(text) {
        Ok(vector) if vector.len() == provider.dimensions() => Some(vector),
        Ok(vector) => {
            tracing::warn!(
                model = provider.model(),
                expected = provider.dimensions(),
                actual = vector.len(),
                "embedding has unexpected dimensionality, treating as absent"
            );
            None
        }
        Err(e) => {
            tracing::warn!(
                model = provider.model(),
                error = %e,
                "embedding failed, treating as absent"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        dims: usize,
        fail: bool,
        calls: AtomicUsize,
    }

    impl EmbeddingProvider for ScriptedProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(!self.fail, "provider unavailable");
            Ok(vec![text.len() as f32; 3])
        }

        fn dimensions(&self) -> usize {
            self.dims
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn provider(dims: usize, fail: bool) -> ScriptedProvider {
        ScriptedProvider {
            dims,
            fail,
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn embeds_non_empty_text() {
        let p = provider(3, false);
        assert_eq!(embed_or_absent(&p, "jazz"), Some(vec![4.0; 3]));
    }

    #[test]
    fn empty_text_is_never_sent() {
        let p = provider(3, false);
        assert_eq!(embed_or_absent(&p, "  \n "), None);
        assert_eq!(p.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn provider_error_becomes_absent() {
        let p = provider(3, true);
        assert_eq!(embed_or_absent(&p, "jazz"), None);
        assert_eq!(p.calls.load(Ordering::SeqCst), 1, "no retries");
    }

    #[test]
    fn wrong_dimensionality_becomes_absent() {
        let p = provider(1536, false);
        assert_eq!(embed_or_absent(&p, "jazz"), None);
    }

    #[test]
    fn default_batch_embeds_each_text() {
        let p = provider(3, false);
        let out = p.embed_batch(&["a", "bbb"]).unwrap();
        assert_eq!(out, vec![vec![1.0; 3], vec![3.0; 3]]);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = crate::config::EmbeddingConfig {
            provider: "carrier-pigeon".into(),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("unknown embedding provider"));
    }
}
