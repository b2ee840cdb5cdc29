//! OpenAI embeddings API provider.
//!
//! Implements [`EmbeddingProvider`] with a blocking HTTP client against
//! `{base_url}/embeddings`. Every request carries the configured timeout; a
//! timeout surfaces as an ordinary error so callers degrade to "no embedding".

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

/// Remote embedding provider speaking the OpenAI `/embeddings` protocol.
pub struct OpenAiEmbeddingProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .context("no API key configured for the openai embedding provider (set OPENAI_API_KEY)")?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build HTTP client")?;

        tracing::info!(
            model = %config.model,
            base_url = %config.base_url,
            timeout_secs = config.request_timeout_secs,
            "openai embedding provider ready"
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .context("embedding response contained no vectors")
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        anyhow::ensure!(
            texts.iter().all(|t| !t.trim().is_empty()),
            "refusing to embed empty text"
        );

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            encoding_format: "float",
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("embedding request timed out: {e}")
                } else {
                    anyhow::anyhow!("embedding request failed: {e}")
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            anyhow::bail!("embedding API returned HTTP {status}: {}", truncate(&body, 200));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .context("failed to parse embedding response")?;

        let vectors = order_by_index(parsed.data, texts.len())?;
        for v in &vectors {
            anyhow::ensure!(
                v.len() == self.dimensions,
                "embedding API returned {} dimensions, expected {}",
                v.len(),
                self.dimensions
            );
        }

        tracing::debug!(count = vectors.len(), model = %self.model, "embedded batch");
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Put response items back into request order; the API tags each with its input index.
fn order_by_index(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    anyhow::ensure!(
        data.len() == expected,
        "embedding response count mismatch: expected {expected}, got {}",
        data.len()
    );
    data.sort_by_key(|d| d.index);
    for (i, d) in data.iter().enumerate() {
        anyhow::ensure!(d.index == i, "embedding response missing index {i}");
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
