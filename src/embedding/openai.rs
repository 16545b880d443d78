use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EmbeddingModel;

/// OpenAI embedding model via API.
pub struct OpenAIEmbeddingModel {
    model_name: String,
    api_key: String,
    endpoint: String,
    dimensions: u32,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAIEmbeddingModel {
    pub fn new(api_base: &str, model_name: &str, api_key: &str, dimensions: u32) -> Self {
        Self {
            model_name: model_name.to_string(),
            api_key: api_key.to_string(),
            endpoint: format!("{}/embeddings", api_base.trim_end_matches('/')),
            dimensions,
            http_client: reqwest::Client::new(),
        }
    }

    /// Only the text-embedding-3 family accepts a requested output width.
    fn requested_dimensions(&self) -> Option<u32> {
        self.model_name
            .starts_with("text-embedding-3")
            .then_some(self.dimensions)
    }
}

#[async_trait]
impl EmbeddingModel for OpenAIEmbeddingModel {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model_name,
            input: [text],
            dimensions: self.requested_dimensions(),
        };

        let resp = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI embedding API error ({status}): {body}");
        }

        let response: EmbeddingResponse = resp.json().await?;
        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("No embedding returned for input"))?;

        if embedding.len() != self.dimensions as usize {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                embedding.len()
            );
        }

        debug!("Embedded {} chars with {}", text.len(), self.model_name);
        Ok(embedding)
    }

    fn dimensions(&self) -> u32 {
        self.dimensions
    }
}
