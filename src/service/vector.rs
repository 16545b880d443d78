use std::sync::Arc;
use tracing::{debug, info};

use crate::embedding::EmbeddingModel;
use crate::models::embedding::Embedding;
use crate::vector_store::EmbeddingRepository;

/// Stores embeddings and answers "find similar" queries, reusing stored
/// vectors for content that has been seen before.
pub struct VectorService {
    embedding_model: Arc<dyn EmbeddingModel>,
    repository: Arc<dyn EmbeddingRepository>,
}

impl VectorService {
    pub fn new(
        embedding_model: Arc<dyn EmbeddingModel>,
        repository: Arc<dyn EmbeddingRepository>,
    ) -> Self {
        Self {
            embedding_model,
            repository,
        }
    }

    /// Embed `content` and insert a new record, even if the same content is
    /// already stored.
    pub async fn store_embedding(&self, content: &str) -> anyhow::Result<Embedding> {
        let vector = self.embedding_model.embed(content).await?;

        let mut tx = self.repository.begin().await?;
        let stored = tx.insert(&Embedding::new(content, vector)).await?;
        tx.commit().await?;

        info!("Stored embedding {} ({} chars)", stored.id, content.len());
        Ok(stored)
    }

    /// Oldest stored record with exactly this content.
    pub async fn find_embedding(&self, content: &str) -> anyhow::Result<Option<Embedding>> {
        let mut tx = self.repository.begin().await?;
        let found = tx.find_by_content(content).await?;
        tx.commit().await?;
        Ok(found)
    }

    /// Contents of the `limit` records nearest to `query`, in store order.
    /// The query's own content is always among them.
    ///
    /// The query's vector is looked up by exact content and computed and
    /// stored only when absent, all within one transaction holding a
    /// per-content lock, so concurrent callers never duplicate it.
    pub async fn find_similar(&self, query: &str, limit: usize) -> anyhow::Result<Vec<String>> {
        if limit == 0 {
            return Ok(vec![]);
        }

        let mut tx = self.repository.begin().await?;
        tx.lock_content(query).await?;

        let own = match tx.find_by_content(query).await? {
            Some(existing) => {
                debug!("Reusing stored embedding {}", existing.id);
                existing
            }
            None => {
                let vector = self.embedding_model.embed(query).await?;
                let stored = tx.insert(&Embedding::new(query, vector)).await?;
                info!("Stored embedding {} for new query", stored.id);
                stored
            }
        };

        let mut matches = tx
            .find_most_similar(&own.embedding, limit, Some(query))
            .await?;
        tx.commit().await?;

        // Inner product does not rank a vector nearest to itself unless it
        // is normalized; the query's own record is always part of the result.
        if !matches.iter().any(|e| e.content == query) {
            matches.truncate(limit - 1);
            matches.insert(0, own);
        }

        debug!(
            "Found {} similar record(s) via {}",
            matches.len(),
            self.repository.provider_name()
        );
        Ok(matches.into_iter().map(|e| e.content).collect())
    }
}
