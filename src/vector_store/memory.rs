use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::models::embedding::Embedding;
use crate::vector_store::{
    EmbeddingRepository, EmbeddingTransaction, RepositoryError, SimilarityMetric,
    check_dimensions,
};

/// Process-local repository with brute-force search.
///
/// A transaction holds the store lock for its whole lifetime, so transactions
/// are fully serialized. Writes are staged and only become visible on commit.
pub struct InMemoryEmbeddingRepository {
    records: Arc<Mutex<Vec<Embedding>>>,
    dimensions: usize,
    metric: SimilarityMetric,
}

impl InMemoryEmbeddingRepository {
    pub fn new(dimensions: usize, metric: SimilarityMetric) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            dimensions,
            metric,
        }
    }

    /// Committed records in insertion order.
    pub async fn snapshot(&self) -> Vec<Embedding> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl EmbeddingRepository for InMemoryEmbeddingRepository {
    async fn initialize(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn EmbeddingTransaction>, RepositoryError> {
        let committed = self.records.clone().lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            committed,
            staged: Vec::new(),
            dimensions: self.dimensions,
            metric: self.metric,
        }))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}

struct InMemoryTransaction {
    committed: OwnedMutexGuard<Vec<Embedding>>,
    staged: Vec<Embedding>,
    dimensions: usize,
    metric: SimilarityMetric,
}

impl InMemoryTransaction {
    fn visible(&self) -> impl Iterator<Item = &Embedding> {
        self.committed.iter().chain(self.staged.iter())
    }
}

#[async_trait]
impl EmbeddingTransaction for InMemoryTransaction {
    async fn lock_content(&mut self, _content: &str) -> Result<(), RepositoryError> {
        // Already exclusive.
        Ok(())
    }

    async fn find_by_content(
        &mut self,
        content: &str,
    ) -> Result<Option<Embedding>, RepositoryError> {
        Ok(self.visible().find(|e| e.content == content).cloned())
    }

    async fn insert(&mut self, record: &Embedding) -> Result<Embedding, RepositoryError> {
        check_dimensions(self.dimensions, &record.embedding)?;
        self.staged.push(record.clone());
        Ok(record.clone())
    }

    async fn find_most_similar(
        &mut self,
        vector: &[f32],
        limit: usize,
        prefer_content: Option<&str>,
    ) -> Result<Vec<Embedding>, RepositoryError> {
        if limit == 0 {
            return Ok(vec![]);
        }
        check_dimensions(self.dimensions, vector)?;

        let mut scored: Vec<(f32, &Embedding)> = self
            .visible()
            .map(|e| (self.metric.distance(vector, &e.embedding), e))
            .collect();
        let preferred = |e: &Embedding| prefer_content == Some(e.content.as_str());
        // Stable sort keeps insertion order among the remaining ties.
        scored.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| preferred(b.1).cmp(&preferred(a.1)))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let InMemoryTransaction {
            mut committed,
            staged,
            ..
        } = *self;
        debug!("Committing {} staged embedding(s)", staged.len());
        committed.extend(staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        debug!("Discarding {} staged embedding(s)", self.staged.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> InMemoryEmbeddingRepository {
        InMemoryEmbeddingRepository::new(2, SimilarityMetric::Cosine)
    }

    #[tokio::test]
    async fn test_insert_then_lookup_same_vector() {
        let repo = repo();
        let mut tx = repo.begin().await.unwrap();
        let stored = tx
            .insert(&Embedding::new("hello world", vec![0.6, 0.8]))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        let found = tx.find_by_content("hello world").await.unwrap().unwrap();
        assert_eq!(found.embedding, vec![0.6, 0.8]);
        assert_eq!(found.id, stored.id);
        assert!(tx.find_by_content("hello").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drop_without_commit_rolls_back() {
        let repo = repo();
        {
            let mut tx = repo.begin().await.unwrap();
            tx.insert(&Embedding::new("gone", vec![1.0, 0.0])).await.unwrap();
            assert!(tx.find_by_content("gone").await.unwrap().is_some());
        }
        assert!(repo.snapshot().await.is_empty());

        let mut tx = repo.begin().await.unwrap();
        tx.insert(&Embedding::new("gone", vec![1.0, 0.0])).await.unwrap();
        tx.rollback().await.unwrap();
        assert!(repo.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_find_most_similar_orders_by_distance() {
        let repo = repo();
        let mut tx = repo.begin().await.unwrap();
        tx.insert(&Embedding::new("east", vec![1.0, 0.0])).await.unwrap();
        tx.insert(&Embedding::new("north", vec![0.0, 1.0])).await.unwrap();
        tx.insert(&Embedding::new("north-east", vec![0.7, 0.7])).await.unwrap();

        let hits = tx.find_most_similar(&[1.0, 0.1], 2, None).await.unwrap();
        let names: Vec<_> = hits.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(names, vec!["east", "north-east"]);

        assert!(tx.find_most_similar(&[1.0, 0.0], 0, None).await.unwrap().is_empty());
        assert_eq!(tx.find_most_similar(&[1.0, 0.0], 10, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rejects_wrong_dimensions() {
        let repo = repo();
        let mut tx = repo.begin().await.unwrap();
        let err = tx
            .insert(&Embedding::new("bad", vec![1.0, 2.0, 3.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DimensionMismatch { .. }));
        assert!(tx.find_most_similar(&[1.0], 1, None).await.is_err());
    }

    #[tokio::test]
    async fn test_l2_metric() {
        let repo = InMemoryEmbeddingRepository::new(2, SimilarityMetric::L2);
        let mut tx = repo.begin().await.unwrap();
        tx.insert(&Embedding::new("far", vec![10.0, 10.0])).await.unwrap();
        tx.insert(&Embedding::new("near", vec![1.0, 1.0])).await.unwrap();
        let hits = tx.find_most_similar(&[0.0, 0.0], 1, None).await.unwrap();
        assert_eq!(hits[0].content, "near");
    }

    #[tokio::test]
    async fn test_equal_distance_prefers_given_content() {
        let repo = repo();
        let mut tx = repo.begin().await.unwrap();
        tx.insert(&Embedding::new("older", vec![1.0, 0.0])).await.unwrap();
        tx.insert(&Embedding::new("newer", vec![2.0, 0.0])).await.unwrap();

        let hits = tx.find_most_similar(&[2.0, 0.0], 1, None).await.unwrap();
        assert_eq!(hits[0].content, "older");

        let hits = tx
            .find_most_similar(&[2.0, 0.0], 1, Some("newer"))
            .await
            .unwrap();
        assert_eq!(hits[0].content, "newer");

        let hits = tx
            .find_most_similar(&[2.0, 0.0], 2, Some("newer"))
            .await
            .unwrap();
        let names: Vec<_> = hits.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(names, vec!["newer", "older"]);
    }
}
