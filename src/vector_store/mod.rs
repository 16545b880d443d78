pub mod memory;
pub mod pgvector;
pub mod utils;

use async_trait::async_trait;
use std::str::FromStr;
use thiserror::Error;

use crate::models::embedding::Embedding;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Malformed stored vector: {0}")]
    MalformedVector(String),
}

/// Distance used for nearest-neighbour ordering. Smaller is closer for all
/// three, matching the pgvector operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMetric {
    Cosine,
    L2,
    InnerProduct,
}

impl SimilarityMetric {
    /// pgvector distance operator.
    pub fn pg_operator(self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "<=>",
            SimilarityMetric::L2 => "<->",
            SimilarityMetric::InnerProduct => "<#>",
        }
    }

    /// pgvector operator class for an index on this metric.
    pub fn pg_ops_class(self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "vector_cosine_ops",
            SimilarityMetric::L2 => "vector_l2_ops",
            SimilarityMetric::InnerProduct => "vector_ip_ops",
        }
    }

    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityMetric::Cosine => utils::cosine_distance(a, b),
            SimilarityMetric::L2 => utils::l2_distance(a, b),
            SimilarityMetric::InnerProduct => utils::negative_inner_product(a, b),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "l2" | "euclidean" => Ok(SimilarityMetric::L2),
            "inner_product" | "dot" => Ok(SimilarityMetric::InnerProduct),
            other => anyhow::bail!("Unknown similarity metric: {other}"),
        }
    }
}

/// Persistence for embedding records. All reads and writes go through an
/// explicit transaction obtained from [`EmbeddingRepository::begin`].
#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    /// Create tables/indexes if needed.
    async fn initialize(&self) -> Result<(), RepositoryError>;

    /// Open a transaction. Dropping it without `commit` rolls it back.
    async fn begin(&self) -> Result<Box<dyn EmbeddingTransaction>, RepositoryError>;

    /// Vector width every stored record must have.
    fn dimensions(&self) -> usize;

    /// Backend name for logging.
    fn provider_name(&self) -> &str;
}

#[async_trait]
pub trait EmbeddingTransaction: Send {
    /// Block other transactions locking the same content until this one ends.
    async fn lock_content(&mut self, content: &str) -> Result<(), RepositoryError>;

    /// Oldest record whose content matches exactly.
    async fn find_by_content(&mut self, content: &str)
    -> Result<Option<Embedding>, RepositoryError>;

    /// Insert a new record and return it as stored.
    async fn insert(&mut self, record: &Embedding) -> Result<Embedding, RepositoryError>;

    /// Up to `limit` records ordered nearest first. Among equal distances,
    /// records whose content equals `prefer_content` come first, then older
    /// records.
    async fn find_most_similar(
        &mut self,
        vector: &[f32],
        limit: usize,
        prefer_content: Option<&str>,
    ) -> Result<Vec<Embedding>, RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}

pub(crate) fn check_dimensions(expected: usize, vector: &[f32]) -> Result<(), RepositoryError> {
    if vector.len() != expected {
        return Err(RepositoryError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
