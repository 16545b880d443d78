use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::embedding::Embedding;
use crate::vector_store::utils::{parse_pgvector_literal, to_pgvector_literal};
use crate::vector_store::{
    EmbeddingRepository, EmbeddingTransaction, RepositoryError, SimilarityMetric,
    check_dimensions,
};

/// pgvector indexes (hnsw/ivfflat) only accept up to this many dimensions.
const MAX_INDEXED_DIMENSIONS: u32 = 2000;

const SELECT_COLUMNS: &str = "id, content, embedding::text AS embedding, created_at";

/// PostgreSQL with pgvector implementation of the embedding repository.
pub struct PGVectorRepository {
    pool: PgPool,
    dimensions: u32,
    metric: SimilarityMetric,
}

impl PGVectorRepository {
    pub async fn new(
        uri: &str,
        pool_size: u32,
        acquire_timeout_secs: u64,
        dimensions: u32,
        metric: SimilarityMetric,
    ) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .connect(uri)
            .await?;

        info!("Created PGVector connection pool (size={pool_size})");
        Ok(Self::from_pool(pool, dimensions, metric))
    }

    pub fn from_pool(pool: PgPool, dimensions: u32, metric: SimilarityMetric) -> Self {
        Self {
            pool,
            dimensions,
            metric,
        }
    }
}

#[async_trait]
impl EmbeddingRepository for PGVectorRepository {
    async fn initialize(&self) -> Result<(), RepositoryError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;
        info!("Enabled pgvector extension");

        let create_sql = format!(
            "CREATE TABLE IF NOT EXISTS embeddings (
                id UUID PRIMARY KEY,
                content TEXT NOT NULL,
                embedding vector({}) NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            self.dimensions
        );
        sqlx::query(&create_sql).execute(&self.pool).await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_content ON embeddings(content)")
            .execute(&self.pool)
            .await?;

        if self.dimensions <= MAX_INDEXED_DIMENSIONS {
            let index_sql = format!(
                "CREATE INDEX IF NOT EXISTS idx_embeddings_vector ON embeddings
                 USING hnsw (embedding {})",
                self.metric.pg_ops_class()
            );
            sqlx::query(&index_sql).execute(&self.pool).await?;
            info!("Created HNSW index on embeddings ({})", self.metric.pg_ops_class());
        } else {
            info!(
                "Skipping vector index: {} dimensions exceeds the pgvector limit of {MAX_INDEXED_DIMENSIONS}",
                self.dimensions
            );
        }

        info!("embeddings table ready with vector({})", self.dimensions);
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn EmbeddingTransaction>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PGVectorTransaction {
            tx,
            dimensions: self.dimensions as usize,
            metric: self.metric,
        }))
    }

    fn dimensions(&self) -> usize {
        self.dimensions as usize
    }

    fn provider_name(&self) -> &str {
        "pgvector"
    }
}

/// A pooled connection inside `BEGIN`. sqlx rolls back on drop.
struct PGVectorTransaction {
    tx: Transaction<'static, Postgres>,
    dimensions: usize,
    metric: SimilarityMetric,
}

fn row_to_embedding(row: &PgRow) -> Result<Embedding, RepositoryError> {
    let id: Uuid = row.try_get("id")?;
    let content: String = row.try_get("content")?;
    let vector_text: String = row.try_get("embedding")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Embedding {
        id,
        content,
        embedding: parse_pgvector_literal(&vector_text)?,
        created_at,
    })
}

pub(crate) fn similarity_query(metric: SimilarityMetric) -> String {
    format!(
        "SELECT {SELECT_COLUMNS}
         FROM embeddings
         ORDER BY embedding {} $1::vector,
                  (content IS NOT DISTINCT FROM $3::text) DESC,
                  created_at
         LIMIT $2",
        metric.pg_operator()
    )
}

#[async_trait]
impl EmbeddingTransaction for PGVectorTransaction {
    async fn lock_content(&mut self, content: &str) -> Result<(), RepositoryError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(content)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_by_content(
        &mut self,
        content: &str,
    ) -> Result<Option<Embedding>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS}
             FROM embeddings
             WHERE content = $1
             ORDER BY created_at
             LIMIT 1"
        ))
        .bind(content)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_embedding).transpose()
    }

    async fn insert(&mut self, record: &Embedding) -> Result<Embedding, RepositoryError> {
        check_dimensions(self.dimensions, &record.embedding)?;

        let row = sqlx::query(&format!(
            "INSERT INTO embeddings (id, content, embedding, created_at)
             VALUES ($1, $2, $3::vector, $4)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(record.id)
        .bind(&record.content)
        .bind(to_pgvector_literal(&record.embedding))
        .bind(record.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        debug!("Inserted embedding {}", record.id);
        row_to_embedding(&row)
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

        let rows = sqlx::query(&similarity_query(self.metric))
            .bind(to_pgvector_literal(vector))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(prefer_content)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(row_to_embedding).collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
