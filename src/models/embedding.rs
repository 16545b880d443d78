use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored piece of text together with its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub id: Uuid,
    /// Original text; doubles as the lookup key for reuse.
    pub content: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Embedding {
    /// Build a fresh record stamped with a new id and the current time.
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            embedding,
            created_at: Utc::now(),
        }
    }
}
