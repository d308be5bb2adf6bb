use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Fixed collection holding job records.
pub const JOB_COLLECTION: &str = "videolabel";

/// Narrow interface the pipeline uses against the external document store.
/// Collections are computed scopes: `{game}_match`,
/// `{game}_{lang}_text_prompts`, `{game}_{lang}_video_prompts`, and the fixed
/// job collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with a store-assigned id; returns the id.
    async fn add(&self, collection: &str, data: &Value) -> Result<String, StoreError>;

    /// Fetch a document by id, or `None` if absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Create-or-replace a document under a known id.
    async fn set(&self, collection: &str, id: &str, data: &Value) -> Result<(), StoreError>;

    /// List every document in a collection, oldest first.
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;
}

/// PostgreSQL-backed document store: a single `documents` table with the
/// collection name as a keyed scope and the payload as JSONB.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn add(&self, collection: &str, data: &Value) -> Result<String, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (collection, data)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(collection)
        .bind(data)
        .fetch_one(&self.pool)
        .await?;

        let id: Uuid = row.try_get("id")?;
        Ok(id.to_string())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        // A non-uuid id cannot exist in the table.
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let row = sqlx::query(
            r#"
            SELECT data FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(r) => Some(r.try_get("data")?),
            None => None,
        })
    }

    async fn set(&self, collection: &str, id: &str, data: &Value) -> Result<(), StoreError> {
        let id = Uuid::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, collection, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(collection)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT data FROM documents
            WHERE collection = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.try_get("data").map_err(StoreError::Db))
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("invalid document id: {0}")]
    InvalidId(String),
}
