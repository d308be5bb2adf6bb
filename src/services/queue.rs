use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::models::job::ExtraMap;

const QUEUE_KEY: &str = "videolabel:jobs";
const PROCESSING_KEY: &str = "videolabel:processing";

/// Job payload serialized into the queue. Carries everything a worker needs
/// to run the pipeline without re-reading the queued record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub msg_id: String,
    pub game: String,
    pub lang: String,
    pub url: String,
    #[serde(default)]
    pub extra: ExtraMap,
}

/// Queue operations shared by intake and the worker pool. Object-safe so
/// handlers can run against an in-memory implementation in tests.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a labeling job.
    async fn enqueue(&self, job: &QueuedJob) -> Result<(), QueueError>;

    /// Dequeue a job for processing.
    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError>;

    /// Remove a job from the processing list once it reached a terminal state.
    async fn complete(&self, job: &QueuedJob) -> Result<(), QueueError>;

    /// Current number of pending jobs.
    async fn queue_depth(&self) -> Result<u64, QueueError>;

    /// Connectivity check (for health checks).
    async fn health_check(&self) -> Result<(), QueueError>;
}

/// Redis-backed task queue between intake and the worker pool. Submission
/// enqueues instead of spawning per-request tasks, so in-flight work is
/// bounded by worker concurrency and observable via `queue_depth`.
pub struct JobQueue {
    client: redis::Client,
}

impl JobQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TaskQueue for JobQueue {
    async fn enqueue(&self, job: &QueuedJob) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Pop with move to the processing list.
    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let result: Option<String> = conn
            .rpoplpush(QUEUE_KEY, PROCESSING_KEY)
            .await
            .map_err(QueueError::Redis)?;

        match result {
            Some(payload) => {
                let job: QueuedJob =
                    serde_json::from_str(&payload).map_err(QueueError::Serialize)?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, job: &QueuedJob) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let depth: u64 = conn.llen(QUEUE_KEY).await.map_err(QueueError::Redis)?;
        Ok(depth)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
