use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{inference::Inference, queue::TaskQueue, store::DocumentStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<dyn DocumentStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub inference: Arc<dyn Inference>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        store: Arc<dyn DocumentStore>,
        queue: Arc<dyn TaskQueue>,
        inference: Arc<dyn Inference>,
    ) -> Self {
        Self {
            db,
            store,
            queue,
            inference,
        }
    }
}
