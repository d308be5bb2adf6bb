//! In-memory collaborators for pipeline and route tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use video_labeler::models::label::LabelResponse;
use video_labeler::services::inference::{Inference, InferenceError, InferenceInput};
use video_labeler::services::queue::{QueueError, QueuedJob, TaskQueue};
use video_labeler::services::store::{DocumentStore, StoreError};

/// In-memory document store that records every call it serves.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<Vec<(String, String, Value)>>,
    set_calls: Mutex<Vec<(String, String)>>,
    list_calls: Mutex<Vec<String>>,
    pub failing_collections: Vec<String>,
}

impl MemoryStore {
    pub fn seed(&self, collection: &str, docs: &[Value]) {
        let mut all = self.docs.lock().unwrap();
        for (i, doc) in docs.iter().enumerate() {
            all.push((collection.to_string(), format!("seed-{i}"), doc.clone()));
        }
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Value> {
        self.docs
            .lock()
            .unwrap()
            .iter()
            .find(|(c, i, _)| c == collection && i == id)
            .map(|(_, _, d)| d.clone())
    }

    pub fn document_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn set_calls(&self) -> Vec<(String, String)> {
        self.set_calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<String> {
        self.list_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, collection: &str, data: &Value) -> Result<String, StoreError> {
        let mut docs = self.docs.lock().unwrap();
        let id = format!("doc-{}", docs.len());
        docs.push((collection.to_string(), id.clone(), data.clone()));
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.document(collection, id))
    }

    async fn set(&self, collection: &str, id: &str, data: &Value) -> Result<(), StoreError> {
        self.set_calls
            .lock()
            .unwrap()
            .push((collection.to_string(), id.to_string()));
        let mut docs = self.docs.lock().unwrap();
        docs.retain(|(c, i, _)| !(c == collection && i == id));
        docs.push((collection.to_string(), id.to_string(), data.clone()));
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.list_calls.lock().unwrap().push(collection.to_string());
        if self.failing_collections.iter().any(|c| c == collection) {
            return Err(StoreError::InvalidId(format!("{collection} unavailable")));
        }
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| c == collection)
            .map(|(_, _, d)| d.clone())
            .collect())
    }
}

/// Inference backend scripted per prompt. Prompts without a script entry are
/// treated as the caption instruction and answered with `caption`.
pub struct ScriptedInference {
    caption: Result<String, ()>,
    responses: HashMap<String, Result<String, ()>>,
}

impl ScriptedInference {
    pub fn new(caption: &str) -> Self {
        Self {
            caption: Ok(caption.to_string()),
            responses: HashMap::new(),
        }
    }

    pub fn failing_caption() -> Self {
        Self {
            caption: Err(()),
            responses: HashMap::new(),
        }
    }

    pub fn respond(mut self, prompt: &str, label: &str) -> Self {
        self.responses
            .insert(prompt.to_string(), Ok(label.to_string()));
        self
    }

    pub fn fail(mut self, prompt: &str) -> Self {
        self.responses.insert(prompt.to_string(), Err(()));
        self
    }
}

#[async_trait]
impl Inference for ScriptedInference {
    async fn invoke(
        &self,
        prompt: &str,
        _input: InferenceInput<'_>,
    ) -> Result<LabelResponse, InferenceError> {
        let scripted = self.responses.get(prompt).unwrap_or(&self.caption);
        match scripted {
            Ok(label) => Ok(LabelResponse {
                label: label.clone(),
            }),
            Err(()) => Err(InferenceError::EmptyResponse),
        }
    }
}

/// In-memory task queue; `failing()` makes every enqueue error.
#[derive(Default)]
pub struct MemoryQueue {
    jobs: Mutex<VecDeque<QueuedJob>>,
    fail_enqueue: bool,
}

impl MemoryQueue {
    pub fn failing() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            fail_enqueue: true,
        }
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn enqueue(&self, job: &QueuedJob) -> Result<(), QueueError> {
        if self.fail_enqueue {
            return Err(QueueError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "queue unavailable",
            ))));
        }
        self.jobs.lock().unwrap().push_back(job.clone());
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>, QueueError> {
        Ok(self.jobs.lock().unwrap().pop_front())
    }

    async fn complete(&self, _job: &QueuedJob) -> Result<(), QueueError> {
        Ok(())
    }

    async fn queue_depth(&self) -> Result<u64, QueueError> {
        Ok(self.jobs.lock().unwrap().len() as u64)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(())
    }
}
