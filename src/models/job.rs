use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Status of a labeling job. Monotonic: once `Done` or `Failed`, a job is
/// never revisited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Done,
    Failed,
}

/// A caller-supplied passthrough value. Job submissions may carry arbitrary
/// extra fields; they are preserved verbatim through the pipeline and written
/// back unchanged on the terminal record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Number(f64),
    String(String),
    Sequence(Vec<ExtraValue>),
}

/// Passthrough fields, keyed by field name.
pub type ExtraMap = BTreeMap<String, ExtraValue>;

/// One labeling request and its lifecycle record, persisted in the
/// `videolabel` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub game: String,
    pub url: String,
    pub lang: String,
    #[serde(flatten)]
    pub extra: ExtraMap,
}

impl JobRecord {
    /// A freshly submitted job, not yet persisted or assigned an id.
    pub fn queued(game: String, url: String, lang: String, extra: ExtraMap) -> Self {
        Self {
            msg_id: None,
            status: JobStatus::Queued,
            labels: Vec::new(),
            date: None,
            spend_time: None,
            error: None,
            game,
            url,
            lang,
            extra,
        }
    }

    /// Transition to `done` with the aggregated labels.
    pub fn mark_done(&mut self, labels: Vec<String>, elapsed: std::time::Duration) {
        self.status = JobStatus::Done;
        self.labels = labels;
        self.stamp(elapsed);
    }

    /// Transition to `failed`, recording the error. Partial labels computed
    /// before the failure are discarded.
    pub fn mark_failed(&mut self, error: String, elapsed: std::time::Duration) {
        self.status = JobStatus::Failed;
        self.labels = Vec::new();
        self.error = Some(error);
        self.stamp(elapsed);
    }

    fn stamp(&mut self, elapsed: std::time::Duration) {
        self.date = Some(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string());
        self.spend_time = Some(format!("{:.3}s", elapsed.as_secs_f64()));
    }
}
