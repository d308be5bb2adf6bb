use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::job::ExtraMap;

/// Request to submit a labeling job. Fields beyond the required three are
/// carried through the pipeline untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[garde(length(min = 1, max = 200))]
    pub game: String,

    #[garde(length(min = 1, max = 2000))]
    pub url: String,

    #[garde(length(min = 1, max = 20))]
    pub lang: String,

    #[garde(skip)]
    #[serde(flatten)]
    pub extra: ExtraMap,
}

/// Response after submitting a labeling job.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub msg_id: String,
    pub status: String,
}

/// JSON error body returned by the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
