use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::api::{ErrorBody, SubmitRequest, SubmitResponse};
use crate::models::job::{JobRecord, JobStatus};
use crate::services::queue::{QueuedJob, TaskQueue};
use crate::services::store::JOB_COLLECTION;

type ApiError = (StatusCode, Json<ErrorBody>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// POST /api/v1/labels — Submit a labeling job.
///
/// Creates the queued record, enqueues it for the worker pool, and
/// acknowledges immediately with the job id; the caller never waits on
/// processing.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    request
        .validate()
        .map_err(|e| error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let mut record = JobRecord::queued(request.game, request.url, request.lang, request.extra);
    let data = serde_json::to_value(&record)
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let msg_id = state
        .store
        .add(JOB_COLLECTION, &data)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to create job record");
            error(StatusCode::INTERNAL_SERVER_ERROR, "failed to create job")
        })?;
    record.msg_id = Some(msg_id.clone());

    metrics::counter!("label_jobs_total").increment(1);

    let queued = QueuedJob {
        msg_id: msg_id.clone(),
        game: record.game.clone(),
        lang: record.lang.clone(),
        url: record.url.clone(),
        extra: record.extra.clone(),
    };

    // The record exists from here on; the response always carries its id.
    let status = match state.queue.enqueue(&queued).await {
        Ok(()) => {
            if let Ok(depth) = state.queue.queue_depth().await {
                metrics::gauge!("label_queue_depth").set(depth as f64);
            }
            tracing::info!(msg_id = %msg_id, "job submitted");
            JobStatus::Queued
        }
        Err(e) => {
            // No worker will ever see this job; surface the failure on the
            // record rather than leaving it queued forever.
            tracing::error!(msg_id = %msg_id, error = %e, "failed to enqueue job");
            record.mark_failed(
                format!("failed to enqueue job: {e}"),
                std::time::Duration::ZERO,
            );
            match serde_json::to_value(&record) {
                Ok(data) => {
                    if let Err(e) = state.store.set(JOB_COLLECTION, &msg_id, &data).await {
                        tracing::error!(msg_id = %msg_id, error = %e, "failed to record enqueue failure");
                    }
                }
                Err(e) => {
                    tracing::error!(msg_id = %msg_id, error = %e, "failed to serialize job record");
                }
            }
            JobStatus::Failed
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            msg_id,
            status: status.to_string(),
        }),
    ))
}

/// GET /api/v1/labels/{msg_id} — Fetch the persisted job record.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(msg_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state
        .store
        .get(JOB_COLLECTION, &msg_id)
        .await
        .map_err(|e| {
            tracing::error!(msg_id = %msg_id, error = %e, "failed to read job record");
            error(StatusCode::INTERNAL_SERVER_ERROR, "failed to read job")
        })?;

    match record {
        Some(record) => Ok(Json(record)),
        None => Err(error(StatusCode::NOT_FOUND, "job not found")),
    }
}
