use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use video_labeler::{
    config::AppConfig,
    db,
    services::{
        inference::GeminiClient,
        pipeline::Pipeline,
        queue::{JobQueue, TaskQueue},
        store::PgDocumentStore,
    },
};

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting labeling worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // The job-outcome metrics are recorded in this process, so the worker
    // runs its own Prometheus exporter.
    let metrics_addr: SocketAddr = config
        .metrics_addr
        .parse()
        .expect("Invalid metrics address");
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .expect("Failed to install Prometheus metrics exporter");

    metrics::describe_counter!("label_jobs_completed", "Total labeling jobs completed");
    metrics::describe_counter!("label_jobs_failed", "Total labeling jobs that failed");
    metrics::describe_histogram!(
        "label_processing_seconds",
        "Time to run a labeling job to its terminal state"
    );
    metrics::describe_gauge!(
        "label_queue_depth",
        "Current number of pending jobs in the queue"
    );

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let store = Arc::new(PgDocumentStore::new(db_pool));
    let queue = Arc::new(JobQueue::new(&config.redis_url).expect("Failed to initialize job queue"));
    let inference = Arc::new(GeminiClient::new(&config));

    let pipeline = Arc::new(Pipeline::new(
        store,
        inference,
        Duration::from_secs(config.inference_timeout_secs),
    ));

    tracing::info!(
        concurrency = config.worker_concurrency,
        "Worker ready, starting job processing loops"
    );

    // Bounded pool: a fixed number of loops caps in-flight jobs.
    let mut loops = JoinSet::new();
    for slot in 0..config.worker_concurrency {
        let queue = Arc::clone(&queue);
        let pipeline = Arc::clone(&pipeline);
        loops.spawn(async move {
            worker_loop(slot, queue, pipeline).await;
        });
    }

    while let Some(res) = loops.join_next().await {
        if let Err(e) = res {
            tracing::error!(error = %e, "worker loop terminated");
        }
    }
}

async fn worker_loop(slot: usize, queue: Arc<JobQueue>, pipeline: Arc<Pipeline>) {
    loop {
        match queue.dequeue().await {
            Ok(Some(job)) => {
                tracing::debug!(slot, msg_id = %job.msg_id, "dequeued job");
                let queued = job.clone();
                let record = pipeline.run(job).await;
                tracing::debug!(
                    slot,
                    msg_id = %queued.msg_id,
                    status = %record.status,
                    "job reached terminal state"
                );

                if let Err(e) = queue.complete(&queued).await {
                    tracing::error!(msg_id = %queued.msg_id, error = %e, "failed to ack job");
                }
                if let Ok(depth) = queue.queue_depth().await {
                    metrics::gauge!("label_queue_depth").set(depth as f64);
                }
            }
            Ok(None) => {
                // No job available, sleep before next poll
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(slot, error = %e, "failed to dequeue, backing off");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}
