use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for job queue
    pub redis_url: String,

    /// Inference API key
    pub api_key: String,

    /// Inference API base URL
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Inference model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for inference calls
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Number of concurrent worker loops in the worker process
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Prometheus exporter listen address for the worker process
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,

    /// Upper bound on a single prompt evaluation, in seconds
    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_api_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9091".to_string()
}

fn default_inference_timeout_secs() -> u64 {
    120
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
