pub mod health;
pub mod labels;
pub mod metrics;
