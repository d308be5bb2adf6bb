//! Video Labeling Pipeline
//!
//! This library provides the core functionality for the video-labeler
//! service: an asynchronous job pipeline that classifies a video by
//! combining substring rule matching with concurrent LLM prompt
//! evaluation, then durably records the merged labels.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
