//! Core video ingestion and analysis pipeline

pub mod agent;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod poller;
pub mod pricing;
pub mod prompts;
pub mod sanitizer;
pub mod uploader;
