//! s3gate - HTTP Gateway for S3 Object Storage
//!
//! A small Rust service that puts a JSON REST API in front of an
//! S3-compatible object store.
//!
//! # Features
//!
//! - Bucket listing and paginated object listing
//! - Streaming object downloads with optional attachment disposition
//! - Browser upload form with pre-signed download links
//! - Uniform JSON error envelope
//! - TOML configuration with environment overrides

pub mod api;
pub mod config;
pub mod error;
pub mod storage;

pub use config::GatewayConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{AppState, HttpServer, UploadSettings};
    pub use crate::config::GatewayConfig;
    pub use crate::error::{Error, Result};
    pub use crate::storage::{ObjectStore, S3Store};
}
