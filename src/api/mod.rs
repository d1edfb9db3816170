//! HTTP API Module
//!
//! JSON endpoints for listing buckets and objects, streaming object
//! downloads and accepting uploads.

mod docs;
mod handlers;
mod http;
pub mod mapping;
mod upload;

pub use handlers::{download_filename, parse_download, parse_max_keys, DEFAULT_MAX_KEYS};
pub use http::{AppState, HttpServer, UploadSettings};
pub use upload::upload_key;
