//! Object Storage Module
//!
//! The `ObjectStore` trait is the only surface the HTTP layer uses to talk
//! to the storage provider. `S3Store` implements it on top of the AWS SDK.

mod s3;
#[cfg(test)]
pub(crate) mod memory;

use std::fmt;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::Result;

pub use s3::S3Store;

/// A bucket as reported by the provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketRecord {
    pub name: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
}

/// One object entry of a listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRecord {
    pub key: Option<String>,
    pub size: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub e_tag: Option<String>,
    pub storage_class: Option<String>,
}

/// Parameters of a single list-objects page request
#[derive(Debug, Clone, PartialEq)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub max_keys: i32,
    pub continuation_token: Option<String>,
}

/// One page of a listing with the provider's pagination metadata
#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    pub contents: Vec<ObjectRecord>,
    pub is_truncated: Option<bool>,
    pub next_continuation_token: Option<String>,
}

/// Sequential byte source of known or unknown length.
///
/// Provider bodies are always exposed through this type, whether the
/// provider hands back a stream or an in-memory buffer.
pub struct ByteSource {
    stream: Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>,
    len: Option<u64>,
}

impl ByteSource {
    /// Wrap a stream of chunks
    pub fn from_stream<S>(stream: S, len: Option<u64>) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            stream: Box::pin(stream),
            len,
        }
    }

    /// Wrap an already buffered payload as a single-chunk source
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let len = data.len() as u64;
        Self::from_stream(futures::stream::once(async move { Ok(data) }), Some(len))
    }

    /// Total length, if known up front
    pub fn known_len(&self) -> Option<u64> {
        self.len
    }

    /// Consume into the underlying stream
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>> {
        self.stream
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource").field("len", &self.len).finish_non_exhaustive()
    }
}

/// Result of a get-object call
#[derive(Debug)]
pub struct ObjectContent {
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    /// `None` when the provider returned no body at all
    pub body: Option<ByteSource>,
}

/// Upload payload staged on local disk.
///
/// The temporary file is removed when this value is dropped.
#[derive(Debug)]
pub struct StagedFile {
    file: tempfile::NamedTempFile,
    len: u64,
}

impl StagedFile {
    pub fn new(file: tempfile::NamedTempFile, len: u64) -> Self {
        Self { file, len }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes staged
    pub fn size(&self) -> u64 {
        self.len
    }
}

/// Canned access control applied to stored objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessControl {
    Private,
}

impl AccessControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessControl::Private => "private",
        }
    }
}

/// Parameters of a put-object call
#[derive(Debug)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: StagedFile,
    pub content_type: String,
    pub acl: AccessControl,
}

/// Operations the gateway needs from the storage provider.
///
/// Implementations make exactly one provider call per method and never
/// retry on their own.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all buckets visible to the configured credentials
    async fn list_buckets(&self) -> Result<Vec<BucketRecord>>;

    /// Fetch one page of objects
    async fn list_objects(&self, request: ListObjectsRequest) -> Result<ObjectListing>;

    /// Fetch an object body and its metadata
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectContent>;

    /// Store an object
    async fn put_object(&self, request: PutObjectRequest) -> Result<()>;

    /// Issue a time-limited download URL for an object
    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String>;
}
