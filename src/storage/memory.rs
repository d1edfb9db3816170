//! In-memory ObjectStore that records every call it receives

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};

use super::{
    BucketRecord, ByteSource, ListObjectsRequest, ObjectContent, ObjectListing, ObjectRecord,
    ObjectStore, PutObjectRequest,
};
use crate::error::{Error, ProviderErrorKind, Result};

/// A provider call as observed by the store
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListBuckets,
    ListObjects(ListObjectsRequest),
    GetObject { bucket: String, key: String },
    PutObject {
        bucket: String,
        key: String,
        content_type: String,
        acl: &'static str,
        data: Vec<u8>,
    },
    PresignGet { bucket: String, key: String, expires_in: Duration },
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, StoredObject>>>,
    calls: Mutex<Vec<Call>>,
    no_body: Mutex<bool>,
    no_length: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.buckets.lock().unwrap().entry(bucket.to_string()).or_default();
        self
    }

    pub fn with_object(self, bucket: &str, key: &str, content_type: Option<&str>, data: &[u8]) -> Self {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: Bytes::copy_from_slice(data),
                    content_type: content_type.map(str::to_owned),
                },
            );
        self
    }

    /// Make get-object succeed without a body
    pub fn without_bodies(self) -> Self {
        *self.no_body.lock().unwrap() = true;
        self
    }

    /// Report object bodies without a content length
    pub fn without_lengths(self) -> Self {
        *self.no_length.lock().unwrap() = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn not_found(operation: &'static str, code: &str, message: &str) -> Error {
        Error::Provider {
            operation,
            kind: ProviderErrorKind::NotFound,
            code: Some(code.to_string()),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<BucketRecord>> {
        self.record(Call::ListBuckets);
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single();
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .keys()
            .map(|name| BucketRecord {
                name: Some(name.clone()),
                creation_date: created,
            })
            .collect())
    }

    async fn list_objects(&self, request: ListObjectsRequest) -> Result<ObjectListing> {
        self.record(Call::ListObjects(request.clone()));

        let buckets = self.buckets.lock().unwrap();
        let objects = buckets.get(&request.bucket).ok_or_else(|| {
            Self::not_found("ListObjectsV2", "NoSuchBucket", "The specified bucket does not exist")
        })?;

        let prefix = request.prefix.as_deref().unwrap_or("");
        let max_keys = usize::try_from(request.max_keys).unwrap_or(0);
        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| match &request.continuation_token {
                Some(token) => key.as_str() > token.as_str(),
                None => true,
            })
            .peekable();

        let mut contents = Vec::new();
        while contents.len() < max_keys {
            match matching.next() {
                Some((key, obj)) => contents.push(ObjectRecord {
                    key: Some(key.clone()),
                    size: Some(obj.data.len() as i64),
                    last_modified: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single(),
                    e_tag: Some(format!("\"etag-{}\"", obj.data.len())),
                    storage_class: Some("STANDARD".to_string()),
                }),
                None => break,
            }
        }

        let is_truncated = matching.peek().is_some();
        let next_continuation_token = if is_truncated {
            contents.last().and_then(|o| o.key.clone())
        } else {
            None
        };

        Ok(ObjectListing {
            contents,
            is_truncated: Some(is_truncated),
            next_continuation_token,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectContent> {
        self.record(Call::GetObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        let buckets = self.buckets.lock().unwrap();
        let object = buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| Self::not_found("GetObject", "NoSuchKey", "The specified key does not exist."))?;

        let body = if *self.no_body.lock().unwrap() {
            None
        } else {
            Some(ByteSource::from_bytes(object.data.clone()))
        };

        Ok(ObjectContent {
            content_type: object.content_type.clone(),
            content_length: if *self.no_length.lock().unwrap() {
                None
            } else {
                Some(object.data.len() as i64)
            },
            body,
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        let data = tokio::fs::read(request.body.path()).await?;
        self.record(Call::PutObject {
            bucket: request.bucket.clone(),
            key: request.key.clone(),
            content_type: request.content_type.clone(),
            acl: request.acl.as_str(),
            data: data.clone(),
        });

        self.buckets
            .lock()
            .unwrap()
            .entry(request.bucket)
            .or_default()
            .insert(
                request.key,
                StoredObject {
                    data: Bytes::from(data),
                    content_type: Some(request.content_type),
                },
            );
        Ok(())
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String> {
        self.record(Call::PresignGet {
            bucket: bucket.to_string(),
            key: key.to_string(),
            expires_in,
        });
        Ok(format!(
            "https://{}.s3.example.test/{}?X-Amz-Expires={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}
