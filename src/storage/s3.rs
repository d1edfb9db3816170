//! S3 Object Storage Implementation
//!
//! Implements the ObjectStore trait on top of the AWS SDK. Works against
//! AWS itself or any S3-compatible endpoint.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTime as SdkDateTime};
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::{
    BucketRecord, ByteSource, ListObjectsRequest, ObjectContent, ObjectListing, ObjectRecord,
    ObjectStore, PutObjectRequest,
};
use crate::config::AwsConfig;
use crate::error::{Error, ProviderErrorKind, Result};

/// S3-backed object store
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from static credentials
    pub fn from_config(config: &AwsConfig) -> Self {
        let creds = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "s3gate-config",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(creds)
            .force_path_style(config.force_path_style);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self::new(Client::from_conf(builder.build()))
    }

    /// Wrap an existing SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_buckets(&self) -> Result<Vec<BucketRecord>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| provider_error("ListBuckets", e))?;

        let buckets = output
            .buckets()
            .iter()
            .map(|b| BucketRecord {
                name: b.name().map(str::to_owned),
                creation_date: b.creation_date().and_then(to_chrono),
            })
            .collect::<Vec<_>>();

        debug!(count = buckets.len(), "Listed buckets");
        Ok(buckets)
    }

    async fn list_objects(&self, request: ListObjectsRequest) -> Result<ObjectListing> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix(request.prefix)
            .max_keys(request.max_keys)
            .set_continuation_token(request.continuation_token)
            .send()
            .await
            .map_err(|e| provider_error("ListObjectsV2", e))?;

        let contents = output
            .contents()
            .iter()
            .map(|o| ObjectRecord {
                key: o.key().map(str::to_owned),
                size: o.size(),
                last_modified: o.last_modified().and_then(to_chrono),
                e_tag: o.e_tag().map(str::to_owned),
                storage_class: o.storage_class().map(|c| c.as_str().to_owned()),
            })
            .collect::<Vec<_>>();

        debug!(bucket = %request.bucket, count = contents.len(), "Listed objects");
        Ok(ObjectListing {
            contents,
            is_truncated: output.is_truncated(),
            next_continuation_token: output.next_continuation_token().map(str::to_owned),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectContent> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| provider_error("GetObject", e))?;

        let content_type = output.content_type().map(str::to_owned);
        let content_length = output.content_length();
        let known_len = content_length.and_then(|l| u64::try_from(l).ok());

        let reader = output.body.into_async_read();
        let body = ByteSource::from_stream(ReaderStream::new(reader), known_len);

        debug!(bucket = %bucket, key = %key, ?content_length, "Opened object stream");
        Ok(ObjectContent {
            content_type,
            content_length,
            body: Some(body),
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        let body = ByteStream::from_path(request.body.path())
            .await
            .map_err(|e| Error::Internal(format!("failed to open staged upload: {}", e)))?;

        self.client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(body)
            .content_length(request.body.size() as i64)
            .content_type(&request.content_type)
            .acl(ObjectCannedAcl::from(request.acl.as_str()))
            .send()
            .await
            .map_err(|e| provider_error("PutObject", e))?;

        debug!(bucket = %request.bucket, key = %request.key, bytes = request.body.size(), "Put object to S3");
        Ok(())
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| Error::Internal(format!("invalid presign expiry: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| provider_error("PresignGetObject", e))?;

        Ok(request.uri().to_string())
    }
}

/// Convert an SDK failure into a provider error, keeping its category
fn provider_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_owned);
    let message = err
        .message()
        .map(str::to_owned)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    Error::Provider {
        operation,
        kind: ProviderErrorKind::from_code(code.as_deref()),
        code,
        message,
    }
}

fn to_chrono(ts: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_chrono() {
        let ts = SdkDateTime::from_secs_and_nanos(1_700_000_000, 250_000_000);
        let converted = to_chrono(&ts).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
        assert_eq!(converted.timestamp_subsec_millis(), 250);
    }

    #[tokio::test]
    async fn test_presign_get_is_local() {
        let store = S3Store::from_config(&AwsConfig {
            region: "us-east-1".into(),
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            endpoint_url: None,
            force_path_style: false,
        });

        let url = store
            .presign_get("apk-drop", "uploads/1-app.apk", Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(url.starts_with("https://"));
        assert!(url.contains("uploads/1-app.apk"));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(url.contains("X-Amz-Signature="));
    }
}
