//! Response contracts and the mappers that build them from provider records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{BucketRecord, ObjectListing, ObjectRecord};

/// Bucket entry of a bucket listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketResponse {
    pub name: String,
    #[serde(default, with = "millis_timestamp", skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,
}

/// Response of `GET /api/buckets`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBucketsResponse {
    pub success: bool,
    pub count: usize,
    pub buckets: Vec<BucketResponse>,
}

/// Object entry of an object listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, with = "millis_timestamp", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, rename = "eTag", skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

/// Response of `GET /api/buckets/:bucketName/objects`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsResponse {
    pub success: bool,
    pub bucket: String,
    /// Always serialized; `null` when no prefix was requested
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_truncated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,
    pub count: usize,
    pub objects: Vec<ObjectResponse>,
}

/// Response of `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub download_url: String,
}

/// Response of `GET /hello`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
}

pub fn bucket_response(record: BucketRecord) -> BucketResponse {
    BucketResponse {
        name: record.name.unwrap_or_default(),
        creation_date: record.creation_date,
    }
}

pub fn object_response(record: ObjectRecord) -> ObjectResponse {
    ObjectResponse {
        key: record.key,
        size: record.size,
        last_modified: record.last_modified,
        e_tag: record.e_tag,
        storage_class: record.storage_class,
    }
}

pub fn list_buckets_response(records: Vec<BucketRecord>) -> ListBucketsResponse {
    let buckets: Vec<BucketResponse> = records.into_iter().map(bucket_response).collect();
    ListBucketsResponse {
        success: true,
        count: buckets.len(),
        buckets,
    }
}

pub fn list_objects_response(
    bucket: String,
    prefix: Option<String>,
    listing: ObjectListing,
) -> ListObjectsResponse {
    let objects: Vec<ObjectResponse> = listing.contents.into_iter().map(object_response).collect();
    ListObjectsResponse {
        success: true,
        bucket,
        prefix,
        is_truncated: listing.is_truncated,
        next_continuation_token: listing.next_continuation_token,
        count: objects.len(),
        objects,
    }
}

/// RFC 3339 UTC timestamps with millisecond precision, e.g. `2024-01-02T03:04:05.000Z`
mod millis_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<DateTime<Utc>>::deserialize(deserializer)
    }
}
