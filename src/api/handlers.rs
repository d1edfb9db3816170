//! Bucket and object route handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use tracing::{debug, error};

use super::http::AppState;
use super::mapping::{list_buckets_response, list_objects_response, ListBucketsResponse, ListObjectsResponse};
use crate::error::{Error, Result};
use crate::storage::ListObjectsRequest;

/// Page size used when `maxKeys` is not supplied
pub const DEFAULT_MAX_KEYS: i32 = 1000;

/// Filename used for downloads whose key ends in `/`
const FALLBACK_FILENAME: &str = "download";

/// RFC 5987 `attr-char` set; everything else is percent-encoded in `filename*`
const FILENAME_STAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Query string of `GET /api/buckets/:bucketName/objects`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsQuery {
    pub prefix: Option<String>,
    pub max_keys: Option<String>,
    pub continuation_token: Option<String>,
}

/// Query string of `GET /api/buckets/:bucketName/objects/*objectKey`
#[derive(Debug, Default, Deserialize)]
pub struct GetObjectQuery {
    pub download: Option<String>,
}

pub(crate) async fn handle_list_buckets(State(state): State<Arc<AppState>>) -> Result<Json<ListBucketsResponse>> {
    let records = state
        .store
        .list_buckets()
        .await
        .inspect_err(|e| error!(kind = ?e.provider_kind(), "Failed to list buckets: {}", e))?;

    Ok(Json(list_buckets_response(records)))
}

pub(crate) async fn handle_list_objects(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<String>, PathRejection>,
    query: std::result::Result<Query<ListObjectsQuery>, QueryRejection>,
) -> Result<Json<ListObjectsResponse>> {
    let Path(bucket) = path.map_err(|e| Error::validation(e.body_text()))?;
    require("bucketName", &bucket)?;
    let Query(query) = query.map_err(|e| Error::validation(e.body_text()))?;
    let max_keys = parse_max_keys(query.max_keys.as_deref())?;

    let request = ListObjectsRequest {
        bucket: bucket.clone(),
        prefix: query.prefix.clone(),
        max_keys,
        continuation_token: query.continuation_token,
    };

    let listing = state.store.list_objects(request).await.inspect_err(|e| {
        error!(bucket = %bucket, kind = ?e.provider_kind(), "Failed to list objects: {}", e)
    })?;

    Ok(Json(list_objects_response(bucket, query.prefix, listing)))
}

pub(crate) async fn handle_get_object(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<(String, String)>, PathRejection>,
    query: std::result::Result<Query<GetObjectQuery>, QueryRejection>,
) -> Result<Response> {
    // Path captures are percent-decoded once by the extractor; the key is
    // used as-is from here on so `%252F` reaches the provider as `%2F`.
    let Path((bucket, key)) = path.map_err(|e| Error::validation(e.body_text()))?;
    require("bucketName", &bucket)?;
    require("objectKey", &key)?;
    let Query(query) = query.map_err(|e| Error::validation(e.body_text()))?;
    let download = parse_download(query.download.as_deref())?;

    let content = state.store.get_object(&bucket, &key).await.inspect_err(|e| {
        error!(bucket = %bucket, key = %key, kind = ?e.provider_kind(), "Failed to get object: {}", e)
    })?;

    let Some(body) = content.body else {
        debug!(bucket = %bucket, key = %key, "Provider returned no body");
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let mut headers = HeaderMap::new();
    if let Some(content_type) = content.content_type.as_deref() {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
    }
    let len = content
        .content_length
        .and_then(|l| u64::try_from(l).ok())
        .or_else(|| body.known_len());
    if let Some(len) = len {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    if download {
        headers.insert(header::CONTENT_DISPOSITION, content_disposition(&key));
    }

    Ok((headers, Body::from_stream(body.into_stream())).into_response())
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(format!("params/{} is required", name)));
    }
    Ok(())
}

/// Validate and parse `maxKeys`; only plain digit strings are accepted
pub fn parse_max_keys(raw: Option<&str>) -> Result<i32> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_MAX_KEYS);
    };

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::validation(
            "querystring/maxKeys must match pattern \"^[0-9]+$\"",
        ));
    }

    raw.parse::<i32>()
        .map_err(|_| Error::validation(format!("querystring/maxKeys must not exceed {}", i32::MAX)))
}

/// Validate `download`, which only accepts `true` or `false`
pub fn parse_download(raw: Option<&str>) -> Result<bool> {
    match raw {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(_) => Err(Error::validation(
            "querystring/download must be equal to one of the allowed values: true, false",
        )),
    }
}

/// Last path segment of a key, used as the download filename
pub fn download_filename(key: &str) -> &str {
    key.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_FILENAME)
}

/// `attachment` disposition with an ASCII `filename` and, when the name is
/// not plain printable ASCII, an RFC 5987 `filename*` carrying the exact name
fn content_disposition(key: &str) -> HeaderValue {
    let name = download_filename(key);
    let ascii: String = name
        .chars()
        .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '_' })
        .collect();

    let mut value = format!(
        "attachment; filename=\"{}\"",
        ascii.replace('\\', "\\\\").replace('"', "\\\"")
    );
    if ascii != name {
        value.push_str("; filename*=UTF-8''");
        value.extend(utf8_percent_encode(name, FILENAME_STAR));
    }

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_keys() {
        assert_eq!(parse_max_keys(None).unwrap(), 1000);
        assert_eq!(parse_max_keys(Some("25")).unwrap(), 25);
        assert_eq!(parse_max_keys(Some("0")).unwrap(), 0);
        assert_eq!(parse_max_keys(Some("007")).unwrap(), 7);

        for bad in ["abc", "12.5", "-1", "", " 5", "+5", "99999999999"] {
            assert!(
                matches!(parse_max_keys(Some(bad)), Err(Error::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_download() {
        assert!(!parse_download(None).unwrap());
        assert!(!parse_download(Some("false")).unwrap());
        assert!(parse_download(Some("true")).unwrap());
        assert!(parse_download(Some("yes")).is_err());
        assert!(parse_download(Some("TRUE")).is_err());
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(download_filename("folder/sub/report.pdf"), "report.pdf");
        assert_eq!(download_filename("onlyname"), "onlyname");
        assert_eq!(download_filename("folder/"), "download");
    }

    #[test]
    fn test_content_disposition_quotes_filename() {
        assert_eq!(
            content_disposition("a/report.pdf").to_str().unwrap(),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition("we\"ird.txt").to_str().unwrap(),
            "attachment; filename=\"we\\\"ird.txt\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii_names() {
        assert_eq!(
            content_disposition("docs/r\u{e9}sum\u{e9}.pdf").to_str().unwrap(),
            "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
        assert_eq!(
            content_disposition("line\nbreak.txt").to_str().unwrap(),
            "attachment; filename=\"line_break.txt\"; filename*=UTF-8''line%0Abreak.txt"
        );
    }
}
