//! File upload endpoint
//!
//! The first file part of the form is spooled to a temporary file chunk by
//! chunk, stored in the configured bucket, and answered with a pre-signed
//! download URL.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    response::Html,
    Json,
};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use super::http::AppState;
use super::mapping::UploadResponse;
use crate::error::{Error, Result};
use crate::storage::{AccessControl, PutObjectRequest, StagedFile};

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Upload APK</title>
  </head>
  <body>
    <h1>Upload APK to S3</h1>
    <form action="/upload" method="POST" enctype="multipart/form-data">
      <input type="file" name="apk" accept=".apk" required />
      <button type="submit">Upload</button>
    </form>
  </body>
</html>
"#;

pub(crate) async fn handle_upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

pub(crate) async fn handle_upload(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        warn!("Upload rejected: {}", rejection.body_text());
        Error::MissingFile
    })?;

    let Some((filename, staged)) = stage_first_file(&mut multipart).await? else {
        warn!("Upload rejected: no file part");
        return Err(Error::MissingFile);
    };

    let settings = &state.upload;
    let key = upload_key(&settings.key_prefix, chrono::Utc::now().timestamp_millis(), &filename);
    let size = staged.size();

    state
        .store
        .put_object(PutObjectRequest {
            bucket: settings.bucket.clone(),
            key: key.clone(),
            body: staged,
            content_type: settings.content_type.clone(),
            acl: AccessControl::Private,
        })
        .await
        .inspect_err(|e| {
            error!(bucket = %settings.bucket, key = %key, kind = ?e.provider_kind(), "Failed to store upload: {}", e)
        })?;

    let download_url = state
        .store
        .presign_get(&settings.bucket, &key, settings.url_expiry)
        .await
        .inspect_err(|e| {
            error!(bucket = %settings.bucket, key = %key, "Failed to presign download URL: {}", e)
        })?;

    info!(bucket = %settings.bucket, key = %key, bytes = size, "Stored upload");
    Ok(Json(UploadResponse { download_url }))
}

/// Storage key for an upload: `<prefix><epoch millis>-<original filename>`
pub fn upload_key(prefix: &str, timestamp_millis: i64, filename: &str) -> String {
    format!("{}{}-{}", prefix, timestamp_millis, filename)
}

/// Spool the first part that carries a filename; other parts are skipped
async fn stage_first_file(multipart: &mut Multipart) -> Result<Option<(String, StagedFile)>> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let staged = spool(&mut field).await?;
        return Ok(Some((filename, staged)));
    }

    Ok(None)
}

async fn spool(field: &mut Field<'_>) -> Result<StagedFile> {
    let (temp, std_file) = tokio::task::spawn_blocking(|| -> std::io::Result<_> {
        let temp = tempfile::NamedTempFile::new()?;
        let file = temp.reopen()?;
        Ok((temp, file))
    })
    .await
    .map_err(|e| Error::Internal(format!("staging task failed: {}", e)))??;
    let mut file = tokio::fs::File::from_std(std_file);
    let mut len = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk).await?;
        len += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(StagedFile::new(temp, len))
}

fn multipart_error(err: MultipartError) -> Error {
    Error::Upload {
        status: err.status(),
        message: err.body_text(),
    }
}
