//! Lab report upload endpoint.
//!
//! `POST /get-lab-tests`: multipart upload of a report photo, answered with
//! the lab-test records found in it.

use std::time::Instant;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, LabTestsResponse};

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// An uploaded report image.
struct Upload {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

/// `POST /get-lab-tests`: extract lab tests from an uploaded image.
///
/// The `file` part must declare an `image/*` content type. Extraction runs
/// on the blocking pool under the configured timeout.
pub async fn get_lab_tests(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<LabTestsResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let upload = read_image_field(multipart).await?;

    tracing::info!(
        %request_id,
        file_name = upload.file_name.as_deref().unwrap_or("-"),
        bytes = upload.bytes.len(),
        "Lab report received"
    );

    let start = Instant::now();
    let extractor = ctx.extractor.clone();
    let bytes = upload.bytes;
    let task = tokio::task::spawn_blocking(move || extractor.extract(&bytes));

    let lab_tests = match tokio::time::timeout(ctx.config.ocr_timeout, task).await {
        Ok(Ok(Ok(tests))) => tests,
        Ok(Ok(Err(e))) => {
            tracing::warn!(%request_id, error = %e, "Lab report extraction failed");
            return Err(e.into());
        }
        Ok(Err(join_err)) => {
            return Err(ApiError::Internal(format!("extraction task failed: {join_err}")));
        }
        Err(_) => {
            // The blocking task keeps running to completion; its result is dropped.
            tracing::warn!(%request_id, "Lab report extraction timed out");
            return Err(ApiError::Timeout(ctx.config.ocr_timeout.as_secs()));
        }
    };

    tracing::info!(
        %request_id,
        records = lab_tests.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Lab report processed"
    );

    Ok(Json(LabTestsResponse::success(lab_tests)))
}

/// Pull the `file` part out of the form, rejecting anything that is not
/// declared as an image. Other parts are ignored.
async fn read_image_field(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Malformed multipart body"))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(ApiError::BadRequest("File must be an image".into()));
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "Failed to read file data"))?;

        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest("No file provided".into()))
}

/// Body-limit rejections keep their 413; every other multipart failure is
/// the client's malformed request.
fn multipart_error(err: MultipartError, context: &str) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("{context}: {}", err.body_text()))
    } else {
        ApiError::BadRequest(format!("{context}: {}", err.body_text()))
    }
}
