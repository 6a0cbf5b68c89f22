//! Sending images to the hosting endpoint.

use bytes::Bytes;
use http::StatusCode;
use sendraft_common::{ApiRequest, ApiResponse, FilePart, HttpClient, RequestBody};
use serde::Deserialize;

use crate::types::{ImageKind, UploadOutcome};

pub const IMAGES_PATH: &str = "/v1/images";

#[derive(Debug, Deserialize)]
struct UploadedImage {
    image: Option<String>,
}

/// Interpret the response to an image upload.
pub fn classify_upload(response: &ApiResponse) -> UploadOutcome {
    let status = response.status;
    if status.is_success() {
        let url = response
            .json::<UploadedImage>()
            .ok()
            .and_then(|uploaded| uploaded.image)
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty());
        match url {
            Some(url) => UploadOutcome::Success { url },
            None => UploadOutcome::HttpFailure {
                status,
                body: response.text().into_owned(),
            },
        }
    } else if status == StatusCode::FORBIDDEN {
        UploadOutcome::AuthFailure
    } else {
        UploadOutcome::HttpFailure {
            status,
            body: response.text().into_owned(),
        }
    }
}

/// Upload one image. Never retries; every failure comes back as an outcome.
#[tracing::instrument(skip(client, api_key, bytes), fields(bytes = bytes.len(), mime = kind.mime_type()))]
pub async fn upload_image<C: HttpClient>(
    client: &C,
    api_key: &str,
    file_name: &str,
    kind: ImageKind,
    bytes: Bytes,
) -> UploadOutcome {
    let request = ApiRequest::post(
        IMAGES_PATH,
        api_key,
        RequestBody::Multipart(FilePart {
            field: "image",
            file_name: file_name.to_owned(),
            mime_type: kind.mime_type(),
            bytes,
        }),
    );

    let outcome = match client.send(request).await {
        Ok(response) => classify_upload(&response),
        Err(e) => UploadOutcome::NetworkFailure {
            message: e.to_string(),
        },
    };

    match &outcome {
        UploadOutcome::Success { url } => tracing::info!(%url, "uploaded image"),
        UploadOutcome::AuthFailure => {
            tracing::error!("image upload rejected with 403, check the API key")
        }
        UploadOutcome::HttpFailure { status, body } => {
            tracing::error!(%status, %body, "image upload failed")
        }
        UploadOutcome::NetworkFailure { message } => {
            tracing::error!(error = %message, "error uploading image")
        }
        UploadOutcome::Skipped(_) => {}
    }
    outcome
}
