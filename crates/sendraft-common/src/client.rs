//! HTTP transport for the newsletter API.
//!
//! The pipeline talks to the API through the [`HttpClient`] trait so the remote service
//! can be swapped out in tests. [`ReqwestClient`] is the real implementation.

use std::borrow::Cow;

use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::TransportError;

/// A file sent as one field of a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name
    pub field: &'static str,
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(FilePart),
}

/// A request against the API, relative to the configured endpoint.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the endpoint, e.g. `/v1/images`
    pub path: &'static str,
    /// Sent as `Authorization: Token <api_key>`
    pub api_key: String,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn post(path: &'static str, api_key: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: Method::POST,
            path,
            api_key: api_key.into(),
            body,
        }
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Sends API requests. A returned `Err` means no response was received at all;
/// any status code, including errors, comes back as `Ok`.
#[trait_variant::make(Send)]
pub trait HttpClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

pub struct ReqwestClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ReqwestClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl HttpClient for ReqwestClient {
    #[tracing::instrument(skip_all, fields(method = %request.method, path = request.path))]
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url(request.path);
        let builder = self
            .client
            .request(request.method, &url)
            .header(AUTHORIZATION, format!("Token {}", request.api_key));

        let builder = match request.body {
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(part) => {
                let file = reqwest::multipart::Part::bytes(part.bytes.to_vec())
                    .file_name(part.file_name)
                    .mime_str(part.mime_type)
                    .map_err(|e| TransportError::Build {
                        url: url.clone(),
                        message: e.to_string(),
                    })?;
                builder.multipart(reqwest::multipart::Form::new().part(part.field, file))
            }
        };

        let response = builder.send().await.map_err(|e| TransportError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| TransportError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!(%status, bytes = body.len(), "response received");

        Ok(ApiResponse { status, body })
    }
}
