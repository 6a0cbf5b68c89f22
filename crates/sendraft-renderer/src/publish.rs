//! Creating the draft email.

use sendraft_common::{ApiRequest, ApiResponse, HttpClient, RequestBody};
use serde::Deserialize;

use crate::types::{PublishFailure, PublishOutcome};

pub const EMAILS_PATH: &str = "/v1/emails";

/// JSON payload for the draft endpoint.
pub fn draft_payload(title: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "body": body,
        "subject": title,
        "status": "draft",
    })
}

#[derive(Debug, Deserialize)]
struct CreatedEmail {
    id: Option<String>,
}

pub fn classify_publish(response: &ApiResponse) -> PublishOutcome {
    if response.status.is_success() {
        let id = response
            .json::<CreatedEmail>()
            .ok()
            .and_then(|email| email.id);
        PublishOutcome::Published { id }
    } else {
        PublishOutcome::Failed(PublishFailure::Http {
            status: response.status,
            body: response.text().into_owned(),
        })
    }
}

/// Submit `body` as a draft titled `title`.
#[tracing::instrument(skip(client, api_key, body), fields(bytes = body.len()))]
pub async fn publish_draft<C: HttpClient>(
    client: &C,
    api_key: &str,
    title: &str,
    body: &str,
) -> PublishOutcome {
    let request = ApiRequest::post(
        EMAILS_PATH,
        api_key,
        RequestBody::Json(draft_payload(title, body)),
    );

    let outcome = match client.send(request).await {
        Ok(response) => classify_publish(&response),
        Err(e) => PublishOutcome::Failed(PublishFailure::Network {
            message: e.to_string(),
        }),
    };

    match &outcome {
        PublishOutcome::Published { id } => tracing::info!(id = ?id, "draft created"),
        PublishOutcome::Failed(failure) => {
            tracing::error!(error = %failure, "something went wrong creating the draft")
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_payload_shape() {
        assert_eq!(
            draft_payload("Weekly", "Hello"),
            serde_json::json!({"body": "Hello", "subject": "Weekly", "status": "draft"})
        );
    }

    #[test]
    fn test_created() {
        let response = ApiResponse::new(StatusCode::CREATED, r#"{"id":"e-1","status":"draft"}"#);
        assert_eq!(
            classify_publish(&response),
            PublishOutcome::Published {
                id: Some("e-1".into())
            }
        );
        let response = ApiResponse::new(StatusCode::OK, "");
        assert_eq!(
            classify_publish(&response),
            PublishOutcome::Published { id: None }
        );
    }

    #[test]
    fn test_failed() {
        let response = ApiResponse::new(StatusCode::BAD_REQUEST, "subject required");
        assert_eq!(
            classify_publish(&response),
            PublishOutcome::Failed(PublishFailure::Http {
                status: StatusCode::BAD_REQUEST,
                body: "subject required".into()
            })
        );
    }
}
