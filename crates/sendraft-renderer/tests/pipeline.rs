// End-to-end runs against an in-process fake of the newsletter API.

use std::collections::HashMap;
use std::io::Cursor;
use std::num::NonZeroU32;
use std::sync::Mutex;

use bytes::Bytes;
use http::StatusCode;
use sendraft_common::{
    ApiRequest, ApiResponse, Config, HttpClient, RequestBody, ResizeMode, TransportError,
};
use sendraft_renderer::{
    MemoryStore, Pipeline, PublishFailure, PublishOutcome, SkipReason, UploadOutcome, VaultStore,
};

#[derive(Clone)]
enum Reply {
    Respond(StatusCode, String),
    Unreachable,
}

/// Records every request. Uploads answer with a CDN URL named after the file unless a
/// reply is registered for that file name.
#[derive(Default)]
struct FakeApi {
    uploads: HashMap<String, Reply>,
    draft: Option<Reply>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeApi {
    fn fail_upload(mut self, file_name: &str, reply: Reply) -> Self {
        self.uploads.insert(file_name.to_owned(), reply);
        self
    }

    fn fail_draft(mut self, reply: Reply) -> Self {
        self.draft = Some(reply);
        self
    }

    fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn uploads_sent(&self) -> Vec<(String, Bytes)> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r.body {
                RequestBody::Multipart(part) => Some((part.file_name, part.bytes)),
                RequestBody::Json(_) => None,
            })
            .collect()
    }
}

impl HttpClient for FakeApi {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = match &request.body {
            RequestBody::Multipart(part) => {
                self.uploads.get(&part.file_name).cloned().unwrap_or_else(|| {
                    Reply::Respond(
                        StatusCode::CREATED,
                        format!(r#"{{"image":"https://cdn.example/{}"}}"#, part.file_name),
                    )
                })
            }
            RequestBody::Json(_) => self.draft.clone().unwrap_or_else(|| {
                Reply::Respond(StatusCode::CREATED, r#"{"id":"draft-1"}"#.to_owned())
            }),
        };
        match reply {
            Reply::Respond(status, body) => Ok(ApiResponse::new(status, body)),
            Reply::Unreachable => Err(TransportError::Request {
                url: request.path.to_owned(),
                message: "connection refused".into(),
            }),
        }
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn config() -> Config {
    Config {
        api_key: "test-key".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_image_round_trip() {
    let store = MemoryStore::new().with("img.png", png(10, 10));
    let pipeline = Pipeline::new(&config(), store, FakeApi::default());

    let result = pipeline.run("Weekly", "Hello ![a](img.png) world").await.unwrap();

    insta::assert_snapshot!(result.body, @"Hello ![a](https://cdn.example/img.png) world");
    assert!(result.is_published());
    assert_eq!(
        result.publish,
        PublishOutcome::Published {
            id: Some("draft-1".into())
        }
    );

    let requests = pipeline.client().requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/v1/images");
    assert_eq!(requests[1].path, "/v1/emails");
    assert!(requests.iter().all(|r| r.api_key == "test-key"));
    match &requests[1].body {
        RequestBody::Json(payload) => assert_eq!(
            payload,
            &serde_json::json!({
                "body": "Hello ![a](https://cdn.example/img.png) world",
                "subject": "Weekly",
                "status": "draft",
            })
        ),
        other => panic!("expected json body, got {other:?}"),
    }
}

#[tokio::test]
async fn test_small_image_uploaded_byte_for_byte() {
    let original = png(40, 30);
    let store = MemoryStore::new().with("attachments/photo.png", original.clone());
    let pipeline = Pipeline::new(&config(), store, FakeApi::default());

    let result = pipeline.run("t", "![[photo.png]]").await.unwrap();

    assert_eq!(result.body, "![](https://cdn.example/photo.png)");
    assert!(result.references[0].resize.is_none());
    let uploads = pipeline.client().uploads_sent();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1.as_ref(), original.as_slice());
}

#[tokio::test]
async fn test_large_image_resized_before_upload() {
    let config = Config {
        api_key: "k".into(),
        side_preference: ResizeMode::Width,
        resize_limit: NonZeroU32::new(20).unwrap(),
        ..Default::default()
    };
    let store = MemoryStore::new().with("wide.png", png(80, 40));
    let pipeline = Pipeline::new(&config, store, FakeApi::default());

    let result = pipeline.run("t", "![wide](wide.png)").await.unwrap();

    let resize = result.references[0].resize.unwrap();
    assert_eq!(resize.from, (80, 40));
    assert_eq!(resize.to, (20, 10));
    let uploads = pipeline.client().uploads_sent();
    let uploaded = image::load_from_memory(&uploads[0].1).unwrap();
    assert_eq!((uploaded.width(), uploaded.height()), (20, 10));
}

#[tokio::test]
async fn test_auth_failure_does_not_stop_other_images() {
    let store = MemoryStore::new()
        .with("one.png", png(4, 4))
        .with("two.png", png(4, 4))
        .with("three.png", png(4, 4));
    let api = FakeApi::default().fail_upload(
        "two.png",
        Reply::Respond(StatusCode::FORBIDDEN, "forbidden".into()),
    );
    let pipeline = Pipeline::new(&config(), store, api);

    let body = "![1](one.png)\n![2](two.png)\n![3](three.png)\n";
    let result = pipeline.run("t", body).await.unwrap();

    insta::assert_snapshot!(result.body.trim_end(), @r"
    ![1](https://cdn.example/one.png)
    ![2](two.png)
    ![3](https://cdn.example/three.png)
    ");
    let outcomes: Vec<_> = result.references.iter().map(|r| &r.outcome).collect();
    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[1], &UploadOutcome::AuthFailure);
    assert!(outcomes[2].is_success());
    assert_eq!(result.uploaded(), 2);
    assert!(result.is_published());
}

#[tokio::test]
async fn test_network_and_server_errors_leave_markers() {
    let store = MemoryStore::new()
        .with("a.png", png(4, 4))
        .with("b.png", png(4, 4));
    let api = FakeApi::default()
        .fail_upload("a.png", Reply::Unreachable)
        .fail_upload(
            "b.png",
            Reply::Respond(StatusCode::INTERNAL_SERVER_ERROR, "oops".into()),
        );
    let pipeline = Pipeline::new(&config(), store, api);

    let body = "![](a.png) ![](b.png)";
    let result = pipeline.run("t", body).await.unwrap();

    assert_eq!(result.body, body);
    assert!(matches!(
        result.references[0].outcome,
        UploadOutcome::NetworkFailure { .. }
    ));
    assert!(matches!(
        &result.references[1].outcome,
        UploadOutcome::HttpFailure { status, body } if *status == StatusCode::INTERNAL_SERVER_ERROR && body == "oops"
    ));
    assert!(result.references.iter().all(|r| r.outcome.is_failure()));
}

#[tokio::test]
async fn test_skipped_references_are_reported() {
    let store = MemoryStore::new()
        .with("doc.pdf", b"%PDF-1.4".to_vec())
        .with("broken.png", b"not really an image".to_vec());
    let pipeline = Pipeline::new(&config(), store, FakeApi::default());

    let body = "![](missing.png) ![](doc.pdf) ![](broken.png) ![](https://cdn.example/x.png)";
    let result = pipeline.run("t", body).await.unwrap();

    assert_eq!(result.body, body);
    let reasons: Vec<_> = result
        .references
        .iter()
        .map(|r| match &r.outcome {
            UploadOutcome::Skipped(reason) => reason.clone(),
            other => panic!("expected skip, got {other:?}"),
        })
        .collect();
    assert_eq!(reasons[0], SkipReason::Unresolved);
    assert_eq!(
        reasons[1],
        SkipReason::UnsupportedType {
            extension: "pdf".into()
        }
    );
    assert!(matches!(reasons[2], SkipReason::Unreadable { .. }));
    assert_eq!(reasons[3], SkipReason::RemoteUrl);

    // only the draft itself went out
    let requests = pipeline.client().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/v1/emails");
}

#[tokio::test]
async fn test_publish_failure_is_reported() {
    let store = MemoryStore::new().with("img.png", png(4, 4));
    let api = FakeApi::default().fail_draft(Reply::Respond(
        StatusCode::BAD_REQUEST,
        r#"{"detail":"bad"}"#.into(),
    ));
    let pipeline = Pipeline::new(&config(), store, api);

    let result = pipeline.run("t", "![a](img.png)").await.unwrap();

    // the upload already happened and the rewritten body is still returned
    assert_eq!(result.body, "![a](https://cdn.example/img.png)");
    assert!(!result.is_published());
    assert_eq!(
        result.publish,
        PublishOutcome::Failed(PublishFailure::Http {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"detail":"bad"}"#.into(),
        })
    );
}

#[tokio::test]
async fn test_unreachable_publish() {
    let api = FakeApi::default().fail_draft(Reply::Unreachable);
    let pipeline = Pipeline::new(&config(), MemoryStore::new(), api);

    let result = pipeline.run("t", "no images").await.unwrap();

    assert_eq!(result.body, "no images");
    assert!(matches!(
        result.publish,
        PublishOutcome::Failed(PublishFailure::Network { .. })
    ));
}

#[tokio::test]
async fn test_duplicate_markers_each_consume_one_occurrence() {
    let store = MemoryStore::new().with("x.png", png(4, 4));
    let pipeline = Pipeline::new(&config(), store, FakeApi::default());

    let result = pipeline.run("t", "![a](x.png) and ![a](x.png)").await.unwrap();

    assert_eq!(
        result.body,
        "![a](https://cdn.example/x.png) and ![a](https://cdn.example/x.png)"
    );
    assert_eq!(pipeline.client().uploads_sent().len(), 2);
}

#[tokio::test]
async fn test_vault_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("notes/attachments")).unwrap();
    std::fs::write(dir.path().join("notes/attachments/diagram.png"), png(6, 6)).unwrap();
    std::fs::write(dir.path().join("notes/post.md"), "not an image").unwrap();

    let vault = VaultStore::open(dir.path()).unwrap();
    let pipeline = Pipeline::new(&config(), vault, FakeApi::default());

    let result = pipeline
        .run("Post", "Intro\n\n![[diagram.png|300]]\n\n![d](attachments/diagram.png)\n")
        .await
        .unwrap();

    insta::assert_snapshot!(result.body.trim_end(), @r"
    Intro

    ![](https://cdn.example/diagram.png)

    ![d](https://cdn.example/diagram.png)
    ");
    assert_eq!(result.uploaded(), 2);
}
