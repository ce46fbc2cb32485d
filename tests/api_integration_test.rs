mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use bike_recorder_backend::entities::sea_orm_active_enums::UserRole;
use bike_recorder_backend::utils::auth::create_jwt;
use bike_recorder_backend::utils::hash::calculate_hash;
use bike_recorder_backend::{AppState, create_app};
use common::{CONTENT, TestContext, seed_user};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

struct Harness {
    ctx: TestContext,
    app: Router,
    token: String,
}

impl Harness {
    async fn new() -> Self {
        let ctx = TestContext::new().await;
        let state = AppState::new(ctx.db.clone(), ctx.local_storage(), ctx.config.clone());
        let app = create_app(state);
        let token = create_jwt(&ctx.owner.id.to_string(), &ctx.config.jwt_secret).unwrap();
        Self { ctx, app, token }
    }

    async fn send(&self, req: Request<Body>) -> Response {
        self.app.clone().oneshot(req).await.unwrap()
    }

    async fn create(&self, token: &str, sha256: &str) -> Response {
        let body = json!({
            "trip_id": self.ctx.trip.id,
            "segment_id": self.ctx.segment.id,
            "filename": "segment_0000.mp4",
            "file_type": "video_mp4",
            "sha256": sha256,
            "upload_length": CONTENT.len(),
        });
        self.send(
            Request::builder()
                .method("POST")
                .uri("/uploads")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn create_id(&self, sha256: &str) -> Uuid {
        let response = self.create(&self.token, sha256).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
    }

    async fn head(&self, token: &str, id: Uuid) -> Response {
        self.send(
            Request::builder()
                .method("HEAD")
                .uri(format!("/uploads/{id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn patch(&self, id: Uuid, offset: Option<&str>, chunk: &'static [u8]) -> Response {
        let mut req = Request::builder()
            .method("PATCH")
            .uri(format!("/uploads/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::CONTENT_TYPE, "application/offset+octet-stream");
        if let Some(offset) = offset {
            req = req.header("Upload-Offset", offset);
        }
        self.send(req.body(Body::from(chunk)).unwrap()).await
    }

    async fn attach_metadata(&self, segment_id: Uuid, body: Value) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(format!("/segments/{segment_id}/metadata"))
                .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn header_str(response: &Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_resumable_upload_over_http() {
    let h = Harness::new().await;

    let response = h.create(&h.token, &calculate_hash(CONTENT)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["offset"], 0);
    assert_eq!(body["upload_length"], 13);
    let id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();

    let response = h.head(&h.token, id).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header_str(&response, "upload-offset"), "0");
    assert_eq!(header_str(&response, "upload-length"), "13");
    assert_eq!(header_str(&response, "cache-control"), "no-store");

    let response = h.patch(id, Some("0"), b"bike record").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header_str(&response, "upload-offset"), "11");

    let response = h.head(&h.token, id).await;
    assert_eq!(header_str(&response, "upload-offset"), "11");

    let response = h.patch(id, Some("11"), b"er").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header_str(&response, "upload-offset"), "13");

    let response = h.patch(id, Some("13"), b"").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_patch_errors() {
    let h = Harness::new().await;
    let id = h.create_id(&calculate_hash(CONTENT)).await;

    let response = h.patch(id, None, b"bike").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h.patch(id, Some("abc"), b"bike").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h.patch(id, Some("5"), b"recorder").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("expected 0"));

    let response = h.patch(id, Some("0"), b"bike recorder, too long").await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = h.patch(Uuid::new_v4(), Some("0"), b"bike").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checksum_mismatch_is_unprocessable() {
    let h = Harness::new().await;
    let id = h.create_id(&calculate_hash(CONTENT)).await;

    let response = h.patch(id, Some("0"), b"WRONG DATA!!!").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // The session is dead; the client must start over
    let response = h.patch(id, Some("13"), b"").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_authentication_and_ownership() {
    let h = Harness::new().await;

    let response = h
        .send(
            Request::builder()
                .method("POST")
                .uri("/uploads")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Missing bearer token");

    let response = h.create("not-a-token", &calculate_hash(CONTENT)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Invalid or expired token");

    // Valid signature, but no such user
    let ghost = create_jwt(&Uuid::new_v4().to_string(), &h.ctx.config.jwt_secret).unwrap();
    let response = h.create(&ghost, &calculate_hash(CONTENT)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Unknown user");

    let stranger = seed_user(&h.ctx.db, UserRole::User).await;
    let stranger_token = create_jwt(&stranger.id.to_string(), &h.ctx.config.jwt_secret).unwrap();

    let response = h.create(&stranger_token, &calculate_hash(CONTENT)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let id = h.create_id(&calculate_hash(CONTENT)).await;
    let response = h.head(&stranger_token, id).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_rejects_bad_digest() {
    let h = Harness::new().await;
    let response = h.create(&h.token, "xyz").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("sha256"));
}

#[tokio::test]
async fn test_attach_metadata() {
    let h = Harness::new().await;
    let content = "{\"lat\":52.1,\"lon\":4.3}\n";

    let response = h
        .attach_metadata(
            h.ctx.segment.id,
            json!({ "type": "gps_jsonl", "content": content }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["type"], "gps_jsonl");
    assert_eq!(body["bytes"], content.len());
    assert_eq!(body["sha256"], calculate_hash(content.as_bytes()));
    let uri = body["storage_uri"].as_str().unwrap();
    assert!(uri.ends_with("/metadata_gps_jsonl.txt"));
    assert!(h.ctx.dir.path().join(uri).exists());

    let response = h
        .attach_metadata(
            h.ctx.segment.id,
            json!({ "type": "video_mp4", "content": "nope" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h
        .attach_metadata(
            h.ctx.segment.id,
            json!({ "type": "gps_gpx", "content": "<gpx/>", "filename": "../track.gpx" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h
        .attach_metadata(
            Uuid::new_v4(),
            json!({ "type": "metadata_json", "content": "{}" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_is_public() {
    let h = Harness::new().await;
    let response = h
        .send(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["database"], "connected");
    assert_eq!(body["storage"], "connected");
}
