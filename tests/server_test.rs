//! Router tests driven through `tower::ServiceExt::oneshot`.
#![cfg(feature = "server")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{ScriptedGateway, configured, image_reply, library_store, unconfigured};
use readaloud::server::{AppState, AuthRole, TokenTable, build_router};
use readaloud::store::{MemoryBlobStore, MemoryRowStore, RowStore, VOCABULARY_TABLE, library};
use readaloud::{AiConfig, CallProfiles, Orchestrator, RetryPolicy};

const USER: &str = "user-token";
const ADMIN: &str = "admin-token";

struct Harness {
    router: Router,
    store: Arc<MemoryRowStore>,
    blobs: Arc<MemoryBlobStore>,
    gateway: Arc<ScriptedGateway>,
}

fn harness(gateway: ScriptedGateway, config: &AiConfig) -> Harness {
    let gateway = Arc::new(gateway);
    let store = Arc::new(library_store());
    let blobs = Arc::new(MemoryBlobStore::default());
    let orchestrator = Orchestrator::new(gateway.clone(), config)
        .with_profiles(CallProfiles::default().with_retry(RetryPolicy::disabled()));
    let tokens = TokenTable::new([
        (USER.to_string(), AuthRole::User),
        (ADMIN.to_string(), AuthRole::Admin),
    ]);
    let state = AppState::new(orchestrator, store.clone(), blobs.clone(), tokens)
        .item_delay(Duration::ZERO);
    Harness {
        router: build_router(state),
        store,
        blobs,
        gateway,
    }
}

fn offline() -> Harness {
    harness(ScriptedGateway::replying("{}"), &unconfigured())
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).expect("request builds")
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("request succeeds");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, body)
}

#[tokio::test]
async fn healthz_needs_no_token() {
    let h = offline();
    let (status, body) = send(&h.router, get("/api/healthz", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ai"], "unavailable");
    assert_eq!(body["store"], "memory");
    assert!(body["build"]["version"].is_string());
}

#[tokio::test]
async fn missing_or_unknown_token_is_401() {
    let h = offline();
    let request = json!({"transcript": "hi", "targetText": "hi"});

    let (status, body) = send(&h.router, post("/api/chat/evaluate-pronunciation", None, request.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(
        &h.router,
        post("/api/chat/evaluate-pronunciation", Some("stolen"), request),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_plain_users() {
    let h = offline();
    let (status, body) = send(
        &h.router,
        post("/api/books/batch-analyze", Some(USER), json!({"bookId": "b1"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn missing_fields_are_400_with_field_name() {
    let h = offline();
    let cases = [
        ("/api/chat/evaluate-pronunciation", json!({"transcript": "hi"}), "targetText"),
        ("/api/chat/evaluate-pronunciation", json!({"targetText": "hi"}), "transcript"),
        ("/api/chat/evaluate-pronunciation", json!({"transcript": "hi", "targetText": "  "}), "targetText"),
        ("/api/books/extract-vocabulary", json!({}), "description"),
        ("/api/books/extract-vocabulary", json!({"description": "a fox", "difficultyLevel": "expert"}), "difficultyLevel"),
        ("/api/books/extract-vocabulary", json!({"description": "a fox", "maxWords": 0}), "maxWords"),
        ("/api/books/analyze-image", json!({"context": "cover"}), "imageUrl"),
    ];
    for (uri, body, field) in cases {
        let (status, response) = send(&h.router, post(uri, Some(USER), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {field}");
        assert_eq!(response["field"], field, "{uri}");
    }

    let (status, response) = send(
        &h.router,
        post("/api/books/batch-analyze", Some(ADMIN), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["field"], "bookId");
}

#[tokio::test]
async fn invalid_json_is_400() {
    let h = offline();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chat/evaluate-pronunciation")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {USER}"))
        .body(Body::from("{not json"))
        .expect("request builds");
    let (status, body) = send(&h.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "body");
}

#[tokio::test]
async fn pronunciation_falls_back_without_ai() {
    let h = offline();
    let (status, body) = send(
        &h.router,
        post(
            "/api/chat/evaluate-pronunciation",
            Some(USER),
            json!({"transcript": "the cat sat", "targetText": "The cat sat.", "confidence": 0.9}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "heuristic");
    assert_eq!(body["fallbackReason"], "unconfigured");
    assert_eq!(body["accuracyScore"], 100);
    assert_eq!(body["pronunciationScore"], 90);
    assert_eq!(body["fluencyScore"], 100);
    assert!(!body["suggestions"].as_array().unwrap().is_empty());
    assert_eq!(h.gateway.call_count(), 0);
}

#[tokio::test]
async fn out_of_range_confidence_is_clamped() {
    let h = offline();
    for (confidence, score) in [(3.0, 100), (-0.5, 0)] {
        let (status, body) = send(
            &h.router,
            post(
                "/api/chat/evaluate-pronunciation",
                Some(USER),
                json!({"transcript": "the cat", "targetText": "the cat", "confidence": confidence}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pronunciationScore"], score);
    }
}

#[tokio::test]
async fn provider_failure_still_answers_200() {
    let h = harness(
        ScriptedGateway::failing(readaloud::GatewayError::Http {
            status: 502,
            body: "bad gateway".into(),
        }),
        &configured(),
    );
    let (status, body) = send(
        &h.router,
        post(
            "/api/books/analyze-image",
            Some(USER),
            json!({"imageUrl": "https://img.test/c.png", "context": "COVER"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "heuristic");
    assert_eq!(body["fallbackReason"], "http");
    assert!(body["description"].as_str().unwrap().len() > 10);
    assert!(body.get("persisted").is_none());
}

#[tokio::test]
async fn image_with_page_id_persists_description() {
    let h = harness(
        ScriptedGateway::replying(image_reply("A fox looks at the moon.")),
        &configured(),
    );
    let (status, body) = send(
        &h.router,
        post(
            "/api/books/analyze-image",
            Some(USER),
            json!({"imageUrl": "https://img.test/1.png", "pageId": "p1"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "ai");
    assert_eq!(body["description"], "A fox looks at the moon.");
    assert_eq!(body["persisted"]["status"], "applied");
    let page = library::find_page(h.store.as_ref(), "p1").await.unwrap().unwrap();
    assert_eq!(page.description.as_deref(), Some("A fox looks at the moon."));
}

#[tokio::test]
async fn image_for_unknown_page_is_404() {
    let h = offline();
    let (status, body) = send(
        &h.router,
        post(
            "/api/books/analyze-image",
            Some(USER),
            json!({"imageUrl": "https://img.test/1.png", "pageId": "p404"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["field"], "pageId");
}

#[tokio::test]
async fn vocabulary_is_saved_once_per_word_and_listed() {
    let h = offline();
    let request = json!({
        "description": "The brave little fox jumped over the lazy sleeping dog",
        "maxWords": 3,
        "bookId": "b1"
    });

    let (status, first) = send(&h.router, post("/api/books/extract-vocabulary", Some(USER), request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["source"], "heuristic");
    assert_eq!(first["vocabulary"].as_array().unwrap().len(), 3);
    assert_eq!(first["persisted"]["status"], "applied");
    assert_eq!(first["saved"], json!(["brave", "little", "jumped"]));

    let (_, second) = send(&h.router, post("/api/books/extract-vocabulary", Some(USER), request)).await;
    assert_eq!(second["saved"], json!([]));
    assert_eq!(second["duplicates"], json!(["brave", "little", "jumped"]));
    assert_eq!(h.store.rows(VOCABULARY_TABLE).await.len(), 3);

    let (status, list) = send(&h.router, get("/api/vocabulary?bookId=b1&limit=2", Some(USER))).await;
    assert_eq!(status, StatusCode::OK);
    let words: Vec<&str> = list["vocabulary"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["word"].as_str().unwrap())
        .collect();
    assert_eq!(words, vec!["brave", "jumped"]);
    assert_eq!(list["vocabulary"][0]["bookIds"], json!(["b1"]));

    let (_, other) = send(&h.router, get("/api/vocabulary?bookId=b9", Some(USER))).await;
    assert!(other["vocabulary"].as_array().unwrap().is_empty());

    let (status, bad) = send(&h.router, get("/api/vocabulary?difficulty=expert", Some(USER))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(bad["field"], "difficulty");
}

#[tokio::test]
async fn vocabulary_for_unknown_book_is_404() {
    let h = offline();
    let (status, body) = send(
        &h.router,
        post(
            "/api/books/extract-vocabulary",
            Some(USER),
            json!({"description": "a fox", "bookId": "nope"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["field"], "bookId");
}

#[tokio::test]
async fn batch_analyze_reports_per_page() {
    let h = harness(
        ScriptedGateway::replying(image_reply("Batch text.")),
        &configured(),
    );
    let (status, body) = send(
        &h.router,
        post("/api/books/batch-analyze", Some(ADMIN), json!({"bookId": "b1"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookId"], "b1");
    assert_eq!(body["totalItems"], 3);
    assert_eq!(body["analyzed"], 2);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["details"][0]["itemId"], "p1");
    assert_eq!(body["details"][1]["status"], "skipped");
    assert_eq!(h.gateway.call_count(), 2);

    let (status, _) = send(
        &h.router,
        post("/api/books/batch-analyze", Some(ADMIN), json!({"bookId": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn image_request(method: Method, uri: &str, token: &str, content_type: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    builder.body(Body::from(body)).expect("request builds")
}

#[tokio::test]
async fn page_image_upload_and_removal() {
    let h = offline();
    let uri = "/api/books/b1/pages/p1/image";

    let (status, _) = send(&h.router, image_request(Method::PUT, uri, USER, Some("image/png"), vec![1, 2, 3])).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&h.router, image_request(Method::PUT, uri, ADMIN, Some("text/plain"), vec![1])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "Content-Type");

    let (status, _) = send(
        &h.router,
        image_request(Method::PUT, "/api/books/b9/pages/p1/image", ADMIN, Some("image/png"), vec![1]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&h.router, image_request(Method::PUT, uri, ADMIN, Some("image/png"), vec![1, 2, 3])).await;
    assert_eq!(status, StatusCode::OK);
    let url = body["imageUrl"].as_str().unwrap().to_string();
    assert!(url.ends_with("pages/b1/p1"), "{url}");
    assert_eq!(h.blobs.len().await, 1);
    let page = library::find_page(h.store.as_ref(), "p1").await.unwrap().unwrap();
    assert_eq!(page.image_url.as_deref(), Some(url.as_str()));

    let (status, _) = send(&h.router, image_request(Method::DELETE, uri, ADMIN, None, Vec::new())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(h.blobs.is_empty().await);
    let page = library::find_page(h.store.as_ref(), "p1").await.unwrap().unwrap();
    assert_eq!(page.image_url, None);
    assert_eq!(h.store.name(), "memory");
}
