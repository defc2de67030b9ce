/// HTTP surface tests
///
/// Run with: cargo test --test web_tests
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tx_adapter::adapter::config::AppConfig;
use tx_adapter::adapter::init::AppInitializer;
use tx_adapter::adapter::web::create_router::create_router;
use tx_adapter::adapter::web::dto::user::UserWebOutput;

async fn app() -> Router {
    let state = AppInitializer::initialize(&AppConfig::default())
        .await
        .unwrap();
    create_router(state)
}

fn post_user(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/users")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_create_then_fetch_user() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_user(
            json!({"id": 1, "name": "alice", "email": "alice@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: UserWebOutput = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(created.id, 1);

    let response = app.oneshot(request("GET", "/users/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let user: UserWebOutput = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        user,
        UserWebOutput {
            id: 1,
            name: "alice".to_string(),
            email: "alice@example.com".to_string(),
        }
    );
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let app = app().await;

    let response = app.clone().oneshot(request("GET", "/users/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(request("DELETE", "/users/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_email_conflicts_and_leaves_no_row() {
    let app = app().await;

    let first = app
        .clone()
        .oneshot(post_user(
            json!({"id": 1, "name": "alice", "email": "alice@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .clone()
        .oneshot(post_user(
            json!({"id": 2, "name": "impostor", "email": "alice@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert!(body_text(second).await.contains("users_email_key"));

    let response = app.oneshot(request("GET", "/users/2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_input_is_unprocessable() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_user(json!({"id": 3, "name": "  ", "email": "x@example.com"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(post_user(json!({"id": 3, "name": "carol", "email": "not-an-email"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_delete_removes_user() {
    let app = app().await;

    let created = app
        .clone()
        .oneshot(post_user(
            json!({"id": 7, "name": "dave", "email": "dave@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(request("DELETE", "/users/7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(request("GET", "/users/7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_creates_both_succeed() {
    let app = app().await;

    let (first, second) = tokio::join!(
        app.clone().oneshot(post_user(
            json!({"id": 11, "name": "erin", "email": "erin@example.com"}),
        )),
        app.clone().oneshot(post_user(
            json!({"id": 12, "name": "frank", "email": "frank@example.com"}),
        )),
    );
    assert_eq!(first.unwrap().status(), StatusCode::CREATED);
    assert_eq!(second.unwrap().status(), StatusCode::CREATED);

    for uri in ["/users/11", "/users/12"] {
        let response = app.clone().oneshot(request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
