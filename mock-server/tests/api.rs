use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use ice_mock_server::{app, Created, Rejection, NULL_VALUE_ISSUE};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn peer() -> SocketAddr {
    "198.51.100.7:41000".parse().unwrap()
}

// --- my_ip ---

#[tokio::test]
async fn my_ip_returns_peer_address_as_text() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v2/my_ip")
                .extension(ConnectInfo(peer()))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(&body_bytes(resp).await[..], b"198.51.100.7\n");
}

#[tokio::test]
async fn my_ip_prefers_first_forwarded_hop() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v2/my_ip")
                .header("x-forwarded-for", "203.0.113.5, 10.0.0.1")
                .extension(ConnectInfo(peer()))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"203.0.113.5\n");
}

#[tokio::test]
async fn my_ip_without_peer_info_is_500() {
    let resp = app()
        .oneshot(Request::builder().uri("/v2/my_ip").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- store ---

#[tokio::test]
async fn store_instance_returns_201_with_id() {
    let resp = app()
        .oneshot(json_request("/v2/instances", r#"{"name":"worker-1"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Created = body_json(resp).await;
    assert_eq!(created.status, "OK");
    assert!(!created.id.is_nil());
}

#[tokio::test]
async fn store_instance_null_fields_are_issues() {
    let resp = app()
        .oneshot(json_request(
            "/v2/instances",
            r#"{"name":null,"owner":null,"tags":["a"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let rejection: Rejection = body_json(resp).await;
    assert_eq!(rejection.status, "ERR");
    assert_eq!(rejection.error.code, 422);
    assert_eq!(rejection.issues.len(), 2);
    assert_eq!(rejection.issues["name"], NULL_VALUE_ISSUE);
    assert_eq!(rejection.issues["owner"], NULL_VALUE_ISSUE);
}

#[tokio::test]
async fn store_instance_non_object_is_rejected_without_issues() {
    let resp = app()
        .oneshot(json_request("/v2/instances", r#"["not","an","object"]"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body["_error"]["message"], "Instance must be a JSON object");
    assert!(body.get("_issues").is_none());
}

#[tokio::test]
async fn store_instance_malformed_json_is_a_client_error() {
    let resp = app()
        .oneshot(json_request("/v2/instances", "{not json"))
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}

// --- read back ---

#[tokio::test]
async fn get_instance_not_found() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v2/instances/00000000-0000-0000-0000-000000000000")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_instance_bad_uuid_returns_400() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v2/instances/not-a-uuid")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_then_read_back() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("/v2/instances", r#"{"name":"worker-1","port":8080}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: Created = body_json(resp).await;

    // Same payload again: a second, distinct record.
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("/v2/instances", r#"{"name":"worker-1","port":8080}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let second: Created = body_json(resp).await;
    assert_ne!(first.id, second.id);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .uri(format!("/v2/instances/{}", first.id))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let record: Value = body_json(resp).await;
    assert_eq!(record["_id"], first.id.to_string());
    assert_eq!(record["name"], "worker-1");
    assert_eq!(record["port"], 8080);
}
