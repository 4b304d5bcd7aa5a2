//! Smoke tests for the server router, driven through `tower::oneshot`
//! without binding a socket.  No Spotify credentials are required except
//! for the login redirect test, which uses dummy ones.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use vibe_proto::config::SpotifyConfig;
use vibe_server::routes::{router, AppState};
use vibe_server::session::SessionStore;
use vibe_server::spotify::SpotifyClient;

fn test_app() -> axum::Router {
    let config = SpotifyConfig {
        client_id: "test-client-id".into(),
        client_secret: "test-client-secret".into(),
        redirect_uri: "http://127.0.0.1:5000/callback".into(),
    };
    router(AppState {
        store: Arc::new(SessionStore::new()),
        spotify: Arc::new(SpotifyClient::new(config).unwrap()),
    })
}

fn unconfigured_app() -> axum::Router {
    router(AppState {
        store: Arc::new(SessionStore::new()),
        spotify: Arc::new(SpotifyClient::new(SpotifyConfig::default()).unwrap()),
    })
}

async fn get(app: axum::Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_returns_ok() {
    let response = get(test_app(), "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn index_serves_projector_page() {
    let response = get(test_app(), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Vibe Projector"));
    assert!(html.contains("/login"));
}

#[tokio::test]
async fn nowplaying_unauthenticated_is_401() {
    let response = get(test_app(), "/nowplaying").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn nowplaying_with_forged_cookie_is_401() {
    let app = test_app();
    let request = Request::get("/nowplaying")
        .header(header::COOKIE, "vibe_session=not-a-real-session")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_redirects_to_spotify() {
    let response = get(test_app(), "/login").await;
    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with("https://accounts.spotify.com/authorize"));
    assert!(location.contains("state="));
    assert!(location.contains("client_id=test-client-id"));
}

#[tokio::test]
async fn login_without_credentials_is_unavailable() {
    let response = get(unconfigured_app(), "/login").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn logout_redirects_to_root() {
    let response = get(test_app(), "/logout").await;
    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(location, "/");
    // Session cookie is cleared.
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn auth_status_unauthenticated() {
    let response = get(test_app(), "/auth/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["authenticated"], false);
}

#[tokio::test]
async fn callback_rejects_forged_state() {
    let response = get(test_app(), "/callback?code=abc&state=forged").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn callback_without_params_is_bad_request() {
    let response = get(test_app(), "/callback").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let response = get(test_app(), "/nonexistent-endpoint").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
