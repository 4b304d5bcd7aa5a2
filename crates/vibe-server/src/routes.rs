//! HTTP routes: the projector page, the OAuth glue, and `/nowplaying`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use vibe_proto::snapshot::{ErrorBody, ErrorKind};

use crate::session::{SessionStore, TokenData, SESSION_COOKIE};
use crate::spotify::{SpotifyClient, SpotifyError, TokenResponse};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub spotify: Arc<SpotifyClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .route("/auth/status", get(auth_status))
        .route("/nowplaying", get(now_playing))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn index() -> Html<&'static str> {
    Html(
        "<!doctype html>\n<html>\n<head><title>Vibe Projector</title></head>\n<body>\n\
         <h1>Vibe Projector</h1>\n\
         <p>Run <code>vibe</code> in a terminal for the fullscreen display.</p>\n\
         <p><a href=\"/login\">Connect Spotify</a></p>\n\
         </body>\n</html>\n",
    )
}

async fn login(State(state): State<AppState>) -> Response {
    if !state.spotify.config().is_configured() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "Spotify credentials not configured",
        )
            .into_response();
    }
    let nonce = state.store.issue_state(now_ts()).await;
    match state.spotify.authorize_url(&nonce) {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => {
            warn!("failed to build authorize URL: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
    if let Some(err) = query.error {
        warn!("authorization denied: {err}");
        return Redirect::to("/").into_response();
    }
    let (Some(code), Some(nonce)) = (query.code, query.state) else {
        return (StatusCode::BAD_REQUEST, "missing code or state").into_response();
    };
    if !state.store.take_state(&nonce, now_ts()).await {
        warn!("callback with unknown or expired state nonce");
        return (StatusCode::BAD_REQUEST, "invalid state").into_response();
    }

    match state.spotify.exchange_code(&code).await {
        Ok(tokens) => {
            let tokens = TokenData::from_response(tokens, None, now_ts());
            let id = state.store.create(tokens).await;
            info!("session established");
            let mut response = Redirect::to("/").into_response();
            response.headers_mut().insert(
                header::SET_COOKIE,
                session_cookie(&id).parse().expect("valid cookie header"),
            );
            response
        }
        Err(e) => {
            warn!("token exchange failed: {e}");
            (StatusCode::BAD_GATEWAY, "token exchange failed").into_response()
        }
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        state.store.remove(&id).await;
    }
    let mut response = Redirect::to("/").into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
            .parse()
            .expect("valid cookie header"),
    );
    response
}

async fn auth_status(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let authenticated = match session_id(&headers) {
        Some(id) => state.store.get(&id).await.is_some(),
        None => false,
    };
    Json(json!({ "authenticated": authenticated }))
}

async fn now_playing(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return unauthorized();
    };
    let Some(mut tokens) = state.store.get(&id).await else {
        return unauthorized();
    };

    let now = now_ts();
    if tokens.is_expired(now) {
        match refresh_with_retry(&state.spotify, &tokens.refresh_token).await {
            Ok(resp) => {
                tokens = TokenData::from_response(resp, Some(&tokens.refresh_token), now);
                state.store.update(&id, tokens.clone()).await;
            }
            Err(e) => {
                warn!("token refresh failed after retry: {e}");
                state.store.remove(&id).await;
                return unauthorized();
            }
        }
    }

    match state.spotify.now_playing(&tokens.access_token).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(SpotifyError::Unauthorized) => {
            state.store.remove(&id).await;
            unauthorized()
        }
        Err(SpotifyError::Network(e)) => {
            warn!("spotify unreachable: {e}");
            error_response(StatusCode::SERVICE_UNAVAILABLE, ErrorKind::Network)
        }
        Err(SpotifyError::Upstream(status)) => {
            warn!("spotify returned {status}");
            error_response(StatusCode::SERVICE_UNAVAILABLE, ErrorKind::Upstream)
        }
        Err(SpotifyError::Malformed(msg)) => {
            warn!("unparseable spotify response: {msg}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Malformed)
        }
    }
}

/// Refresh the access token; on failure retry once before giving up.
async fn refresh_with_retry(
    spotify: &SpotifyClient,
    refresh_token: &str,
) -> Result<TokenResponse, SpotifyError> {
    match spotify.refresh(refresh_token).await {
        Ok(resp) => Ok(resp),
        Err(first) => {
            warn!("token refresh failed, retrying once: {first}");
            spotify.refresh(refresh_token).await
        }
    }
}

fn unauthorized() -> Response {
    error_response(StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized)
}

fn error_response(status: StatusCode, kind: ErrorKind) -> Response {
    (status, Json(ErrorBody::new(kind))).into_response()
}

fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        pair.trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .map(String::from)
    })
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
