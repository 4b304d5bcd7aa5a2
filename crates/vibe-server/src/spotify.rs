//! Spotify Web API client — OAuth token exchange/refresh and the
//! currently-playing mapping.

use serde::Deserialize;
use thiserror::Error;
use vibe_proto::config::SpotifyConfig;
use vibe_proto::snapshot::PlaybackSnapshot;

const AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const NOW_PLAYING_URL: &str = "https://api.spotify.com/v1/me/player/currently-playing";
const OAUTH_SCOPE: &str = "user-read-currently-playing user-read-playback-state";

/// Failures talking to Spotify, classified by origin rather than by
/// message text: transport vs. HTTP status vs. payload.
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("token expired or invalid")]
    Unauthorized,
    #[error("spotify returned status {0}")]
    Upstream(reqwest::StatusCode),
    #[error("network error reaching spotify: {0}")]
    Network(reqwest::Error),
    #[error("unexpected spotify response: {0}")]
    Malformed(String),
}

/// Token endpoint response.  `refresh_token` is absent on refresh grants
/// unless Spotify decides to rotate it.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

pub struct SpotifyClient {
    http: reqwest::Client,
    config: SpotifyConfig,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    /// Build the authorization URL the browser is redirected to.
    pub fn authorize_url(&self, state: &str) -> anyhow::Result<reqwest::Url> {
        anyhow::ensure!(
            self.config.is_configured(),
            "Spotify credentials not configured"
        );
        let url = reqwest::Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state),
                ("scope", OAUTH_SCOPE),
            ],
        )?;
        Ok(url)
    }

    /// Exchange an authorization code for access and refresh tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SpotifyError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ])
        .await
    }

    /// Refresh an expired access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, SpotifyError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, SpotifyError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(form)
            .send()
            .await
            .map_err(SpotifyError::Network)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::BAD_REQUEST
        {
            // Spotify answers 400 invalid_grant for revoked refresh tokens.
            return Err(SpotifyError::Unauthorized);
        }
        if !status.is_success() {
            return Err(SpotifyError::Upstream(status));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| SpotifyError::Malformed(e.to_string()))
    }

    /// Fetch the current playback state and map it to a snapshot.
    pub async fn now_playing(
        &self,
        access_token: &str,
    ) -> Result<PlaybackSnapshot, SpotifyError> {
        let response = self
            .http
            .get(NOW_PLAYING_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(SpotifyError::Network)?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            // 204: nothing currently playing.
            return Ok(PlaybackSnapshot::empty());
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SpotifyError::Unauthorized);
        }
        if !status.is_success() {
            return Err(SpotifyError::Upstream(status));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SpotifyError::Malformed(e.to_string()))?;

        Ok(snapshot_from_playback(&body))
    }
}

/// Map a Spotify currently-playing body to a `PlaybackSnapshot`.
///
/// A body with no `item` (ads, private sessions) maps to the empty snapshot,
/// mirroring the 204 case.
pub fn snapshot_from_playback(body: &serde_json::Value) -> PlaybackSnapshot {
    let Some(track) = body.get("item").filter(|i| !i.is_null()) else {
        return PlaybackSnapshot::empty();
    };

    let title = track
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown Track")
        .to_string();

    let artist = track
        .get("artists")
        .and_then(|a| a.as_array())
        .filter(|a| !a.is_empty())
        .map(|artists| {
            artists
                .iter()
                .map(|a| {
                    a.get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or("Unknown Artist")
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| "Unknown Artist".to_string());

    // Spotify lists album images largest first.
    let cover_url = track
        .get("album")
        .and_then(|a| a.get("images"))
        .and_then(|i| i.as_array())
        .and_then(|i| i.first())
        .and_then(|i| i.get("url"))
        .and_then(|u| u.as_str())
        .map(String::from);

    let device_name = Some(
        body.get("device")
            .and_then(|d| d.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or("Unknown Device")
            .to_string(),
    );

    PlaybackSnapshot {
        is_playing: body
            .get("is_playing")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        title: Some(title),
        artist: Some(artist),
        cover_url,
        device_name,
        progress_ms: body
            .get("progress_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        duration_ms: track
            .get("duration_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client() -> SpotifyClient {
        SpotifyClient::new(SpotifyConfig {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            redirect_uri: "http://127.0.0.1:5000/callback".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_authorize_url_carries_oauth_params() {
        let url = test_client().authorize_url("nonce123").unwrap();
        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("client_id".into(), "client-id".into())));
        assert!(query.contains(&("response_type".into(), "code".into())));
        assert!(query.contains(&("state".into(), "nonce123".into())));
        assert!(query.contains(&("scope".into(), OAUTH_SCOPE.into())));
    }

    #[test]
    fn test_authorize_url_requires_credentials() {
        let client = SpotifyClient::new(SpotifyConfig::default()).unwrap();
        assert!(client.authorize_url("x").is_err());
    }

    #[test]
    fn test_snapshot_from_full_playback() {
        let body = json!({
            "is_playing": true,
            "progress_ms": 65000,
            "device": { "name": "Living Room" },
            "item": {
                "name": "Windowlicker",
                "duration_ms": 337000,
                "artists": [ { "name": "Aphex Twin" } ],
                "album": {
                    "images": [
                        { "url": "https://i.scdn.co/image/large" },
                        { "url": "https://i.scdn.co/image/small" }
                    ]
                }
            }
        });
        let snap = snapshot_from_playback(&body);
        assert!(snap.is_playing);
        assert_eq!(snap.title.as_deref(), Some("Windowlicker"));
        assert_eq!(snap.artist.as_deref(), Some("Aphex Twin"));
        assert_eq!(snap.cover_url.as_deref(), Some("https://i.scdn.co/image/large"));
        assert_eq!(snap.device_name.as_deref(), Some("Living Room"));
        assert_eq!(snap.progress_ms, 65000);
        assert_eq!(snap.duration_ms, 337000);
    }

    #[test]
    fn test_snapshot_joins_multiple_artists() {
        let body = json!({
            "is_playing": false,
            "item": {
                "name": "Duet",
                "artists": [ { "name": "A" }, { "name": "B" } ]
            }
        });
        let snap = snapshot_from_playback(&body);
        assert_eq!(snap.artist.as_deref(), Some("A, B"));
        assert!(!snap.is_playing);
        assert_eq!(snap.duration_ms, 0);
        assert_eq!(snap.device_name.as_deref(), Some("Unknown Device"));
    }

    #[test]
    fn test_snapshot_without_item_is_empty() {
        let snap = snapshot_from_playback(&json!({ "is_playing": false }));
        assert_eq!(snap, PlaybackSnapshot::empty());
        assert!(!snap.has_track());

        let snap = snapshot_from_playback(&json!({ "item": null }));
        assert_eq!(snap, PlaybackSnapshot::empty());
    }
}
