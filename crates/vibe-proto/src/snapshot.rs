use serde::{Deserialize, Serialize};

/// One polled playback state.  Produced by the server's `/nowplaying`
/// endpoint and consumed synchronously by the display reconciler.
/// Field names on the wire are camelCase (`isPlaying`, `coverUrl`, …).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub cover_url: Option<String>,
    pub device_name: Option<String>,
    #[serde(default)]
    pub progress_ms: u64,
    #[serde(default)]
    pub duration_ms: u64,
}

impl PlaybackSnapshot {
    /// Snapshot for "nothing currently playing": no track identity, zeroed timeline.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when the snapshot carries a track identity (title or artist).
    pub fn has_track(&self) -> bool {
        self.title.is_some() || self.artist.is_some()
    }

    /// Progress ratio for display, clamped to 0..=1.
    ///
    /// `None` when duration is unknown or zero — the progress indicator is
    /// hidden entirely rather than rendered at 0%.
    pub fn progress_ratio(&self) -> Option<f64> {
        if self.duration_ms == 0 {
            return None;
        }
        Some((self.progress_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0))
    }
}

/// Error kinds carried in `/nowplaying` error bodies as `{"error": "<kind>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Unauthorized,
    Network,
    Upstream,
    Malformed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unauthorized => "unauthorized",
            Self::Network => "network",
            Self::Upstream => "upstream",
            Self::Malformed => "malformed",
        };
        f.write_str(s)
    }
}

/// JSON error body returned by the server alongside non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
}

impl ErrorBody {
    pub fn new(error: ErrorKind) -> Self {
        Self { error }
    }
}

/// Format a track position as `minutes:seconds`, seconds zero-padded to two
/// digits, floor division on milliseconds.
pub fn fmt_track_time(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_track_time() {
        assert_eq!(fmt_track_time(65_000), "1:05");
        assert_eq!(fmt_track_time(5_000), "0:05");
        assert_eq!(fmt_track_time(600_000), "10:00");
        assert_eq!(fmt_track_time(0), "0:00");
        // Floor division: 999ms has not completed a second yet.
        assert_eq!(fmt_track_time(999), "0:00");
        assert_eq!(fmt_track_time(59_999), "0:59");
    }

    #[test]
    fn test_progress_ratio_hidden_without_duration() {
        let snap = PlaybackSnapshot {
            progress_ms: 1000,
            duration_ms: 0,
            ..PlaybackSnapshot::empty()
        };
        assert_eq!(snap.progress_ratio(), None);
    }

    #[test]
    fn test_progress_ratio_clamped() {
        let mut snap = PlaybackSnapshot {
            progress_ms: 30_000,
            duration_ms: 60_000,
            ..PlaybackSnapshot::empty()
        };
        assert_eq!(snap.progress_ratio(), Some(0.5));

        // Progress past the end (provider clock skew) clamps to 1.0.
        snap.progress_ms = 90_000;
        assert_eq!(snap.progress_ratio(), Some(1.0));
    }

    #[test]
    fn test_snapshot_wire_format_is_camel_case() {
        let snap = PlaybackSnapshot {
            is_playing: true,
            title: Some("A".into()),
            artist: Some("B".into()),
            cover_url: Some("https://example.com/c.jpg".into()),
            device_name: Some("Kitchen".into()),
            progress_ms: 1000,
            duration_ms: 2000,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["isPlaying"], true);
        assert_eq!(json["coverUrl"], "https://example.com/c.jpg");
        assert_eq!(json["deviceName"], "Kitchen");
        assert_eq!(json["progressMs"], 1000);
        assert_eq!(json["durationMs"], 2000);

        let back: PlaybackSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_error_body_wire_format() {
        let body = ErrorBody::new(ErrorKind::Unauthorized);
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"unauthorized"}"#
        );
        let parsed: ErrorBody = serde_json::from_str(r#"{"error":"network"}"#).unwrap();
        assert_eq!(parsed.error, ErrorKind::Network);
    }
}
