//! UI reconciler — maps poll outcomes to display state.
//!
//! Owns the view state machine and the network retry budget.  Pure: the
//! event loop applies outcomes/signals and executes the returned effects
//! (toasts, retry timers, immediate re-polls), so every transition is
//! testable without a terminal or a socket.

use std::time::Duration;

use vibe_proto::snapshot::PlaybackSnapshot;

use crate::poller::PollOutcome;
use crate::widgets::toast::Severity;

/// The one current display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Unauthorized,
    NothingPlaying,
    Playing,
    Paused,
    NetworkError,
}

/// Connectivity edge reported by the net watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetSignal {
    Online,
    Offline,
}

/// Side effects for the event loop to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Toast(Severity, String),
    /// Arm the one-shot retry timer.  The loop must re-check
    /// `in_error_backoff()` when it fires and no-op if the error cleared
    /// in the meantime.
    ScheduleRetry(Duration),
    /// Re-poll immediately.
    PollNow,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryState {
    pub retry_count: u32,
    pub max_retries: u32,
    pub in_error_backoff: bool,
}

pub struct Reconciler {
    state: ViewState,
    retry: RetryState,
    snapshot: Option<PlaybackSnapshot>,
    backoff_step: Duration,
    /// Persistent user-facing message for the error panel.
    error_text: Option<String>,
}

impl Reconciler {
    pub fn new(max_retries: u32, backoff_step: Duration) -> Self {
        Self {
            state: ViewState::Loading,
            retry: RetryState {
                retry_count: 0,
                max_retries,
                in_error_backoff: false,
            },
            snapshot: None,
            backoff_step,
            error_text: None,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn retry(&self) -> RetryState {
        self.retry
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    pub fn in_error_backoff(&self) -> bool {
        self.retry.in_error_backoff
    }

    /// Whether the fixed-cadence poll interval should fire.  Suspended
    /// while a retry is pending or the budget is exhausted; the retry
    /// timer / online signal drive polling instead.
    pub fn polling_active(&self) -> bool {
        !self.retry.in_error_backoff
    }

    fn retry_exhausted(&self) -> bool {
        self.retry.retry_count > self.retry.max_retries
    }

    /// Short note for the status bar while in error backoff.
    pub fn retry_note(&self) -> Option<String> {
        if self.state != ViewState::NetworkError {
            return None;
        }
        if self.retry_exhausted() {
            Some("retries exhausted".to_string())
        } else if self.retry.retry_count > 0 {
            Some(format!(
                "retry {}/{}",
                self.retry.retry_count, self.retry.max_retries
            ))
        } else {
            None
        }
    }

    pub fn apply(&mut self, outcome: PollOutcome) -> Vec<Effect> {
        match outcome {
            PollOutcome::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            PollOutcome::Unauthorized => self.apply_unauthorized(),
            PollOutcome::Network => self.apply_network_failure(),
            PollOutcome::Upstream(msg) => {
                // Not assumed transient: surface immediately, no retry.
                vec![Effect::Toast(Severity::Error, msg)]
            }
            PollOutcome::Malformed => vec![Effect::Toast(
                Severity::Error,
                "Malformed response from server".to_string(),
            )],
        }
    }

    fn apply_snapshot(&mut self, snapshot: PlaybackSnapshot) -> Vec<Effect> {
        // Any successful poll clears the retry budget.
        self.retry.retry_count = 0;
        self.retry.in_error_backoff = false;
        self.error_text = None;

        let target = if !snapshot.has_track() {
            ViewState::NothingPlaying
        } else if snapshot.is_playing {
            ViewState::Playing
        } else {
            ViewState::Paused
        };

        let mut effects = Vec::new();
        if target != self.state {
            effects.push(transition_toast(target, &snapshot));
        } else if target == ViewState::Playing && self.track_changed(&snapshot) {
            effects.push(Effect::Toast(
                Severity::Success,
                now_playing_text(&snapshot),
            ));
        }

        self.state = target;
        self.snapshot = Some(snapshot);
        effects
    }

    fn track_changed(&self, snapshot: &PlaybackSnapshot) -> bool {
        match &self.snapshot {
            Some(prev) => prev.title != snapshot.title || prev.artist != snapshot.artist,
            None => false,
        }
    }

    fn apply_unauthorized(&mut self) -> Vec<Effect> {
        // A 401 is an HTTP response, so the network itself is fine:
        // leave the retry count alone but stop any error backoff so the
        // regular cadence resumes and picks up the login when it happens.
        self.retry.in_error_backoff = false;
        self.error_text = None;

        if self.state == ViewState::Unauthorized {
            return Vec::new();
        }
        self.state = ViewState::Unauthorized;
        vec![Effect::Toast(
            Severity::Warning,
            "Not connected to Spotify".to_string(),
        )]
    }

    fn apply_network_failure(&mut self) -> Vec<Effect> {
        let was_exhausted = self.retry_exhausted();
        if !was_exhausted {
            self.retry.retry_count += 1;
        }
        self.retry.in_error_backoff = true;
        self.state = ViewState::NetworkError;

        if self.retry.retry_count <= self.retry.max_retries {
            // Linear-times-count backoff: 2s, 4s, 6s.
            let delay = self.backoff_step * self.retry.retry_count;
            self.error_text = Some("Connection lost, retrying…".to_string());
            vec![
                Effect::Toast(
                    Severity::Warning,
                    format!(
                        "Connection lost, retry {}/{} in {}s",
                        self.retry.retry_count,
                        self.retry.max_retries,
                        delay.as_secs()
                    ),
                ),
                Effect::ScheduleRetry(delay),
            ]
        } else {
            self.error_text =
                Some("Connection lost. Will reconnect when the network returns.".to_string());
            if was_exhausted {
                // Already terminal (manual re-poll failed again): keep the
                // persistent error state, no new toast, no reset.
                Vec::new()
            } else {
                vec![Effect::Toast(
                    Severity::Error,
                    "Connection lost, retries exhausted".to_string(),
                )]
            }
        }
    }

    pub fn apply_net(&mut self, signal: NetSignal) -> Vec<Effect> {
        match signal {
            NetSignal::Offline => {
                // Force the error state immediately, independent of the
                // next scheduled poll.
                self.retry.in_error_backoff = true;
                let was_error = self.state == ViewState::NetworkError;
                self.state = ViewState::NetworkError;
                self.error_text =
                    Some("Offline. Will reconnect when the network returns.".to_string());
                if was_error {
                    Vec::new()
                } else {
                    vec![Effect::Toast(
                        Severity::Warning,
                        "Network offline".to_string(),
                    )]
                }
            }
            NetSignal::Online => {
                // Only meaningful while in a network-error condition.
                if self.state != ViewState::NetworkError {
                    return Vec::new();
                }
                self.retry.retry_count = 0;
                self.retry.in_error_backoff = false;
                self.state = ViewState::Loading;
                self.error_text = None;
                vec![
                    Effect::Toast(Severity::Info, "Back online, reconnecting".to_string()),
                    Effect::PollNow,
                ]
            }
        }
    }
}

fn transition_toast(target: ViewState, snapshot: &PlaybackSnapshot) -> Effect {
    match target {
        ViewState::Playing => Effect::Toast(Severity::Success, now_playing_text(snapshot)),
        ViewState::Paused => Effect::Toast(Severity::Info, "Playback paused".to_string()),
        ViewState::NothingPlaying => {
            Effect::Toast(Severity::Info, "Nothing playing".to_string())
        }
        // Snapshots only ever land in the three states above.
        _ => unreachable!("snapshot cannot target {:?}", target),
    }
}

fn now_playing_text(snapshot: &PlaybackSnapshot) -> String {
    let title = snapshot.title.as_deref().unwrap_or("Unknown Track");
    match snapshot.artist.as_deref() {
        Some(artist) => format!("Now playing: {} by {}", title, artist),
        None => format!("Now playing: {}", title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler() -> Reconciler {
        Reconciler::new(3, Duration::from_millis(2000))
    }

    fn playing(title: &str, artist: &str) -> PollOutcome {
        PollOutcome::Snapshot(PlaybackSnapshot {
            is_playing: true,
            title: Some(title.into()),
            artist: Some(artist.into()),
            progress_ms: 1000,
            duration_ms: 2000,
            ..PlaybackSnapshot::empty()
        })
    }

    fn toasts(effects: &[Effect]) -> Vec<(Severity, String)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Toast(sev, msg) => Some((*sev, msg.clone())),
                _ => None,
            })
            .collect()
    }

    fn retry_delay(effects: &[Effect]) -> Option<Duration> {
        effects.iter().find_map(|e| match e {
            Effect::ScheduleRetry(d) => Some(*d),
            _ => None,
        })
    }

    #[test]
    fn test_playing_snapshot_single_success_toast() {
        let mut r = reconciler();
        let effects = r.apply(playing("A", "B"));
        assert_eq!(r.state(), ViewState::Playing);

        let toasts = toasts(&effects);
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].0, Severity::Success);
        assert!(toasts[0].1.contains('A') && toasts[0].1.contains('B'));
    }

    #[test]
    fn test_same_track_same_state_no_toast() {
        let mut r = reconciler();
        r.apply(playing("A", "B"));
        let effects = r.apply(playing("A", "B"));
        assert!(effects.is_empty());
        assert_eq!(r.state(), ViewState::Playing);
    }

    #[test]
    fn test_track_change_while_playing_toasts_once() {
        let mut r = reconciler();
        r.apply(playing("A", "B"));
        let effects = r.apply(playing("C", "B"));
        assert_eq!(toasts(&effects).len(), 1);
    }

    #[test]
    fn test_empty_snapshot_is_nothing_playing() {
        let mut r = reconciler();
        let effects = r.apply(PollOutcome::Snapshot(PlaybackSnapshot::empty()));
        assert_eq!(r.state(), ViewState::NothingPlaying);
        assert_eq!(toasts(&effects).len(), 1);
        assert!(!r.snapshot().unwrap().has_track());
    }

    #[test]
    fn test_paused_snapshot() {
        let mut r = reconciler();
        let effects = r.apply(PollOutcome::Snapshot(PlaybackSnapshot {
            is_playing: false,
            title: Some("A".into()),
            artist: Some("B".into()),
            ..PlaybackSnapshot::empty()
        }));
        assert_eq!(r.state(), ViewState::Paused);
        assert_eq!(toasts(&effects).len(), 1);
    }

    #[test]
    fn test_backoff_delays_then_terminal() {
        let mut r = reconciler();

        // Three consecutive network failures: 2s, 4s, 6s.
        let e1 = r.apply(PollOutcome::Network);
        assert_eq!(retry_delay(&e1), Some(Duration::from_millis(2000)));
        let e2 = r.apply(PollOutcome::Network);
        assert_eq!(retry_delay(&e2), Some(Duration::from_millis(4000)));
        let e3 = r.apply(PollOutcome::Network);
        assert_eq!(retry_delay(&e3), Some(Duration::from_millis(6000)));
        assert_eq!(r.state(), ViewState::NetworkError);
        assert!(!r.polling_active());

        // Fourth failure exhausts the budget: no further automatic retry,
        // persistent error surfaced.
        let e4 = r.apply(PollOutcome::Network);
        assert_eq!(retry_delay(&e4), None);
        assert_eq!(toasts(&e4).len(), 1);
        assert!(r.error_text().is_some());

        // A fifth failure (manual re-poll) keeps the persistent error
        // state, not a reset.
        let e5 = r.apply(PollOutcome::Network);
        assert!(e5.is_empty());
        assert_eq!(r.state(), ViewState::NetworkError);
        assert_eq!(r.retry_note().as_deref(), Some("retries exhausted"));
    }

    #[test]
    fn test_success_resets_retry_budget() {
        let mut r = reconciler();
        r.apply(PollOutcome::Network);
        r.apply(PollOutcome::Network);
        assert!(r.in_error_backoff());

        r.apply(playing("A", "B"));
        assert_eq!(r.retry().retry_count, 0);
        assert!(!r.in_error_backoff());
        assert!(r.polling_active());
    }

    #[test]
    fn test_401_transitions_directly_without_touching_retry_count() {
        let mut r = reconciler();
        r.apply(PollOutcome::Network);
        r.apply(PollOutcome::Network);
        let count_before = r.retry().retry_count;

        let effects = r.apply(PollOutcome::Unauthorized);
        assert_eq!(r.state(), ViewState::Unauthorized);
        assert_eq!(r.retry().retry_count, count_before);
        assert_eq!(toasts(&effects).len(), 1);

        // Repeated 401s do not re-toast.
        assert!(r.apply(PollOutcome::Unauthorized).is_empty());
    }

    #[test]
    fn test_online_resets_and_repolls() {
        let mut r = reconciler();
        for _ in 0..4 {
            r.apply(PollOutcome::Network);
        }
        assert_eq!(r.state(), ViewState::NetworkError);

        let effects = r.apply_net(NetSignal::Online);
        assert_eq!(r.retry().retry_count, 0);
        assert_eq!(r.state(), ViewState::Loading);
        assert!(effects.contains(&Effect::PollNow));
    }

    #[test]
    fn test_online_ignored_outside_network_error() {
        let mut r = reconciler();
        r.apply(playing("A", "B"));
        assert!(r.apply_net(NetSignal::Online).is_empty());
        assert_eq!(r.state(), ViewState::Playing);
    }

    #[test]
    fn test_offline_forces_network_error_immediately() {
        let mut r = reconciler();
        r.apply(playing("A", "B"));
        let effects = r.apply_net(NetSignal::Offline);
        assert_eq!(r.state(), ViewState::NetworkError);
        assert!(!r.polling_active());
        assert_eq!(toasts(&effects).len(), 1);

        // A second offline signal is silent.
        assert!(r.apply_net(NetSignal::Offline).is_empty());
    }

    #[test]
    fn test_upstream_error_surfaces_without_retry_or_transition() {
        let mut r = reconciler();
        r.apply(playing("A", "B"));
        let effects = r.apply(PollOutcome::Upstream("server error 503".into()));
        assert_eq!(r.state(), ViewState::Playing);
        assert_eq!(r.retry().retry_count, 0);
        assert_eq!(toasts(&effects).len(), 1);
        assert_eq!(toasts(&effects)[0].0, Severity::Error);
        assert_eq!(retry_delay(&effects), None);
    }

    #[test]
    fn test_malformed_surfaces_without_retry() {
        let mut r = reconciler();
        let effects = r.apply(PollOutcome::Malformed);
        assert_eq!(toasts(&effects).len(), 1);
        assert_eq!(retry_delay(&effects), None);
        assert_eq!(r.state(), ViewState::Loading);
    }
}
