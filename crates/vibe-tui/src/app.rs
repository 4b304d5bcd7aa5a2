//! App — the projector event loop.
//!
//! Architecture:
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background
//!   tasks (keyboard reader, poller, connectivity watcher).
//! - The loop draws a frame only when something changed, then awaits the
//!   next message or timer tick.
//! - The reconciler owns all state transitions and answers with `Effect`s;
//!   App dispatches each effect (toast, retry timer, immediate poll).

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vibe_proto::config::Config;

use crate::net_watch;
use crate::poller::{self, PollOutcome, PollerHandle};
use crate::reconciler::{Effect, NetSignal, Reconciler, ViewState};
use crate::ui;
use crate::widgets::toast::{Severity, ToastManager};

/// Internal event bus.
pub enum AppMessage {
    /// Keyboard/resize event from the blocking input reader.
    Input(Event),
    /// Outcome of one status poll.
    Poll(PollOutcome),
    /// Connectivity edge from the healthz watcher.
    Net(NetSignal),
}

pub struct App {
    reconciler: Reconciler,
    toasts: ToastManager,
    login_url: String,
    nowplaying_url: String,
    healthz_url: String,
    poll_interval: Duration,
    probe_interval: Duration,
    /// Fullscreen/zen mode: hide the status bar, keep only the track panel.
    zen: bool,
    should_quit: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let base = config.display.server_url.trim_end_matches('/').to_string();
        Self {
            reconciler: Reconciler::new(
                config.poll.max_retries,
                Duration::from_millis(config.poll.backoff_step_ms),
            ),
            toasts: ToastManager::new(),
            login_url: format!("{base}/login"),
            nowplaying_url: format!("{base}/nowplaying"),
            healthz_url: format!("{base}/healthz"),
            poll_interval: Duration::from_millis(config.poll.interval_ms),
            probe_interval: Duration::from_millis(config.poll.probe_interval_ms),
            zen: false,
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(64);

        // ── Background task: keyboard events ──────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Input(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background tasks: poller and connectivity watcher ─────────────
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(8))
            .build()?;
        let poller = poller::spawn(client.clone(), self.nowplaying_url.clone(), tx.clone());
        net_watch::spawn(client, self.healthz_url.clone(), self.probe_interval, tx);

        // ── Periodic timers ───────────────────────────────────────────────
        let mut poll_tick = tokio::time::interval(self.poll_interval);
        poll_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut toast_tick = tokio::time::interval(Duration::from_millis(250));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // One-shot retry deadline, armed by ScheduleRetry effects.  Checked
        // again at fire time because an Online edge may have reset the
        // reconciler while the timer was pending.
        let mut retry_deadline: Option<tokio::time::Instant> = None;

        info!("projector started, polling {}", self.nowplaying_url);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| {
                    ui::draw(f, &self.reconciler, &self.toasts, self.zen, &self.login_url)
                })?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            let deadline = retry_deadline;
            let retry_fire = async move {
                match deadline {
                    Some(d) => tokio::time::sleep_until(d).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg, &poller, &mut retry_deadline);
                }
                // The first tick fires immediately, which doubles as the
                // startup poll.  Disabled while a retry backoff is pending.
                _ = poll_tick.tick(), if self.reconciler.polling_active() => {
                    poller.poll_now();
                }
                () = retry_fire => {
                    retry_deadline = None;
                    if self.reconciler.in_error_backoff() {
                        debug!("retry timer fired, polling");
                        poller.poll_now();
                        needs_redraw = true;
                    }
                }
                _ = toast_tick.tick() => {
                    if !self.toasts.is_empty() {
                        self.toasts.tick();
                        needs_redraw = true;
                    }
                }
            }
        }

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    fn handle_message(
        &mut self,
        msg: AppMessage,
        poller: &PollerHandle,
        retry_deadline: &mut Option<tokio::time::Instant>,
    ) -> bool {
        match msg {
            AppMessage::Input(Event::Key(key)) => self.handle_key(key, poller),
            AppMessage::Input(Event::Resize(..)) => true,
            AppMessage::Input(_) => false,
            AppMessage::Poll(outcome) => {
                let effects = self.reconciler.apply(outcome);
                self.run_effects(effects, poller, retry_deadline);
                true
            }
            AppMessage::Net(signal) => {
                let effects = self.reconciler.apply_net(signal);
                self.run_effects(effects, poller, retry_deadline);
                true
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent, poller: &PollerHandle) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                true
            }
            KeyCode::Char('f') | KeyCode::Char('F') => {
                self.zen = !self.zen;
                true
            }
            KeyCode::Char('x') => {
                self.toasts.dismiss_latest();
                true
            }
            KeyCode::Char('r') => {
                poller.poll_now();
                false
            }
            KeyCode::Char('o') => {
                if self.reconciler.state() == ViewState::Unauthorized {
                    match webbrowser::open(&self.login_url) {
                        Ok(_) => self.toasts.push("Opening login page", Severity::Info),
                        Err(e) => {
                            warn!("failed to open browser: {}", e);
                            self.toasts
                                .push(format!("Open manually: {}", self.login_url), Severity::Warning);
                        }
                    }
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    fn run_effects(
        &mut self,
        effects: Vec<Effect>,
        poller: &PollerHandle,
        retry_deadline: &mut Option<tokio::time::Instant>,
    ) {
        for effect in effects {
            match effect {
                Effect::Toast(severity, message) => self.toasts.push(message, severity),
                Effect::ScheduleRetry(delay) => {
                    debug!("retry scheduled in {:?}", delay);
                    *retry_deadline = Some(tokio::time::Instant::now() + delay);
                }
                Effect::PollNow => poller.poll_now(),
            }
        }
    }
}
