//! Toast notification system — transient status messages.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

/// Auto-dismiss delay for every toast.
const TOAST_TTL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
}

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    max_visible: usize,
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            max_visible: 4,
        }
    }

    pub fn push(&mut self, message: impl Into<String>, severity: Severity) {
        // Remove duplicates (same message)
        let msg = message.into();
        self.toasts.retain(|t| t.message != msg);
        self.toasts.push_back(Toast {
            message: msg,
            severity,
            expires: Instant::now() + TOAST_TTL,
        });
        // Cap queue
        while self.toasts.len() > self.max_visible * 2 {
            self.toasts.pop_front();
        }
    }

    /// Dismiss the newest toast (user pressed the dismiss key).
    pub fn dismiss_latest(&mut self) {
        self.toasts.pop_back();
    }

    /// Remove expired toasts. Call each tick.
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.toasts.retain(|t| t.expires > now);
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    /// Render toasts in the top-right corner of `area`.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if self.is_empty() {
            return;
        }
        let max_width = (area.width / 2).clamp(30, 60);

        let mut y = area.y + 1;
        let visible: Vec<&Toast> = self.toasts.iter().rev().take(self.max_visible).collect();

        for toast in visible {
            let msg_len = toast.message.chars().count() as u16;
            let w = (msg_len + 4).min(max_width);
            let x = area.x + area.width.saturating_sub(w + 1);

            let color = match toast.severity {
                Severity::Info => C_TOAST_INFO,
                Severity::Success => C_TOAST_SUCCESS,
                Severity::Warning => C_TOAST_WARNING,
                Severity::Error => C_TOAST_ERROR,
            };

            let icon = match toast.severity {
                Severity::Info => "·",
                Severity::Success => "✓",
                Severity::Warning => "!",
                Severity::Error => "✗",
            };

            let toast_area = Rect {
                x,
                y,
                width: w,
                height: 1,
            };
            frame.render_widget(Clear, toast_area);
            let paragraph = Paragraph::new(Line::from(vec![Span::styled(
                format!(" {} {} ", icon, &toast.message),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )]));
            frame.render_widget(paragraph, toast_area);

            y += 1;
            if y >= area.y + area.height {
                break;
            }
        }
    }
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_dedupes_same_message() {
        let mut tm = ToastManager::new();
        tm.push("hello", Severity::Info);
        tm.push("hello", Severity::Info);
        assert_eq!(tm.len(), 1);
    }

    #[test]
    fn test_dismiss_latest() {
        let mut tm = ToastManager::new();
        tm.push("a", Severity::Info);
        tm.push("b", Severity::Error);
        tm.dismiss_latest();
        assert_eq!(tm.len(), 1);
        tm.dismiss_latest();
        assert!(tm.is_empty());
        // Dismissing with nothing queued is a no-op.
        tm.dismiss_latest();
    }
}
