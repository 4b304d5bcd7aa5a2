//! Frame layout — the fullscreen projector view.
//!
//! One central panel whose content follows the reconciler state, a status
//! bar at the bottom (hidden in fullscreen/zen mode), toasts top-right.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::reconciler::{Reconciler, ViewState};
use crate::theme::{
    style_default, style_error, style_muted, style_playing, style_secondary, C_ACCENT, C_BG,
    C_CONNECTING, C_DEVICE,
};
use crate::widgets::{progress_bar, status_bar, toast::ToastManager};

const PANEL_HEIGHT: u16 = 7;

pub fn draw(
    frame: &mut Frame,
    reconciler: &Reconciler,
    toasts: &ToastManager,
    zen: bool,
    login_url: &str,
) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

    let main = if zen || area.height < 4 {
        area
    } else {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        status_bar::draw_status_bar(
            frame,
            rows[1],
            reconciler.state(),
            reconciler.retry_note().as_deref(),
        );
        rows[0]
    };

    let panel = centered_panel(main, PANEL_HEIGHT);
    match reconciler.state() {
        ViewState::Loading => draw_loading(frame, panel),
        ViewState::Unauthorized => draw_connect_panel(frame, panel, login_url),
        ViewState::NetworkError => draw_error_panel(frame, panel, reconciler),
        ViewState::NothingPlaying => draw_nothing_playing(frame, panel),
        ViewState::Playing | ViewState::Paused => draw_track_panel(frame, panel, reconciler),
    }

    toasts.draw(frame, area);
}

fn centered_panel(area: Rect, height: u16) -> Rect {
    let height = height.min(area.height);
    let top = (area.height - height) / 2;
    let width = (area.width / 4 * 3).clamp(20.min(area.width), area.width);
    let left = (area.width - width) / 2;
    Rect {
        x: area.x + left,
        y: area.y + top,
        width,
        height,
    }
}

fn draw_loading(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("◔ connecting…", Style::default().fg(C_CONNECTING))),
    ];
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        area,
    );
}

fn draw_connect_panel(frame: &mut Frame, area: Rect, login_url: &str) {
    let lines = vec![
        Line::from(Span::styled(
            "Connect Spotify",
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "The projector needs a Spotify session to show playback.",
            style_secondary(),
        )),
        Line::from(Span::styled(login_url.to_string(), Style::default().fg(C_DEVICE))),
        Line::from(""),
        Line::from(Span::styled("press o to open the login page", style_muted())),
    ];
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_error_panel(frame: &mut Frame, area: Rect, reconciler: &Reconciler) {
    let detail = reconciler
        .error_text()
        .unwrap_or("Connection lost")
        .to_string();
    let mut lines = vec![
        Line::from(Span::styled(
            "⚠ Connection problem",
            style_error().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(detail, style_secondary())),
    ];
    if let Some(note) = reconciler.retry_note() {
        lines.push(Line::from(Span::styled(note, style_muted())));
    }
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_nothing_playing(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled("■ Nothing playing", style_muted())),
        Line::from(""),
        Line::from(Span::styled(
            "Start playback on any Spotify device to light up the projector.",
            style_secondary(),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_track_panel(frame: &mut Frame, area: Rect, reconciler: &Reconciler) {
    let Some(snapshot) = reconciler.snapshot() else {
        return;
    };

    let (icon, icon_style) = if reconciler.state() == ViewState::Playing {
        ("▶", style_playing())
    } else {
        ("⏸", Style::default().fg(C_CONNECTING))
    };

    let max_w = area.width.saturating_sub(4) as usize;
    let title = truncate_to_width(snapshot.title.as_deref().unwrap_or("Unknown Track"), max_w);
    let artist = truncate_to_width(snapshot.artist.as_deref().unwrap_or("Unknown Artist"), max_w);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // icon + title
            Constraint::Length(1), // artist
            Constraint::Length(1), // device
            Constraint::Length(1),
            Constraint::Length(1), // progress
        ])
        .split(area);

    let title_line = Line::from(vec![
        Span::styled(icon, icon_style),
        Span::raw(" "),
        Span::styled(title, style_default().add_modifier(Modifier::BOLD)),
    ]);
    frame.render_widget(
        Paragraph::new(title_line).alignment(Alignment::Center),
        rows[0],
    );

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(artist, style_secondary())))
            .alignment(Alignment::Center),
        rows[1],
    );

    if let Some(device) = snapshot.device_name.as_deref() {
        let device_line = Line::from(vec![
            Span::styled("on ", style_muted()),
            Span::styled(device.to_string(), Style::default().fg(C_DEVICE)),
        ]);
        frame.render_widget(
            Paragraph::new(device_line).alignment(Alignment::Center),
            rows[2],
        );
    }

    // Hidden entirely when the track has no usable duration.
    progress_bar::draw_progress(frame, rows[4], snapshot);
}

/// Truncate to a display width, appending an ellipsis when shortened.
fn truncate_to_width(s: &str, max_w: usize) -> String {
    if max_w == 0 {
        return String::new();
    }
    let mut width = 0usize;
    let mut out = String::new();
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > max_w.saturating_sub(1) {
            out.push('…');
            return out;
        }
        width += w;
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello world", 6), "hello…");
        assert_eq!(truncate_to_width("", 4), "");
        assert_eq!(truncate_to_width("abc", 0), "");
    }
}
