//! Status bar — bottom line with connection badge and keybindings.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::reconciler::ViewState;
use crate::theme::{C_BADGE_ERR, C_BADGE_LIVE, C_BADGE_PENDING, C_MUTED, C_SECONDARY};

fn badge(state: ViewState) -> (&'static str, Color) {
    match state {
        ViewState::Loading => ("CONNECTING", C_BADGE_PENDING),
        ViewState::Unauthorized => ("LOGIN REQUIRED", C_BADGE_PENDING),
        ViewState::NothingPlaying => ("IDLE", C_MUTED),
        ViewState::Playing => ("PLAYING", C_BADGE_LIVE),
        ViewState::Paused => ("PAUSED", C_BADGE_PENDING),
        ViewState::NetworkError => ("OFFLINE", C_BADGE_ERR),
    }
}

/// Draw the one-row footer: state badge, retry info, key hints.
pub fn draw_status_bar(frame: &mut Frame, area: Rect, state: ViewState, retry_note: Option<&str>) {
    let (label, color) = badge(state);

    let mut spans = vec![
        Span::styled(
            format!(" {} ", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("●", Style::default().fg(color)),
        Span::raw(" "),
    ];

    if let Some(note) = retry_note {
        spans.push(Span::styled(
            format!("{}  ", note),
            Style::default().fg(C_SECONDARY),
        ));
    }

    let keys = match state {
        ViewState::Unauthorized => " o open login  r retry  f fullscreen  x dismiss  q quit",
        _ => " f fullscreen  r refresh  x dismiss  q quit",
    };
    spans.push(Span::styled(keys, Style::default().fg(C_MUTED)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
