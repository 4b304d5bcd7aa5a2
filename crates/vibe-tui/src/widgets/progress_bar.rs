//! Smooth Unicode progress bar for the track timeline.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use vibe_proto::snapshot::{fmt_track_time, PlaybackSnapshot};

use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY};

/// Render the track progress bar with `m:ss` labels on both sides.
///
/// When the snapshot has no usable duration the indicator is hidden
/// entirely — nothing is rendered, not a 0% bar.
pub fn draw_progress(frame: &mut Frame, area: Rect, snapshot: &PlaybackSnapshot) {
    let Some(progress) = snapshot.progress_ratio() else {
        return;
    };
    if area.width < 12 || area.height == 0 {
        return;
    }

    let left_label = fmt_track_time(snapshot.progress_ms.min(snapshot.duration_ms));
    let right_label = fmt_track_time(snapshot.duration_ms);
    let label_w = (left_label.len() + right_label.len() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    // Unicode smooth fill: 8 eighths per cell
    let eighths = (progress * bar_w as f64 * 8.0) as usize;
    let full_blocks = eighths / 8;
    let partial = eighths % 8;

    const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

    let mut bar = String::with_capacity(bar_w + 4);
    for _ in 0..full_blocks {
        bar.push('█');
    }
    if full_blocks < bar_w {
        bar.push(BLOCKS[partial]);
        for _ in (full_blocks + 1)..bar_w {
            bar.push('·');
        }
    }

    let line = Line::from(vec![
        Span::styled(format!("{} ", left_label), Style::default().fg(C_SECONDARY)),
        Span::styled(bar, Style::default().fg(C_PLAYING)),
        Span::styled(format!(" {}", right_label), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
