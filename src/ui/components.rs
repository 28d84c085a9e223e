//! Small building blocks shared by the screen and popups

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders},
};

/// Columns a tab expands to on screen
const TAB_WIDTH: usize = 4;

/// A bordered box whose border and title follow focus
pub fn focus_block<'a>(title: &'a str, focused: bool, active: Color, idle: Color) -> Block<'a> {
    let color = if focused { active } else { idle };
    let title_style = if focused {
        Style::default().fg(active).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(idle)
    };

    Block::default()
        .title(Span::styled(format!(" {} ", title), title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

/// `key action │ ` pair for footers; disabled actions are drawn in `off`
pub fn key_hint(key: &str, action: &str, enabled: bool, on: Color, dim: Color, off: Color) -> Vec<Span<'static>> {
    let (key_color, action_color) = if enabled { (on, dim) } else { (off, off) };
    vec![
        Span::styled(key.to_string(), Style::default().fg(key_color)),
        Span::styled(format!(" {} │ ", action), Style::default().fg(action_color)),
    ]
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Make text safe to hand to the terminal.
///
/// Newlines are kept and tabs expand to spaces. Other C0 controls become their
/// Control Pictures glyph (ESC shows as ␛) and DEL/C1 controls become U+FFFD,
/// so no escape sequence reaches the terminal.
pub fn printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.extend(std::iter::repeat(' ').take(TAB_WIDTH)),
            c if (c as u32) < 0x20 => out.push(char::from_u32(0x2400 + c as u32).unwrap_or('\u{FFFD}')),
            '\u{7f}' => out.push('\u{2421}'),
            c if c.is_control() => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

/// Break `text` into rows no wider than `width` columns.
///
/// Wraps on character boundaries, so the row count is exact and callers can
/// compute a scroll offset from it.
pub fn wrap_to_width(text: &str, width: u16) -> Vec<String> {
    let width = usize::from(width.max(1));
    let mut rows = Vec::new();

    for logical in text.split('\n') {
        let mut row = String::new();
        let mut used = 0;
        for c in logical.chars() {
            let w = Span::raw(c.to_string()).width();
            if used + w > width && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                used = 0;
            }
            row.push(c);
            used += w;
        }
        rows.push(row);
    }
    rows
}
