mod components;

use std::sync::OnceLock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ConversionResult, Focus, Popup, ToastKind, UiState, BUSY_PLACEHOLDER};
use crate::config::ErrorPanelStyle;
use crate::theme::Theme;
use components::{centered_rect, focus_block, key_hint, printable, wrap_to_width};

const CURSOR: char = '█';

// Load theme colors from the desktop once at startup
static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

fn accent() -> Color { theme().accent }
fn danger() -> Color { theme().danger }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn inactive() -> Color { theme().inactive }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    // Give the output more room on tall terminals
    let (input_height, output_height) = if area.height < 24 {
        (Constraint::Min(4), Constraint::Min(5))
    } else {
        (Constraint::Percentage(40), Constraint::Percentage(60))
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Info line / toast
            input_height,           // Input box
            Constraint::Length(3),  // Audience selector
            output_height,          // Output box
            Constraint::Length(1),  // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_input_box(f, app, chunks[1]);
    draw_audience_box(f, app, chunks[2]);
    draw_output_box(f, app, chunks[3]);
    draw_footer(f, app, chunks[4]);

    if app.popup == Popup::Help {
        draw_help_popup(f);
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Priority: toast > conversion state
    let line = if let Some(ref toast) = app.toast {
        let (icon, color) = match toast.kind {
            ToastKind::Success => ("✓ ", success()),
            ToastKind::Failure => ("✗ ", danger()),
            ToastKind::Info => ("• ", accent()),
        };
        Line::from(vec![
            Span::styled(icon, Style::default().fg(color)),
            Span::styled(toast.message.as_str(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ])
    } else {
        let status = match app.ui_state() {
            UiState::Idle => "Type something to convert",
            UiState::Ready => "Ready",
            UiState::Loading => "Converting...",
            UiState::Displaying(ConversionResult::Success { .. }) => "Converted",
            UiState::Displaying(ConversionResult::Failure { .. }) => "Conversion failed",
        };
        Line::from(Span::styled(status, Style::default().fg(text_dim())))
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_input_box(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Input;
    let counter_color = if app.over_limit() { danger() } else { text_dim() };

    let mut block = focus_block("Original text", focused, accent(), inactive()).title(
        Line::from(Span::styled(format!(" {} ", app.counter_label), Style::default().fg(counter_color)))
            .alignment(Alignment::Right),
    );
    if app.clear_visible {
        block = block.title_bottom(
            Line::from(vec![
                Span::styled(" Ctrl+L", Style::default().fg(accent())),
                Span::styled(" clear ", Style::default().fg(text_dim())),
            ])
            .alignment(Alignment::Right),
        );
    }

    if app.input.is_empty() {
        let placeholder = Paragraph::new(Span::styled(
            "Type the message you want to rewrite...",
            Style::default().fg(text_dim()).add_modifier(Modifier::ITALIC),
        ))
        .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let inner = block.inner(area);
    let mut shown = printable(&app.input);
    if focused {
        shown.push(CURSOR);
    }
    let rows = wrap_to_width(&shown, inner.width);

    // Keep the tail (and the cursor) in view
    let scroll = rows.len().saturating_sub(usize::from(inner.height));
    let last = rows.len().saturating_sub(1);

    let lines: Vec<Line> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let body_style = Style::default().fg(text());
            if focused && i == last {
                if let Some(body) = row.strip_suffix(CURSOR) {
                    return Line::from(vec![
                        Span::styled(body.to_string(), body_style),
                        Span::styled(CURSOR.to_string(), Style::default().fg(accent())),
                    ]);
                }
            }
            Line::from(Span::styled(row, body_style))
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((to_u16(scroll), 0));
    f.render_widget(paragraph, area);
}

fn draw_audience_box(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Audience;
    let block = focus_block("Audience", focused, accent(), inactive());

    let mut spans = vec![Span::raw(" ")];
    for (i, audience) in app.config.audiences.iter().enumerate() {
        let style = if i == app.audience {
            Style::default().fg(accent()).add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(text_dim())
        };
        spans.push(Span::styled(format!(" {} ", audience.label), style));
        spans.push(Span::raw("  "));
    }
    if focused {
        spans.push(Span::styled("←/→ choose", Style::default().fg(inactive())));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_output_box(f: &mut Frame, app: &App, area: Rect) {
    let mut block = Block::default()
        .title(Span::styled(" Converted text ", Style::default().fg(header()).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(inactive()));

    if app.feedback_visible {
        block = block.title_bottom(
            Line::from(vec![
                Span::styled(" Helpful? ", Style::default().fg(text_dim())),
                Span::styled("F2", Style::default().fg(accent())),
                Span::styled(" 👍  ", Style::default().fg(text_dim())),
                Span::styled("F3", Style::default().fg(accent())),
                Span::styled(" 👎 ", Style::default().fg(text_dim())),
            ])
            .alignment(Alignment::Right),
        );
    }

    // Only a displayed result can scroll
    app.output_max_scroll.set(0);

    match app.ui_state() {
        UiState::Loading => {
            let busy = Paragraph::new(Span::styled(
                BUSY_PLACEHOLDER,
                Style::default().fg(warning()).add_modifier(Modifier::ITALIC | Modifier::SLOW_BLINK),
            ))
            .block(block);
            f.render_widget(busy, area);
        }
        UiState::Displaying(ConversionResult::Success { converted_text }) => {
            // Plain text, never markup; control characters are shown, not sent
            let inner = block.inner(area);
            let rows = wrap_to_width(&printable(converted_text), inner.width);
            let max_scroll = to_u16(rows.len().saturating_sub(usize::from(inner.height)));
            app.output_max_scroll.set(max_scroll);
            let offset = app.output_scroll.min(max_scroll);

            let mut block = block.border_style(Style::default().fg(success()));
            if max_scroll > 0 {
                block = block.title(
                    Line::from(Span::styled(
                        format!(" {}/{} PgUp/PgDn ", offset + 1, max_scroll + 1),
                        Style::default().fg(text_dim()),
                    ))
                    .alignment(Alignment::Right),
                );
            }

            let lines: Vec<Line> = rows.into_iter().map(Line::raw).collect();
            let paragraph = Paragraph::new(lines)
                .style(Style::default().fg(text()))
                .block(block)
                .scroll((offset, 0));
            f.render_widget(paragraph, area);
        }
        UiState::Displaying(ConversionResult::Failure { message, .. }) => {
            let inner = block.inner(area);
            f.render_widget(block, area);
            draw_error_panel(f, message, app.config.error_panel, inner);
        }
        UiState::Idle | UiState::Ready => {
            let hint = Paragraph::new(Span::styled(
                "The converted text will appear here.",
                Style::default().fg(text_dim()),
            ))
            .block(block);
            f.render_widget(hint, area);
        }
    }
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn draw_error_panel(f: &mut Frame, message: &str, style: ErrorPanelStyle, area: Rect) {
    let lines = vec![
        Line::from(Span::styled("Something went wrong", Style::default().fg(danger()).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(printable(message), Style::default().fg(text()))),
        Line::from(""),
        Line::from(vec![
            Span::styled("Ctrl+R", Style::default().fg(accent()).add_modifier(Modifier::BOLD)),
            Span::styled(" Retry", Style::default().fg(text())),
        ]),
    ];

    match style {
        ErrorPanelStyle::Bordered => {
            // Inset so the panel reads as a box inside the output
            let panel_area = Rect {
                x: area.x + 1,
                y: area.y,
                width: area.width.saturating_sub(2),
                height: area.height.min(lines.len() as u16 + 2),
            };
            let panel = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(danger())),
                );
            f.render_widget(panel, panel_area);
        }
        ErrorPanelStyle::Compact => {
            f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
        }
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let retry_available = matches!(app.ui_state(), UiState::Displaying(ConversionResult::Failure { .. }));

    let mut hints: Vec<(&str, &str, bool)> = vec![
        ("Enter", "Convert", app.convert_enabled),
        ("Ctrl+Y", "Copy", app.copy_enabled),
    ];
    if retry_available {
        hints.push(("Ctrl+R", "Retry", true));
    }
    if app.clear_visible {
        hints.push(("Ctrl+L", "Clear", true));
    }
    // Output is drawn first, so this reflects the current frame
    if app.output_max_scroll.get() > 0 {
        hints.push(("PgUp/PgDn", "Scroll", true));
    }
    hints.push(("Tab", "Audience", true));
    hints.push(("F1", "Help", true));
    hints.push(("Esc", "Quit", true));

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 3 } else if area.width < 90 { 5 } else { hints.len() };

    let spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action, enabled)| key_hint(key, action, *enabled, accent(), text_dim(), inactive()))
        .collect();

    f.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            format!("═══ {} ═══", title),
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        ))
    };
    let binding = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<11}", key), Style::default().fg(accent())),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        section("Editing"),
        binding("Type", "Edit the original text"),
        binding("Alt+Enter", "New line"),
        binding("Ctrl+L", "Clear the input"),
        binding("Tab", "Switch between text and audience"),
        binding("←/→", "Choose audience (audience focused)"),
        Line::from(""),
        section("Conversion"),
        binding("Enter", "Convert"),
        binding("Ctrl+R", "Retry after an error"),
        binding("Ctrl+Y", "Copy converted text"),
        binding("PgUp/PgDn", "Scroll converted text"),
        binding("↑/↓", "Scroll by one line (text focused)"),
        binding("F2 / F3", "Rate the result 👍 / 👎"),
        Line::from(""),
        section("General"),
        binding("F1", "Toggle this help"),
        binding("Esc", "Close help / quit"),
        binding("Ctrl+C", "Quit"),
    ];

    let help = Paragraph::new(help_text).block(
        Block::default()
            .title(Span::styled(" Help ", Style::default().fg(accent()).add_modifier(Modifier::BOLD)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent())),
    );
    f.render_widget(help, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ConversionRequest;
    use crate::app::tests::{app_with, FakeBackend, FakeClipboard};
    use crossterm::event::{KeyCode, KeyEvent};
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        render_sized(app, 100, 30)
    }

    fn render_sized(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();

        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn blank_app() -> App {
        app_with(FakeBackend::with_replies(vec![]), FakeClipboard::default())
    }

    #[test]
    fn test_idle_screen() {
        let app = blank_app();
        let screen = render(&app);
        assert!(screen.contains("0 / 500"));
        assert!(screen.contains("Type something to convert"));
        assert!(!screen.contains("Ctrl+L clear"));
        assert!(screen.contains("Boss"));
    }

    #[test]
    fn test_counter_and_clear_hint() {
        let mut app = blank_app();
        app.insert_text("Need this by Friday");
        let screen = render(&app);
        assert!(screen.contains("19 / 500"));
        assert!(screen.contains("Ctrl+L clear"));
    }

    #[test]
    fn test_converted_text_is_not_interpreted() {
        let mut app = blank_app();
        app.result = Some(ConversionResult::Success {
            converted_text: "<b>Dear team</b> &amp; all".to_string(),
        });
        app.feedback_visible = true;
        let screen = render(&app);
        assert!(screen.contains("<b>Dear team</b> &amp; all"));
        assert!(screen.contains("Helpful?"));
    }

    #[test]
    fn test_error_panel_shows_message_and_retry() {
        for style in [ErrorPanelStyle::Bordered, ErrorPanelStyle::Compact] {
            let mut app = blank_app();
            app.config.error_panel = style;
            app.result = Some(ConversionResult::Failure {
                message: "There was a problem communicating with the server.".to_string(),
                request: ConversionRequest {
                    text: "hi".to_string(),
                    target: "Upward".to_string(),
                },
            });
            let screen = render(&app);
            assert!(screen.contains("Something went wrong"));
            assert!(screen.contains("Ctrl+R Retry"));
        }
    }

    #[test]
    fn test_toast_takes_info_line() {
        let mut app = blank_app();
        app.show_toast("Copied to clipboard!", ToastKind::Success);
        let screen = render(&app);
        assert!(screen.contains("Copied to clipboard!"));
        assert!(!screen.contains("Type something to convert"));
    }

    #[test]
    fn test_help_popup() {
        let mut app = blank_app();
        app.popup = Popup::Help;
        let screen = render(&app);
        assert!(screen.contains("Copy converted text"));
    }

    #[test]
    fn test_escape_sequences_never_reach_terminal() {
        let mut app = blank_app();
        app.insert_text("typed\x1b[31mred");
        app.result = Some(ConversionResult::Success {
            converted_text: "ok\x1b]52;c;ZXZpbA==\x07\x1b[2Jdone\u{9b}1m".to_string(),
        });
        let screen = render(&app);

        assert!(!screen.chars().any(|c| c.is_control() && c != '\n'));
        assert!(screen.contains("ok␛]52;c;ZXZpbA==␇␛[2Jdone"));
        assert!(screen.contains("typed␛[31mred"));

        // Only the display is cleaned; the stored result stays raw
        match &app.result {
            Some(ConversionResult::Success { converted_text }) => assert!(converted_text.contains('\x1b')),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_long_result_scrolls_to_last_line() {
        let mut app = blank_app();
        let text: Vec<String> = (1..=40).map(|i| format!("line {:02}", i)).collect();
        app.result = Some(ConversionResult::Success {
            converted_text: text.join("\n"),
        });

        let screen = render_sized(&app, 80, 24);
        assert!(screen.contains("line 01"));
        assert!(!screen.contains("line 40"));
        assert!(screen.contains("PgUp/PgDn"));
        assert!(app.output_max_scroll.get() > 0);

        for _ in 0..10 {
            app.handle_key(KeyEvent::from(KeyCode::PageDown));
        }
        assert_eq!(app.output_scroll, app.output_max_scroll.get());
        let screen = render_sized(&app, 80, 24);
        assert!(screen.contains("line 40"));
        assert!(!screen.contains("line 01"));
    }

    #[test]
    fn test_long_input_keeps_tail_visible() {
        let mut app = blank_app();
        let text: Vec<String> = (1..=31).map(|i| format!("row {:02}", i)).collect();
        app.insert_text(&text.join("\n"));

        let screen = render_sized(&app, 80, 24);
        assert!(screen.contains("row 31█"));
        assert!(!screen.contains("row 01"));
    }

    #[test]
    fn test_wrapped_input_keeps_tail_visible() {
        let mut app = blank_app();
        let mut text = "word ".repeat(200);
        text.push_str("THE END");
        app.insert_text(&text);

        let screen = render_sized(&app, 60, 20);
        assert!(screen.contains("THE END"));
    }
}
