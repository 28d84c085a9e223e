use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::cell::Cell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::api::{ConversionRequest, ConvertBackend, ConvertError};
use crate::clipboard::Clipboard;
use crate::config::{AppConfig, Audience};

/// Identity of one outbound conversion
pub type RequestId = u64;

/// Placeholder shown in the output box while a conversion is in flight
pub const BUSY_PLACEHOLDER: &str = "Rewriting your text...";

/// Rows moved by PgUp/PgDn in the converted text
const SCROLL_PAGE: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Audience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// The single live result shown in the output box
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Success {
        converted_text: String,
    },
    Failure {
        message: String,
        request: ConversionRequest,  // Resent as-is by retry
    },
}

/// What the screen is showing, derived from the controller fields
#[derive(Debug, PartialEq, Eq)]
pub enum UiState<'a> {
    Idle,
    Ready,
    Loading,
    Displaying(&'a ConversionResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Up,
    Down,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Up => "up",
            FeedbackKind::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Failure,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub shown_at: Instant,
}

/// A settled conversion, reported back by the request task
#[derive(Debug)]
struct Outcome {
    id: RequestId,
    request: ConversionRequest,
    result: Result<String, ConvertError>,
}

pub struct App {
    pub config: AppConfig,
    pub focus: Focus,
    pub popup: Popup,

    // Input state
    pub input: String,
    pub audience: usize,

    // Display state kept in sync by on_input_changed / set_loading
    pub counter_label: String,
    pub clear_visible: bool,
    pub convert_enabled: bool,
    pub copy_enabled: bool,
    pub feedback_visible: bool,

    pub result: Option<ConversionResult>,
    pub toast: Option<Toast>,

    /// First visible row of the converted text
    pub output_scroll: u16,
    /// Largest useful `output_scroll`, recorded by the last draw
    pub output_max_scroll: Cell<u16>,

    // Single-flight bookkeeping
    next_request: RequestId,
    active_request: Option<RequestId>,

    backend: Arc<dyn ConvertBackend>,
    clipboard: Box<dyn Clipboard>,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl App {
    pub fn new(config: AppConfig, backend: Arc<dyn ConvertBackend>, clipboard: Box<dyn Clipboard>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let audience = config.initial_audience();

        let mut app = Self {
            config,
            focus: Focus::Input,
            popup: Popup::None,

            input: String::new(),
            audience,

            counter_label: String::new(),
            clear_visible: false,
            convert_enabled: false,
            copy_enabled: false,
            feedback_visible: false,

            result: None,
            toast: None,

            output_scroll: 0,
            output_max_scroll: Cell::new(0),

            next_request: 0,
            active_request: None,

            backend,
            clipboard,
            outcome_tx,
            outcome_rx,
        };
        app.on_input_changed();
        app
    }

    pub fn selected_audience(&self) -> &Audience {
        // config.normalize() guarantees at least one entry
        &self.config.audiences[self.audience.min(self.config.audiences.len() - 1)]
    }

    pub fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    pub fn over_limit(&self) -> bool {
        self.input_len() > self.config.max_chars
    }

    pub fn is_loading(&self) -> bool {
        self.active_request.is_some()
    }

    pub fn ui_state(&self) -> UiState<'_> {
        if self.is_loading() {
            UiState::Loading
        } else if let Some(result) = &self.result {
            UiState::Displaying(result)
        } else if self.input.is_empty() {
            UiState::Idle
        } else {
            UiState::Ready
        }
    }

    /// Refresh the counter, clear affordance and convert action after an edit
    pub fn on_input_changed(&mut self) {
        let len = self.input_len();
        self.counter_label = format!("{} / {}", len, self.config.max_chars);
        self.clear_visible = len > 0;
        self.convert_enabled = len > 0 && !self.is_loading();
    }

    pub fn on_clear(&mut self) {
        self.input.clear();
        self.on_input_changed();
        self.focus = Focus::Input;
    }

    pub fn insert_text(&mut self, text: &str) {
        // Terminals send \r for newlines inside bracketed paste
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.input.push_str(&normalized);
        self.on_input_changed();
    }

    pub fn cycle_audience(&mut self, forward: bool) {
        let count = self.config.audiences.len();
        if count == 0 {
            return;
        }
        self.audience = if forward {
            (self.audience + 1) % count
        } else {
            self.audience.checked_sub(1).unwrap_or(count - 1)
        };
    }

    /// Start a conversion of the current input (no-op for blank input or while busy)
    pub fn submit_conversion(&mut self) {
        if self.is_loading() {
            tracing::debug!("Conversion already in flight, ignoring submit");
            return;
        }

        let text = self.input.trim();
        if text.is_empty() {
            return;
        }

        let request = ConversionRequest {
            text: text.to_string(),
            target: self.selected_audience().value.clone(),
        };
        self.dispatch(request);
    }

    /// Resend the request behind the error panel currently shown
    pub fn retry(&mut self) {
        if self.is_loading() {
            return;
        }
        let request = match &self.result {
            Some(ConversionResult::Failure { request, .. }) => request.clone(),
            _ => return,
        };
        tracing::info!("Retrying conversion");
        self.dispatch(request);
    }

    fn dispatch(&mut self, request: ConversionRequest) {
        self.next_request += 1;
        let id = self.next_request;
        self.active_request = Some(id);
        self.set_loading(true);

        tracing::info!(
            id,
            audience = %request.target,
            chars = request.text.chars().count(),
            "Submitting conversion"
        );

        let backend = Arc::clone(&self.backend);
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = backend.convert(&request).await;
            // Receiver only goes away when the app is shutting down
            let _ = tx.send(Outcome { id, request, result });
        });
    }

    fn set_loading(&mut self, loading: bool) {
        if loading {
            self.convert_enabled = false;
            self.copy_enabled = false;
            self.feedback_visible = false;
            self.result = None;
            self.output_scroll = 0;
        } else {
            self.convert_enabled = !self.input.is_empty();
        }
    }

    fn apply_outcome(&mut self, outcome: Outcome) {
        if self.active_request != Some(outcome.id) {
            tracing::debug!(id = outcome.id, active = ?self.active_request, "Discarding stale conversion result");
            return;
        }

        self.active_request = None;
        self.set_loading(false);
        self.output_scroll = 0;

        match outcome.result {
            Ok(converted_text) => {
                tracing::info!(id = outcome.id, "Conversion succeeded");
                self.result = Some(ConversionResult::Success { converted_text });
                self.copy_enabled = true;
                self.feedback_visible = true;
            }
            Err(e) => {
                tracing::warn!(id = outcome.id, detail = %e.detail(), "Conversion failed");
                self.result = Some(ConversionResult::Failure {
                    message: e.to_string(),
                    request: outcome.request,
                });
            }
        }
    }

    pub fn copy_result(&mut self) {
        let text = match &self.result {
            Some(ConversionResult::Success { converted_text }) if self.copy_enabled => converted_text.clone(),
            _ => return,
        };
        if text.is_empty() {
            return;
        }

        match self.clipboard.write_text(&text) {
            Ok(()) => self.show_toast("Copied to clipboard!", ToastKind::Success),
            Err(e) => {
                tracing::warn!("Copy failed: {}", e);
                self.show_toast("Failed to copy.", ToastKind::Failure);
            }
        }
    }

    /// Move the converted text view by `rows`, clamped to what the last draw showed
    pub fn scroll_output(&mut self, rows: i32) {
        let max = i32::from(self.output_max_scroll.get());
        let next = (i32::from(self.output_scroll) + rows).clamp(0, max);
        self.output_scroll = u16::try_from(next).unwrap_or(0);
    }

    /// Acknowledge a thumbs up/down; nothing leaves the machine
    pub fn submit_feedback(&mut self, kind: FeedbackKind) {
        if !self.feedback_visible {
            return;
        }
        tracing::info!(kind = kind.as_str(), "Feedback recorded");
        self.show_toast("Thanks for your feedback!", ToastKind::Info);
        self.feedback_visible = false;
    }

    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        let message = message.into();

        if self.config.notifications {
            if let Err(e) = notify_rust::Notification::new()
                .summary("biztone")
                .body(&message)
                .show()
            {
                tracing::warn!("Desktop notification failed: {}", e);
            }
        }

        self.toast = Some(Toast {
            message,
            kind,
            shown_at: Instant::now(),
        });
    }

    fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.config.toast_millis)
    }

    /// Apply settled conversions and expire the toast
    pub fn tick(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply_outcome(outcome);
        }

        let expired = self
            .toast
            .as_ref()
            .map(|t| t.shown_at.elapsed() >= self.toast_duration())
            .unwrap_or(false);
        if expired {
            self.toast = None;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.popup == Popup::Help {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Enter) {
                self.popup = Popup::None;
            }
            return;
        }

        // Plain characters are the user's text; keep them out of the log
        if !matches!(key.code, KeyCode::Char(_)) || key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            tracing::debug!(code = ?key.code, modifiers = ?key.modifiers, focus = ?self.focus, "Key");
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::F(1) => self.popup = Popup::Help,
            KeyCode::F(2) => self.submit_feedback(FeedbackKind::Up),
            KeyCode::F(3) => self.submit_feedback(FeedbackKind::Down),

            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Input => Focus::Audience,
                    Focus::Audience => Focus::Input,
                };
            }

            KeyCode::Char('l') if ctrl => self.on_clear(),
            KeyCode::Char('y') if ctrl => self.copy_result(),
            KeyCode::Char('r') if ctrl => self.retry(),

            KeyCode::Enter if alt => {
                if self.focus == Focus::Input {
                    self.insert_text("\n");
                }
            }
            KeyCode::Enter => self.submit_conversion(),

            KeyCode::PageUp => self.scroll_output(-i32::from(SCROLL_PAGE)),
            KeyCode::PageDown => self.scroll_output(i32::from(SCROLL_PAGE)),

            _ => match self.focus {
                Focus::Input => self.handle_input_key(key, ctrl || alt),
                Focus::Audience => self.handle_audience_key(key),
            },
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent, modified: bool) {
        match key.code {
            KeyCode::Char(c) if !modified => {
                self.input.push(c);
                self.on_input_changed();
            }
            KeyCode::Backspace => {
                if self.input.pop().is_some() {
                    self.on_input_changed();
                }
            }
            KeyCode::Up => self.scroll_output(-1),
            KeyCode::Down => self.scroll_output(1),
            _ => {}
        }
    }

    fn handle_audience_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Up | KeyCode::Char('h') | KeyCode::Char('k') => self.cycle_audience(false),
            KeyCode::Right | KeyCode::Down | KeyCode::Char('l') | KeyCode::Char('j') => self.cycle_audience(true),
            _ => {}
        }
    }
}
