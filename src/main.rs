mod api;
mod app;
mod clipboard;
mod config;
mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use reqwest::Url;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{ConversionRequest, ConvertBackend, ConvertError, HttpBackend};
use app::{App, Focus, Popup};
use clipboard::SystemClipboard;
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "biztone")]
#[command(version)]
#[command(about = "Rewrite text into a business tone for your boss, a colleague or a customer")]
struct Args {
    /// Conversion backend base URL (overrides the config file)
    #[arg(short, long)]
    server: Option<String>,

    /// Convert this text once and print the result instead of opening the TUI
    #[arg(short, long)]
    text: Option<String>,

    /// Audience value to convert for (e.g. Upward, Lateral, External)
    #[arg(short = 'a', long)]
    target: Option<String>,

    /// Check that the backend is reachable and print its status as JSON
    #[arg(long)]
    check: bool,

    /// Append logs to this file (filter with RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The TUI owns the terminal, so it only logs to a file
    let cli_only = args.check || args.text.is_some();
    init_logging(args.log_file.as_deref(), cli_only)?;

    let mut config = AppConfig::load().unwrap_or_default();
    if let Some(server) = &args.server {
        config.server = server.trim_end_matches('/').to_string();
    }

    let backend = HttpBackend::new(
        &config.server,
        config.request_timeout_secs.map(Duration::from_secs),
    )?;

    if args.check {
        return print_health(&backend).await;
    }

    if let Some(text) = args.text {
        return convert_once(&backend, &config, &text, args.target.as_deref()).await;
    }

    if let Some(target) = args.target {
        config.default_audience = Some(target);
    }

    run_tui(config, Arc::new(backend)).await
}

fn init_logging(log_file: Option<&Path>, to_stderr: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };
    let stderr_layer = (to_stderr && file_layer.is_none()).then(|| fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

async fn print_health(backend: &HttpBackend) -> Result<()> {
    let health = backend.health().await;
    println!("{}", serde_json::to_string(&health)?);
    if !health.reachable {
        anyhow::bail!("backend at {} is not reachable", backend.endpoint());
    }
    Ok(())
}

async fn convert_once(backend: &HttpBackend, config: &AppConfig, text: &str, target: Option<&str>) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("nothing to convert");
    }

    let target = match target {
        Some(t) => t.to_string(),
        None => config.audiences[config.initial_audience()].value.clone(),
    };

    let request = ConversionRequest {
        text: text.to_string(),
        target,
    };
    tracing::info!(audience = %request.target, "Converting once");

    let converted = backend
        .convert(&request)
        .await
        .map_err(|e| conversion_failed(e, backend.endpoint()))?;
    println!("{}", converted);
    Ok(())
}

/// CLI error for a failed conversion; carries the cause the TUI only logs
fn conversion_failed(error: ConvertError, endpoint: &Url) -> anyhow::Error {
    let detail = error.detail();
    anyhow::Error::new(error).context(format!("Conversion via {} failed: {}", endpoint, detail))
}

async fn run_tui(config: AppConfig, backend: Arc<dyn ConvertBackend>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    let mut app = App::new(config, backend, Box::new(SystemClipboard));

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Esc if app.popup == Popup::None => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(())
                    }
                    _ => app.handle_key(key),
                },
                Event::Paste(text) if app.focus == Focus::Input && app.popup == Popup::None => {
                    app.insert_text(&text);
                }
                _ => {}
            }
        }

        // Pick up settled conversions, expire toasts
        app.tick();
    }
}
