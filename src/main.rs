//! poemarket - Path of Exile economy dashboard for the terminal
//!
//! A terminal UI application that displays currency and item prices for a
//! chosen league, with character viewing and trade price checks.

mod app;
mod logging;
mod refresh;
mod ui;

use poemarket::{cli, config};

use std::io;
use std::panic;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use app::{App, AppState, PendingAction};
use refresh::{RefreshConfig, RefreshHandle, RefreshMessage};

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Renders the UI based on the current application state
fn render_ui(frame: &mut ratatui::Frame, app: &App) {
    match app.state {
        AppState::Loading => render_loading(frame),
        AppState::Currency => ui::render_currency(frame, app),
        AppState::Items => ui::render_items(frame, app),
        AppState::Characters => ui::render_characters(frame, app),
    }

    if app.show_help {
        ui::render_help_overlay(frame);
    }
}

/// Renders a loading message while data is being fetched
fn render_loading(frame: &mut ratatui::Frame) {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Style},
        widgets::Paragraph,
    };

    let area = frame.area();

    // Center the loading message vertically
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let loading_text = Paragraph::new("Loading price data...")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment first: .env is honored in development
    dotenvy::dotenv().ok();
    let _log_path = logging::init();

    let cli = cli::Cli::parse();
    let startup = match cli::StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    let app_config = config::Config::from_env();

    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app instance
    let mut app = App::new(app_config, startup);

    // Initial render to show loading state
    terminal.draw(|f| render_ui(f, &app))?;

    // Trigger initial data load
    app.load_all_data().await;

    // Background refresh ticker
    let mut refresh_handle = RefreshHandle::spawn(RefreshConfig::default());

    // Main event loop
    loop {
        // Render UI
        terminal.draw(|f| render_ui(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        // Run any async work the key handler queued
        if let Some(action) = app.take_pending() {
            match action {
                PendingAction::ReloadAll => app.load_all_data().await,
                PendingAction::ReloadPrices => app.load_prices().await,
                PendingAction::ReloadLeagues => app.reload_leagues().await,
                PendingAction::LoadCharacters => app.load_characters().await,
                PendingAction::TradeCheck => app.run_trade_check().await,
            }
        }

        // Background refresh cadence
        while let Some(message) = refresh::try_recv(&mut refresh_handle) {
            match message {
                RefreshMessage::PricesDue => app.load_prices().await,
                RefreshMessage::LeaguesDue => app.reload_leagues().await,
            }
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
