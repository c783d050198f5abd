mod action;
mod app;
mod cli;
mod collector;
mod config;
mod discovery;
mod error;
mod event;
mod layout;
mod sort;
mod status;
mod tui;
mod ui;
mod worker;

use std::fs::OpenOptions;
use std::panic;
use std::sync::Mutex;
use std::time::Instant;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::App;
use crate::cli::Cli;
use crate::config::{Config, Settings};
use crate::error::GhStatusError;
use crate::tui::{EventHandler, Tui};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();
    let settings = Settings::resolve(Config::load(), cli.poll_interval, cli.max_concurrent);
    for warning in &settings.warnings {
        eprintln!("{}", warning);
        tracing::warn!("{}", warning);
    }

    if cli.users.is_empty() {
        eprintln!(
            "{}. Usage: ghstatus [-p seconds>=1] [-c count>=1] <github-username> [user2 ...]",
            GhStatusError::NoUsers
        );
        return Ok(());
    }

    let repos = discovery::discover_all(&cli.users, &settings.commands.discover).await;
    if repos.is_empty() {
        eprintln!("{}, exiting...", GhStatusError::NoRepositories);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let mut app = App::new(repos, cli.users.len(), &settings, cancel.clone());
    app.start_round(Instant::now()).await;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let result = match tui::init() {
        Ok(mut terminal) => run(&mut app, &mut terminal, &cancel).await,
        Err(e) => Err(e.into()),
    };

    // Every exit path reaps the fetches and restores the terminal
    app.shutdown().await;
    tui::restore()?;

    result?;
    Ok(())
}

async fn run(
    app: &mut App,
    terminal: &mut Tui,
    cancel: &CancellationToken,
) -> error::Result<()> {
    let mut events = EventHandler::new();

    while !cancel.is_cancelled() {
        app.tick_spinner(Instant::now());

        // Bounded wait; paces the loop
        app.collect().await;
        app.refresh_order();

        let now = Instant::now();
        terminal.draw(|frame| {
            app.relayout(frame.area());
            ui::render(frame, &app.display_state(now));
        })?;

        if app.refresh_due(now) {
            app.start_round(now).await;
        }

        if let Some(event) = events.try_next() {
            let action = app.handle_event(event);
            app.update(action).await;
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Cancel on SIGINT or SIGTERM so the loop leaves through the normal teardown.
async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown signal received");
    cancel.cancel();
}

/// Log to a file in the cache directory; stderr belongs to the dashboard.
fn init_logging() {
    let filter = EnvFilter::try_from_env("GHSTATUS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_file = dirs::cache_dir()
        .map(|dir| dir.join("ghstatus"))
        .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir.join("ghstatus.log")))
        .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());

    let registry = tracing_subscriber::registry().with(filter);
    match log_file {
        Some(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init(),
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::sink))
            .init(),
    }
}
