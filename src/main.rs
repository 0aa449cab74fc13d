mod app;
mod backend;
mod catalog;
mod config;
mod debounce;
mod diff;
mod domain;
mod handlers;
mod infra;
mod ledger;
mod search;
mod session;
mod terminal;
mod tristate;
mod ui;

use crate::app::{App, BackendEvent, BackendTask};
use crate::backend::worker_loop;
use crate::config::{AppConfig, ensure_parent_dir};
use crate::debounce::Debouncer;
use crate::handlers::{handle_backend_event, handle_key_event, send_task, sync_reveal_timer};
use crate::infra::{CatalogBackend, HttpCatalogBackend};
use crate::terminal::{Tui, restore_terminal, setup_terminal};
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Pick which Confluence pages feed a vector store and sync the difference.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Vector store to open; the store picker opens when omitted
    #[arg(short, long)]
    store: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match AppConfig::load_or_default(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load config, using defaults: {err:#}");
            AppConfig::default()
        }
    };

    init_tracing(&config, cli.verbose)?;
    info!(base_url = %config.base_url, "starting");

    // reqwest's blocking client owns a runtime and must be built off the async threads
    let backend_config = config.clone();
    let backend: Arc<dyn CatalogBackend> = Arc::new(
        tokio::task::spawn_blocking(move || HttpCatalogBackend::from_config(&backend_config))
            .await
            .context("backend setup task failed")??,
    );

    let mut terminal = setup_terminal()?;
    let run_result = run_app(&mut terminal, config, backend, cli.store).await;
    restore_terminal(&mut terminal)?;

    let config = match run_result {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = config.save(cli.config.as_deref()) {
        eprintln!("failed to save config: {err:#}");
    }

    Ok(())
}

/// Logs go to a file so they never draw over the TUI.
fn init_tracing(config: &AppConfig, verbose: u8) -> Result<()> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| "curator_tui=info".into()),
        1 => EnvFilter::new("curator_tui=debug"),
        _ => EnvFilter::new("curator_tui=trace"),
    };

    let path = config.log_path()?;
    ensure_parent_dir(&path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

async fn run_app(
    terminal: &mut Tui,
    config: AppConfig,
    backend: Arc<dyn CatalogBackend>,
    store: Option<String>,
) -> Result<AppConfig> {
    let mut debouncer = Debouncer::new(config.search_debounce());
    let initial_store = store.or_else(|| config.default_store.clone());
    let mut app = App::new(config);

    let (task_tx, task_rx) = mpsc::unbounded_channel::<BackendTask>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<BackendEvent>();

    tokio::spawn(worker_loop(backend, task_rx, event_tx.clone()));

    match initial_store {
        Some(store) => {
            if let Some(task) = app.switch_target(&store) {
                send_task(&mut app, &task_tx, task)?;
            }
        }
        None => {
            app.open_store_picker();
            send_task(&mut app, &task_tx, BackendTask::ListStores)?;
        }
    }

    while !app.should_quit {
        while let Ok(event) = event_rx.try_recv() {
            handle_backend_event(&mut app, &mut debouncer, event);
        }

        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        if event::poll(Duration::from_millis(50)).context("event poll failed")?
            && let Event::Key(key) = event::read().context("event read failed")?
            && key.kind == KeyEventKind::Press
        {
            handle_key_event(&mut app, key, &task_tx)?;
            sync_reveal_timer(&mut app, &mut debouncer, &event_tx);
        }
    }

    if app.diff_summary().has_changes {
        warn!(
            added = app.diff_summary().added_count,
            removed = app.diff_summary().removed_count,
            "quitting with unsynced changes"
        );
    }

    Ok(app.config)
}
