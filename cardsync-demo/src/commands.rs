use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use cardsync_core::modules::config as core_config;
use cardsync_core::{
    BuiltinCard, CardLoader, ExternalStore, LocalCell, MemoryVariableStore, SubscriptionLifecycle,
    SyncBridge,
};
use cardsync_types::{
    BridgeState, CardError, CardSource, DetectionMode, Direction, EchoGuard, SyncConfig,
};

use crate::cli::Cli;

/// Config file (or data dir), then environment, then command line.
pub fn resolve_config(cli: &Cli) -> Result<SyncConfig> {
    let mut config = match &cli.config {
        Some(path) => core_config::load_config_at(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => core_config::load_config().context("loading config from the data directory")?,
    };

    if let Some(ms) = cli.poll_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(ms) = cli.cooldown_ms {
        config.cooldown_ms = ms;
    }
    if let Some(detection) = &cli.detection {
        config.detection = DetectionMode::from_string(detection);
    }
    if let Some(guard) = &cli.echo_guard {
        config.echo_guard = EchoGuard::from_string(guard);
    }

    config.validate()?;
    Ok(config)
}

/// A built-in card name, or a path to a card file.
pub async fn load_card(loader: &CardLoader, card: &str) -> Result<CardSource, CardError> {
    match BuiltinCard::from_name(card) {
        Some(builtin) => loader.load_builtin(builtin).await,
        None => CardLoader::load(Path::new(card)).await,
    }
}

/// Long enough for a write, its echo and both cooldowns to settle.
pub fn settle_time(config: &SyncConfig) -> Duration {
    config.poll_interval() * 2 + config.cooldown() * 3
}

fn engine_bool(store: &dyn ExternalStore, bridge: &SyncBridge<bool>) -> String {
    store
        .query(bridge.scope_id(), bridge.variable())
        .map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn state_cell(state: BridgeState) -> Cell {
    match state {
        BridgeState::Idle => Cell::new("idle").fg(Color::Green),
        BridgeState::PropagatingLocalToExternal => Cell::new("local→engine").fg(Color::Yellow),
        BridgeState::PropagatingExternalToLocal => Cell::new("engine→local").fg(Color::Yellow),
        BridgeState::Settling => Cell::new("settling").fg(Color::Red),
    }
}

pub async fn handle_run(
    config: SyncConfig,
    loader: &CardLoader,
    card: &str,
    toggles: u32,
) -> Result<()> {
    let card = load_card(loader, card).await;
    let store = Arc::new(match &card {
        Ok(card) => MemoryVariableStore::from_card(card),
        Err(_) => MemoryVariableStore::new(),
    });

    let cell = LocalCell::new(false);
    let lifecycle = SubscriptionLifecycle::new(config.clone(), cell.clone())?;
    let bridge = match lifecycle.attach(card, store.clone()) {
        Ok(bridge) => bridge,
        Err(e) => {
            println!("{} view state: {:?}", "✗".red(), lifecycle.view_state());
            return Err(e.into());
        },
    };

    println!(
        "{} Attached to {}/{} ({} detection, {} guard)",
        "✓".green(),
        bridge.scope_id().cyan(),
        bridge.variable().cyan(),
        config.detection,
        config.echo_guard
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Step", "Actor", "Local", "Engine", "State", "Out trips", "In trips"]);

    let pause = settle_time(&config);
    for step in 1..=toggles {
        let actor = if step % 2 == 1 {
            cell.set(!cell.get());
            "user"
        } else {
            let next = if cell.get() { "0" } else { "1" };
            store.set_variable(bridge.scope_id(), bridge.variable(), next);
            "card action"
        };

        tokio::time::sleep(pause).await;
        table.add_row(vec![
            Cell::new(step),
            Cell::new(actor),
            Cell::new(cell.get()),
            Cell::new(engine_bool(store.as_ref(), &bridge)),
            state_cell(bridge.state()),
            Cell::new(bridge.breaker(Direction::LocalToExternal).total_trips),
            Cell::new(bridge.breaker(Direction::ExternalToLocal).total_trips),
        ]);
    }
    println!("{table}");

    let stats = bridge.stats();
    lifecycle.detach();
    info!(?stats, "Run finished");
    println!(
        "{} outbound writes: {}, inbound applies: {}, suppressed: {}, engine writes: {}",
        "Summary:".cyan().bold(),
        stats.outbound_writes,
        stats.inbound_applies,
        stats.suppressed,
        store.write_count(bridge.scope_id(), bridge.variable())
    );
    Ok(())
}

pub fn handle_status(
    config: &SyncConfig,
    loader: &CardLoader,
    json: bool,
    save: bool,
) -> Result<()> {
    if save {
        let path = core_config::save_config(config)?;
        info!(path = %path.display(), "Resolved configuration persisted");
        if !json {
            println!("{} Saved to {}", "✓".green(), path.display());
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("{}", "cardsync Configuration:".cyan().bold());
    println!("  Variable: {}", config.variable);
    println!("  Scope override: {}", config.scope_id.as_deref().unwrap_or("-"));
    println!("  Poll interval: {} ms", config.poll_interval_ms);
    println!("  Cooldown: {} ms", config.cooldown_ms);
    println!("  Detection: {}", config.detection);
    println!("  Echo guard: {}", config.echo_guard);
    println!("  Echo ledger capacity: {}", config.echo_ledger_capacity);
    match core_config::config_path() {
        Ok(path) => println!("  Config file: {}", path.display()),
        Err(e) => println!("  Config file: {}", e.to_string().red()),
    }

    println!("{}", "Built-in cards:".cyan().bold());
    for card in BuiltinCard::ALL {
        match loader.resolve(card) {
            Ok(path) => println!("  {} {} → {}", "✓".green(), card, path.display()),
            Err(e) => println!("  {} {} ({})", "✗".red(), card, e),
        }
    }
    println!("  Version: {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
