//! The four reference scenarios, run against the bundled module A card.

use anyhow::{bail, Result};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use cardsync_core::{
    BuiltinCard, CardLoader, ExternalStore, LocalCell, MemoryVariableStore, SubscriptionLifecycle,
    SyncBridge,
};
use cardsync_types::{BridgeState, Direction, SyncConfig, VariableValue};

use crate::commands::settle_time;

struct Harness {
    lifecycle: SubscriptionLifecycle<bool>,
    bridge: SyncBridge<bool>,
    store: Arc<MemoryVariableStore>,
    cell: LocalCell<bool>,
    config: SyncConfig,
}

impl Harness {
    async fn start(config: &SyncConfig, loader: &CardLoader) -> Result<Self> {
        let card = loader.load_builtin(BuiltinCard::ModuleA).await?;
        let store = Arc::new(MemoryVariableStore::from_card(&card));
        let cell = LocalCell::new(false);
        let lifecycle = SubscriptionLifecycle::new(config.clone(), cell.clone())?;
        let bridge = lifecycle.attach(Ok(card), store.clone())?;
        Ok(Self { lifecycle, bridge, store, cell, config: config.clone() })
    }

    fn engine(&self) -> Option<VariableValue> {
        self.store.query(self.bridge.scope_id(), self.bridge.variable())
    }

    fn engine_writes(&self) -> u64 {
        self.store.write_count(self.bridge.scope_id(), self.bridge.variable())
    }

    async fn settle(&self) {
        tokio::time::sleep(settle_time(&self.config)).await;
    }

    async fn poll_ticks(&self, ticks: u32) {
        tokio::time::sleep(self.config.poll_interval() * ticks).await;
    }
}

fn check(label: &str, ok: bool, failures: &mut Vec<String>) {
    if ok {
        println!("  {} {}", "✓".green(), label);
    } else {
        println!("  {} {}", "✗".red(), label);
        failures.push(label.to_string());
    }
}

pub async fn handle_scenario(config: SyncConfig, loader: &CardLoader, name: &str) -> Result<()> {
    let harness = Harness::start(&config, loader).await?;
    let mut failures = Vec::new();

    match name {
        "a" => scenario_a(&harness, &mut failures).await,
        "b" => scenario_b(&harness, &mut failures).await,
        "c" => scenario_c(&harness, &mut failures).await,
        "d" => scenario_d(&harness, &mut failures).await,
        other => bail!("Unknown scenario: {}", other),
    }

    if failures.is_empty() {
        println!("{} Scenario {} passed", "✓".green().bold(), name.to_uppercase());
        Ok(())
    } else {
        bail!("Scenario {} failed: {}", name.to_uppercase(), failures.join(", "))
    }
}

async fn scenario_a(h: &Harness, failures: &mut Vec<String>) {
    println!("{}", "Scenario A: local change reaches the engine".cyan().bold());
    h.cell.set(true);
    h.poll_ticks(2).await;

    let outbound = h.bridge.breaker(Direction::LocalToExternal);
    check(
        "engine holds true within two poll intervals",
        h.engine() == Some(VariableValue::Bool(true)),
        failures,
    );
    check("outbound breaker engaged", outbound.total_trips == 1, failures);

    h.settle().await;
    let outbound = h.bridge.breaker(Direction::LocalToExternal);
    check("outbound breaker released", outbound.is_settled(), failures);
    check("local value unchanged", h.cell.get(), failures);
}

async fn scenario_b(h: &Harness, failures: &mut Vec<String>) {
    println!("{}", "Scenario B: engine change reaches the local cell".cyan().bold());
    h.store.set_variable(h.bridge.scope_id(), h.bridge.variable(), "1");

    check("local value is true", h.cell.get(), failures);
    check("detector marker updated", h.cell.observed(), failures);

    h.poll_ticks(3).await;
    check("no outbound propagation", h.bridge.stats().outbound_writes == 0, failures);
    check("engine written once", h.engine_writes() == 1, failures);
}

async fn scenario_c(h: &Harness, failures: &mut Vec<String>) {
    println!("{}", "Scenario C: fast toggles inside one cooldown".cyan().bold());
    let step = Duration::from_millis(h.config.cooldown_ms / 3).max(h.config.poll_interval());

    h.cell.set(true);
    tokio::time::sleep(step).await;
    h.cell.set(false);
    tokio::time::sleep(step).await;
    h.cell.set(true);

    h.settle().await;
    h.settle().await;
    let expected = Some(VariableValue::Bool(h.cell.get()));
    check("engine matches last local write", h.engine() == expected, failures);
    check("bridge back to idle", h.bridge.state() == BridgeState::Idle, failures);
}

async fn scenario_d(h: &Harness, failures: &mut Vec<String>) {
    println!("{}", "Scenario D: detach with a release pending".cyan().bold());
    h.cell.set(true);
    let deadline = Instant::now() + h.config.poll_interval() * 3;
    while !h.bridge.breaker(Direction::LocalToExternal).engaged && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let pending = h.bridge.breaker(Direction::LocalToExternal).pending_releases;
    check("a release is pending at detach", pending > 0, failures);
    check("first detach tears down", h.lifecycle.detach(), failures);
    check("second detach is a no-op", !h.lifecycle.detach(), failures);

    h.settle().await;
    let outbound = h.bridge.breaker(Direction::LocalToExternal);
    check("pending release cancelled", outbound.is_settled(), failures);
    check("observer disposed", h.store.observer_count() == 0, failures);
}
