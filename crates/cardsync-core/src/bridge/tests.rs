use super::*;
use crate::store::MemoryVariableStore;
use cardsync_types::VariableValue;

const SCOPE: &str = "module_a_dynamic_form";
const COOLDOWN_MS: u64 = 20;

fn config(echo_guard: EchoGuard) -> SyncConfig {
    SyncConfig { cooldown_ms: COOLDOWN_MS, echo_guard, ..SyncConfig::default() }
}

fn store() -> Arc<MemoryVariableStore> {
    let store = Arc::new(MemoryVariableStore::new());
    store.declare(SCOPE, "is_liked", VariableValue::Bool(false));
    store.declare(SCOPE, "likes", VariableValue::Integer(0));
    store
}

fn connected(echo_guard: EchoGuard) -> (SyncBridge<bool>, Arc<MemoryVariableStore>) {
    let store = store();
    let bridge = SyncBridge::new(&config(echo_guard), SCOPE, LocalCell::new(false));
    bridge.connect(store.clone());
    let handle = store.observe(bridge.observer_callback());
    // Registration lives as long as the store in these tests.
    std::mem::forget(handle);
    (bridge, store)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(COOLDOWN_MS * 4)).await;
}

#[tokio::test]
async fn test_local_write_reaches_engine_and_echo_is_dropped() {
    let (bridge, store) = connected(EchoGuard::Cooldown);

    bridge.cell().set(true);
    let delta = bridge.cell().take_local_delta();
    assert_eq!(delta, Some(true));
    assert_eq!(bridge.push_local_to_external(true), SyncOutcome::Propagated);

    assert_eq!(store.query(SCOPE, "is_liked"), Some(VariableValue::Bool(true)));
    assert_eq!(store.write_count(SCOPE, "is_liked"), 1);
    assert_eq!(bridge.state(), BridgeState::PropagatingLocalToExternal);

    let stats = bridge.stats();
    assert_eq!(stats.outbound_writes, 1);
    assert_eq!(stats.inbound_applies, 0);
    assert_eq!(stats.suppressed, 1);

    settle().await;
    assert_eq!(bridge.state(), BridgeState::Idle);
    assert!(bridge.cell().get());
    assert_eq!(store.write_count(SCOPE, "is_liked"), 1);
}

#[tokio::test]
async fn test_engine_change_applies_to_cell() {
    let (bridge, store) = connected(EchoGuard::Cooldown);

    store.set_variable(SCOPE, "is_liked", "1");

    assert!(bridge.cell().get());
    assert_eq!(bridge.cell().origin(), crate::local::Origin::External);
    assert_eq!(bridge.cell().take_local_delta(), None);
    assert_eq!(bridge.state(), BridgeState::PropagatingExternalToLocal);
    assert_eq!(bridge.stats().inbound_applies, 1);

    settle().await;
    assert_eq!(bridge.state(), BridgeState::Idle);
    assert_eq!(store.write_count(SCOPE, "is_liked"), 1);
}

#[tokio::test]
async fn test_unrelated_variable_is_filtered() {
    let (bridge, store) = connected(EchoGuard::Cooldown);

    store.set_variable(SCOPE, "likes", "12");
    let outcome = bridge.handle_external_change(&VariableKey::new("baseline", "is_liked"));

    assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::Filtered));
    assert!(!bridge.cell().get());
    assert_eq!(bridge.state(), BridgeState::Idle);
}

#[tokio::test]
async fn test_engine_write_of_current_value_is_unchanged() {
    let (bridge, _store) = connected(EchoGuard::Cooldown);

    assert_eq!(
        bridge.push_external_to_local(false),
        SyncOutcome::Suppressed(SuppressReason::Unchanged)
    );
    assert_eq!(bridge.state(), BridgeState::Idle);
}

#[tokio::test]
async fn test_push_without_store_is_not_ready() {
    let bridge = SyncBridge::new(&config(EchoGuard::Cooldown), SCOPE, LocalCell::new(false));

    assert_eq!(bridge.push_local_to_external(true), SyncOutcome::Skipped(SkipReason::NotReady));
    assert_eq!(bridge.state(), BridgeState::Idle);
    assert_eq!(bridge.stats().skipped, 1);
}

#[tokio::test]
async fn test_second_local_write_while_engaged_is_deferred_then_reissued() {
    let (bridge, store) = connected(EchoGuard::Cooldown);

    bridge.cell().set(true);
    assert_eq!(bridge.push_local_to_external(true), SyncOutcome::Propagated);

    bridge.cell().set(false);
    assert_eq!(
        bridge.push_local_to_external(false),
        SyncOutcome::Suppressed(SuppressReason::AlreadyPropagating)
    );
    assert_eq!(store.query(SCOPE, "is_liked"), Some(VariableValue::Bool(true)));

    settle().await;
    assert_eq!(store.query(SCOPE, "is_liked"), Some(VariableValue::Bool(false)));
    settle().await;
    assert_eq!(bridge.state(), BridgeState::Idle);
}

#[tokio::test]
async fn test_local_write_during_inbound_cooldown_converges() {
    let (bridge, store) = connected(EchoGuard::Cooldown);

    store.set_variable(SCOPE, "is_liked", "1");
    assert!(bridge.cell().get());

    // User flips it back before the inbound breaker clears.
    bridge.cell().set(false);
    let delta = bridge.cell().take_local_delta();
    assert_eq!(delta, Some(false));
    assert_eq!(
        bridge.push_local_to_external(false),
        SyncOutcome::Suppressed(SuppressReason::OppositeDirectionCooling)
    );

    settle().await;
    settle().await;
    assert!(!bridge.cell().get());
    assert_eq!(store.query(SCOPE, "is_liked"), Some(VariableValue::Bool(false)));
    assert_eq!(bridge.state(), BridgeState::Idle);
}

#[tokio::test]
async fn test_engine_change_during_outbound_cooldown_converges() {
    let (bridge, store) = connected(EchoGuard::Cooldown);

    bridge.cell().set(true);
    bridge.push_local_to_external(true);

    // Card button fires while our own write is settling.
    store.set_variable(SCOPE, "is_liked", "0");
    assert!(bridge.cell().get());

    settle().await;
    settle().await;
    assert!(!bridge.cell().get());
    assert_eq!(store.query(SCOPE, "is_liked"), Some(VariableValue::Bool(false)));
    assert_eq!(bridge.state(), BridgeState::Idle);
}

#[tokio::test]
async fn test_shutdown_skips_and_clears() {
    let (bridge, store) = connected(EchoGuard::Cooldown);

    bridge.cell().set(true);
    bridge.push_local_to_external(true);
    assert!(bridge.breaker(Direction::LocalToExternal).engaged);

    assert!(bridge.shutdown());
    assert!(!bridge.shutdown());
    assert!(!bridge.is_live());
    assert_eq!(bridge.state(), BridgeState::Idle);

    assert_eq!(bridge.push_local_to_external(false), SyncOutcome::Skipped(SkipReason::Detached));
    store.set_variable(SCOPE, "is_liked", "0");
    assert!(bridge.cell().get());

    settle().await;
    let outbound = bridge.breaker(Direction::LocalToExternal);
    assert!(!outbound.engaged);
    assert_eq!(outbound.pending_releases, 0);
}

#[tokio::test]
async fn test_origin_tag_consumes_echo_without_breakers() {
    let (bridge, store) = connected(EchoGuard::OriginTag);

    bridge.cell().set(true);
    assert_eq!(bridge.push_local_to_external(true), SyncOutcome::Propagated);

    assert_eq!(bridge.stats().outstanding_echoes, 0);
    assert_eq!(bridge.state(), BridgeState::Idle);
    assert!(!bridge.breaker(Direction::LocalToExternal).engaged);

    // No cooldown to wait out: an engine change applies at once.
    store.set_variable(SCOPE, "is_liked", "0");
    assert!(!bridge.cell().get());
    assert_eq!(bridge.stats().inbound_applies, 1);
}

#[tokio::test]
async fn test_origin_tag_late_echo_is_still_recognized() {
    let store = store();
    let bridge = SyncBridge::new(&config(EchoGuard::OriginTag), SCOPE, LocalCell::new(false));
    bridge.connect(store.clone());

    // Write goes out before the observer is registered: the echo is delivered by hand.
    bridge.cell().set(true);
    bridge.push_local_to_external(true);
    assert_eq!(bridge.state(), BridgeState::PropagatingLocalToExternal);

    let outcome = bridge.handle_external_change(&VariableKey::new(SCOPE, "is_liked"));
    assert_eq!(outcome, SyncOutcome::Suppressed(SuppressReason::EchoOfOwnWrite));
    assert_eq!(bridge.state(), BridgeState::Idle);
}

#[tokio::test]
async fn test_observer_callback_does_not_keep_bridge_alive() {
    let (bridge, store) = connected(EchoGuard::Cooldown);
    let weak = bridge.downgrade();
    drop(bridge);

    assert!(weak.upgrade().is_none());
    store.set_variable(SCOPE, "is_liked", "1");
}

#[tokio::test]
async fn test_engine_value_matching_pending_user_edit_is_absorbed() {
    let (bridge, store) = connected(EchoGuard::Cooldown);

    // User edit the detector has not picked up yet.
    bridge.cell().set(true);
    store.set_variable(SCOPE, "is_liked", "1");

    assert_eq!(bridge.stats().suppressed, 1);
    assert_eq!(bridge.cell().take_local_delta(), None);
    assert_eq!(bridge.cell().origin(), crate::local::Origin::Local);
    assert_eq!(bridge.stats().outbound_writes, 0);
    assert_eq!(store.write_count(SCOPE, "is_liked"), 1);
}

#[tokio::test]
async fn test_origin_tag_engine_change_overtakes_outstanding_write() {
    let store = store();
    let bridge = SyncBridge::new(&config(EchoGuard::OriginTag), SCOPE, LocalCell::new(false));
    bridge.connect(store.clone());
    let key = VariableKey::new(SCOPE, "is_liked");

    bridge.cell().set(true);
    bridge.push_local_to_external(true);
    assert_eq!(bridge.stats().outstanding_echoes, 1);

    // Card action lands before the notification for our write is delivered.
    store.set_variable(SCOPE, "is_liked", "0");
    assert_eq!(bridge.handle_external_change(&key), SyncOutcome::Propagated);
    assert!(!bridge.cell().get());
    assert_eq!(bridge.stats().outstanding_echoes, 0);

    assert_eq!(
        bridge.handle_external_change(&key),
        SyncOutcome::Suppressed(SuppressReason::Unchanged)
    );

    // A later engine change back to the written value is not mistaken for its echo.
    store.set_variable(SCOPE, "is_liked", "1");
    assert_eq!(bridge.handle_external_change(&key), SyncOutcome::Propagated);
    assert!(bridge.cell().get());
    assert_eq!(bridge.state(), BridgeState::Idle);
}
