#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use portly_api::WriteOp;
use portly_api::mock::{MockSwitch, Reply};
use portly_core::{
    AdminState, Coordinator, CoordinatorConfig, CoordinatorEvent, CoreError, Health, PoeDelivery,
    PollOutcome, PortMode, SnapshotOrigin,
};
use pretty_assertions::assert_eq;
use secrecy::SecretString;

// ── Helpers ─────────────────────────────────────────────────────────

const SYSTEM: &str = "
 Status and Counters - General System Information

  System Name        : lab-sw
  Software revision  : YA.16.08.0002        Base MAC Addr      : 001122-334455
  ROM Version        : YA.15.20            Serial Number      : CN12345678
";

const BRIEF: &str = "
  Port  Type      | Alert     Enabled Status Mode       Mode Ctrl  Limit
  ----- --------- + --------- ------- ------ ---------- ---- ----- ------
  1     100/1000T | No        Yes     Up     1000FDx    MDIX off   0
  2     100/1000T | No        Yes     Down   1000FDx    Auto off   0
  3     100/1000T | No        Yes     Up     1000FDx    MDI  off   0
  4     100/1000T | No        No      Down   100HDx     Auto off   0
";

fn section(port: u16, enabled: bool, bytes: u64) -> String {
    let flag = if enabled { "Yes" } else { "No" };
    format!(
        " Status and Counters - Port Counters for port {port}\n\n  Link Status      : Up\n  Port Enabled     : {flag}\n   Bytes Rx        : {bytes}          Bytes Tx        : {bytes}\n"
    )
}

fn detail_all() -> String {
    (1..=4).map(|p| section(p, p != 4, 1_000)).collect()
}

fn poe_block(port: u16, enabled: bool, draw: &str) -> String {
    let flag = if enabled { "Yes" } else { "No" };
    format!(
        " Status and Configuration Information for port {port}\n\n  Power Enable      : {flag}                   PoE Port Status   : Delivering\n  Power Draw        : {draw}\n"
    )
}

const WRITE_LINES: [&str; 9] = [
    "configure",
    "interface 1",
    "interface 2",
    "enable",
    "disable",
    "power-over-ethernet",
    "no power-over-ethernet",
    "exit",
    "write memory",
];

/// A four-port switch with PoE on ports 1 and 2.
fn switch() -> MockSwitch {
    let switch = MockSwitch::new();
    switch.reply_text("show system", SYSTEM);
    switch.reply_text("show interfaces brief", BRIEF);
    switch.reply_text("show interfaces all", &detail_all());
    switch.reply_text(
        "show power-over-ethernet all",
        &format!("{}{}", poe_block(1, true, "4.8 W"), poe_block(2, true, "0.0 W")),
    );
    for line in WRITE_LINES {
        switch.reply_text(line, "");
    }
    switch
}

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        port_count: 4,
        poll_interval: Duration::from_secs(3600),
        ..CoordinatorConfig::new("mock", "manager", SecretString::from("secret".to_owned()))
    }
}

fn coordinator(switch: &MockSwitch, config: CoordinatorConfig) -> Coordinator {
    Coordinator::with_connector(config, Arc::new(switch.clone())).unwrap()
}

fn position(sent: &[String], line: &str) -> usize {
    sent.iter().position(|s| s == line).unwrap()
}

fn count(sent: &[String], line: &str) -> usize {
    sent.iter().filter(|s| *s == line).count()
}

fn health_changes(events: &mut tokio::sync::broadcast::Receiver<Arc<CoordinatorEvent>>) -> Vec<(Health, Health)> {
    std::iter::from_fn(|| events.try_recv().ok())
        .filter_map(|event| match event.as_ref() {
            CoordinatorEvent::HealthChanged { transition, .. } => Some((transition.from, transition.to)),
            _ => None,
        })
        .collect()
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn full_poll_builds_consistent_snapshot() {
    let switch = switch();
    let coordinator = coordinator(&switch, config());

    let snapshot = coordinator.poll_once().await.unwrap();

    assert_eq!(snapshot.sequence, 1);
    assert_eq!(snapshot.outcome, PollOutcome::Complete);
    assert_eq!(snapshot.origin, SnapshotOrigin::FullPoll);
    assert_eq!(snapshot.ports.len(), 4);
    assert_eq!(snapshot.poe.len(), 4);

    assert_eq!(snapshot.identity.hostname.as_deref(), Some("lab-sw"));
    assert_eq!(snapshot.identity.firmware.as_deref(), Some("YA.16.08.0002"));
    assert_eq!(snapshot.identity.model.as_deref(), Some("HP-2530-24G-PoEP"));

    assert_eq!(snapshot.ports[&3].speed_mbps, Some(1000));
    assert_eq!(snapshot.ports[&4].admin, AdminState::Disabled);
    assert_eq!(snapshot.ports[&1].counters.bytes_in, Some(1_000));

    assert!(snapshot.poe[&1].delivering());
    assert_eq!(snapshot.poe[&1].delivery, PoeDelivery::Delivering);
    // Status word says delivering, but nothing is drawn.
    assert!(!snapshot.poe[&2].delivering());
    assert_eq!(snapshot.poe[&2].delivery, PoeDelivery::Searching);
    assert_eq!(snapshot.poe[&3].delivery, PoeDelivery::NotApplicable);

    assert_eq!(snapshot.port_mode(1), Some(PortMode::EnabledPoeOn));
    assert_eq!(snapshot.port_mode(3), Some(PortMode::Enabled));
    assert_eq!(snapshot.port_mode(4), Some(PortMode::Disabled));
}

#[tokio::test(start_paused = true)]
async fn flapping_switch_goes_offline_and_recovers() {
    let switch = switch().fail_connects(3);
    let coordinator = coordinator(&switch, config());
    let mut events = coordinator.events();

    for _ in 0..2 {
        let err = coordinator.poll_once().await.unwrap_err();
        assert!(matches!(err, CoreError::ConnectFailed { .. }));
    }
    let state = coordinator.get_connectivity();
    assert_eq!(state.health, Health::Degraded);
    assert!(state.is_online());

    coordinator.poll_once().await.unwrap_err();
    let state = coordinator.get_connectivity();
    assert_eq!(state.health, Health::Offline);
    assert_eq!(state.consecutive_failures, 3);
    assert!(matches!(
        coordinator.get_snapshot(),
        Err(CoreError::DeviceOffline {
            consecutive_failures: 3
        })
    ));

    coordinator.poll_once().await.unwrap();
    let state = coordinator.get_connectivity();
    assert_eq!(state.health, Health::Online);
    assert_eq!(state.consecutive_failures, 0);
    assert!(coordinator.get_snapshot().is_ok());

    assert_eq!(
        health_changes(&mut events),
        vec![
            (Health::Online, Health::Degraded),
            (Health::Degraded, Health::Offline),
            (Health::Offline, Health::Online),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn silent_switch_goes_offline_and_recovers() {
    let switch = switch();
    for command in ["show interfaces brief", "show interfaces all"] {
        switch.reply(command, Reply::Delayed(Duration::from_secs(20), String::new()));
    }
    let coordinator = coordinator(&switch, config());
    let mut events = coordinator.events();

    for expected in [Health::Degraded, Health::Degraded, Health::Offline] {
        let err = coordinator.poll_once().await.unwrap_err();
        assert!(matches!(err, CoreError::ReadTimeout { .. }), "{err:?}");
        assert_eq!(coordinator.get_connectivity().health, expected);
    }
    let state = coordinator.get_connectivity();
    assert!(!state.is_online());
    assert_eq!(state.consecutive_failures, 3);

    switch.reply_text("show interfaces brief", BRIEF);
    switch.reply_text("show interfaces all", &detail_all());
    coordinator.poll_once().await.unwrap();

    let state = coordinator.get_connectivity();
    assert_eq!(state.health, Health::Online);
    assert_eq!(state.consecutive_failures, 0);
    assert_eq!(
        health_changes(&mut events),
        vec![
            (Health::Online, Health::Degraded),
            (Health::Degraded, Health::Offline),
            (Health::Offline, Health::Online),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unparseable_poll_keeps_previous_snapshot() {
    let switch = switch();
    let coordinator = coordinator(&switch, config());
    coordinator.poll_once().await.unwrap();

    let mut events = coordinator.events();
    switch.reply_text("show interfaces brief", "Invalid input: brief");
    switch.reply_text("show interfaces all", "Invalid input: all");

    let err = coordinator.poll_once().await.unwrap_err();
    assert!(matches!(err, CoreError::ParseFailed { .. }));
    assert_eq!(coordinator.last_snapshot().unwrap().sequence, 1);
    assert_eq!(coordinator.get_connectivity().health, Health::Degraded);

    let event = events.try_recv().unwrap();
    assert!(matches!(
        event.as_ref(),
        CoordinatorEvent::ParseFailed { command, .. } if command == "show interfaces brief"
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_poe_command_gives_partial_snapshot() {
    let switch = switch();
    switch.reply(
        "show power-over-ethernet all",
        Reply::Delayed(Duration::from_secs(20), poe_block(1, true, "4.8 W")),
    );
    let coordinator = coordinator(&switch, config());

    let snapshot = coordinator.poll_once().await.unwrap();
    assert!(snapshot.is_partial());
    assert_eq!(snapshot.poe[&1].delivery, PoeDelivery::Unknown);
    assert_eq!(snapshot.ports[&1].admin, AdminState::Enabled);
    assert_eq!(coordinator.get_connectivity().health, Health::Online);
}

#[tokio::test(start_paused = true)]
async fn subscribers_receive_snapshots() {
    let switch = switch();
    let coordinator = coordinator(&switch, config());
    let mut changes = coordinator.subscribe();

    coordinator.poll_once().await.unwrap();
    assert_eq!(changes.changed().await.unwrap().sequence, 1);

    let mut stream = coordinator.subscribe().into_stream();
    coordinator.poll_once().await.unwrap();
    assert_eq!(stream.next().await.unwrap().sequence, 2);
}

// ── Exclusions ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn excluded_ports_are_hidden_and_read_only() {
    let switch = switch();
    let coordinator = coordinator(
        &switch,
        CoordinatorConfig {
            excluded_ports: BTreeSet::from([2]),
            excluded_poe: BTreeSet::from([1]),
            ..config()
        },
    );
    let snapshot = coordinator.poll_once().await.unwrap();
    assert!(snapshot.ports[&2].excluded);

    assert!(matches!(
        coordinator.get_port(2),
        Err(CoreError::PortExcluded { index: 2 })
    ));
    assert!(matches!(
        coordinator.get_port(9),
        Err(CoreError::PortNotFound { index: 9, port_count: 4 })
    ));
    let visible: Vec<u16> = coordinator
        .list_ports()
        .unwrap()
        .iter()
        .map(|v| v.port.index)
        .collect();
    assert_eq!(visible, vec![1, 3, 4]);

    assert!(matches!(
        coordinator.set_port_enabled(2, false).await,
        Err(CoreError::PortExcluded { index: 2 })
    ));
    assert!(matches!(
        coordinator.set_poe_enabled(1, false).await,
        Err(CoreError::PoeExcluded { index: 1 })
    ));
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn write_before_start_is_refused() {
    let switch = switch();
    let coordinator = coordinator(&switch, config());
    assert!(matches!(
        coordinator.set_port_enabled(1, false).await,
        Err(CoreError::CoordinatorStopped)
    ));
}

#[tokio::test(start_paused = true)]
async fn write_waits_for_running_poll_then_refreshes_port() {
    let switch = switch();
    switch.reply(
        "show interfaces all",
        Reply::Delayed(Duration::from_secs(2), detail_all()),
    );
    switch.reply_text("show interfaces 1", &section(1, false, 2_000));
    switch.reply_text("show power-over-ethernet 1", &poe_block(1, true, "4.8 W"));

    let coordinator = coordinator(&switch, config());
    coordinator.start().await.unwrap();
    // Let the first scheduled poll take the session.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let outcome = coordinator.set_port_enabled(1, false).await.unwrap();
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.refreshed);

    let sent = switch.sent_commands();
    assert!(position(&sent, "show power-over-ethernet all") < position(&sent, "configure"));
    assert!(position(&sent, "write memory") < position(&sent, "show interfaces 1"));

    let snapshot = coordinator.get_snapshot().unwrap();
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(snapshot.origin, SnapshotOrigin::PortRefresh { port: 1 });
    assert_eq!(snapshot.ports[&1].admin, AdminState::Disabled);
    assert_eq!(snapshot.ports[&1].counters.bytes_in, Some(2_000));
    // Other ports are untouched by the single-port refresh.
    assert_eq!(snapshot.ports[&3].port_type.as_deref(), Some("100/1000T"));

    coordinator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_write_is_not_retried() {
    let switch = switch();
    switch.reply_text("interface 1", "Invalid input: interface 1");
    let coordinator = coordinator(&switch, config());
    coordinator.start().await.unwrap();

    let err = coordinator.set_port_enabled(1, true).await.unwrap_err();
    assert!(matches!(err, CoreError::CommandRejected { .. }));

    let configures = switch
        .sent_commands()
        .iter()
        .filter(|s| *s == "configure")
        .count();
    assert_eq!(configures, 1);
    coordinator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn lost_session_is_retried_until_exhausted() {
    let switch = switch();
    switch.reply("no power-over-ethernet", Reply::Disconnect);
    let coordinator = coordinator(
        &switch,
        CoordinatorConfig {
            write_retries: 2,
            ..config()
        },
    );
    coordinator.start().await.unwrap();
    let mut events = coordinator.events();

    let err = coordinator.set_poe_enabled(2, false).await.unwrap_err();
    assert!(matches!(err, CoreError::RetriesExhausted { attempts: 3, .. }));

    let attempts = switch
        .sent_commands()
        .iter()
        .filter(|s| *s == "no power-over-ethernet")
        .count();
    assert_eq!(attempts, 3);

    let failed = std::iter::from_fn(|| events.try_recv().ok())
        .any(|e| matches!(e.as_ref(), CoordinatorEvent::WriteFailed { port: 2, .. }));
    assert!(failed);
    coordinator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn writes_fail_fast_while_offline() {
    let switch = switch().fail_connects(1);
    let coordinator = coordinator(
        &switch,
        CoordinatorConfig {
            offline_threshold: 1,
            ..config()
        },
    );
    coordinator.poll_once().await.unwrap_err();
    assert_eq!(coordinator.get_connectivity().health, Health::Offline);

    assert!(matches!(
        coordinator.set_port_enabled(1, false).await,
        Err(CoreError::DeviceOffline {
            consecutive_failures: 1
        })
    ));
    assert!(!switch.sent_commands().iter().any(|s| s == "configure"));
}

#[tokio::test(start_paused = true)]
async fn write_timed_out_in_queue_never_reaches_switch() {
    let switch = switch();
    switch.reply(
        "show interfaces all",
        Reply::Delayed(Duration::from_secs(4), detail_all()),
    );
    let coordinator = coordinator(
        &switch,
        CoordinatorConfig {
            write_timeout: Duration::from_secs(3),
            acquire_timeout: Duration::from_secs(10),
            ..config()
        },
    );
    coordinator.start().await.unwrap();
    let mut events = coordinator.events();
    // Let the first scheduled poll take the session.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let err = coordinator.set_port_enabled(1, false).await.unwrap_err();
    assert!(matches!(err, CoreError::RetriesExhausted { .. }), "{err:?}");

    // Long after the poll released the session.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let sent = switch.sent_commands();
    assert_eq!(count(&sent, "configure"), 0);
    assert_eq!(count(&sent, "show interfaces 1"), 0);

    let failed = std::iter::from_fn(|| events.try_recv().ok())
        .any(|e| matches!(e.as_ref(), CoordinatorEvent::WriteFailed { port: 1, .. }));
    assert!(failed);
    coordinator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn switch_going_offline_mid_retry_reports_write_failed() {
    let switch = switch();
    switch.reply("disable", Reply::Disconnect);
    let coordinator = coordinator(
        &switch,
        CoordinatorConfig {
            offline_threshold: 1,
            write_retries: 2,
            retry_backoff: Duration::from_secs(5),
            ..config()
        },
    );
    coordinator.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let mut events = coordinator.events();

    let writer = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.set_port_enabled(1, false).await })
    };
    // First attempt fails; the switch drops off before the retry.
    tokio::time::sleep(Duration::from_secs(1)).await;
    switch.reply_text("show interfaces brief", "Invalid input: brief");
    switch.reply_text("show interfaces all", "Invalid input: all");
    coordinator.poll_once().await.unwrap_err();
    assert_eq!(coordinator.get_connectivity().health, Health::Offline);

    let err = writer.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::DeviceOffline { .. }), "{err:?}");
    assert_eq!(count(&switch.sent_commands(), "disable"), 1);

    let failed = std::iter::from_fn(|| events.try_recv().ok()).any(|e| {
        matches!(e.as_ref(), CoordinatorEvent::WriteFailed { port: 1, error, .. } if error.contains("offline"))
    });
    assert!(failed);
    coordinator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn poll_blocked_by_write_does_not_count_against_health() {
    let switch = switch();
    switch.reply(
        "write memory",
        Reply::Delayed(Duration::from_secs(3), String::new()),
    );
    let coordinator = coordinator(
        &switch,
        CoordinatorConfig {
            acquire_timeout: Duration::from_secs(1),
            ..config()
        },
    );
    coordinator.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let writer = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.set_port_enabled(1, true).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = coordinator.poll_once().await.unwrap_err();
    assert!(matches!(err, CoreError::SessionBusy { .. }), "{err:?}");
    let state = coordinator.get_connectivity();
    assert_eq!(state.health, Health::Online);
    assert_eq!(state.consecutive_failures, 0);

    writer.await.unwrap().unwrap();
    coordinator.shutdown().await;
}

// ── Port mode ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn port_mode_chains_port_and_poe_writes() {
    let switch = switch();
    let coordinator = coordinator(&switch, config());
    coordinator.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let outcomes = coordinator
        .set_port_mode(2, PortMode::EnabledPoeOff)
        .await
        .unwrap();
    let ops: Vec<WriteOp> = outcomes.iter().map(|o| o.op).collect();
    assert_eq!(ops, vec![WriteOp::EnablePort, WriteOp::DisablePoe]);

    let sent = switch.sent_commands();
    assert!(position(&sent, "enable") < position(&sent, "no power-over-ethernet"));
    assert_eq!(count(&sent, "configure"), 2);
    coordinator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn disabled_mode_leaves_poe_alone() {
    let switch = switch();
    let coordinator = coordinator(&switch, config());
    coordinator.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let outcomes = coordinator.set_port_mode(1, PortMode::Disabled).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].op, WriteOp::DisablePort);
    assert_eq!(count(&switch.sent_commands(), "no power-over-ethernet"), 0);
    coordinator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn poe_mode_on_port_without_poe_is_refused_up_front() {
    let switch = switch();
    let coordinator = coordinator(&switch, config());
    coordinator.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(matches!(
        coordinator.set_port_mode(3, PortMode::EnabledPoeOn).await,
        Err(CoreError::PoeNotSupported { index: 3 })
    ));
    assert_eq!(count(&switch.sent_commands(), "configure"), 0);
    coordinator.shutdown().await;
}
