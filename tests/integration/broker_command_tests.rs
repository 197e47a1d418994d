//! Inbound broker messages: status updates and factory reset.

use fieldnode::app::events::AppEvent;
use fieldnode::app::service::TickOutcome;
use fieldnode::fsm::StateId;
use fieldnode::text::bounded;

use crate::mock_hw::Rig;

#[test]
fn command_payload_becomes_status() {
    let mut rig = Rig::online();
    rig.links.broker.push("ESP32/cmd", b"maintenance");

    assert_eq!(rig.idle(), TickOutcome::Continue);

    assert_eq!(rig.app.store().record().status(), "maintenance");
    assert_eq!(rig.nvs.persisted().status(), "maintenance");
    assert!(rig.sink.contains(&AppEvent::StatusChanged(bounded("maintenance"))));
}

#[test]
fn long_status_is_truncated() {
    let mut rig = Rig::online();
    rig.links
        .broker
        .push("ESP32/cmd", b"a-very-long-status-string-indeed");
    rig.idle();
    assert_eq!(rig.app.store().record().status(), "a-very-long-status-");
}

#[test]
fn status_with_embedded_nul_matches_persisted_copy() {
    let mut rig = Rig::online();
    rig.links.broker.push("ESP32/cmd", b"ab\0cd");
    rig.idle();

    let persisted = rig.nvs.persisted();
    assert_eq!(rig.app.store().record(), &persisted);
    assert_eq!(persisted.status(), "ab");
    assert!(rig.sink.contains(&AppEvent::StatusChanged(bounded("ab"))));
}

#[test]
fn unchanged_status_is_not_rewritten() {
    let mut rig = Rig::online();
    rig.links.broker.push("ESP32/cmd", b"busy");
    rig.idle();
    let writes = rig.nvs.writes();

    rig.links.broker.push("ESP32/cmd", b"busy");
    rig.idle();

    assert_eq!(rig.nvs.writes(), writes);
    assert_eq!(rig.sink.count(&AppEvent::StatusChanged(bounded("busy"))), 1);
}

#[test]
fn disconnect_erases_store_and_restarts() {
    let mut rig = Rig::online();
    assert!(rig.nvs.record_blob().is_some());
    rig.links.broker.push("ESP32/cmd", b"disconnect");

    assert_eq!(rig.idle(), TickOutcome::Restart);

    assert!(rig.nvs.record_blob().is_none());
    assert!(rig.sink.contains(&AppEvent::FactoryReset));
}

#[test]
fn reset_topic_accepts_reset_alias() {
    let mut rig = Rig::online();
    rig.links.broker.push("ESP32/reset", b"reset");
    assert_eq!(rig.idle(), TickOutcome::Restart);
    assert!(rig.nvs.record_blob().is_none());
}

#[test]
fn reset_topic_never_sets_status() {
    let mut rig = Rig::online();
    rig.links.broker.push("ESP32/reset", b"hello");
    assert_eq!(rig.idle(), TickOutcome::Continue);
    assert_eq!(rig.app.store().record().status(), "online");
    assert!(rig.nvs.record_blob().is_some());
}

#[test]
fn unknown_topic_is_ignored() {
    let mut rig = Rig::online();
    rig.links.broker.push("other/topic", b"disconnect");
    assert_eq!(rig.idle(), TickOutcome::Continue);
    assert_eq!(rig.app.store().record().status(), "online");
}

#[test]
fn messages_after_reset_are_left_queued() {
    let mut rig = Rig::online();
    rig.links.broker.push("ESP32/cmd", b"disconnect");
    rig.links.broker.push("ESP32/cmd", b"late");
    assert_eq!(rig.idle(), TickOutcome::Restart);
    assert_eq!(rig.links.broker.inbox.len(), 1);
}

#[test]
fn commands_are_handled_in_suspended() {
    let mut rig = Rig::online();
    rig.press();
    rig.press();
    assert_eq!(rig.app.state(), StateId::Suspended);

    rig.links.broker.push("ESP32/cmd", b"parked");
    rig.idle();
    assert_eq!(rig.app.store().record().status(), "parked");

    rig.links.broker.push("ESP32/cmd", b"disconnect");
    assert_eq!(rig.idle(), TickOutcome::Restart);
}

#[test]
fn commands_wait_while_provisioning() {
    let mut rig = Rig::online();
    rig.press();
    rig.links.broker.push("ESP32/cmd", b"disconnect");
    assert_eq!(rig.idle(), TickOutcome::Continue);
    assert_eq!(rig.links.broker.inbox.len(), 1);
}
