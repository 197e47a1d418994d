//! Mode transitions and the transport actions tied to them.
//!
//! Walks the Operational → Provisioning → Suspended → Operational cycle
//! and checks that the network and BLE radios are never up together.

use fieldnode::app::events::AppEvent;
use fieldnode::app::service::TickOutcome;
use fieldnode::fsm::StateId;
use fieldnode::supervisor::LinkState;
use fieldnode::text::bounded;

use crate::mock_hw::Rig;

#[test]
fn boot_joins_then_first_tick_announces_online() {
    let mut rig = Rig::started();
    assert_eq!(rig.app.state(), StateId::Operational);
    assert!(rig.sink.contains(&AppEvent::Started(StateId::Operational)));
    assert!(rig.sink.contains(&AppEvent::NetworkJoined));
    assert_eq!(rig.links.network.last_join(), Some(("ABC", "12345678")));

    assert_eq!(rig.idle(), TickOutcome::Continue);

    let broker = &rig.links.broker;
    assert_eq!(broker.endpoint, Some(("192.168.1.100".to_string(), 1883)));
    assert_eq!(broker.subscriptions, vec!["ESP32/cmd", "ESP32/reset"]);
    assert_eq!(broker.published_on("ESP32/status"), vec!["online"]);
    assert_eq!(rig.app.broker_state(), LinkState::Established);
    assert!(rig.sink.contains(&AppEvent::BrokerConnected));
}

#[test]
fn announcement_is_sent_once_per_session() {
    let mut rig = Rig::online();
    for _ in 0..5 {
        rig.idle();
    }
    assert_eq!(rig.links.broker.published_on("ESP32/status"), vec!["online"]);
    assert_eq!(rig.links.broker.connects, 1);
}

#[test]
fn button_enters_provisioning_and_tears_down_network() {
    let mut rig = Rig::online();
    rig.links.clock.delays.clear();

    rig.press();

    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert!(rig.sink.contains(&AppEvent::StateChanged {
        from: StateId::Operational,
        to: StateId::Provisioning,
    }));

    // Broker stopped first, with a best-effort offline notice.
    assert_eq!(
        rig.links.broker.published_on("ESP32/status"),
        vec!["online", "offline"]
    );
    assert!(!rig.links.broker.connected);
    assert!(!rig.links.network.connected);
    assert_eq!(rig.links.network.disconnects, 1);
    assert_eq!(rig.app.network_state(), LinkState::Idle);
    assert_eq!(rig.app.broker_state(), LinkState::Idle);
    assert_eq!(rig.links.clock.delays, vec![1000]);

    let seed = rig.links.provisioning.seeds.last().unwrap();
    assert!(rig.links.provisioning.active);
    assert_eq!(seed.device_name, "ESP32");
    assert_eq!(seed.network_name, "ABC");
    assert_eq!(seed.network_secret, "12345678");
    assert_eq!(seed.broker_host, "192.168.1.100");
}

#[test]
fn provisioning_has_no_network_activity() {
    let mut rig = Rig::online();
    rig.press();
    let joins = rig.links.network.begins.len();
    let connects = rig.links.broker.connects;

    for _ in 0..10 {
        rig.idle();
    }

    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert_eq!(rig.links.network.begins.len(), joins);
    assert_eq!(rig.links.broker.connects, connects);
}

#[test]
fn button_in_provisioning_suspends_with_stored_credentials() {
    let mut rig = Rig::online();
    rig.press();
    rig.links.clock.delays.clear();
    rig.sink.clear();

    rig.press();

    assert_eq!(rig.app.state(), StateId::Suspended);
    assert!(!rig.links.provisioning.active);
    assert_eq!(rig.links.provisioning.stops, 1);
    assert_eq!(rig.links.clock.delays, vec![1000]);
    assert_eq!(rig.links.network.last_join(), Some(("ABC", "12345678")));
    assert_eq!(rig.app.network_state(), LinkState::Established);
    assert_eq!(rig.app.broker_state(), LinkState::Established);

    assert_eq!(rig.app.store().record().status(), "offline");
    assert_eq!(rig.nvs.persisted().status(), "offline");
    assert!(rig.sink.contains(&AppEvent::StatusChanged(bounded("offline"))));
}

#[test]
fn suspended_does_not_announce() {
    let mut rig = Rig::online();
    rig.press();
    rig.press();
    for _ in 0..3 {
        rig.idle();
    }
    assert_eq!(rig.app.state(), StateId::Suspended);
    assert_eq!(
        rig.links.broker.published_on("ESP32/status"),
        vec!["online", "offline"]
    );
    assert_eq!(rig.app.store().record().status(), "offline");
}

#[test]
fn full_cycle_returns_online_with_new_credentials() {
    let mut rig = Rig::online();

    rig.press();
    rig.provision("Attic", "s3cret-pass", "10.0.0.7");
    rig.idle();

    // Ready signal advances on the same tick.
    assert_eq!(rig.app.state(), StateId::Suspended);
    assert!(rig.sink.contains(&AppEvent::CredentialsCommitted));
    assert_eq!(rig.links.network.last_join(), Some(("Attic", "s3cret-pass")));
    assert_eq!(
        rig.links.broker.endpoint,
        Some(("10.0.0.7".to_string(), 1883))
    );
    assert_eq!(rig.app.store().record().status(), "offline");

    rig.press();

    assert_eq!(rig.app.state(), StateId::Operational);
    assert!(rig.sink.contains(&AppEvent::StateChanged {
        from: StateId::Suspended,
        to: StateId::Operational,
    }));
    let stored = rig.nvs.persisted();
    assert_eq!(stored.status(), "online");
    assert_eq!(stored.network_name(), "Attic");
    assert_eq!(stored.network_secret(), "s3cret-pass");
    assert_eq!(stored.broker_host(), "10.0.0.7");
    assert_eq!(stored.broker_port(), 1883);
}

#[test]
fn returning_to_operational_keeps_transports() {
    let mut rig = Rig::online();
    rig.press();
    rig.press();
    let joins = rig.links.network.begins.len();
    let disconnects = rig.links.network.disconnects;

    rig.press();

    assert_eq!(rig.app.state(), StateId::Operational);
    assert_eq!(rig.links.network.begins.len(), joins);
    assert_eq!(rig.links.network.disconnects, disconnects);
    assert!(rig.links.broker.connected);
}

#[test]
fn lost_link_is_rejoined_on_next_tick() {
    let mut rig = Rig::online();
    rig.links.network.connected = false;

    rig.idle();
    assert!(rig.sink.contains(&AppEvent::NetworkLost));
    assert_eq!(rig.app.network_state(), LinkState::Idle);

    rig.idle();
    assert_eq!(rig.app.network_state(), LinkState::Established);
    assert_eq!(rig.links.network.begins.len(), 2);
    assert_eq!(rig.sink.count(&AppEvent::NetworkJoined), 2);
}

#[test]
fn lost_broker_session_reconnects_and_reannounces() {
    let mut rig = Rig::online();
    rig.links.broker.connected = false;

    rig.idle();

    assert_eq!(rig.links.broker.connects, 2);
    assert_eq!(rig.app.broker_state(), LinkState::Established);
    assert_eq!(rig.sink.count(&AppEvent::BrokerConnected), 2);
    assert_eq!(
        rig.links.broker.published_on("ESP32/status"),
        vec!["online", "online"]
    );
}

#[test]
fn unreachable_broker_is_retried_every_tick() {
    let mut rig = Rig::started();
    rig.links.broker.reachable = false;

    rig.idle();
    rig.idle();
    rig.idle();

    assert_eq!(rig.links.broker.connects, 3);
    assert_eq!(rig.app.broker_state(), LinkState::Attempting);

    rig.links.broker.reachable = true;
    rig.idle();
    assert_eq!(rig.app.broker_state(), LinkState::Established);
}

#[test]
fn stalled_broker_handshake_does_not_hold_up_the_button() {
    let mut rig = Rig::started();
    rig.links.broker.stalled = true;
    rig.links.clock.delays.clear();

    rig.idle();
    rig.idle();
    assert_eq!(rig.app.broker_state(), LinkState::Attempting);
    assert!(rig.links.clock.delays.is_empty());

    rig.press();
    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert!(rig.links.provisioning.active);
}

#[test]
fn failed_provisioning_link_is_not_stopped_on_exit() {
    let mut rig = Rig::online();
    rig.links.provisioning.fail_start = true;

    rig.press();
    assert_eq!(rig.app.state(), StateId::Provisioning);
    assert!(!rig.links.provisioning.active);

    rig.press();
    assert_eq!(rig.app.state(), StateId::Suspended);
    assert_eq!(rig.links.provisioning.stops, 0);
    assert!(rig.links.network.connected);
}
