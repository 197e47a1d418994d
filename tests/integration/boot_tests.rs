//! Boot: record load, fallback to defaults and the initial join.

use fieldnode::app::events::AppEvent;
use fieldnode::config::SystemConfig;
use fieldnode::fsm::StateId;
use fieldnode::store::record::{ConfigRecord, RECORD_LEN};
use fieldnode::supervisor::LinkState;

use crate::mock_hw::{MockNvs, Rig};

fn stored_record(name: &str, secret: &str, host: &str, port: u16, status: &str) -> MockNvs {
    let mut record = ConfigRecord::default();
    record.set_network_name(name);
    record.set_network_secret(secret);
    record.set_broker_host(host);
    record.set_broker_port(port);
    record.set_status(status);
    record.seal();
    let nvs = MockNvs::new();
    nvs.put_record_blob(&record.encode());
    nvs
}

#[test]
fn empty_storage_falls_back_and_persists_defaults() {
    let rig = Rig::started();
    assert!(rig.sink.contains(&AppEvent::ConfigFallback));
    assert_eq!(rig.nvs.persisted(), ConfigRecord::default());
    assert!(rig.app.store().is_valid());
}

#[test]
fn valid_record_is_used_for_join_and_broker() {
    let nvs = stored_record("Barn", "barn-pass", "10.2.0.1", 8883, "parked");
    let mut rig = Rig::with(SystemConfig::default(), nvs);
    rig.start();

    assert!(!rig.sink.contains(&AppEvent::ConfigFallback));
    assert_eq!(rig.links.network.last_join(), Some(("Barn", "barn-pass")));

    rig.idle();
    assert_eq!(
        rig.links.broker.endpoint,
        Some(("10.2.0.1".to_string(), 8883))
    );
    // First broker session in Operational marks the node online.
    assert_eq!(rig.nvs.persisted().status(), "online");
}

#[test]
fn corrupted_record_is_replaced_with_defaults() {
    let nvs = stored_record("Barn", "barn-pass", "10.2.0.1", 8883, "parked");
    let mut raw = nvs.record_blob().unwrap();
    raw[5] ^= 0x40;
    nvs.put_record_blob(&raw);

    let mut rig = Rig::with(SystemConfig::default(), nvs);
    rig.start();

    assert!(rig.sink.contains(&AppEvent::ConfigFallback));
    assert_eq!(rig.links.network.last_join(), Some(("ABC", "12345678")));
    assert_eq!(rig.nvs.persisted(), ConfigRecord::default());
}

#[test]
fn short_blob_is_rejected() {
    let nvs = MockNvs::new();
    nvs.put_record_blob(&[0u8; RECORD_LEN - 4]);
    let mut rig = Rig::with(SystemConfig::default(), nvs);
    rig.start();
    assert!(rig.sink.contains(&AppEvent::ConfigFallback));
    assert_eq!(rig.nvs.record_blob().unwrap().len(), RECORD_LEN);
}

#[test]
fn boot_join_times_out_after_window() {
    let mut rig = Rig::new();
    rig.links.network.auto_connect = false;
    rig.start();

    assert!(rig.sink.contains(&AppEvent::NetworkJoinTimedOut));
    assert_eq!(rig.app.network_state(), LinkState::Idle);
    // 15 s window polled every second; gives up on the first poll past it.
    assert_eq!(rig.links.clock.delays.len(), 16);
    assert!(rig.links.clock.delays.iter().all(|&d| d == 1000));
    assert_eq!(rig.app.state(), StateId::Operational);
}

#[test]
fn loop_retries_join_after_boot_timeout() {
    let mut rig = Rig::new();
    rig.links.network.auto_connect = false;
    rig.start();

    rig.links.network.auto_connect = true;
    rig.idle();

    assert_eq!(rig.links.network.begins.len(), 2);
    assert_eq!(rig.app.network_state(), LinkState::Established);
}

#[test]
fn join_timeout_in_loop_restarts_attempt() {
    let mut config = SystemConfig::default();
    config.boot_join = false;
    let mut rig = Rig::with(config, MockNvs::new());
    rig.links.network.auto_connect = false;
    rig.start();
    assert!(rig.links.network.begins.is_empty());

    rig.idle();
    assert_eq!(rig.app.network_state(), LinkState::Attempting);

    rig.links.clock.advance(15_001);
    rig.idle();
    assert!(rig.sink.contains(&AppEvent::NetworkJoinTimedOut));
    assert_eq!(rig.app.network_state(), LinkState::Idle);

    rig.idle();
    assert_eq!(rig.links.network.begins.len(), 2);
    assert_eq!(rig.app.network_state(), LinkState::Attempting);
}

#[test]
fn boot_without_join_connects_on_first_tick() {
    let mut config = SystemConfig::default();
    config.boot_join = false;
    let mut rig = Rig::with(config, MockNvs::new());
    rig.start();
    assert!(rig.links.network.begins.is_empty());
    assert!(rig.links.clock.delays.is_empty());

    rig.idle();
    assert_eq!(rig.app.network_state(), LinkState::Established);
    assert_eq!(rig.app.broker_state(), LinkState::Established);
}
