//! Mock adapters for integration tests.
//!
//! Every radio mock records the calls it receives so tests can assert on
//! the full history without touching real peripherals.  `MockNvs` shares
//! its backing map, so a test keeps a handle after the service takes
//! ownership of the storage.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use fieldnode::app::events::AppEvent;
use fieldnode::app::ports::{
    AttributeSeed, BrokerMessage, BrokerPort, EventSink, NetworkPort, ProvisioningPort,
    StorageError, StoragePort, TimePort,
};
use fieldnode::app::service::{AppService, Links, TickOutcome};
use fieldnode::config::SystemConfig;
use fieldnode::error::CommsError;
use fieldnode::provisioning::{CredentialField, FieldWrite};
use fieldnode::store::record::ConfigRecord;
use fieldnode::store::{RECORD_KEY, RECORD_NAMESPACE};

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct NvsState {
    pub blobs: HashMap<String, Vec<u8>>,
    pub writes: u32,
    pub fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct MockNvs {
    pub state: Rc<RefCell<NvsState>>,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Raw credential record blob, if present.
    pub fn record_blob(&self) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .blobs
            .get(&Self::key(RECORD_NAMESPACE, RECORD_KEY))
            .cloned()
    }

    pub fn put_record_blob(&self, raw: &[u8]) {
        self.state
            .borrow_mut()
            .blobs
            .insert(Self::key(RECORD_NAMESPACE, RECORD_KEY), raw.to_vec());
    }

    /// Decoded persisted record; panics if absent or invalid.
    pub fn persisted(&self) -> ConfigRecord {
        let raw = self.record_blob().expect("record persisted");
        ConfigRecord::decode(&raw).expect("persisted record valid")
    }

    pub fn writes(&self) -> u32 {
        self.state.borrow().writes
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.state.borrow().blobs.get(&Self::key(namespace, key)) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(StorageError::IoError);
        }
        state.writes += 1;
        state.blobs.insert(Self::key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.state
            .borrow_mut()
            .blobs
            .remove(&Self::key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.state
            .borrow()
            .blobs
            .contains_key(&Self::key(namespace, key))
    }
}

// ── MockNetwork ───────────────────────────────────────────────

pub struct MockNetwork {
    /// Join completes as soon as `begin` is called.
    pub auto_connect: bool,
    pub connected: bool,
    pub begins: Vec<(String, String)>,
    pub disconnects: u32,
}

#[allow(dead_code)]
impl MockNetwork {
    pub fn new() -> Self {
        Self {
            auto_connect: true,
            connected: false,
            begins: Vec::new(),
            disconnects: 0,
        }
    }

    pub fn last_join(&self) -> Option<(&str, &str)> {
        self.begins.last().map(|(n, s)| (n.as_str(), s.as_str()))
    }
}

impl NetworkPort for MockNetwork {
    fn set_station_mode(&mut self) -> Result<(), CommsError> {
        Ok(())
    }

    fn begin(&mut self, name: &str, secret: &str) -> Result<(), CommsError> {
        self.begins.push((name.to_string(), secret.to_string()));
        self.connected = self.auto_connect;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.disconnects += 1;
    }
}

// ── MockBroker ────────────────────────────────────────────────

pub struct MockBroker {
    pub reachable: bool,
    /// Accept connects but never deliver the CONNACK.
    pub stalled: bool,
    pub connected: bool,
    pub endpoint: Option<(String, u16)>,
    pub connects: u32,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String)>,
    pub inbox: VecDeque<BrokerMessage>,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new() -> Self {
        Self {
            reachable: true,
            stalled: false,
            connected: false,
            endpoint: None,
            connects: 0,
            subscriptions: Vec::new(),
            published: Vec::new(),
            inbox: VecDeque::new(),
        }
    }

    pub fn push(&mut self, topic: &str, payload: &[u8]) {
        self.inbox.push_back(BrokerMessage::new(topic, payload));
    }

    pub fn published_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}

impl BrokerPort for MockBroker {
    fn configure(&mut self, host: &str, port: u16) {
        self.endpoint = Some((host.to_string(), port));
    }

    fn connect(&mut self, _client_id: &str, _user: &str, _password: &str) -> Result<(), CommsError> {
        self.connects += 1;
        if !self.reachable {
            return Err(CommsError::MqttConnectFailed);
        }
        self.connected = !self.stalled;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::MqttPublishFailed);
        }
        self.published
            .push((topic.to_string(), String::from_utf8_lossy(payload).into_owned()));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn take_message(&mut self) -> Option<BrokerMessage> {
        self.inbox.pop_front()
    }
}

// ── MockProvisioning ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedCopy {
    pub device_name: String,
    pub network_name: String,
    pub network_secret: String,
    pub broker_host: String,
}

pub struct MockProvisioning {
    pub active: bool,
    pub fail_start: bool,
    pub seeds: Vec<SeedCopy>,
    pub stops: u32,
    pub queue: VecDeque<FieldWrite>,
}

#[allow(dead_code)]
impl MockProvisioning {
    pub fn new() -> Self {
        Self {
            active: false,
            fail_start: false,
            seeds: Vec::new(),
            stops: 0,
            queue: VecDeque::new(),
        }
    }

    /// A peer writes `value` to the attribute for `field`.
    pub fn write(&mut self, field: CredentialField, value: &[u8]) {
        self.queue.push_back(FieldWrite::new(field, value));
    }
}

impl ProvisioningPort for MockProvisioning {
    fn start(&mut self, seed: &AttributeSeed<'_>) -> Result<(), CommsError> {
        if self.fail_start {
            return Err(CommsError::BleInitFailed);
        }
        self.active = true;
        self.seeds.push(SeedCopy {
            device_name: seed.device_name.to_string(),
            network_name: seed.network_name.to_string(),
            network_secret: seed.network_secret.to_string(),
            broker_host: seed.broker_host.to_string(),
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
        self.stops += 1;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn take_write(&mut self) -> Option<FieldWrite> {
        self.queue.pop_front()
    }
}

// ── FakeClock ─────────────────────────────────────────────────

/// Time only moves when something delays or the test advances it.
#[derive(Default)]
pub struct FakeClock {
    pub now: u64,
    pub delays: Vec<u32>,
}

#[allow(dead_code)]
impl FakeClock {
    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }
}

impl TimePort for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
        self.now += u64::from(ms);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn count(&self, event: &AppEvent) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestLinks = Links<MockNetwork, MockBroker, MockProvisioning, FakeClock>;

/// Service plus every mock it talks to.
pub struct Rig {
    pub app: AppService<MockNvs>,
    pub links: TestLinks,
    pub sink: RecordingSink,
    pub nvs: MockNvs,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with(SystemConfig::default(), MockNvs::new())
    }

    pub fn with(config: SystemConfig, nvs: MockNvs) -> Self {
        Self {
            app: AppService::new(config, nvs.clone()),
            links: Links {
                network: MockNetwork::new(),
                broker: MockBroker::new(),
                provisioning: MockProvisioning::new(),
                clock: FakeClock::default(),
            },
            sink: RecordingSink::default(),
            nvs,
        }
    }

    /// Default rig, booted.
    pub fn started() -> Self {
        let mut rig = Self::new();
        rig.start();
        rig
    }

    /// Booted and one idle tick run, so the broker session is up.
    pub fn online() -> Self {
        let mut rig = Self::started();
        rig.idle();
        rig
    }

    pub fn start(&mut self) {
        self.app.start(&mut self.links, &mut self.sink);
    }

    pub fn tick(&mut self, button: bool) -> TickOutcome {
        self.app.tick(button, &mut self.links, &mut self.sink)
    }

    pub fn press(&mut self) -> TickOutcome {
        self.tick(true)
    }

    pub fn idle(&mut self) -> TickOutcome {
        self.tick(false)
    }

    /// Queue all three credential writes.
    pub fn provision(&mut self, name: &str, secret: &str, host: &str) {
        let p = &mut self.links.provisioning;
        p.write(CredentialField::NetworkName, name.as_bytes());
        p.write(CredentialField::NetworkSecret, secret.as_bytes());
        p.write(CredentialField::BrokerAddress, host.as_bytes());
    }
}
