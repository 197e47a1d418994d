//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the configuration store, the provisioning
//! aggregator, both connection supervisors and the mode FSM.  Radios and
//! the clock are injected per call through [`Links`], so the whole service
//! runs against mock adapters on the host.
//!
//! ```text
//!  ProvisioningPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  NetworkPort     ◀──▶ │          AppService          │
//!  BrokerPort      ◀──▶ │ FSM · Store · Aggregator     │
//!  TimePort        ◀──  │ NetworkSup · BrokerSup       │ ◀──▶ StoragePort
//!                       └──────────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::fsm::context::{FsmContext, ModeAction};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::provisioning::ProvisioningAggregator;
use crate::store::ConfigStore;
use crate::store::record::STATUS_ONLINE;
use crate::supervisor::{BrokerSupervisor, LinkState, NetworkSupervisor, join_blocking};
use crate::text::bounded;

use super::commands::BrokerCommand;
use super::events::AppEvent;
use super::ports::{
    AttributeSeed, BrokerPort, EventSink, NetworkPort, ProvisioningPort, StoragePort, TimePort,
};

// ───────────────────────────────────────────────────────────────
// Injected adapters
// ───────────────────────────────────────────────────────────────

/// The outward-facing adapters, bundled so one `&mut` reaches them all.
pub struct Links<N, B, P, T> {
    pub network: N,
    pub broker: B,
    pub provisioning: P,
    pub clock: T,
}

/// What the main loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The stored record was erased; reboot the device.
    Restart,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<S> {
    fsm: Fsm,
    ctx: FsmContext,
    config: SystemConfig,
    store: ConfigStore<S>,
    aggregator: ProvisioningAggregator,
    network: NetworkSupervisor,
    broker: BrokerSupervisor,
}

impl<S: StoragePort> AppService<S> {
    /// Construct the service.  Does **not** touch storage or radios; call
    /// [`start`](Self::start) next.
    pub fn new(config: SystemConfig, storage: S) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Operational),
            ctx: FsmContext::new(),
            network: NetworkSupervisor::new(config.join_timeout_ms),
            broker: BrokerSupervisor::new(config.broker_retry_interval_ms),
            store: ConfigStore::new(storage),
            aggregator: ProvisioningAggregator::new(),
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the stored record, enter the initial mode and, if configured,
    /// block until the first Wi-Fi join succeeds or times out.
    pub fn start<N, B, P, T>(&mut self, links: &mut Links<N, B, P, T>, sink: &mut impl EventSink)
    where
        N: NetworkPort,
        B: BrokerPort,
        P: ProvisioningPort,
        T: TimePort,
    {
        if let Err(e) = self.store.load() {
            warn!("AppService: stored config unusable ({e}), writing defaults");
            sink.emit(&AppEvent::ConfigFallback);
            if let Err(e) = self.store.save() {
                warn!("AppService: could not persist defaults: {e}");
            }
        }

        let record = self.store.record();
        info!(
            "config: network '{}' (secret {} bytes), broker {}:{}, status '{}'",
            record.network_name(),
            record.network_secret().len(),
            record.broker_host(),
            record.broker_port(),
            record.status()
        );

        self.fsm.start(&mut self.ctx);
        self.run_actions(links, sink);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {}", self.fsm.current_state());

        if self.config.boot_join {
            let record = self.store.record();
            let joined = join_blocking(
                &mut self.network,
                &mut links.network,
                &mut links.clock,
                record.network_name(),
                record.network_secret(),
                self.config.join_poll_interval_ms,
            );
            sink.emit(if joined {
                &AppEvent::NetworkJoined
            } else {
                &AppEvent::NetworkJoinTimedOut
            });
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop pass: provisioning intake → FSM → mode actions →
    /// connection servicing.
    pub fn tick<N, B, P, T>(
        &mut self,
        button_pressed: bool,
        links: &mut Links<N, B, P, T>,
        sink: &mut impl EventSink,
    ) -> TickOutcome
    where
        N: NetworkPort,
        B: BrokerPort,
        P: ProvisioningPort,
        T: TimePort,
    {
        // 1. Credential writes queued by the provisioning link
        if self.fsm.current_state() == StateId::Provisioning {
            self.drain_provisioning(&mut links.provisioning, sink);
        }

        // 2. FSM tick (pure state logic)
        self.ctx.inputs.button_pressed = button_pressed;
        if let Some((from, to)) = self.fsm.tick(&mut self.ctx) {
            sink.emit(&AppEvent::StateChanged { from, to });
        }
        self.ctx.inputs.clear();

        // 3. Side effects requested by exit/enter handlers
        self.run_actions(links, sink);

        // 4. Keep the current mode's connections alive
        match self.fsm.current_state() {
            StateId::Provisioning => TickOutcome::Continue,
            StateId::Operational => self.service_links(links, true, sink),
            StateId::Suspended => self.service_links(links, false, sink),
        }
    }

    fn drain_provisioning<P: ProvisioningPort>(
        &mut self,
        provisioning: &mut P,
        sink: &mut impl EventSink,
    ) {
        while let Some(write) = provisioning.take_write() {
            match self.aggregator.accept(&write, &mut self.store) {
                Ok(false) => {}
                Ok(true) => sink.emit(&AppEvent::CredentialsCommitted),
                Err(e) => {
                    warn!("AppService: credentials not persisted: {e}");
                    sink.emit(&AppEvent::CredentialsCommitted);
                }
            }
        }
        self.ctx.inputs.credentials_ready = self.aggregator.take_ready();
    }

    fn run_actions<N, B, P, T>(&mut self, links: &mut Links<N, B, P, T>, sink: &mut impl EventSink)
    where
        N: NetworkPort,
        B: BrokerPort,
        P: ProvisioningPort,
        T: TimePort,
    {
        for action in self.ctx.take_actions() {
            match action {
                ModeAction::StopBroker => {
                    self.broker.stop(&mut links.broker, &self.config.status_topic);
                }
                ModeAction::StopNetwork => self.network.stop(&mut links.network),
                ModeAction::RadioSettle => links.clock.delay_ms(self.config.radio_settle_ms),
                ModeAction::StartProvisioning => {
                    self.aggregator.reset();
                    // Writes left over from an earlier session are stale.
                    while links.provisioning.take_write().is_some() {}
                    let record = self.store.record();
                    let seed = AttributeSeed {
                        device_name: &self.config.device_name,
                        network_name: record.network_name(),
                        network_secret: record.network_secret(),
                        broker_host: record.broker_host(),
                    };
                    if let Err(e) = links.provisioning.start(&seed) {
                        warn!("AppService: provisioning link not started: {e}");
                    }
                }
                ModeAction::StopProvisioning => {
                    if links.provisioning.is_active() {
                        links.provisioning.stop();
                    } else {
                        info!("AppService: provisioning link never came up, nothing to stop");
                    }
                }
                ModeAction::StartNetwork => {
                    let record = self.store.record();
                    self.network.start(
                        &mut links.network,
                        record.network_name(),
                        record.network_secret(),
                        links.clock.now_ms(),
                    );
                }
                ModeAction::StartBroker => {
                    let record = self.store.record();
                    self.broker
                        .start(&mut links.broker, record.broker_host(), record.broker_port());
                }
                ModeAction::SetStatus(status) => self.update_status(status, sink),
            }
        }
    }

    /// Join, keep the broker session up and handle inbound commands.
    /// `announce` publishes presence and marks the node online whenever the
    /// broker session comes up.
    fn service_links<N, B, P, T>(
        &mut self,
        links: &mut Links<N, B, P, T>,
        announce: bool,
        sink: &mut impl EventSink,
    ) -> TickOutcome
    where
        N: NetworkPort,
        B: BrokerPort,
        P: ProvisioningPort,
        T: TimePort,
    {
        let now = links.clock.now_ms();

        if self.network.state() == LinkState::Idle {
            let record = self.store.record();
            self.network.start(
                &mut links.network,
                record.network_name(),
                record.network_secret(),
                now,
            );
        }

        let before = self.network.state();
        match self.network.poll(&links.network, now) {
            Some(LinkState::Established) => sink.emit(&AppEvent::NetworkJoined),
            Some(LinkState::Idle) if before == LinkState::Established => {
                sink.emit(&AppEvent::NetworkLost);
            }
            Some(LinkState::Idle) => sink.emit(&AppEvent::NetworkJoinTimedOut),
            _ => {}
        }
        if !self.network.is_established() {
            return TickOutcome::Continue;
        }

        if !self.broker.is_started() {
            let record = self.store.record();
            self.broker
                .start(&mut links.broker, record.broker_host(), record.broker_port());
        }

        if self.broker.poll(&mut links.broker, &self.config, now) == Some(LinkState::Established) {
            sink.emit(&AppEvent::BrokerConnected);
            if announce {
                if let Err(e) = links
                    .broker
                    .publish(&self.config.status_topic, STATUS_ONLINE.as_bytes())
                {
                    warn!("AppService: online announcement failed: {e}");
                }
                self.update_status(STATUS_ONLINE, sink);
            }
        }

        while let Some(msg) = links.broker.take_message() {
            match BrokerCommand::parse(&msg, &self.config) {
                Some(BrokerCommand::FactoryReset) => {
                    warn!("AppService: factory reset requested on '{}'", msg.topic);
                    if let Err(e) = self.store.clear() {
                        warn!("AppService: erase failed: {e}");
                    }
                    sink.emit(&AppEvent::FactoryReset);
                    return TickOutcome::Restart;
                }
                Some(BrokerCommand::SetStatus(status)) => self.update_status(&status, sink),
                None => info!("AppService: ignoring message on '{}'", msg.topic),
            }
        }

        TickOutcome::Continue
    }

    /// Store `status` and report it.  The store only writes when the value
    /// differs from the current one, so the command channel and the
    /// announcement on every broker reconnect can call this freely; an
    /// unchanged status emits no event either.
    fn update_status(&mut self, status: &str, sink: &mut impl EventSink) {
        match self.store.set_status(status) {
            Ok(true) => {
                info!("status -> '{}'", self.store.record().status());
                sink.emit(&AppEvent::StatusChanged(bounded(self.store.record().status())));
            }
            Ok(false) => {}
            Err(e) => warn!("AppService: status '{}' not persisted: {e}", status),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn network_state(&self) -> LinkState {
        self.network.state()
    }

    pub fn broker_state(&self) -> LinkState {
        self.broker.state()
    }

    /// Credential fields staged in the current provisioning session.
    pub fn staged_fields(&self) -> usize {
        self.aggregator.received()
    }
}
