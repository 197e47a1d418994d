//! Shared mutable context threaded through every FSM handler.
//!
//! The service writes this tick's inputs before calling
//! [`Fsm::tick`](super::Fsm::tick); handlers read them and queue
//! [`ModeAction`]s, which the service drains and executes in order.

use heapless::Vec;
use log::warn;

/// Upper bound on actions queued by one transition (exit + enter).
pub const MAX_ACTIONS: usize = 8;

/// Side effects requested by state handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeAction {
    /// Announce "offline" if possible, then drop the broker session.
    StopBroker,
    /// Drop the Wi-Fi link.
    StopNetwork,
    /// Wait for the previous radio owner to release the antenna.
    RadioSettle,
    /// Start the GATT server seeded with the current credentials.
    StartProvisioning,
    /// Tear the GATT server down.
    StopProvisioning,
    /// Begin a non-blocking join with the stored credentials.
    StartNetwork,
    /// Point the broker session at the stored host.
    StartBroker,
    /// Update and persist the operating status.
    SetStatus(&'static str),
}

/// Edge-triggered inputs for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeInputs {
    /// Debounced button press seen this loop pass.
    pub button_pressed: bool,
    /// The provisioning aggregator committed a full credential set.
    pub credentials_ready: bool,
}

impl ModeInputs {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

pub struct FsmContext {
    pub inputs: ModeInputs,
    actions: Vec<ModeAction, MAX_ACTIONS>,
}

impl Default for FsmContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FsmContext {
    pub fn new() -> Self {
        Self {
            inputs: ModeInputs::default(),
            actions: Vec::new(),
        }
    }

    /// Queue an action for the service to execute after this tick.
    pub fn request(&mut self, action: ModeAction) {
        if self.actions.push(action).is_err() {
            warn!("FSM: action queue full, dropping {:?}", action);
        }
    }

    /// Drain queued actions in request order.
    pub fn take_actions(&mut self) -> Vec<ModeAction, MAX_ACTIONS> {
        core::mem::take(&mut self.actions)
    }
}
