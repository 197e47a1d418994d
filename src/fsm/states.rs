//! Concrete state handler functions and table builder.
//!
//! ```text
//!  OPERATIONAL ──[button]──▶ PROVISIONING ──[button | ready]──▶ SUSPENDED
//!       ▲                                                          │
//!       └──────────────────────────[button]────────────────────────┘
//! ```
//!
//! The network radio and the BLE radio are never up together: every path
//! into PROVISIONING tears the network down first, and every path out of it
//! releases BLE before joining again.

use super::context::{FsmContext, ModeAction};
use super::{StateDescriptor, StateId};
use crate::store::record::{STATUS_OFFLINE, STATUS_ONLINE};
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Operational
        StateDescriptor {
            id: StateId::Operational,
            name: "Operational",
            on_enter: None,
            on_exit: Some(operational_exit),
            on_update: operational_update,
        },
        // Index 1: Provisioning
        StateDescriptor {
            id: StateId::Provisioning,
            name: "Provisioning",
            on_enter: Some(provisioning_enter),
            on_exit: Some(provisioning_exit),
            on_update: provisioning_update,
        },
        // Index 2: Suspended
        StateDescriptor {
            id: StateId::Suspended,
            name: "Suspended",
            on_enter: Some(suspended_enter),
            on_exit: Some(suspended_exit),
            on_update: suspended_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  OPERATIONAL state
// ═══════════════════════════════════════════════════════════════════════════

fn operational_exit(ctx: &mut FsmContext) {
    // Broker first so the "offline" publish still has a link to go out on.
    ctx.request(ModeAction::StopBroker);
    ctx.request(ModeAction::StopNetwork);
    ctx.request(ModeAction::RadioSettle);
}

fn operational_update(ctx: &mut FsmContext) -> Option<StateId> {
    ctx.inputs.button_pressed.then_some(StateId::Provisioning)
}

// ═══════════════════════════════════════════════════════════════════════════
//  PROVISIONING state
// ═══════════════════════════════════════════════════════════════════════════

fn provisioning_enter(ctx: &mut FsmContext) {
    info!("Provisioning: waiting for credentials over BLE");
    ctx.request(ModeAction::StartProvisioning);
}

fn provisioning_exit(ctx: &mut FsmContext) {
    ctx.request(ModeAction::StopProvisioning);
    ctx.request(ModeAction::RadioSettle);
}

fn provisioning_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.inputs.credentials_ready {
        info!("Provisioning: credentials complete");
        return Some(StateId::Suspended);
    }
    ctx.inputs.button_pressed.then_some(StateId::Suspended)
}

// ═══════════════════════════════════════════════════════════════════════════
//  SUSPENDED state
// ═══════════════════════════════════════════════════════════════════════════

fn suspended_enter(ctx: &mut FsmContext) {
    ctx.request(ModeAction::StartNetwork);
    ctx.request(ModeAction::StartBroker);
    ctx.request(ModeAction::SetStatus(STATUS_OFFLINE));
}

fn suspended_exit(ctx: &mut FsmContext) {
    ctx.request(ModeAction::SetStatus(STATUS_ONLINE));
}

fn suspended_update(ctx: &mut FsmContext) -> Option<StateId> {
    ctx.inputs.button_pressed.then_some(StateId::Operational)
}
