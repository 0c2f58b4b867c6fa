//! OAuth callback state machine using rust-fsm.
//!
//! ```text
//! Idle ──Begin──► ValidatingParams ──ProviderDenied / ParamsInvalid──► Failed
//!  ▲                    │
//!  │              ParamsAccepted
//!  │                    ▼
//!  └─VerificationPending── AwaitingVerificationReady
//!                               │
//!                        VerificationReady
//!                               ▼
//!                          Exchanging ──StateRejected / ExchangeFailed──► Failed
//!                               │
//!                       ExchangeSucceeded
//!                               ▼
//!                           Succeeded
//! ```
//!
//! Only `Idle` accepts `Begin`, which is what makes re-entrant invocations
//! no-ops. The machine goes back to `Idle` solely through
//! `VerificationPending`, i.e. before any request was dispatched.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub callback_machine(Idle)

    Idle => {
        Begin => ValidatingParams
    },
    ValidatingParams => {
        ProviderDenied => Failed,
        ParamsInvalid => Failed,
        ParamsAccepted => AwaitingVerificationReady
    },
    AwaitingVerificationReady => {
        VerificationPending => Idle,
        VerificationReady => Exchanging
    },
    Exchanging => {
        StateRejected => Failed,
        ExchangeSucceeded => Succeeded,
        ExchangeFailed => Failed
    }
}

pub use callback_machine::Input as CallbackMachineInput;
pub use callback_machine::State as CallbackMachineState;
pub use callback_machine::StateMachine as CallbackMachine;

/// Serializable view of the machine's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackState {
    Idle,
    ValidatingParams,
    AwaitingVerificationReady,
    Exchanging,
    Succeeded,
    Failed,
}

impl CallbackState {
    /// Terminal states accept no further input.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallbackState::Succeeded | CallbackState::Failed)
    }
}

impl From<&CallbackMachineState> for CallbackState {
    fn from(state: &CallbackMachineState) -> Self {
        match state {
            CallbackMachineState::Idle => CallbackState::Idle,
            CallbackMachineState::ValidatingParams => CallbackState::ValidatingParams,
            CallbackMachineState::AwaitingVerificationReady => {
                CallbackState::AwaitingVerificationReady
            }
            CallbackMachineState::Exchanging => CallbackState::Exchanging,
            CallbackMachineState::Succeeded => CallbackState::Succeeded,
            CallbackMachineState::Failed => CallbackState::Failed,
        }
    }
}
