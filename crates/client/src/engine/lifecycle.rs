//! Engine lifecycle state machine.
//!
//! ```text
//! Parsed -> Installing -> Waiting -> Active -> Retired
//!                  \          \
//!                   `----------`---> Retired
//! ```

use offgrid_core::Error;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Where an engine instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Parsed,
    /// Preloading the manifest.
    Installing,
    /// Installed; another generation may still be in control.
    Waiting,
    /// Intercepting requests.
    Active,
    /// Superseded or failed. Terminal.
    Retired,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Active => "active",
            LifecycleState::Retired => "retired",
        };
        f.write_str(name)
    }
}

pub fn is_valid_transition(from: LifecycleState, to: LifecycleState) -> bool {
    use LifecycleState::*;
    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Waiting)
            | (Installing, Retired)
            | (Waiting, Active)
            | (Waiting, Retired)
            | (Active, Retired)
    )
}

/// Current state plus the pending skip-waiting request.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
    skip_waiting: AtomicBool,
}

impl Lifecycle {
    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `to`, returning the previous state.
    pub fn transition(&self, to: LifecycleState) -> Result<LifecycleState, Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let from = *state;
        if !is_valid_transition(from, to) {
            return Err(Error::InvalidState(format!("cannot move from {from} to {to}")));
        }
        *state = to;
        tracing::info!(%from, %to, "lifecycle transition");
        Ok(from)
    }

    /// Ask to activate without waiting for the previous generation to yield.
    pub fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }
}
