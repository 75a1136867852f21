//! Process-wide backend runtime
//!
//! The runtime is initialized when the first world is created and torn down
//! when the last one is dropped. Each world holds a [`RuntimeGuard`]; the
//! count lives behind a mutex so worlds may be created and dropped from any
//! thread.

use crate::foundation::logging::{debug, info};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct RuntimeState {
    live_worlds: usize,
    initializations: u64,
}

static RUNTIME: Mutex<RuntimeState> = Mutex::new(RuntimeState {
    live_worlds: 0,
    initializations: 0,
});

fn state() -> MutexGuard<'static, RuntimeState> {
    // Plain counters: a poisoned lock still holds valid state
    RUNTIME.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps the runtime alive while held
#[derive(Debug)]
pub struct RuntimeGuard {
    _private: (),
}

impl RuntimeGuard {
    /// Register one more user, initializing the runtime on the first
    pub fn acquire() -> Self {
        let mut state = state();
        if state.live_worlds == 0 {
            state.initializations += 1;
            info!("Physics runtime initialized");
        }
        state.live_worlds += 1;
        debug!("Physics runtime users: {}", state.live_worlds);
        Self { _private: () }
    }
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        let mut state = state();
        state.live_worlds = state.live_worlds.saturating_sub(1);
        if state.live_worlds == 0 {
            info!("Physics runtime shut down");
        }
    }
}

/// Number of guards currently alive
pub fn live_worlds() -> usize {
    state().live_worlds
}

/// Whether at least one guard is alive
pub fn is_initialized() -> bool {
    state().live_worlds > 0
}

/// How many times the runtime has gone from shut down to initialized
pub fn initialization_count() -> u64 {
    state().initializations
}
