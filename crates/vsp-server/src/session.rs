//! Single-session ownership.
//!
//! A process hosts at most one control session. The check is injected as a
//! [`SessionSlot`] so tests can run servers side by side with isolated slots
//! while the binary shares [`SessionSlot::process`].

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, Ordering},
};

use crate::ServerError;

/// Ownership flag for a control session.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    occupied: Arc<AtomicBool>,
}

impl SessionSlot {
    /// Create an isolated, free slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot shared by every server in this process.
    pub fn process() -> Self {
        static PROCESS: OnceLock<SessionSlot> = OnceLock::new();
        PROCESS.get_or_init(Self::new).clone()
    }

    /// Claim the slot for a new session.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::SessionExists`] if another session holds it.
    pub fn claim(&self) -> Result<SessionGuard, ServerError> {
        self.occupied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ServerError::SessionExists)?;
        Ok(SessionGuard { occupied: Arc::clone(&self.occupied) })
    }

    /// Whether a session currently holds the slot.
    pub fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::Acquire)
    }
}

/// Held by the running session; releases the slot on drop.
#[derive(Debug)]
pub struct SessionGuard {
    occupied: Arc<AtomicBool>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.occupied.store(false, Ordering::Release);
    }
}
