//! Per-interaction runtime state: which step is expected next, and the
//! IP address cached for the interaction's domain-bound steps. Grounded
//! on `original_source/src/monitor/InteractionManager.py`'s state-index
//! bookkeeping (spec §4.4).

use std::net::IpAddr;

/// Tracks one interaction's progress through its step sequence. State
/// `0` means "awaiting the interaction's first step"; reaching it again
/// after completion (or after a step that doesn't match) clears the
/// cached IP, since a fresh run of the interaction may bind a different
/// address (spec §9 open question, resolved in SPEC_FULL.md §4.4).
#[derive(Debug, Clone)]
pub struct InteractionState {
    total_steps: usize,
    current_step: usize,
    cached_ip: Option<IpAddr>,
}

impl InteractionState {
    pub fn new(total_steps: usize) -> Self {
        InteractionState {
            total_steps,
            current_step: 0,
            cached_ip: None,
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn cached_ip(&self) -> Option<IpAddr> {
        self.cached_ip
    }

    /// Records a successful match of the expected step, optionally
    /// binding the interaction's cached address (the first step to
    /// resolve a domain wins; later steps reuse it).
    pub fn advance(&mut self, resolved_ip: Option<IpAddr>) {
        if self.cached_ip.is_none() {
            self.cached_ip = resolved_ip;
        }
        self.current_step += 1;
        if self.current_step >= self.total_steps {
            self.reset();
        }
    }

    /// A step didn't match; the interaction restarts from its first
    /// step and forgets its cached address.
    pub fn reset(&mut self) {
        self.current_step = 0;
        self.cached_ip = None;
    }

    pub fn is_awaiting_first_step(&self) -> bool {
        self.current_step == 0
    }
}
