//! The process-wide configuration record: server identity, the dynamic
//! address range, lease durations, default options, and the binding store.

use std::time::Duration;

use crate::binding::BindingStore;
use crate::options::Options;

/// The (first, last, current) dynamic-allocation cursor. `first <= current
/// <= last + 1`; `current > last` means the pool is exhausted.
#[derive(Debug, Clone, Copy)]
pub struct PoolIndexes {
    pub first: u32,
    pub last: u32,
    pub current: u32,
}

impl PoolIndexes {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last, current: first }
    }

    /// Hand out the next unused address in the range, advancing the
    /// cursor. `None` once the range is exhausted.
    pub fn take_free_address(&mut self) -> Option<u32> {
        if self.current <= self.last {
            let addr = self.current;
            self.current += 1;
            Some(addr)
        } else {
            None
        }
    }
}

/// Process-wide server configuration plus the binding store it governs.
pub struct Pool {
    pub server_id: u32,
    pub netmask: u32,
    pub gateway: u32,
    pub device: String,
    pub indexes: PoolIndexes,
    pub lease_time: Duration,
    pub pending_time: Duration,
    pub default_options: Options,
    pub bindings: BindingStore,
}

impl Pool {
    pub fn new(
        server_id: u32,
        netmask: u32,
        gateway: u32,
        device: String,
        indexes: PoolIndexes,
        lease_time: Duration,
        pending_time: Duration,
    ) -> Self {
        Self {
            server_id,
            netmask,
            gateway,
            device,
            indexes,
            lease_time,
            pending_time,
            default_options: Options::new(),
            bindings: BindingStore::new(),
        }
    }
}
