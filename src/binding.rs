//! The in-memory lease database: an ordered list of [`Binding`] records
//! with lazy expiration and linear lookup.

use std::time::{Duration, SystemTime};

/// Selects which bindings a search considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Dynamic,
    Static,
    StaticOrDynamic,
}

impl Kind {
    fn matches(self, is_static: bool) -> bool {
        match self {
            Kind::Dynamic => !is_static,
            Kind::Static => is_static,
            Kind::StaticOrDynamic => true,
        }
    }
}

/// A binding's place in the state machine (§4.2/§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Empty,
    Pending,
    Associated,
    Expired,
    Released,
}

/// One lease record.
#[derive(Debug, Clone)]
pub struct Binding {
    pub address: u32,
    pub client_id: Vec<u8>,
    pub binding_time: SystemTime,
    pub lease_time: Duration,
    pub status: Status,
    pub is_static: bool,
}

impl Binding {
    fn expired(&self, now: SystemTime) -> bool {
        match now.duration_since(self.binding_time) {
            Ok(elapsed) => elapsed >= self.lease_time,
            Err(_) => false,
        }
    }
}

/// A stable reference to a binding, valid for the lifetime of the store
/// (bindings are never removed, only transitioned in place). Backed by an
/// index into an append-only vector rather than a linked-list head pointer,
/// so handing one out survives every later insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingRef(usize);

/// An ordered collection of bindings. New bindings are appended, so earlier
/// insertions (statics loaded at startup) keep lower indices and are found
/// first by the forward scan in [`search_binding`], the same tie-break the
/// source's head-insertion linked list gave for free.
#[derive(Debug, Default)]
pub struct BindingStore {
    bindings: Vec<Binding>,
}

impl BindingStore {
    pub fn new() -> Self {
        Self { bindings: Vec::new() }
    }

    pub fn get(&self, r: BindingRef) -> &Binding {
        &self.bindings[r.0]
    }

    pub fn get_mut(&mut self, r: BindingRef) -> &mut Binding {
        &mut self.bindings[r.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Append a new binding. Returns a stable reference to it.
    pub fn add_binding(
        &mut self,
        address: u32,
        client_id: Vec<u8>,
        is_static: bool,
        status: Status,
    ) -> BindingRef {
        self.bindings.push(Binding {
            address,
            client_id,
            binding_time: SystemTime::UNIX_EPOCH,
            lease_time: Duration::ZERO,
            status,
            is_static,
        });

        BindingRef(self.bindings.len() - 1)
    }

    /// Linear scan for a binding matching `cid` exactly, filtered by `kind`
    /// and, unless `status` is `None` ("any"), by status. First match wins,
    /// in insertion order (statics loaded first end up later in the scan
    /// only if inserted first — callers load statics before serving
    /// traffic, so they win ties as the spec requires).
    pub fn search_binding(
        &self,
        cid: &[u8],
        kind: Kind,
        status: Option<Status>,
    ) -> Option<BindingRef> {
        self.bindings.iter().enumerate().find_map(|(i, b)| {
            let status_ok = status.map(|s| b.status == s).unwrap_or(true);
            if kind.matches(b.is_static) && b.client_id == cid && status_ok {
                Some(BindingRef(i))
            } else {
                None
            }
        })
    }

    /// Transition every binding past its lease boundary to `Expired`.
    pub fn update_statuses(&mut self, now: SystemTime) {
        for b in &mut self.bindings {
            if matches!(b.status, Status::Pending | Status::Associated) && b.expired(now) {
                b.status = Status::Expired;
            }
        }
    }

    /// Returns the live status for `r`, lazily expiring it against `now`
    /// first.
    pub fn status_at(&mut self, r: BindingRef, now: SystemTime) -> Status {
        let b = self.get_mut(r);
        if matches!(b.status, Status::Pending | Status::Associated) && b.expired(now) {
            b.status = Status::Expired;
        }
        self.get(r).status
    }

    /// §4.2 `new_dynamic_binding`: reuse the requested address if free,
    /// else draw a fresh one from the pool cursor, else reclaim a stale
    /// dynamic binding, else fail (pool full).
    pub fn new_dynamic_binding(
        &mut self,
        indexes: &mut super::pool::PoolIndexes,
        requested: u32,
        cid: &[u8],
    ) -> Option<BindingRef> {
        if requested != 0 {
            if let Some(i) = self.bindings.iter().position(|b| {
                b.address == requested
                    && !b.is_static
                    && !matches!(b.status, Status::Pending | Status::Associated)
            }) {
                return Some(BindingRef(i));
            }
        }

        if let Some(addr) = indexes.take_free_address() {
            return Some(self.add_binding(addr, cid.to_vec(), false, Status::Empty));
        }

        if let Some(i) = self.bindings.iter().position(|b| {
            !b.is_static && !matches!(b.status, Status::Pending | Status::Associated)
        }) {
            return Some(BindingRef(i));
        }

        None
    }
}
