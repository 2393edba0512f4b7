// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//!
//! The bidirectional identity registry.
//!
//! Four structures, per the runtime's identity rules:
//!
//! - `local_by_id` — id → strong or weak reference to a local value. Strong
//!   while the peer holds a stub; demoted to weak on `del`; erased once the
//!   value itself dies.
//! - `local_by_ptr` — value pointer → id, so re-exposing a value reuses its
//!   id. Hits are validated against the id slot before being trusted, which
//!   makes the map behave as if it were weak-keyed despite the raw key.
//! - `remote_by_id` — id → weak reference to the stub materialized for it.
//! - release hooks: local values get their release slot armed on first
//!   exposure; stub drops are reported by the stub itself. Both feed the GC
//!   bridge, which calls back into [`ObjectRegistry::drop_local`] and
//!   [`ObjectRegistry::forget_remote_if_dead`].

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use objlink_wire::ObjectId;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::error::{Result, RpcError};
use crate::gc::GcEvent;
use crate::object::{LocalFunction, LocalObject};
use crate::stub::{Stub, StubInner};
use crate::value::Value;

/// A local value that can be addressed by the peer.
#[derive(Clone, Debug)]
pub(crate) enum LocalTarget {
    Object(Arc<LocalObject>),
    Function(Arc<LocalFunction>),
}

impl LocalTarget {
    pub(crate) fn into_value(self) -> Value {
        match self {
            LocalTarget::Object(obj) => Value::Object(obj),
            LocalTarget::Function(f) => Value::Function(f),
        }
    }
}

enum SlotRef {
    StrongObject(Arc<LocalObject>),
    WeakObject(Weak<LocalObject>),
    StrongFunction(Arc<LocalFunction>),
    WeakFunction(Weak<LocalFunction>),
}

struct LocalSlot {
    state: SlotRef,
    /// Key of the companion `local_by_ptr` entry.
    ptr: usize,
}

/// Whether an exposure needs a full description on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exposure {
    /// The peer already holds this id — a bare reference suffices.
    Known,
    /// First exposure, or a re-export after the peer released its stub; the
    /// peer needs the full `{idLocal, className, properties}` form.
    NeedsDescription,
}

pub(crate) struct ObjectRegistry {
    local_by_id: HashMap<ObjectId, LocalSlot>,
    local_by_ptr: HashMap<usize, ObjectId>,
    remote_by_id: HashMap<ObjectId, Weak<StubInner>>,
    next_id: u64,
    gc_tx: UnboundedSender<GcEvent>,
}

impl ObjectRegistry {
    pub(crate) fn new(gc_tx: UnboundedSender<GcEvent>) -> Self {
        Self {
            local_by_id: HashMap::new(),
            local_by_ptr: HashMap::new(),
            remote_by_id: HashMap::new(),
            next_id: 0,
            gc_tx,
        }
    }

    /// Allocate a fresh id. Ids are opaque tokens; a monotonic counter keeps
    /// them unique within the session, and the loop guards the invariant
    /// against any future allocation scheme.
    fn alloc_id(&mut self) -> ObjectId {
        loop {
            self.next_id += 1;
            let id = ObjectId::from_raw(self.next_id.to_string());
            if !self.local_by_id.contains_key(&id) {
                return id;
            }
        }
    }

    /// Return the id for a local object, allocating and registering on first
    /// exposure. A previously demoted entry re-promotes to strong and keeps
    /// its id, but reports `NeedsDescription` because the peer forgot it.
    pub(crate) fn expose_object(&mut self, obj: &Arc<LocalObject>) -> (ObjectId, Exposure) {
        let ptr = Arc::as_ptr(obj) as usize;
        if let Some(id) = self.local_by_ptr.get(&ptr).cloned() {
            if let Some(slot) = self.local_by_id.get_mut(&id) {
                match &slot.state {
                    SlotRef::StrongObject(existing) if Arc::ptr_eq(existing, obj) => {
                        return (id, Exposure::Known);
                    }
                    SlotRef::WeakObject(weak) => {
                        if weak.upgrade().is_some_and(|live| Arc::ptr_eq(&live, obj)) {
                            debug!(%id, "re-promoting released local object");
                            slot.state = SlotRef::StrongObject(obj.clone());
                            return (id, Exposure::NeedsDescription);
                        }
                    }
                    _ => {}
                }
            }
            // Stale hit: the address was reused by a different allocation.
            self.local_by_ptr.remove(&ptr);
            self.local_by_id.remove(&id);
        }

        let id = self.alloc_id();
        trace!(%id, class = obj.class().name(), "exposing local object");
        obj.release.arm(id.clone(), self.gc_tx.clone());
        self.local_by_id.insert(
            id.clone(),
            LocalSlot {
                state: SlotRef::StrongObject(obj.clone()),
                ptr,
            },
        );
        self.local_by_ptr.insert(ptr, id.clone());
        (id, Exposure::NeedsDescription)
    }

    /// Function counterpart of [`expose_object`]. Functions have no
    /// properties, so callers never need the exposure flag: the wire form is
    /// the same either way.
    pub(crate) fn expose_function(&mut self, f: &Arc<LocalFunction>) -> ObjectId {
        let ptr = Arc::as_ptr(f) as usize;
        if let Some(id) = self.local_by_ptr.get(&ptr).cloned() {
            if let Some(slot) = self.local_by_id.get_mut(&id) {
                match &slot.state {
                    SlotRef::StrongFunction(existing) if Arc::ptr_eq(existing, f) => {
                        return id;
                    }
                    SlotRef::WeakFunction(weak) => {
                        if weak.upgrade().is_some_and(|live| Arc::ptr_eq(&live, f)) {
                            debug!(%id, "re-promoting released local function");
                            slot.state = SlotRef::StrongFunction(f.clone());
                            return id;
                        }
                    }
                    _ => {}
                }
            }
            self.local_by_ptr.remove(&ptr);
            self.local_by_id.remove(&id);
        }

        let id = self.alloc_id();
        trace!(%id, "exposing local function");
        f.release.arm(id.clone(), self.gc_tx.clone());
        self.local_by_id.insert(
            id.clone(),
            LocalSlot {
                state: SlotRef::StrongFunction(f.clone()),
                ptr,
            },
        );
        self.local_by_ptr.insert(ptr, id.clone());
        id
    }

    /// Resolve an inbound `idRemote` to the local value it names. A live
    /// weak entry is promoted back to strong: the peer is re-referencing the
    /// object, so local interest resumes.
    pub(crate) fn local_for(&mut self, id: &ObjectId) -> Result<LocalTarget> {
        let slot = self
            .local_by_id
            .get_mut(id)
            .ok_or_else(|| RpcError::UnknownLocal(id.clone()))?;
        match &slot.state {
            SlotRef::StrongObject(obj) => Ok(LocalTarget::Object(obj.clone())),
            SlotRef::StrongFunction(f) => Ok(LocalTarget::Function(f.clone())),
            SlotRef::WeakObject(weak) => match weak.upgrade() {
                Some(obj) => {
                    debug!(%id, "re-promoting local object on peer reference");
                    slot.state = SlotRef::StrongObject(obj.clone());
                    Ok(LocalTarget::Object(obj))
                }
                None => {
                    self.erase_local(id);
                    Err(RpcError::UnknownLocal(id.clone()))
                }
            },
            SlotRef::WeakFunction(weak) => match weak.upgrade() {
                Some(f) => {
                    debug!(%id, "re-promoting local function on peer reference");
                    slot.state = SlotRef::StrongFunction(f.clone());
                    Ok(LocalTarget::Function(f))
                }
                None => {
                    self.erase_local(id);
                    Err(RpcError::UnknownLocal(id.clone()))
                }
            },
        }
    }

    /// Inbound `del`: the peer dropped its stub. Demote to weak so the value
    /// survives while anything local still holds it; a later re-export
    /// restores identity. No-op when already weak.
    pub(crate) fn release_local(&mut self, id: &ObjectId) {
        let Some(slot) = self.local_by_id.get_mut(id) else {
            debug!(%id, "del for unknown local id ignored");
            return;
        };
        match &slot.state {
            SlotRef::StrongObject(obj) => {
                debug!(%id, "demoting local object to weak");
                slot.state = SlotRef::WeakObject(Arc::downgrade(obj));
            }
            SlotRef::StrongFunction(f) => {
                debug!(%id, "demoting local function to weak");
                slot.state = SlotRef::WeakFunction(Arc::downgrade(f));
            }
            SlotRef::WeakObject(_) | SlotRef::WeakFunction(_) => {}
        }
    }

    /// GC bridge callback: a demoted local value was dropped. Erase the slot
    /// unless it was re-promoted in the meantime.
    pub(crate) fn drop_local(&mut self, id: &ObjectId) {
        let Some(slot) = self.local_by_id.get(id) else {
            return;
        };
        let dead = match &slot.state {
            SlotRef::WeakObject(w) => w.upgrade().is_none(),
            SlotRef::WeakFunction(w) => w.upgrade().is_none(),
            _ => false,
        };
        if dead {
            debug!(%id, "local value collected, erasing registry slot");
            self.erase_local(id);
        }
    }

    fn erase_local(&mut self, id: &ObjectId) {
        if let Some(slot) = self.local_by_id.remove(id) {
            // Only erase the pointer entry while it still names this id;
            // the address may already belong to a newer allocation.
            if self.local_by_ptr.get(&slot.ptr) == Some(id) {
                self.local_by_ptr.remove(&slot.ptr);
            }
        }
    }

    /// Look up a live stub for a peer-owned id.
    pub(crate) fn remote_for(&self, id: &ObjectId) -> Option<Stub> {
        self.remote_by_id
            .get(id)
            .and_then(Weak::upgrade)
            .map(Stub::from_inner)
    }

    /// Register a freshly materialized stub. At most one live stub may exist
    /// per id.
    pub(crate) fn register_remote(&mut self, id: ObjectId, stub: &Stub) -> Result<()> {
        if let Some(existing) = self.remote_by_id.get(&id) {
            if existing.upgrade().is_some() {
                return Err(RpcError::DuplicateRemote(id));
            }
        }
        trace!(%id, "registering remote stub");
        self.remote_by_id.insert(id, stub.downgrade());
        Ok(())
    }

    /// GC bridge callback: a stub was dropped. Erase the entry and report
    /// whether a `del` should be sent — it should not when a newer live stub
    /// has already taken over the id.
    pub(crate) fn forget_remote_if_dead(&mut self, id: &ObjectId) -> bool {
        match self.remote_by_id.get(id) {
            Some(weak) if weak.upgrade().is_none() => {
                self.remote_by_id.remove(id);
                true
            }
            _ => false,
        }
    }
}
