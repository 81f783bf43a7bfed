//! Resource lifecycle: a single owner for every transient buffer or
//! ephemeral reference created during a batch.
//!
//! Each registered resource is released exactly once, through
//! [`ResourceRegistry::release`], [`ResourceRegistry::release_all`] or the
//! registry's drop. Releasing a handle again is a no-op. A release requested
//! while a delivery [`Lease`] is alive waits until the last lease drops.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::outcome::EncodedArtifact;

/// Something that must be released exactly once.
pub trait Resource: Send {
    fn release(self);
}

impl Resource for EncodedArtifact {
    fn release(self) {
        log::trace!(
            "freeing {} byte artifact for {}",
            self.byte_length(),
            self.source_id
        );
    }
}

/// Opaque reference to a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Handle(u64);

impl Handle {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// What a call to [`ResourceRegistry::release`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStatus {
    /// The resource was released now.
    Released,
    /// A delivery lease is alive; release happens when it drops.
    Deferred,
    /// Unknown or already released handle. Nothing happened.
    NotRegistered,
}

struct Entry<R> {
    resource: R,
    leases: usize,
    release_requested: bool,
}

struct Inner<R> {
    next_handle: u64,
    entries: BTreeMap<Handle, Entry<R>>,
    released: u64,
}

/// Thread-safe registry of live resources, in registration order.
pub struct ResourceRegistry<R: Resource> {
    inner: Mutex<Inner<R>>,
}

impl<R: Resource> Default for ResourceRegistry<R> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_handle: 1,
                entries: BTreeMap::new(),
                released: 0,
            }),
        }
    }
}

impl<R: Resource> fmt::Debug for ResourceRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ResourceRegistry")
            .field("live", &inner.entries.len())
            .field("released", &inner.released)
            .finish()
    }
}

impl<R: Resource> ResourceRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<R>> {
        // A panic inside a release callback must not wedge cleanup.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership of `resource` and return its handle.
    pub fn register(&self, resource: R) -> Handle {
        let mut inner = self.lock();
        let handle = Handle(inner.next_handle);
        inner.next_handle += 1;
        inner.entries.insert(
            handle,
            Entry {
                resource,
                leases: 0,
                release_requested: false,
            },
        );
        handle
    }

    /// Release one resource. Idempotent.
    pub fn release(&self, handle: Handle) -> ReleaseStatus {
        let taken = {
            let mut inner = self.lock();
            let leased = match inner.entries.get_mut(&handle) {
                None => return ReleaseStatus::NotRegistered,
                Some(entry) => {
                    entry.release_requested = true;
                    entry.leases > 0
                }
            };
            if leased {
                return ReleaseStatus::Deferred;
            }
            inner.released += 1;
            inner.entries.remove(&handle)
        };
        if let Some(entry) = taken {
            log::debug!("released {}", handle);
            entry.resource.release();
        }
        ReleaseStatus::Released
    }

    /// Release every registered resource. Leased ones are released when
    /// their leases drop. Returns how many were released immediately.
    pub fn release_all(&self) -> usize {
        let taken: Vec<Entry<R>> = {
            let mut inner = self.lock();
            let handles: Vec<Handle> = inner.entries.keys().copied().collect();
            let mut taken = Vec::with_capacity(handles.len());
            for handle in handles {
                let leased = inner
                    .entries
                    .get_mut(&handle)
                    .map(|entry| {
                        entry.release_requested = true;
                        entry.leases > 0
                    })
                    .unwrap_or(true);
                if !leased {
                    if let Some(entry) = inner.entries.remove(&handle) {
                        taken.push(entry);
                    }
                }
            }
            inner.released += taken.len() as u64;
            taken
        };

        let count = taken.len();
        if count > 0 {
            log::debug!("released {} resource(s)", count);
        }
        for entry in taken {
            entry.resource.release();
        }
        count
    }

    /// Pin a resource for the duration of a delivery.
    pub fn lease(&self, handle: Handle) -> Option<Lease<'_, R>> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(&handle)?;
        if entry.release_requested {
            return None;
        }
        entry.leases += 1;
        Some(Lease {
            registry: self,
            handle,
        })
    }

    fn end_lease(&self, handle: Handle) {
        let taken = {
            let mut inner = self.lock();
            let done = match inner.entries.get_mut(&handle) {
                Some(entry) => {
                    entry.leases = entry.leases.saturating_sub(1);
                    entry.leases == 0 && entry.release_requested
                }
                None => false,
            };
            if done {
                inner.released += 1;
                inner.entries.remove(&handle)
            } else {
                None
            }
        };
        if let Some(entry) = taken {
            log::debug!("released {} after delivery", handle);
            entry.resource.release();
        }
    }

    /// Run `f` against a live resource.
    pub fn with<T>(&self, handle: Handle, f: impl FnOnce(&R) -> T) -> Option<T> {
        let inner = self.lock();
        inner.entries.get(&handle).map(|entry| f(&entry.resource))
    }

    /// Like [`with`](Self::with), but `None` once a release was requested,
    /// even if a lease still defers it.
    pub fn available<T>(&self, handle: Handle, f: impl FnOnce(&R) -> T) -> Option<T> {
        let inner = self.lock();
        inner
            .entries
            .get(&handle)
            .filter(|entry| !entry.release_requested)
            .map(|entry| f(&entry.resource))
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.lock().entries.contains_key(&handle)
    }

    /// Live handles in registration order.
    pub fn handles(&self) -> Vec<Handle> {
        self.lock().entries.keys().copied().collect()
    }

    pub fn live_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Total resources released over the registry's lifetime.
    pub fn released_count(&self) -> u64 {
        self.lock().released
    }
}

impl<R: Resource> Drop for ResourceRegistry<R> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        let entries = std::mem::take(&mut inner.entries);
        inner.released += entries.len() as u64;
        for (_, entry) in entries {
            entry.resource.release();
        }
    }
}

/// Keeps a resource alive while a delivery is in flight.
pub struct Lease<'a, R: Resource> {
    registry: &'a ResourceRegistry<R>,
    handle: Handle,
}

impl<R: Resource> Lease<'_, R> {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn with<T>(&self, f: impl FnOnce(&R) -> T) -> Option<T> {
        self.registry.with(self.handle, f)
    }
}

impl<R: Resource> Drop for Lease<'_, R> {
    fn drop(&mut self) {
        self.registry.end_lease(self.handle);
    }
}
