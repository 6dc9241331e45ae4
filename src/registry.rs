//! Backend registry
//!
//! The authoritative name → [`BackendDescriptor`] map. Entries are only
//! added and removed, never edited. Removal is two-phase: the entry is first
//! marked draining (invisible to lookups, but still holding its name), the
//! caller's drain step runs, then the entry is removed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::backend::BackendDescriptor;
use crate::error::ProxyError;
use crate::types::BackendName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Active,
    Draining,
}

#[derive(Debug)]
struct Entry {
    descriptor: Arc<BackendDescriptor>,
    state: EntryState,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<HashMap<BackendName, Entry>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<BackendName, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<BackendName, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a backend; the name must not be registered or draining
    pub fn register(
        &self,
        descriptor: BackendDescriptor,
    ) -> Result<Arc<BackendDescriptor>, ProxyError> {
        descriptor.validate()?;

        let mut entries = self.write();
        if entries.contains_key(&descriptor.name) {
            return Err(ProxyError::DuplicateName(descriptor.name));
        }

        let descriptor = Arc::new(descriptor);
        entries.insert(
            descriptor.name.clone(),
            Entry {
                descriptor: Arc::clone(&descriptor),
                state: EntryState::Active,
            },
        );
        info!(backend = %descriptor.name, address = %descriptor.address(), "Registered backend");
        Ok(descriptor)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<BackendDescriptor>, ProxyError> {
        match self.read().get(name) {
            Some(entry) if entry.state == EntryState::Active => Ok(Arc::clone(&entry.descriptor)),
            _ => Err(ProxyError::unknown(name)),
        }
    }

    /// Active backends ordered by name
    #[must_use]
    pub fn list(&self) -> Vec<Arc<BackendDescriptor>> {
        let mut active: Vec<_> = self
            .read()
            .values()
            .filter(|e| e.state == EntryState::Active)
            .map(|e| Arc::clone(&e.descriptor))
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        active
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read()
            .values()
            .filter(|e| e.state == EntryState::Active)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove a backend after running `drain`
    ///
    /// While `drain` runs the name is unknown to [`lookup`](Self::lookup) but
    /// cannot be registered again. The entry is removed once `drain`
    /// finishes, or when this future is dropped part-way.
    pub async fn unregister<F, Fut>(&self, name: &str, drain: F) -> Result<(), ProxyError>
    where
        F: FnOnce(Arc<BackendDescriptor>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let descriptor = {
            let mut entries = self.write();
            match entries.get_mut(name) {
                Some(entry) if entry.state == EntryState::Active => {
                    entry.state = EntryState::Draining;
                    Arc::clone(&entry.descriptor)
                }
                _ => return Err(ProxyError::unknown(name)),
            }
        };

        let _remove = RemoveOnDrop {
            registry: self,
            name: descriptor.name.clone(),
        };
        debug!(backend = %name, "Draining backend");
        drain(descriptor).await;
        Ok(())
    }
}

struct RemoveOnDrop<'a> {
    registry: &'a Registry,
    name: BackendName,
}

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        self.registry.write().remove(&self.name);
        info!(backend = %self.name, "Unregistered backend");
    }
}
