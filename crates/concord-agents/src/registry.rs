use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;

use crate::agent::Agent;
use crate::error::RegistryError;

struct Entry {
    name: String,
    agent: Arc<dyn Agent>,
    enabled: bool,
}

/// Name → agent bindings with an enabled flag, kept in insertion order.
///
/// Only explicit calls mutate it. Runs take a snapshot up front, so a
/// concurrent `disable` never changes an in-flight run's agent set.
#[derive(Default)]
pub struct AgentRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.read().iter().map(|e| (&e.name, e.enabled)))
            .finish()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is a single push/assign, so a poisoned lock still holds
    // consistent entries.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, name: &str, agent: Arc<dyn Agent>) -> Result<(), RegistryError> {
        let mut entries = self.write();
        if entries.iter().any(|e| e.name == name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        entries.push(Entry {
            name: name.to_string(),
            agent,
            enabled: true,
        });
        info!(agent = name, "Registered agent");
        Ok(())
    }

    /// Bind `name`, replacing any existing agent in place (position and flag kept).
    pub fn register_or_replace(&self, name: &str, agent: Arc<dyn Agent>) {
        let mut entries = self.write();
        if let Some(entry) = entries.iter_mut().find(|e| e.name == name) {
            entry.agent = agent;
            info!(agent = name, "Replaced agent");
        } else {
            entries.push(Entry {
                name: name.to_string(),
                agent,
                enabled: true,
            });
            info!(agent = name, "Registered agent");
        }
    }

    pub fn unregister(&self, name: &str) -> Result<Arc<dyn Agent>, RegistryError> {
        let mut entries = self.write();
        let index = entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        info!(agent = name, "Unregistered agent");
        Ok(entries.remove(index).agent)
    }

    pub fn enable(&self, name: &str) -> Result<(), RegistryError> {
        self.set_enabled(name, true)
    }

    pub fn disable(&self, name: &str) -> Result<(), RegistryError> {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        let mut entries = self.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        entry.enabled = enabled;
        info!(agent = name, enabled, "Agent toggled");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Agent>, RegistryError> {
        self.read()
            .iter()
            .find(|e| e.name == name)
            .map(|e| Arc::clone(&e.agent))
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool, RegistryError> {
        self.read()
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.enabled)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Registered names in insertion order.
    pub fn list(&self) -> Vec<String> {
        self.read().iter().map(|e| e.name.clone()).collect()
    }

    pub fn enabled_names(&self) -> Vec<String> {
        self.read()
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.name.clone())
            .collect()
    }

    /// Resolve `names` to agents under one read lock. Fails on the first unknown name.
    pub fn snapshot(&self, names: &[String]) -> Result<Vec<(String, Arc<dyn Agent>)>, RegistryError> {
        let entries = self.read();
        names
            .iter()
            .map(|name| {
                entries
                    .iter()
                    .find(|e| &e.name == name)
                    .map(|e| (e.name.clone(), Arc::clone(&e.agent)))
                    .ok_or_else(|| RegistryError::NotFound(name.clone()))
            })
            .collect()
    }

    /// Snapshot of every enabled agent, in insertion order.
    pub fn snapshot_enabled(&self) -> Vec<(String, Arc<dyn Agent>)> {
        self.read()
            .iter()
            .filter(|e| e.enabled)
            .map(|e| (e.name.clone(), Arc::clone(&e.agent)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
