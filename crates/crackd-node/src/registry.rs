//! In-memory session registry.
//!
//! An explicit, injectable object rather than process-wide state, so
//! tests can run several independent registries side by side. The outer
//! `RwLock` makes creation atomic with respect to name collisions; the
//! per-session `Mutex` serializes each session's state transitions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crackd_core::protocol::SessionSummary;
use crackd_core::{CrackdError, Result};

use crate::session::Session;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session. Duplicate names are rejected, never
    /// overwritten; the check and the insert happen under one write lock.
    pub async fn insert(&self, session: Session) -> Result<Arc<Mutex<Session>>> {
        let name = session.name().to_string();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&name) {
            return Err(CrackdError::conflict(format!(
                "session '{}' already exists",
                name
            )));
        }
        let entry = Arc::new(Mutex::new(session));
        sessions.insert(name, entry.clone());
        Ok(entry)
    }

    pub async fn get(&self, name: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| CrackdError::not_found("session", name))
    }

    /// Takes a session out of the registry. The caller owns the teardown
    /// of the engine process and hash file.
    pub async fn remove(&self, name: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .write()
            .await
            .remove(name)
            .ok_or_else(|| CrackdError::not_found("session", name))
    }

    /// Summary rows for all sessions, in name order.
    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let entries: Vec<Arc<Mutex<Session>>> = {
            let sessions = self.sessions.read().await;
            sessions.values().cloned().collect()
        };
        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            summaries.push(entry.lock().await.summary());
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }
}
