//! Node-side session: one cracking job bound to a hash file and an attack
//! configuration, mediating all access to its engine process.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crackd_core::protocol::{SessionDetailsBody, SessionSummary};
use crackd_core::stats::{cracked_percent, CrackedStats};
use crackd_core::{
    CrackType, CrackdError, CrackedHash, Result, SessionAction, SessionStatus, TransitionOutcome,
};
use crackd_engine::{AttackSpec, CrackEngine, EngineHandle, EngineState, JobSpec};

pub struct Session {
    name: String,
    crack_type: CrackType,
    hash_mode_id: u32,
    /// Persisted hash list; written once at creation, immutable for the
    /// session's lifetime.
    hash_file: PathBuf,
    attack: AttackSpec,
    username_included: bool,

    status: SessionStatus,
    time_started: Option<DateTime<Utc>>,

    total_hashes: u64,
    /// hash -> username from the input hash list.
    lookup: HashMap<String, Option<String>>,
    /// Append-only, so `cracked()` never shrinks across calls.
    cracked: Vec<CrackedHash>,
    cracked_hashes: HashSet<String>,
    potfile_cursor: u64,

    progress: f64,
    speed: String,
    eta: Option<String>,
    recovered: u64,

    handle: Option<Box<dyn EngineHandle>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Builds a session over an already-persisted hash file.
    ///
    /// `hashes_text` is the raw hash-list text; one `hash` or
    /// `username:hash` per line depending on `username_included`. An empty
    /// hash list is rejected here so no later computation ever divides by
    /// a zero hash count.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        crack_type: CrackType,
        hash_mode_id: u32,
        hash_file: PathBuf,
        attack: AttackSpec,
        username_included: bool,
        hashes_text: &str,
    ) -> Result<Self> {
        let mut lookup = HashMap::new();
        let mut total_hashes = 0u64;
        for line in hashes_text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            total_hashes += 1;
            let (username, hash) = if username_included {
                match line.split_once(':') {
                    Some((user, hash)) => (Some(user.to_string()), hash.to_string()),
                    None => (None, line.to_string()),
                }
            } else {
                (None, line.to_string())
            };
            lookup.insert(hash, username);
        }
        if total_hashes == 0 {
            return Err(CrackdError::validation(format!(
                "session '{}': hash list is empty",
                name
            )));
        }

        Ok(Self {
            name,
            crack_type,
            hash_mode_id,
            hash_file,
            attack,
            username_included,
            status: SessionStatus::Created,
            time_started: None,
            total_hashes,
            lookup,
            cracked: Vec::new(),
            cracked_hashes: HashSet::new(),
            potfile_cursor: 0,
            progress: 0.0,
            speed: String::new(),
            eta: None,
            recovered: 0,
            handle: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn hash_file(&self) -> &Path {
        &self.hash_file
    }

    pub fn current_cracked(&self) -> u64 {
        self.cracked.len() as u64
    }

    pub fn total_hashes(&self) -> u64 {
        self.total_hashes
    }

    /// Dispatches one lifecycle action against this session.
    ///
    /// Actions whose target state is already reached succeed silently;
    /// actions that are invalid from the current state are a conflict
    /// error. On a failed side effect the status is left unchanged, so a
    /// retry sees the same state.
    pub async fn apply(&mut self, action: SessionAction, engine: &dyn CrackEngine) -> Result<()> {
        match self.status.apply(action) {
            TransitionOutcome::Invalid => Err(CrackdError::conflict(format!(
                "cannot {} session '{}' while {}",
                action, self.name, self.status
            ))),
            TransitionOutcome::Unchanged => {
                if action == SessionAction::Update {
                    self.refresh().await?;
                }
                Ok(())
            }
            TransitionOutcome::Advance(next) => {
                match action {
                    SessionAction::Start => self.start(engine).await?,
                    SessionAction::Pause => {
                        if let Some(handle) = self.handle.as_mut() {
                            handle.pause().await?;
                        }
                    }
                    SessionAction::Resume => {
                        if let Some(handle) = self.handle.as_mut() {
                            handle.resume().await?;
                        }
                    }
                    SessionAction::Quit => self.shutdown().await?,
                    SessionAction::Update => unreachable!("update never advances the status"),
                }
                info!(session = %self.name, from = %self.status, to = %next, "session transition");
                self.status = next;
                Ok(())
            }
        }
    }

    async fn start(&mut self, engine: &dyn CrackEngine) -> Result<()> {
        let spec = JobSpec {
            session_name: self.name.clone(),
            hash_file: self.hash_file.clone(),
            hash_mode_id: self.hash_mode_id,
            attack: self.attack.clone(),
            username_included: self.username_included,
        };
        self.handle = Some(engine.spawn(spec).await?);
        self.time_started = Some(Utc::now());
        Ok(())
    }

    /// Re-reads engine status and new potfile lines. No-op when no engine
    /// process is attached.
    async fn refresh(&mut self) -> Result<()> {
        let (status, lines, cursor) = {
            let Some(handle) = self.handle.as_mut() else {
                return Ok(());
            };
            let status = handle.read_status().await?;
            let (lines, cursor) = handle.read_new_potfile_lines(self.potfile_cursor).await?;
            (status, lines, cursor)
        };

        self.potfile_cursor = cursor;
        self.progress = status.progress;
        self.speed = status.speed;
        self.recovered = status.recovered;
        // An estimate only means something when the keyspace is known.
        self.eta = match self.crack_type {
            CrackType::Mask => status.eta,
            CrackType::Dictionary => None,
        };

        for line in lines {
            if let Some(record) = self.resolve_potfile_line(&line) {
                self.cracked_hashes.insert(record.hash.clone());
                self.cracked.push(record);
            }
        }

        match status.state {
            EngineState::Finished => {
                info!(session = %self.name, "engine completed");
                self.status = SessionStatus::Finished;
                self.handle = None;
            }
            EngineState::Exited => {
                warn!(session = %self.name, "engine exited without completing");
                self.status = SessionStatus::Finished;
                self.handle = None;
            }
            EngineState::Running | EngineState::Suspended => {}
        }
        Ok(())
    }

    /// Terminates the engine process if one is attached. The handle is
    /// dropped regardless, so the process cannot outlive the session.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut handle) = self.handle.take() {
            handle.terminate().await?;
        }
        Ok(())
    }

    /// Maps one potfile line (`hash:plain`) back to an input hash.
    ///
    /// The hash itself may contain colons in salted modes, and the
    /// plaintext may too, so an exact first-colon split is tried before a
    /// prefix scan over the known hashes.
    fn resolve_potfile_line(&self, line: &str) -> Option<CrackedHash> {
        if let Some((hash, password)) = line.split_once(':') {
            if let Some(username) = self.lookup.get(hash) {
                return self.record_for(hash, username.clone(), password);
            }
        }
        for (hash, username) in &self.lookup {
            if line.len() > hash.len()
                && line.as_bytes()[hash.len()] == b':'
                && line.starts_with(hash.as_str())
            {
                return self.record_for(hash, username.clone(), &line[hash.len() + 1..]);
            }
        }
        None
    }

    fn record_for(
        &self,
        hash: &str,
        username: Option<String>,
        password: &str,
    ) -> Option<CrackedHash> {
        if self.cracked_hashes.contains(hash) {
            return None;
        }
        Some(CrackedHash {
            username,
            password: password.to_string(),
            hash: hash.to_string(),
        })
    }

    /// One row of the node-info summary list.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            name: self.name.clone(),
            status: self.status,
            crack_type: self.crack_type,
            cracked: cracked_percent(self.current_cracked(), self.total_hashes),
            progress: self.progress,
        }
    }

    /// The full `sessionInfo` contract; statistics are recomputed from the
    /// cracked set on every call.
    pub fn details(&self) -> SessionDetailsBody {
        SessionDetailsBody {
            name: self.name.clone(),
            crack_type: self.crack_type,
            status: self.status,
            time_started: self.time_started.map(|t| t.to_rfc3339()),
            eta: self.eta.clone(),
            speed: self.speed.clone(),
            recovered: self.recovered,
            progress: self.progress,
            results: self.cracked.clone(),
            stats: CrackedStats::compute(&self.cracked),
        }
    }

    /// The full cracked list (never a delta).
    pub fn cracked(&self) -> Vec<CrackedHash> {
        self.cracked.clone()
    }
}
