//! Cracking Engine Adapter.
//!
//! Wraps the external cracking process behind a capability interface with
//! explicit lifecycle variants, so the session manager composes with it
//! through transitions instead of scattering process-signal calls. The
//! real implementation ([`HashcatEngine`]) drives a hashcat subprocess;
//! [`ScriptedEngine`] is a deterministic double for tests.

use std::path::PathBuf;

use async_trait::async_trait;

use crackd_core::{HashMode, Result};

pub mod hashcat;
pub mod potfile;
pub mod scripted;

pub use hashcat::HashcatEngine;
pub use scripted::{ScriptedEngine, ScriptedJob};

/// Where the engine process stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    /// Suspended via `pause`; accumulated progress is preserved.
    Suspended,
    /// The engine completed naturally (keyspace exhausted or every hash
    /// cracked).
    Finished,
    /// The process is gone without completing (aborted, killed, crashed).
    Exited,
}

/// A point-in-time status snapshot of a running job.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub state: EngineState,
    /// Keyspace progress in percent.
    pub progress: f64,
    pub speed: String,
    /// Engine-side recovered-hash counter.
    pub recovered: u64,
    /// Estimated completion time, when the keyspace is known.
    pub eta: Option<String>,
}

/// Attack parameters of one job, with resource names already resolved to
/// paths on the node.
#[derive(Debug, Clone)]
pub enum AttackSpec {
    Dictionary { wordlist: PathBuf, rule: PathBuf },
    Mask { mask: PathBuf },
}

/// Everything the engine needs to start cracking one hash file.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub session_name: String,
    pub hash_file: PathBuf,
    pub hash_mode_id: u32,
    pub attack: AttackSpec,
    pub username_included: bool,
}

/// The engine itself: version/catalogue probes plus job spawning.
#[async_trait]
pub trait CrackEngine: Send + Sync {
    async fn version(&self) -> Result<String>;

    async fn hash_modes(&self) -> Result<Vec<HashMode>>;

    /// Starts the engine process for one job. The returned handle owns the
    /// process for its whole lifetime.
    async fn spawn(&self, spec: JobSpec) -> Result<Box<dyn EngineHandle>>;
}

/// A live (or recently live) engine process for one session.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Suspends the process without losing accumulated progress.
    async fn pause(&mut self) -> Result<()>;

    /// Continues a suspended process.
    async fn resume(&mut self) -> Result<()>;

    /// Terminates the process. Must guarantee the process is gone on
    /// return, falling back to a forced kill after a bounded grace period
    /// if the engine is unresponsive.
    async fn terminate(&mut self) -> Result<()>;

    async fn read_status(&mut self) -> Result<EngineStatus>;

    /// Returns the potfile lines past `from_cursor` together with the new
    /// cursor. The cursor is monotonically non-decreasing.
    async fn read_new_potfile_lines(&mut self, from_cursor: u64) -> Result<(Vec<String>, u64)>;
}
