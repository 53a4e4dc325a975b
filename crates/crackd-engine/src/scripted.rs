//! Deterministic in-memory engine for tests.
//!
//! Each spawned job advances one tick per `read_status` call and reveals
//! its scripted potfile lines proportionally to progress, so tests can
//! drive the whole create/start/update/finish lifecycle without a real
//! cracking process.

use async_trait::async_trait;

use crackd_core::{CrackdError, HashMode, Result};

use crate::{CrackEngine, EngineHandle, EngineState, EngineStatus, JobSpec};

/// Script for one spawned job.
#[derive(Debug, Clone)]
pub struct ScriptedJob {
    /// How many `read_status` calls until the job finishes.
    pub total_ticks: u32,
    /// Potfile lines (`hash:plain`) revealed as the job progresses.
    pub potfile_lines: Vec<String>,
}

impl Default for ScriptedJob {
    fn default() -> Self {
        Self {
            total_ticks: 1,
            potfile_lines: Vec::new(),
        }
    }
}

/// Engine double returning canned data and scripted job runs.
pub struct ScriptedEngine {
    version: String,
    modes: Vec<HashMode>,
    job: ScriptedJob,
}

impl ScriptedEngine {
    pub fn new(version: impl Into<String>, modes: Vec<HashMode>) -> Self {
        Self {
            version: version.into(),
            modes,
            job: ScriptedJob::default(),
        }
    }

    /// Sets the script every spawned job will follow.
    pub fn with_job(mut self, job: ScriptedJob) -> Self {
        self.job = job;
        self
    }
}

#[async_trait]
impl CrackEngine for ScriptedEngine {
    async fn version(&self) -> Result<String> {
        Ok(self.version.clone())
    }

    async fn hash_modes(&self) -> Result<Vec<HashMode>> {
        Ok(self.modes.clone())
    }

    async fn spawn(&self, spec: JobSpec) -> Result<Box<dyn EngineHandle>> {
        Ok(Box::new(ScriptedHandle {
            session: spec.session_name,
            job: self.job.clone(),
            tick: 0,
            state: EngineState::Running,
        }))
    }
}

struct ScriptedHandle {
    session: String,
    job: ScriptedJob,
    tick: u32,
    state: EngineState,
}

impl ScriptedHandle {
    fn revealed(&self) -> usize {
        let total = self.job.total_ticks.max(1);
        let done = self.tick.min(total);
        self.job.potfile_lines.len() * done as usize / total as usize
    }

    fn progress(&self) -> f64 {
        let total = self.job.total_ticks.max(1);
        self.tick.min(total) as f64 * 100.0 / total as f64
    }
}

#[async_trait]
impl EngineHandle for ScriptedHandle {
    async fn pause(&mut self) -> Result<()> {
        match self.state {
            EngineState::Exited => Err(CrackdError::engine(format!(
                "session '{}': engine process is gone",
                self.session
            ))),
            _ => {
                self.state = EngineState::Suspended;
                Ok(())
            }
        }
    }

    async fn resume(&mut self) -> Result<()> {
        match self.state {
            EngineState::Exited => Err(CrackdError::engine(format!(
                "session '{}': engine process is gone",
                self.session
            ))),
            EngineState::Suspended => {
                self.state = EngineState::Running;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn terminate(&mut self) -> Result<()> {
        self.state = EngineState::Exited;
        Ok(())
    }

    async fn read_status(&mut self) -> Result<EngineStatus> {
        if self.state == EngineState::Running {
            self.tick += 1;
            if self.tick >= self.job.total_ticks {
                self.state = EngineState::Finished;
            }
        }
        let remaining = self.job.total_ticks.saturating_sub(self.tick);
        Ok(EngineStatus {
            state: self.state,
            progress: self.progress(),
            speed: "1000 H/s".to_string(),
            recovered: self.revealed() as u64,
            eta: Some(format!("00:00:{:02}", remaining.min(59))),
        })
    }

    async fn read_new_potfile_lines(&mut self, from_cursor: u64) -> Result<(Vec<String>, u64)> {
        let available = self.revealed() as u64;
        if available <= from_cursor {
            return Ok((Vec::new(), from_cursor));
        }
        let lines = self.job.potfile_lines[from_cursor as usize..available as usize].to_vec();
        Ok((lines, available))
    }
}
