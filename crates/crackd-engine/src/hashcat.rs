//! Hashcat subprocess adapter.
//!
//! Spawns hashcat in machine-readable status mode, drains its stdout into
//! a watch channel, and maps pause/resume/terminate onto process signals.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::watch;
use tracing::{debug, warn};

use crackd_core::{CrackdError, HashMode, Result};

use crate::{potfile, AttackSpec, CrackEngine, EngineHandle, EngineState, EngineStatus, JobSpec};

// Machine-readable STATUS codes.
const STATUS_RUNNING: u32 = 3;
const STATUS_PAUSED: u32 = 4;
const STATUS_EXHAUSTED: u32 = 5;
const STATUS_CRACKED: u32 = 6;

const DEFAULT_STATUS_TIMER_SECS: u64 = 10;
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Factory for hashcat-backed jobs.
pub struct HashcatEngine {
    binary: PathBuf,
    potfile_dir: PathBuf,
    status_timer_secs: u64,
    grace_period: Duration,
}

impl HashcatEngine {
    /// Creates an engine using the given hashcat binary and a directory
    /// for per-session potfiles.
    pub fn new(binary: impl Into<PathBuf>, potfile_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            potfile_dir: potfile_dir.into(),
            status_timer_secs: DEFAULT_STATUS_TIMER_SECS,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Sets the interval at which hashcat emits status lines.
    pub fn with_status_timer(mut self, secs: u64) -> Self {
        self.status_timer_secs = secs;
        self
    }

    /// Sets how long `terminate` waits after SIGTERM before SIGKILL.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }
}

#[async_trait]
impl CrackEngine for HashcatEngine {
    async fn version(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                CrackdError::engine(format!("failed to run {}: {}", self.binary.display(), e))
            })?;
        if !output.status.success() {
            return Err(CrackdError::engine(format!(
                "{} --version exited with {}",
                self.binary.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn hash_modes(&self) -> Result<Vec<HashMode>> {
        let output = Command::new(&self.binary)
            .arg("--help")
            .output()
            .await
            .map_err(|e| {
                CrackdError::engine(format!("failed to run {}: {}", self.binary.display(), e))
            })?;
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(parse_hash_mode_table(&text))
    }

    async fn spawn(&self, spec: JobSpec) -> Result<Box<dyn EngineHandle>> {
        tokio::fs::create_dir_all(&self.potfile_dir).await?;
        let potfile = self.potfile_dir.join(format!("{}.pot", spec.session_name));

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--session")
            .arg(&spec.session_name)
            .arg("-m")
            .arg(spec.hash_mode_id.to_string())
            .arg("--potfile-path")
            .arg(&potfile)
            .arg("--machine-readable")
            .arg("--status")
            .arg("--status-timer")
            .arg(self.status_timer_secs.to_string())
            .arg("--quiet");
        if spec.username_included {
            cmd.arg("--username");
        }
        match &spec.attack {
            AttackSpec::Dictionary { wordlist, rule } => {
                cmd.arg("-a")
                    .arg("0")
                    .arg(&spec.hash_file)
                    .arg(wordlist)
                    .arg("-r")
                    .arg(rule);
            }
            AttackSpec::Mask { mask } => {
                cmd.arg("-a").arg("3").arg(&spec.hash_file).arg(mask);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            CrackdError::engine(format!("failed to spawn {}: {}", self.binary.display(), e))
        })?;
        let pid = child
            .id()
            .ok_or_else(|| CrackdError::engine("engine exited during startup"))?
            as i32;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CrackdError::engine("engine stdout was not captured"))?;

        let (tx, rx) = watch::channel(ParsedStatus::default());
        tokio::spawn(drain_status(stdout, tx, spec.session_name.clone()));

        debug!(session = %spec.session_name, pid, "spawned hashcat");
        Ok(Box::new(HashcatHandle {
            child,
            pid,
            potfile,
            status: rx,
            suspended: false,
            exit: None,
            grace_period: self.grace_period,
        }))
    }
}

/// A live hashcat process for one session.
struct HashcatHandle {
    child: Child,
    pid: i32,
    potfile: PathBuf,
    status: watch::Receiver<ParsedStatus>,
    suspended: bool,
    exit: Option<std::process::ExitStatus>,
    grace_period: Duration,
}

impl HashcatHandle {
    fn refresh_exit(&mut self) -> Result<()> {
        if self.exit.is_none() {
            if let Some(status) = self
                .child
                .try_wait()
                .map_err(|e| CrackdError::engine(format!("wait failed: {}", e)))?
            {
                self.exit = Some(status);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EngineHandle for HashcatHandle {
    async fn pause(&mut self) -> Result<()> {
        if self.suspended {
            return Ok(());
        }
        signal(self.pid, libc::SIGSTOP)
            .map_err(|e| CrackdError::engine(format!("failed to suspend pid {}: {}", self.pid, e)))?;
        self.suspended = true;
        Ok(())
    }

    async fn resume(&mut self) -> Result<()> {
        if !self.suspended {
            return Ok(());
        }
        signal(self.pid, libc::SIGCONT)
            .map_err(|e| CrackdError::engine(format!("failed to continue pid {}: {}", self.pid, e)))?;
        self.suspended = false;
        Ok(())
    }

    async fn terminate(&mut self) -> Result<()> {
        self.refresh_exit()?;
        if self.exit.is_some() {
            return Ok(());
        }
        // A stopped process cannot act on SIGTERM.
        if self.suspended {
            let _ = signal(self.pid, libc::SIGCONT);
            self.suspended = false;
        }
        if let Err(err) = signal(self.pid, libc::SIGTERM) {
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(CrackdError::engine(format!(
                    "failed to terminate pid {}: {}",
                    self.pid, err
                )));
            }
        }
        match tokio::time::timeout(self.grace_period, self.child.wait()).await {
            Ok(status) => {
                self.exit = Some(status.map_err(|e| {
                    CrackdError::engine(format!("wait failed after SIGTERM: {}", e))
                })?);
            }
            Err(_) => {
                warn!(pid = self.pid, "engine ignored SIGTERM, forcing kill");
                self.child
                    .kill()
                    .await
                    .map_err(|e| CrackdError::engine(format!("SIGKILL failed: {}", e)))?;
                self.exit = self.child.try_wait().ok().flatten();
            }
        }
        Ok(())
    }

    async fn read_status(&mut self) -> Result<EngineStatus> {
        self.refresh_exit()?;
        let parsed = self.status.borrow().clone();

        let state = if let Some(exit) = self.exit {
            match parsed.code {
                Some(STATUS_EXHAUSTED) | Some(STATUS_CRACKED) => EngineState::Finished,
                _ if exit.success() => EngineState::Finished,
                _ => EngineState::Exited,
            }
        } else if self.suspended || parsed.code == Some(STATUS_PAUSED) {
            EngineState::Suspended
        } else {
            EngineState::Running
        };

        let progress = if parsed.progress_total > 0 {
            parsed.progress_cur as f64 * 100.0 / parsed.progress_total as f64
        } else {
            0.0
        };

        let eta = remaining_secs(&parsed).map(format_duration);

        Ok(EngineStatus {
            state,
            progress,
            speed: format!("{} H/s", parsed.speed_hps),
            recovered: parsed.recovered,
            eta,
        })
    }

    async fn read_new_potfile_lines(&mut self, from_cursor: u64) -> Result<(Vec<String>, u64)> {
        potfile::read_from(&self.potfile, from_cursor).await
    }
}

/// Status fields extracted from one machine-readable line.
#[derive(Debug, Clone, Default, PartialEq)]
struct ParsedStatus {
    code: Option<u32>,
    speed_hps: u64,
    progress_cur: u64,
    progress_total: u64,
    recovered: u64,
}

async fn drain_status(stdout: ChildStdout, tx: watch::Sender<ParsedStatus>, session: String) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(parsed) = parse_status_line(&line) {
            let _ = tx.send(parsed);
        } else {
            debug!(session = %session, line = %line, "non-status engine output");
        }
    }
}

/// Parses one `STATUS ... SPEED ... PROGRESS ... RECHASH ...` line.
///
/// The format is keyword-introduced groups of numbers; unknown keywords
/// are skipped so the parser survives format additions across hashcat
/// versions.
fn parse_status_line(line: &str) -> Option<ParsedStatus> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut parsed = ParsedStatus::default();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "STATUS" => {
                parsed.code = tokens.get(i + 1).and_then(|t| t.parse().ok());
                i += 2;
            }
            "SPEED" => {
                // Pairs of (count, milliseconds), one per device.
                i += 1;
                let mut hps = 0.0f64;
                while i + 1 < tokens.len() {
                    let (Ok(count), Ok(ms)) =
                        (tokens[i].parse::<f64>(), tokens[i + 1].parse::<f64>())
                    else {
                        break;
                    };
                    if ms > 0.0 {
                        hps += count * 1000.0 / ms;
                    }
                    i += 2;
                }
                parsed.speed_hps = hps as u64;
            }
            "PROGRESS" => {
                parsed.progress_cur = tokens
                    .get(i + 1)
                    .and_then(|t| t.parse().ok())
                    .unwrap_or_default();
                parsed.progress_total = tokens
                    .get(i + 2)
                    .and_then(|t| t.parse().ok())
                    .unwrap_or_default();
                i += 3;
            }
            "RECHASH" => {
                parsed.recovered = tokens
                    .get(i + 1)
                    .and_then(|t| t.parse().ok())
                    .unwrap_or_default();
                i += 3;
            }
            _ => i += 1,
        }
    }
    parsed.code.map(|_| parsed)
}

fn remaining_secs(parsed: &ParsedStatus) -> Option<u64> {
    if parsed.speed_hps == 0 || parsed.progress_total == 0 {
        return None;
    }
    let remaining = parsed.progress_total.saturating_sub(parsed.progress_cur);
    Some(remaining / parsed.speed_hps)
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parses the hash-mode table out of `hashcat --help` output.
fn parse_hash_mode_table(help: &str) -> Vec<HashMode> {
    let mut modes = Vec::new();
    for line in help.lines() {
        let mut parts = line.split('|');
        let (Some(id_part), Some(name_part)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(id) = id_part.trim().parse::<u32>() else {
            continue;
        };
        let name = name_part.trim();
        if !name.is_empty() {
            modes.push(HashMode {
                id,
                name: name.to_string(),
            });
        }
    }
    modes
}

fn signal(pid: i32, sig: libc::c_int) -> std::io::Result<()> {
    // SAFETY: plain kill(2) call on a pid we spawned.
    let rc = unsafe { libc::kill(pid, sig) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_machine_readable_status_line() {
        let line = "STATUS\t3\tSPEED\t1000\t500\t2000\t1000\tEXEC_RUNTIME\t0.25\tCURKU\t0\tPROGRESS\t250\t1000\tRECHASH\t2\t8\tRECSALT\t0\t1";
        let parsed = parse_status_line(line).unwrap();
        assert_eq!(parsed.code, Some(3));
        // 1000/500ms + 2000/1000ms = 2000 + 2000 H/s
        assert_eq!(parsed.speed_hps, 4000);
        assert_eq!(parsed.progress_cur, 250);
        assert_eq!(parsed.progress_total, 1000);
        assert_eq!(parsed.recovered, 2);
    }

    #[test]
    fn rejects_non_status_lines() {
        assert!(parse_status_line("hashcat (v6.2.6) starting").is_none());
        assert!(parse_status_line("").is_none());
    }

    #[test]
    fn eta_from_speed_and_progress() {
        let parsed = ParsedStatus {
            code: Some(STATUS_RUNNING),
            speed_hps: 100,
            progress_cur: 4000,
            progress_total: 10_000,
            recovered: 0,
        };
        assert_eq!(remaining_secs(&parsed), Some(60));
        assert_eq!(format_duration(3661), "01:01:01");

        let stalled = ParsedStatus {
            speed_hps: 0,
            ..parsed
        };
        assert_eq!(remaining_secs(&stalled), None);
    }

    #[test]
    fn parses_help_hash_mode_table() {
        let help = "\
- [ Hash modes ] -

      # | Name                     | Category
  ======+==========================+======================
      0 | MD5                      | Raw Hash
    100 | SHA1                     | Raw Hash
   1000 | NTLM                     | Operating System
";
        let modes = parse_hash_mode_table(help);
        assert_eq!(modes.len(), 3);
        assert_eq!(modes[0], HashMode { id: 0, name: "MD5".to_string() });
        assert_eq!(modes[2].id, 1000);
        assert_eq!(modes[2].name, "NTLM");
    }
}
