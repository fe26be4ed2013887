//! Append-only, severity-routed audit trail.
//!
//! INFO and WARNING records go to `session.log`, ERROR and CRITICAL to
//! `error.log`. Writing is best-effort: a failure is reported as a tracing
//! diagnostic and never reaches the caller.

use crate::config::AuditFormat;
use crate::error::{ShellError, ShellResult};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File receiving INFO and WARNING records.
pub const SESSION_LOG: &str = "session.log";

/// File receiving ERROR and CRITICAL records.
pub const ERROR_LOG: &str = "error.log";

/// System-wide audit directory, tried first.
pub const SYSTEM_LOG_DIR: &str = "/var/log/sandbox-shell";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Whether records of this severity belong in the error sink.
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub actor: String,
    pub origin: String,
    pub command: String,
    pub message: String,
}

impl AuditRecord {
    /// Text form: `[timestamp] [SEVERITY] [origin] [actor] [command] message`
    pub fn to_line(&self) -> String {
        format!(
            "[{}] [{}] [{}] [{}] [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.severity,
            self.origin,
            self.actor,
            self.command,
            flatten(&self.message)
        )
    }

    pub fn encode(&self, format: AuditFormat) -> ShellResult<String> {
        match format {
            AuditFormat::Text => Ok(self.to_line()),
            AuditFormat::Json => Ok(serde_json::to_string(self)?),
        }
    }
}

/// Keeps one record per line.
fn flatten(message: &str) -> String {
    message.replace(['\n', '\r'], " ")
}

/// Where records land: an ordered list of candidate directories, the first
/// usable one wins. Resolved again on every write.
#[derive(Debug, Clone)]
pub struct AuditSink {
    candidates: Vec<PathBuf>,
}

impl AuditSink {
    /// System path, then `logs/` next to the running binary, then `./logs`.
    pub fn standard() -> Self {
        let mut candidates = vec![PathBuf::from(SYSTEM_LOG_DIR)];
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join("logs")))
        {
            candidates.push(dir);
        }
        candidates.push(PathBuf::from("logs"));
        Self { candidates }
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![dir.into()],
        }
    }

    /// Candidate directories in the order they are tried.
    pub fn directories(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Append `line` to the severity's file in the first candidate that
    /// takes it, returning the file written to.
    pub fn append(&self, severity: Severity, line: &str) -> ShellResult<PathBuf> {
        let mut last_error = None;

        for dir in &self.candidates {
            if let Err(e) = fs::create_dir_all(dir) {
                debug!("audit directory {} unusable: {}", dir.display(), e);
                last_error = Some(ShellError::Io(format!("create {}", dir.display()), e));
                continue;
            }
            let path = Self::file_for(dir, severity);
            let written = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .and_then(|mut file| writeln!(file, "{}", line));
            match written {
                Ok(()) => return Ok(path),
                Err(e) => {
                    debug!("audit file {} unusable: {}", path.display(), e);
                    last_error = Some(ShellError::Io(format!("append {}", path.display()), e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ShellError::Io(
                "audit directory".to_string(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no usable log directory"),
            )
        }))
    }

    pub fn file_for(dir: &Path, severity: Severity) -> PathBuf {
        if severity.is_error() {
            dir.join(ERROR_LOG)
        } else {
            dir.join(SESSION_LOG)
        }
    }
}

/// Records every operation attempt of a session
#[derive(Debug, Clone)]
pub struct AuditLog {
    sink: AuditSink,
    actor: String,
    origin: String,
    format: AuditFormat,
}

impl AuditLog {
    pub fn new(sink: AuditSink, actor: &str, origin: &str, format: AuditFormat) -> Self {
        Self {
            sink,
            actor: actor.to_string(),
            origin: origin.to_string(),
            format,
        }
    }

    /// Append one record. Never fails from the caller's point of view.
    pub fn record(&self, command: &str, detail: &str, severity: Severity) {
        if let Err(e) = self.try_record(command, detail, severity) {
            warn!("audit record for '{}' dropped: {}", command, e);
        }
    }

    /// Append one record, returning the file written to.
    pub fn try_record(&self, command: &str, detail: &str, severity: Severity) -> ShellResult<PathBuf> {
        let record = AuditRecord {
            timestamp: Local::now(),
            severity,
            actor: self.actor.clone(),
            origin: self.origin.clone(),
            command: command.to_string(),
            message: detail.to_string(),
        };
        let line = record.encode(self.format)?;

        self.sink.append(severity, &line)
    }

    pub fn sink(&self) -> &AuditSink {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log_in(dir: &Path, format: AuditFormat) -> AuditLog {
        AuditLog::new(AuditSink::at(dir), "alice", "LOCAL/CONSOLE", format)
    }

    fn read(path: PathBuf) -> String {
        fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn routes_records_by_severity() {
        let dir = TempDir::new().unwrap();
        let log = log_in(dir.path(), AuditFormat::Text);

        log.record("ls", "listed", Severity::Info);
        log.record("cd", "outside", Severity::Warning);
        log.record("cat", "no such file", Severity::Error);
        log.record("touch", "escape", Severity::Critical);

        let normal = read(dir.path().join(SESSION_LOG));
        let errors = read(dir.path().join(ERROR_LOG));

        assert_eq!(normal.lines().count(), 2);
        assert_eq!(errors.lines().count(), 2);
        assert!(normal.lines().all(|l| l.contains("[INFO]") || l.contains("[WARNING]")));
        assert!(errors.lines().all(|l| l.contains("[ERROR]") || l.contains("[CRITICAL]")));
    }

    #[test]
    fn text_line_carries_every_field() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(AuditSink::at(dir.path()), "bob", "10.1.2.3", AuditFormat::Text);
        log.record("rm", "removed notes.txt\nsecond line", Severity::Info);

        let content = read(dir.path().join(SESSION_LOG));
        let line = content.lines().next().unwrap();
        assert!(line.starts_with('['));
        assert!(line.ends_with("[INFO] [10.1.2.3] [bob] [rm] removed notes.txt second line"));
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn json_lines_parse_back() {
        let dir = TempDir::new().unwrap();
        let log = log_in(dir.path(), AuditFormat::Json);
        log.record("cp", "copied 3 bytes", Severity::Critical);

        let content = read(dir.path().join(ERROR_LOG));
        let record: AuditRecord = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.command, "cp");
        assert!(content.contains("\"CRITICAL\""));
    }

    #[test]
    fn creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/logs");
        let log = log_in(&nested, AuditFormat::Text);

        let written = log.try_record("pwd", "ok", Severity::Info).unwrap();
        assert_eq!(written, nested.join(SESSION_LOG));
    }

    #[test]
    fn falls_through_unusable_candidates() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let sink = AuditSink {
            candidates: vec![blocker.join("logs"), dir.path().join("fallback")],
        };
        assert_eq!(
            sink.append(Severity::Info, "line").unwrap(),
            dir.path().join("fallback").join(SESSION_LOG)
        );
    }

    #[test]
    fn unopenable_log_file_moves_to_next_directory() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir_all(first.join(SESSION_LOG)).unwrap();
        let log = AuditLog::new(
            AuditSink {
                candidates: vec![first.clone(), second.clone()],
            },
            "alice",
            "LOCAL/CONSOLE",
            AuditFormat::Text,
        );

        let written = log.try_record("pwd", "ok", Severity::Info).unwrap();
        assert_eq!(written, second.join(SESSION_LOG));
        assert!(read(second.join(SESSION_LOG)).contains("[pwd] ok"));

        // The error file in the first directory is still usable.
        let written = log.try_record("cat", "missing", Severity::Error).unwrap();
        assert_eq!(written, first.join(ERROR_LOG));
    }

    #[test]
    fn write_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let log = log_in(&blocker, AuditFormat::Text);

        assert!(log.try_record("ls", "x", Severity::Info).is_err());
        log.record("ls", "x", Severity::Info);
    }
}
