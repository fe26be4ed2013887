use crate::error::{ShellError, ShellResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Actor recorded when no user name is available.
pub const UNKNOWN_USER: &str = "unknown";

/// Origin recorded for sessions without a remote-connection indicator.
pub const LOCAL_ORIGIN: &str = "LOCAL/CONSOLE";

/// On-disk encoding of audit records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum AuditFormat {
    /// Bracketed, human-readable text line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Everything a session needs from its environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sandbox root. `None` makes every containment check fail.
    pub sandbox_root: Option<PathBuf>,
    pub user: String,
    pub origin: String,
    /// Overrides the audit directory fallback chain when set.
    pub log_dir: Option<PathBuf>,
    pub audit_format: AuditFormat,
    /// Program and arguments run by the `shutdown` built-in.
    pub shutdown_command: Vec<String>,
}

impl SessionConfig {
    pub fn new(sandbox_root: Option<PathBuf>) -> Self {
        Self {
            sandbox_root,
            user: UNKNOWN_USER.to_string(),
            origin: LOCAL_ORIGIN.to_string(),
            log_dir: None,
            audit_format: AuditFormat::Text,
            shutdown_command: vec!["shutdown".into(), "-h".into(), "now".into()],
        }
    }

    /// Build from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(non_empty("HOME").map(PathBuf::from));
        if let Some(user) = non_empty("USER").or_else(|| non_empty("LOGNAME")) {
            config.user = user;
        }
        config.origin = origin_from(
            non_empty("SSH_CLIENT")
                .or_else(|| non_empty("SSH_CONNECTION"))
                .as_deref(),
        );
        config
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    pub fn with_audit_format(mut self, format: AuditFormat) -> Self {
        self.audit_format = format;
        self
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    pub fn with_shutdown_command(mut self, argv: Vec<String>) -> Self {
        self.shutdown_command = argv;
        self
    }

    /// Startup check: a session must not run without a sandbox root.
    pub fn require_root(&self) -> ShellResult<&PathBuf> {
        self.sandbox_root.as_ref().ok_or(ShellError::MissingHome)
    }
}

/// Client address from a remote-connection indicator such as `SSH_CLIENT`
/// (`"<addr> <port> <port>"`), or the local marker.
pub fn origin_from(indicator: Option<&str>) -> String {
    indicator
        .and_then(|value| value.split_whitespace().next())
        .map(str::to_string)
        .unwrap_or_else(|| LOCAL_ORIGIN.to_string())
}
