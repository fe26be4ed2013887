use crate::audit::Severity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("{0}")]
    Usage(String),

    #[error("Permission denied: {path}: {reason}")]
    Denied { path: String, reason: String },

    #[error("Sandbox escape blocked: {path}: {reason}")]
    EscapeAttempt { path: String, reason: String },

    #[error("Operation cancelled: {0}")]
    Declined(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("{program} {status}")]
    ExitStatus { program: String, status: String },

    #[error("HOME is not set; refusing to start without a sandbox root")]
    MissingHome,

    #[error("{0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl ShellError {
    /// Wraps an I/O failure with the operation and path it concerned.
    pub fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> ShellError {
        let context = context.into();
        move |source| ShellError::Io(context, source)
    }

    /// Audit severity for this error, or `None` when it is not a security event.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            ShellError::Usage(_) => None,
            ShellError::Declined(_) => Some(Severity::Info),
            ShellError::Denied { .. } => Some(Severity::Warning),
            ShellError::EscapeAttempt { .. } => Some(Severity::Critical),
            ShellError::CommandNotFound(_)
            | ShellError::ExitStatus { .. }
            | ShellError::MissingHome
            | ShellError::Io(..)
            | ShellError::IoError(_)
            | ShellError::SerdeError(_) => Some(Severity::Error),
        }
    }
}

pub type ShellResult<T> = Result<T, ShellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors_by_taxonomy() {
        assert_eq!(ShellError::Usage("cp: missing operand".into()).severity(), None);
        assert_eq!(
            ShellError::Declined("rm a".into()).severity(),
            Some(Severity::Info)
        );
        let denied = ShellError::Denied {
            path: "/etc".into(),
            reason: "outside sandbox root".into(),
        };
        assert_eq!(denied.severity(), Some(Severity::Warning));
        let escape = ShellError::EscapeAttempt {
            path: "../../etc".into(),
            reason: "outside sandbox root".into(),
        };
        assert_eq!(escape.severity(), Some(Severity::Critical));
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ShellError::io("cat x")(io).severity(), Some(Severity::Error));
    }

    #[test]
    fn io_errors_keep_the_system_description() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access refused");
        let err = ShellError::io("mkdir /home/u/x")(io);
        assert_eq!(err.to_string(), "mkdir /home/u/x: access refused");
    }
}
