//! Sandbox Shell - Confined Interactive Command Session
//!
//! An interactive command session whose filesystem and process effects are
//! confined to one sandbox root directory, with every attempted operation
//! recorded in a severity-routed audit trail.
//!
//! # Components
//!
//! - **PathGuard**: canonical, component-wise containment checks that fail closed
//! - **AuditLog**: append-only records, INFO/WARNING and ERROR/CRITICAL in separate files
//! - **ConfirmationGate**: deny-by-default prompt before destructive operations
//! - **Session**: the command loop with `>` redirection, built-ins and external programs
//!
//! # Quick Start
//!
//! ```no_run
//! use sandbox_shell::{Console, Session, SessionConfig};
//!
//! let config = SessionConfig::from_env();
//! let mut session = Session::new(config, Console::stdio());
//! session.run()?;
//! # Ok::<(), sandbox_shell::ShellError>(())
//! ```

pub mod audit;
pub mod builtins;
pub mod config;
pub mod confirm;
pub mod console;
pub mod error;
pub mod external;
pub mod path_guard;
pub mod session;

// Re-export main types
pub use audit::{AuditLog, AuditRecord, AuditSink, Severity};
pub use builtins::{Builtin, CommandTable};
pub use config::{AuditFormat, SessionConfig};
pub use confirm::ConfirmationGate;
pub use console::Console;
pub use error::{ShellError, ShellResult};
pub use path_guard::{PathDecision, PathGuard};
pub use session::{Flow, Session, SessionState, ShellContext};
