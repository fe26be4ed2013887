//! Containment checks against the sandbox root.
//!
//! Paths are canonicalized (symlinks, `.` and `..` resolved) and compared
//! component by component, so `/home/alice-evil` is never mistaken for a
//! descendant of `/home/alice`. Any ambiguity is a denial.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of a containment check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathDecision {
    Allowed,
    Denied(String),
}

impl PathDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PathDecision::Allowed)
    }
}

impl fmt::Display for PathDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathDecision::Allowed => write!(f, "allowed"),
            PathDecision::Denied(reason) => write!(f, "denied: {}", reason),
        }
    }
}

/// Decides whether paths lie inside the sandbox root
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: Option<PathBuf>,
    protected: Vec<PathBuf>,
}

impl PathGuard {
    /// Build a guard for `root`. A root that is absent or cannot itself be
    /// canonicalized leaves the guard undefined, and every check is denied.
    pub fn new(root: Option<&Path>) -> Self {
        let root = root.and_then(|r| match r.canonicalize() {
            Ok(canonical) => Some(canonical),
            Err(e) => {
                debug!("sandbox root {} unusable: {}", r.display(), e);
                None
            }
        });
        Self {
            root,
            protected: Vec::new(),
        }
    }

    /// Directories the session may never write into, such as the audit
    /// log directories. Resolved at check time since they may not exist yet.
    pub fn with_protected(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.protected.extend(dirs);
        self
    }

    /// The canonical sandbox root, if defined.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Check `path`. Relative paths are resolved against the process cwd;
    /// callers holding a session cwd should join it first.
    pub fn check(&self, path: &Path) -> PathDecision {
        let Some(root) = self.root.as_deref() else {
            return PathDecision::Denied("sandbox root undefined".to_string());
        };

        match path.canonicalize() {
            Ok(canonical) => contained(root, &canonical),
            Err(e) if e.kind() == ErrorKind::NotFound => self.check_parent(root, path),
            Err(e) => PathDecision::Denied(format!("cannot resolve path: {}", e)),
        }
    }

    /// Check a path the caller is about to create, modify or delete:
    /// containment plus the protected directories.
    pub fn check_mutation(&self, path: &Path) -> PathDecision {
        match self.check(path) {
            PathDecision::Allowed if self.is_protected(path) => {
                PathDecision::Denied("audit log directory is protected".to_string())
            }
            decision => decision,
        }
    }

    /// Whether `path`, or the location it would be created at, lies in a
    /// protected directory. Unresolvable paths are not protected matches.
    pub fn is_protected(&self, path: &Path) -> bool {
        let Some(target) = resolve_target(path) else {
            return false;
        };
        self.protected
            .iter()
            .filter_map(|dir| dir.canonicalize().ok())
            .any(|dir| target.starts_with(dir))
    }

    /// Look-ahead for targets that do not exist yet.
    fn check_parent(&self, root: &Path, path: &Path) -> PathDecision {
        // `x/..` or `/` have no final name to create.
        if path.file_name().is_none() {
            return PathDecision::Denied("path does not exist".to_string());
        }
        // A dangling symlink would be followed on create.
        if path.symlink_metadata().is_ok() {
            return PathDecision::Denied("dangling symbolic link".to_string());
        }
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        match parent.canonicalize() {
            Ok(canonical) if canonical.is_dir() => contained(root, &canonical),
            Ok(_) => PathDecision::Denied("parent is not a directory".to_string()),
            Err(e) => PathDecision::Denied(format!("parent directory unresolved: {}", e)),
        }
    }
}

/// Canonical form of `path`, or of its parent joined with its name.
fn resolve_target(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Some(canonical);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    parent.canonicalize().ok().map(|p| p.join(name))
}

fn contained(root: &Path, canonical: &Path) -> PathDecision {
    if canonical.starts_with(root) {
        PathDecision::Allowed
    } else {
        PathDecision::Denied("outside sandbox root".to_string())
    }
}
