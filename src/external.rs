//! External program execution.
//!
//! Arguments that name a location outside the cwd subtree (absolute paths
//! and `../` traversals) are checked before anything is spawned; a denial
//! is treated as an escape attempt. So is an absolute program path that is
//! neither inside the sandbox root nor in a `PATH` directory. Arguments
//! landing in the audit directories are refused outright.

use crate::audit::Severity;
use crate::error::{ShellError, ShellResult};
use crate::path_guard::PathDecision;
use crate::session::ShellContext;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Whether an argument must pass the guard before a child may see it.
pub fn is_path_like(arg: &str) -> bool {
    Path::new(arg).is_absolute() || is_traversal(arg)
}

fn is_traversal(arg: &str) -> bool {
    arg == ".." || arg.starts_with("../")
}

/// Check every path-like argument, and the program itself when it is
/// given as a parent-relative path or an absolute path off `PATH`.
pub fn screen(ctx: &ShellContext, program: &str, args: &[String]) -> ShellResult<()> {
    let screened_program = (is_traversal(program)
        || (Path::new(program).is_absolute() && !on_search_path(Path::new(program))))
    .then_some(program);
    let candidates = screened_program
        .into_iter()
        .chain(args.iter().map(String::as_str).filter(|a| is_path_like(a)));

    for arg in candidates {
        if let PathDecision::Denied(reason) = ctx.guard.check(&ctx.state.resolve(arg)) {
            return Err(ShellError::EscapeAttempt {
                path: arg.to_string(),
                reason,
            });
        }
    }

    if let Some(arg) = args
        .iter()
        .find(|a| ctx.guard.is_protected(&ctx.state.resolve(a)))
    {
        return Err(ShellError::Denied {
            path: arg.to_string(),
            reason: "audit log directory is protected".to_string(),
        });
    }
    Ok(())
}

/// Whether `program` sits directly in one of the `PATH` directories.
fn on_search_path(program: &Path) -> bool {
    let Some(dir) = program.parent().and_then(|p| p.canonicalize().ok()) else {
        return false;
    };
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths)
                .filter_map(|p: PathBuf| p.canonicalize().ok())
                .any(|p| p == dir)
        })
        .unwrap_or(false)
}

/// Screen, spawn and wait for `program`, auditing the outcome.
pub fn run(ctx: &mut ShellContext, program: &str, args: &[String]) -> ShellResult<()> {
    screen(ctx, program, args)?;

    let stdout = ctx.child_stdout()?;
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(&ctx.state.cwd)
        .envs(ctx.state.env_overrides())
        .stdin(Stdio::inherit())
        .stdout(stdout)
        .stderr(Stdio::inherit());

    let command_line = describe_command(program, args);
    debug!("spawning: {}", command_line);

    let status = match cmd.status() {
        Ok(status) => status,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ShellError::CommandNotFound(program.to_string()));
        }
        Err(e) => return Err(ShellError::Io(format!("spawn {}", program), e)),
    };

    if status.success() {
        ctx.audit
            .record(program, &format!("executed: {}", command_line), Severity::Info);
        Ok(())
    } else {
        Err(ShellError::ExitStatus {
            program: command_line,
            status: describe_status(status),
        })
    }
}

fn describe_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Exit code, or the terminating signal on unix.
pub fn describe_status(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exited with status {}", code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {}", signal);
        }
    }
    "terminated abnormally".to_string()
}
