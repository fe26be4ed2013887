//! The interactive session loop.
//!
//! Each input line is tokenized, an optional `> target` redirection is set
//! up, the first token is resolved against the built-in table (falling back
//! to an external program), and the redirection is torn down again before
//! the next prompt, whatever the command's outcome.

use crate::audit::{AuditLog, AuditSink, Severity};
use crate::builtins::CommandTable;
use crate::config::SessionConfig;
use crate::confirm::ConfirmationGate;
use crate::console::Console;
use crate::error::{ShellError, ShellResult};
use crate::external;
use crate::path_guard::{PathDecision, PathGuard};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Token introducing an output redirection.
pub const REDIRECT_MARKER: &str = ">";

/// Most tokens taken from one line; the rest are ignored.
pub const MAX_ARGS: usize = 63;

const DELIMITERS: &[char] = &[' ', '\t', '\r', '\n', '\x07'];

/// What the loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Output override for the duration of one command
#[derive(Debug)]
pub struct Redirect {
    pub path: PathBuf,
    writer: BufWriter<File>,
}

/// Mutable per-session state
#[derive(Debug)]
pub struct SessionState {
    pub cwd: PathBuf,
    env: BTreeMap<String, String>,
    redirect: Option<Redirect>,
}

impl SessionState {
    pub fn new(cwd: PathBuf) -> Self {
        let mut state = Self {
            cwd: PathBuf::new(),
            env: BTreeMap::new(),
            redirect: None,
        };
        state.set_cwd(cwd);
        state
    }

    /// Change the working directory, keeping the mirrored `PWD` in step.
    pub fn set_cwd(&mut self, dir: PathBuf) {
        self.env
            .insert("PWD".to_string(), dir.to_string_lossy().into_owned());
        self.cwd = dir;
    }

    /// Interpret `arg` relative to the session cwd.
    pub fn resolve(&self, arg: &str) -> PathBuf {
        let path = Path::new(arg);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Variables set on every spawned child.
    pub fn env_overrides(&self) -> impl Iterator<Item = (&String, &String)> {
        self.env.iter()
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        self.redirect.as_ref()
    }
}

/// Everything a command handler may touch
pub struct ShellContext {
    pub config: SessionConfig,
    pub guard: PathGuard,
    pub audit: AuditLog,
    pub gate: ConfirmationGate,
    pub console: Console,
    pub state: SessionState,
}

impl ShellContext {
    /// Current output target: the redirect file if one is live, else the console.
    pub fn out(&mut self) -> &mut dyn Write {
        match self.state.redirect.as_mut() {
            Some(redirect) => &mut redirect.writer,
            None => &mut *self.console.out,
        }
    }

    /// Resolve `arg` against the cwd and require the guard's approval.
    pub fn require(&self, arg: &str) -> ShellResult<PathBuf> {
        let path = self.state.resolve(arg);
        match self.guard.check(&path) {
            PathDecision::Allowed => Ok(path),
            PathDecision::Denied(reason) => Err(ShellError::Denied {
                path: arg.to_string(),
                reason,
            }),
        }
    }

    /// Like [`require`](Self::require), for a path about to be created,
    /// overwritten or removed. The audit directories are off limits.
    pub fn require_writable(&self, arg: &str) -> ShellResult<PathBuf> {
        let path = self.state.resolve(arg);
        match self.guard.check_mutation(&path) {
            PathDecision::Allowed => Ok(path),
            PathDecision::Denied(reason) => Err(ShellError::Denied {
                path: arg.to_string(),
                reason,
            }),
        }
    }

    /// Ask on the console, even while output is redirected.
    pub fn confirm(&mut self, message: &str) -> bool {
        self.gate
            .confirm(&mut *self.console.input, &mut *self.console.out, message)
    }

    /// Stdout handle for a child process, bound to the redirect target if any.
    pub fn child_stdout(&mut self) -> ShellResult<Stdio> {
        match self.state.redirect.as_mut() {
            Some(redirect) => {
                redirect.writer.flush()?;
                Ok(Stdio::from(redirect.writer.get_ref().try_clone()?))
            }
            None => {
                self.console.out.flush()?;
                Ok(Stdio::inherit())
            }
        }
    }
}

/// An interactive session
pub struct Session {
    pub id: Uuid,
    ctx: ShellContext,
    commands: CommandTable,
}

impl Session {
    pub fn new(config: SessionConfig, console: Console) -> Self {
        let sink = match &config.log_dir {
            Some(dir) => AuditSink::at(dir),
            None => AuditSink::standard(),
        };
        let guard = PathGuard::new(config.sandbox_root.as_deref())
            .with_protected(sink.directories().to_vec());
        let audit = AuditLog::new(sink, &config.user, &config.origin, config.audit_format);

        let cwd = std::env::current_dir()
            .ok()
            .filter(|dir| guard.check(dir).is_allowed())
            .or_else(|| guard.root().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("/"));

        Self {
            id: Uuid::new_v4(),
            ctx: ShellContext {
                config,
                guard,
                audit,
                gate: ConfirmationGate::new(),
                console,
                state: SessionState::new(cwd),
            },
            commands: CommandTable::standard(),
        }
    }

    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    pub fn context(&self) -> &ShellContext {
        &self.ctx
    }

    /// Read and execute lines until `exit` or end of input.
    pub fn run(&mut self) -> ShellResult<()> {
        let span = info_span!("session", id = %self.id);
        let _enter = span.enter();

        let root = self
            .ctx
            .guard
            .root()
            .map(|r| r.display().to_string())
            .unwrap_or_else(|| "<undefined>".to_string());
        info!("session started, sandbox root {}", root);
        self.ctx
            .audit
            .record("session", &format!("session started, sandbox root {}", root), Severity::Info);

        loop {
            self.prompt()?;
            let Some(line) = self.ctx.console.read_line()? else {
                writeln!(self.ctx.console.out)?;
                self.ctx.console.out.flush()?;
                break;
            };
            if self.execute_line(&line) == Flow::Exit {
                break;
            }
        }

        info!("session ended");
        self.ctx
            .audit
            .record("session", "session ended", Severity::Info);
        Ok(())
    }

    fn prompt(&mut self) -> ShellResult<()> {
        let out = &mut self.ctx.console.out;
        write!(out, "[{}]> ", self.ctx.state.cwd.display())?;
        out.flush()?;
        Ok(())
    }

    /// Run one command line. Errors are reported and audited here.
    pub fn execute_line(&mut self, line: &str) -> Flow {
        let mut tokens = tokenize(line);
        let Some(command) = tokens.first().cloned() else {
            return Flow::Continue;
        };

        let result = self
            .setup_redirect(&mut tokens)
            .and_then(|()| self.dispatch(&tokens));
        self.teardown_redirect();

        match result {
            Ok(flow) => flow,
            Err(e) => {
                self.report(&command, &e);
                Flow::Continue
            }
        }
    }

    fn setup_redirect(&mut self, tokens: &mut Vec<String>) -> ShellResult<()> {
        let Some(pos) = tokens.iter().position(|t| t == REDIRECT_MARKER) else {
            return Ok(());
        };
        if pos == 0 {
            return Err(ShellError::Usage(
                "syntax error: missing command before '>'".to_string(),
            ));
        }
        let target = tokens.get(pos + 1).cloned().ok_or_else(|| {
            ShellError::Usage("syntax error: expected file after '>'".to_string())
        })?;
        if tokens[pos + 2..].iter().any(|t| t == REDIRECT_MARKER) {
            return Err(ShellError::Usage(
                "syntax error: only one redirection per command".to_string(),
            ));
        }

        let path = self.ctx.require_writable(&target)?;
        let file = File::create(&path).map_err(ShellError::io(format!("> {}", target)))?;
        tokens.drain(pos..=pos + 1);

        debug!("redirecting output to {}", path.display());
        self.ctx.state.redirect = Some(Redirect {
            path,
            writer: BufWriter::new(file),
        });
        Ok(())
    }

    fn teardown_redirect(&mut self) {
        if let Some(mut redirect) = self.ctx.state.redirect.take() {
            if let Err(e) = redirect.writer.flush() {
                warn!("flushing {} failed: {}", redirect.path.display(), e);
                let _ = writeln!(
                    self.ctx.console.err,
                    "> {}: {}",
                    redirect.path.display(),
                    e
                );
            }
            debug!("output restored to console");
        }
    }

    fn dispatch(&mut self, tokens: &[String]) -> ShellResult<Flow> {
        let Some((name, args)) = tokens.split_first() else {
            return Ok(Flow::Continue);
        };
        match self.commands.get(name) {
            Some(builtin) => builtin.run(&mut self.ctx, args),
            None => external::run(&mut self.ctx, name, args).map(|()| Flow::Continue),
        }
    }

    fn report(&mut self, command: &str, err: &ShellError) {
        let _ = writeln!(self.ctx.console.err, "{}: {}", command, err);
        let _ = self.ctx.console.err.flush();
        if let Some(severity) = err.severity() {
            self.ctx.audit.record(command, &err.to_string(), severity);
        }
    }
}

/// Split a line on whitespace, keeping at most `MAX_ARGS` tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(DELIMITERS)
        .filter(|t| !t.is_empty())
        .take(MAX_ARGS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_all_delimiters() {
        assert_eq!(
            tokenize("  cp\ta.txt \x07 b.txt\r\n"),
            vec!["cp", "a.txt", "b.txt"]
        );
        assert!(tokenize(" \t\n").is_empty());
    }

    #[test]
    fn tokenize_caps_argument_count() {
        let line = vec!["x"; MAX_ARGS + 10].join(" ");
        assert_eq!(tokenize(&line).len(), MAX_ARGS);
    }

    #[test]
    fn resolve_joins_relative_paths_to_cwd() {
        let state = SessionState::new(PathBuf::from("/home/u/docs"));
        assert_eq!(state.resolve("a.txt"), PathBuf::from("/home/u/docs/a.txt"));
        assert_eq!(state.resolve("/etc/passwd"), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn set_cwd_mirrors_pwd() {
        let mut state = SessionState::new(PathBuf::from("/home/u"));
        state.set_cwd(PathBuf::from("/home/u/src"));
        let pwd: Vec<_> = state.env_overrides().collect();
        assert_eq!(pwd, vec![(&"PWD".to_string(), &"/home/u/src".to_string())]);
    }
}
