use super::{arg, Builtin};
use crate::audit::Severity;
use crate::error::{ShellError, ShellResult};
use crate::path_guard::PathDecision;
use crate::session::{Flow, ShellContext};
use std::fs;
use std::io;
use std::path::Path;

pub struct Ls;

impl Builtin for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn usage(&self) -> &'static str {
        "ls [path]"
    }

    fn run(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<Flow> {
        let target = args.first().map(String::as_str).unwrap_or(".");
        let path = ctx.require(target)?;
        let context = format!("ls {}", target);

        let metadata = fs::metadata(&path).map_err(ShellError::io(&context))?;
        let mut entries = if metadata.is_dir() {
            fs::read_dir(&path)
                .map_err(ShellError::io(&context))?
                .filter_map(|entry| entry.ok())
                .map(|entry| {
                    let mut name = entry.file_name().to_string_lossy().into_owned();
                    if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                        name.push('/');
                    }
                    name
                })
                .collect::<Vec<_>>()
        } else {
            vec![target.to_string()]
        };
        entries.sort();

        let out = ctx.out();
        for entry in &entries {
            writeln!(out, "{}", entry)?;
        }

        ctx.audit.record(
            "ls",
            &format!("listed {} ({} entries)", path.display(), entries.len()),
            Severity::Info,
        );
        Ok(Flow::Continue)
    }
}

pub struct Cd;

impl Builtin for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn usage(&self) -> &'static str {
        "cd [directory]"
    }

    fn run(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<Flow> {
        let (target, path) = match args.first() {
            Some(target) => (target.as_str(), ctx.require(target)?),
            None => {
                let root = ctx.guard.root().ok_or_else(|| ShellError::Denied {
                    path: "~".to_string(),
                    reason: "sandbox root undefined".to_string(),
                })?;
                ("~", root.to_path_buf())
            }
        };
        let context = format!("cd {}", target);

        let dir = path.canonicalize().map_err(ShellError::io(&context))?;
        if !dir.is_dir() {
            return Err(ShellError::Io(
                context,
                io::Error::new(io::ErrorKind::InvalidInput, "Not a directory"),
            ));
        }

        ctx.audit.record(
            "cd",
            &format!("{} -> {}", ctx.state.cwd.display(), dir.display()),
            Severity::Info,
        );
        ctx.state.set_cwd(dir);
        Ok(Flow::Continue)
    }
}

pub struct Mkdir;

impl Builtin for Mkdir {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    fn usage(&self) -> &'static str {
        "mkdir <directory>"
    }

    fn run(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<Flow> {
        let target = arg(args, 0, self.usage())?;
        let path = ctx.require_writable(target)?;

        fs::create_dir(&path).map_err(ShellError::io(format!("mkdir {}", target)))?;

        ctx.audit
            .record("mkdir", &format!("created {}", path.display()), Severity::Info);
        Ok(Flow::Continue)
    }
}

pub struct Rm;

impl Builtin for Rm {
    fn name(&self) -> &'static str {
        "rm"
    }

    fn usage(&self) -> &'static str {
        "rm <path>"
    }

    fn run(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<Flow> {
        let target = arg(args, 0, self.usage())?;
        let path = ctx.require_writable(target)?;
        let context = format!("rm {}", target);

        if is_root(ctx, &path) {
            return Err(ShellError::Denied {
                path: target.to_string(),
                reason: "refusing to remove the sandbox root".to_string(),
            });
        }
        let metadata = fs::symlink_metadata(&path).map_err(ShellError::io(&context))?;

        if !ctx.confirm(&format!("Remove '{}'?", target)) {
            return Err(ShellError::Declined(context));
        }

        if metadata.is_dir() {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        }
        .map_err(ShellError::io(&context))?;

        ctx.audit
            .record("rm", &format!("removed {}", path.display()), Severity::Info);
        Ok(Flow::Continue)
    }
}

fn is_root(ctx: &ShellContext, path: &Path) -> bool {
    match (ctx.guard.root(), path.canonicalize()) {
        (Some(root), Ok(canonical)) => canonical == root,
        _ => false,
    }
}

pub struct Cp;

impl Builtin for Cp {
    fn name(&self) -> &'static str {
        "cp"
    }

    fn usage(&self) -> &'static str {
        "cp <source> <destination>"
    }

    fn run(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<Flow> {
        let source_arg = arg(args, 0, self.usage())?;
        let dest_arg = arg(args, 1, self.usage())?;
        let source = ctx.require(source_arg)?;
        let mut dest = ctx.require_writable(dest_arg)?;
        let context = format!("cp {} {}", source_arg, dest_arg);

        let metadata = fs::metadata(&source).map_err(ShellError::io(&context))?;
        if !metadata.is_file() {
            return Err(ShellError::Usage(format!("'{}' is not a regular file", source_arg)));
        }

        if dest.is_dir() {
            if let Some(name) = source.file_name() {
                dest = dest.join(name);
                if let PathDecision::Denied(reason) = ctx.guard.check_mutation(&dest) {
                    return Err(ShellError::Denied {
                        path: dest.display().to_string(),
                        reason,
                    });
                }
            }
        }

        if dest.exists() {
            if same_file(&source, &dest) {
                return Err(ShellError::Usage(format!(
                    "'{}' and '{}' are the same file",
                    source_arg, dest_arg
                )));
            }
            if !ctx.confirm(&format!("Overwrite '{}'?", dest.display())) {
                return Err(ShellError::Declined(context));
            }
        }

        let bytes = fs::copy(&source, &dest).map_err(ShellError::io(&context))?;

        ctx.audit.record(
            "cp",
            &format!("copied {} -> {} ({} bytes)", source.display(), dest.display(), bytes),
            Severity::Info,
        );
        Ok(Flow::Continue)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub struct Pwd;

impl Builtin for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn usage(&self) -> &'static str {
        "pwd"
    }

    fn run(&self, ctx: &mut ShellContext, _args: &[String]) -> ShellResult<Flow> {
        let cwd = ctx.state.cwd.display().to_string();
        writeln!(ctx.out(), "{}", cwd)?;
        ctx.audit.record("pwd", &cwd, Severity::Info);
        Ok(Flow::Continue)
    }
}
