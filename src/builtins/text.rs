use super::{arg, Builtin};
use crate::audit::Severity;
use crate::error::{ShellError, ShellResult};
use crate::session::{Flow, ShellContext};
use std::fs::File;
use std::io::{self, BufRead, BufReader};

pub struct Cat;

impl Builtin for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn usage(&self) -> &'static str {
        "cat <file>"
    }

    fn run(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<Flow> {
        let target = arg(args, 0, self.usage())?;
        let path = ctx.require(target)?;
        let context = format!("cat {}", target);

        let mut file = File::open(&path).map_err(ShellError::io(&context))?;
        let bytes = io::copy(&mut file, ctx.out()).map_err(ShellError::io(&context))?;

        ctx.audit.record(
            "cat",
            &format!("read {} ({} bytes)", path.display(), bytes),
            Severity::Info,
        );
        Ok(Flow::Continue)
    }
}

/// Writes its arguments literally; pair with `>` to create files.
pub struct Echo;

impl Builtin for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn usage(&self) -> &'static str {
        "echo [text...]"
    }

    fn run(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<Flow> {
        let text = args.join(" ");
        writeln!(ctx.out(), "{}", text)?;

        let destination = match ctx.state.redirect() {
            Some(redirect) => redirect.path.display().to_string(),
            None => "console".to_string(),
        };
        ctx.audit.record(
            "echo",
            &format!("wrote {} bytes to {}", text.len() + 1, destination),
            Severity::Info,
        );
        Ok(Flow::Continue)
    }
}

/// Literal substring search, line by line.
pub struct Grep;

impl Builtin for Grep {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn usage(&self) -> &'static str {
        "grep <pattern> <file>"
    }

    fn run(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<Flow> {
        let pattern = arg(args, 0, self.usage())?;
        let target = arg(args, 1, self.usage())?;
        let path = ctx.require(target)?;
        let context = format!("grep {}", target);

        let mut reader = BufReader::new(File::open(&path).map_err(ShellError::io(&context))?);
        let mut line = Vec::new();
        let mut matches = 0usize;

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(ShellError::io(&context))?;
            if read == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\n', '\r']);
            if text.contains(pattern) {
                writeln!(ctx.out(), "{}", text)?;
                matches += 1;
            }
        }

        ctx.audit.record(
            "grep",
            &format!("'{}' in {}: {} matching lines", pattern, path.display(), matches),
            Severity::Info,
        );
        Ok(Flow::Continue)
    }
}
