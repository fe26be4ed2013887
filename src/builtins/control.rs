use super::Builtin;
use crate::audit::Severity;
use crate::error::{ShellError, ShellResult};
use crate::external;
use crate::session::{Flow, ShellContext};

pub struct Exit;

impl Builtin for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn usage(&self) -> &'static str {
        "exit"
    }

    fn run(&self, ctx: &mut ShellContext, _args: &[String]) -> ShellResult<Flow> {
        ctx.audit.record("exit", "exit requested", Severity::Info);
        Ok(Flow::Exit)
    }
}

/// Powers off the host after confirmation.
pub struct Shutdown;

impl Builtin for Shutdown {
    fn name(&self) -> &'static str {
        "shutdown"
    }

    fn usage(&self) -> &'static str {
        "shutdown"
    }

    fn run(&self, ctx: &mut ShellContext, _args: &[String]) -> ShellResult<Flow> {
        let Some((program, args)) = ctx.config.shutdown_command.split_first() else {
            return Err(ShellError::Usage("no shutdown command configured".to_string()));
        };
        let (program, args) = (program.clone(), args.to_vec());

        if !ctx.confirm("Shut down the host system?") {
            return Err(ShellError::Declined("shutdown".to_string()));
        }
        ctx.audit
            .record("shutdown", "host shutdown confirmed", Severity::Info);

        external::run(ctx, &program, &args)?;
        Ok(Flow::Exit)
    }
}

pub struct Help {
    lines: Vec<String>,
}

impl Help {
    pub const USAGE: &'static str = "help";

    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }
}

impl Builtin for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn usage(&self) -> &'static str {
        Self::USAGE
    }

    fn run(&self, ctx: &mut ShellContext, _args: &[String]) -> ShellResult<Flow> {
        let out = ctx.out();
        writeln!(out, "Built-in commands:")?;
        for line in &self.lines {
            writeln!(out, "  {}", line)?;
        }
        writeln!(out, "Anything else runs as an external program. Use '> file' to redirect output.")?;

        ctx.audit.record("help", "listed built-ins", Severity::Info);
        Ok(Flow::Continue)
    }
}
