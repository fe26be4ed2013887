//! Built-in commands, looked up by name.

mod control;
mod fs;
mod text;

use crate::error::{ShellError, ShellResult};
use crate::session::{Flow, ShellContext};
use std::collections::BTreeMap;

pub use control::{Exit, Help, Shutdown};
pub use fs::{Cd, Cp, Ls, Mkdir, Pwd, Rm};
pub use text::{Cat, Echo, Grep};

/// A command handled inside the session
pub trait Builtin {
    fn name(&self) -> &'static str;

    /// One-line usage, e.g. `cp <source> <destination>`.
    fn usage(&self) -> &'static str;

    fn run(&self, ctx: &mut ShellContext, args: &[String]) -> ShellResult<Flow>;
}

/// Name to handler table
#[derive(Default)]
pub struct CommandTable {
    commands: BTreeMap<&'static str, Box<dyn Builtin>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard built-in set, plus `help` describing it.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register(Box::new(Ls));
        table.register(Box::new(Cd));
        table.register(Box::new(Mkdir));
        table.register(Box::new(Rm));
        table.register(Box::new(Cp));
        table.register(Box::new(Cat));
        table.register(Box::new(Echo));
        table.register(Box::new(Grep));
        table.register(Box::new(Pwd));
        table.register(Box::new(Exit));
        table.register(Box::new(Shutdown));

        let mut lines = table.usages();
        lines.push(Help::USAGE.to_string());
        lines.sort();
        table.register(Box::new(Help::new(lines)));
        table
    }

    /// Add or replace a handler.
    pub fn register(&mut self, builtin: Box<dyn Builtin>) {
        self.commands.insert(builtin.name(), builtin);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Builtin> {
        self.commands.get(name).map(|b| b.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    pub fn usages(&self) -> Vec<String> {
        self.commands.values().map(|b| b.usage().to_string()).collect()
    }
}

/// The `index`th argument, or a usage error.
pub(crate) fn arg<'a>(args: &'a [String], index: usize, usage: &str) -> ShellResult<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| ShellError::Usage(format!("missing operand; usage: {}", usage)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_has_every_builtin() {
        let table = CommandTable::standard();
        assert_eq!(
            table.names(),
            vec![
                "cat", "cd", "cp", "echo", "exit", "grep", "help", "ls", "mkdir", "pwd", "rm",
                "shutdown"
            ]
        );
        assert!(table.get("vim").is_none());
    }

    #[test]
    fn missing_operand_is_a_usage_error() {
        let args = vec!["a.txt".to_string()];
        assert_eq!(arg(&args, 0, "cp <source> <destination>").unwrap(), "a.txt");
        let err = arg(&args, 1, "cp <source> <destination>").unwrap_err();
        assert!(matches!(err, ShellError::Usage(_)));
        assert_eq!(err.severity(), None);
    }
}
