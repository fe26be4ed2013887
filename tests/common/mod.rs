#![allow(dead_code)]

use sandbox_shell::audit::{ERROR_LOG, SESSION_LOG};
use sandbox_shell::{Console, Session, SessionConfig};
use std::cell::RefCell;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

/// In-memory output stream shared between the session and the test.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sandbox root `<tmp>/home` with siblings available as "outside" paths.
pub struct Harness {
    pub temp: TempDir,
    pub root: PathBuf,
    pub logs: PathBuf,
    pub out: SharedBuf,
    pub err: SharedBuf,
}

impl Harness {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("home")).unwrap();
        let root = temp.path().join("home").canonicalize().unwrap();
        let logs = temp.path().join("logs");
        Self {
            temp,
            root,
            logs,
            out: SharedBuf::default(),
            err: SharedBuf::default(),
        }
    }

    pub fn outside(&self) -> PathBuf {
        self.root.parent().unwrap().to_path_buf()
    }

    pub fn config(&self) -> SessionConfig {
        SessionConfig::new(Some(self.root.clone()))
            .with_log_dir(self.logs.clone())
            .with_user("tester")
            .with_shutdown_command(vec!["true".to_string()])
    }

    pub fn session_with(&self, config: SessionConfig, input: &str) -> Session {
        let console = Console::new(
            Box::new(Cursor::new(input.as_bytes().to_vec())),
            Box::new(self.out.clone()),
            Box::new(self.err.clone()),
        );
        Session::new(config, console)
    }

    /// Run a whole session over `input`.
    pub fn run(&self, input: &str) {
        self.session_with(self.config(), input).run().unwrap();
    }

    pub fn stdout(&self) -> String {
        self.out.contents()
    }

    pub fn stderr(&self) -> String {
        self.err.contents()
    }

    pub fn session_log(&self) -> String {
        fs::read_to_string(self.logs.join(SESSION_LOG)).unwrap_or_default()
    }

    pub fn error_log(&self) -> String {
        fs::read_to_string(self.logs.join(ERROR_LOG)).unwrap_or_default()
    }

    /// Audit lines for `command` at `severity`, across both files.
    pub fn records(&self, command: &str, severity: &str) -> Vec<String> {
        let tag = format!("[{}] ", severity);
        let cmd = format!("[{}] ", command);
        self.session_log()
            .lines()
            .chain(self.error_log().lines())
            .filter(|l| l.contains(&tag) && l.contains(&cmd))
            .map(str::to_string)
            .collect()
    }
}
