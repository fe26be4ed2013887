use clap::Parser;
use sandbox_shell::{AuditFormat, Console, Session, SessionConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Exit status when the session cannot determine its sandbox root.
const EXIT_NO_SANDBOX_ROOT: u8 = 2;

/// Sandbox Shell - Confined Interactive Command Session
///
/// Every filesystem and process effect is confined to $HOME, and every
/// attempted operation is written to an audit log.
#[derive(Parser)]
#[command(name = "sandbox-shell")]
#[command(version)]
#[command(about = "Interactive shell confined to the home directory", long_about = None)]
struct Cli {
    /// Enable verbose diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Audit log directory (skips the default fallback chain)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Audit record encoding
    #[arg(long, value_enum, default_value_t = AuditFormat::Text)]
    audit_format: AuditFormat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let mut config = SessionConfig::from_env().with_audit_format(cli.audit_format);
    if let Some(dir) = cli.log_dir {
        config = config.with_log_dir(dir);
    }

    match config.require_root() {
        Ok(root) if root.is_dir() => {}
        Ok(root) => {
            eprintln!("sandbox-shell: sandbox root {} is not a directory", root.display());
            return ExitCode::from(EXIT_NO_SANDBOX_ROOT);
        }
        Err(e) => {
            eprintln!("sandbox-shell: {}", e);
            return ExitCode::from(EXIT_NO_SANDBOX_ROOT);
        }
    }

    let mut session = Session::new(config, Console::stdio());
    match session.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("session aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
