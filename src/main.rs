//! matrix-user-admin - list and deactivate Matrix users.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use matrix_user_admin::cli::{report_error, Cli};
use matrix_user_admin::config::Settings;
use matrix_user_admin::mas::MasCli;
use matrix_user_admin::synapse::Psql;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::resolve(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings);

    debug!("Starting {} v{}", NAME, VERSION);
    debug!(settings = ?settings, "Configuration resolved");

    let db = Psql::new(settings.database.clone(), settings.subprocess.clone());
    let locker = MasCli::new(settings.mas.clone(), settings.subprocess.clone());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command.execute(&db, &locker, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = %e, "Command failed");
            report_error(&e, &mut out, &mut io::stderr());
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging to stderr; stdout carries the command output.
fn init_logging(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(io::stderr))
                .init();
        }
    }
}
