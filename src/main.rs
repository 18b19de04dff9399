//! cnspec-lint CLI entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use cnspec_lint::cli::{Cli, CommandDispatcher};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN
///
/// Logs go to stderr; stdout is reserved for reports.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("cnspec_lint=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cnspec_lint=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("cnspec-lint starting with args: {:?}", cli);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match (CommandDispatcher::new().dispatch(&cli, &mut out), out.flush()) {
        (Ok(result), Ok(())) => Ok(result),
        (Ok(_), Err(e)) => Err(anyhow::Error::new(e).context("Failed to write report to stdout")),
        (Err(e), flushed) => {
            if let Err(flush_err) = flushed {
                tracing::warn!("Failed to flush stdout: {}", flush_err);
            }
            Err(anyhow::Error::new(e))
        }
    };

    match result {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
