//! tb - taskboard CLI
//!
//! Sign in, keep a list of tasks, comment on them and move them across a
//! two-column board, against local files or a hosted backend.

use clap::Parser;
use taskboard::cli::Cli;
use taskboard::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Longest `RUST_LOG` value we try to parse.
const MAX_FILTER_LEN: usize = 4096;

fn main() {
    init_tracing();

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    // Events on stdout own the stream; errors then go out as plain text.
    let events_to_stdout = cli.events.as_deref().is_some_and(|value| value.trim() == "-");
    let json = cli.json && !events_to_stdout;

    if let Err(err) = cli.run() {
        tracing::debug!(command = %command, error = %err, "command failed");
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}

/// Opt-in tracing via `RUST_LOG`, written to stderr so stdout stays
/// parseable. A missing, invalid or oversized filter means "off".
fn init_tracing() {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty() && raw.len() <= MAX_FILTER_LEN)
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
