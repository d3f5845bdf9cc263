//! Autocast - find a stream for a movie and play it on a Roku
//!
//! # Usage
//!
//! ```bash
//! autocast search "Inception" --year 2010
//! autocast cast --imdb-id tt1375666 --device "Living Room TV"
//! autocast status --device "Bedroom TV" --wake --json
//! ```

use clap::Parser;
use tokio_util::sync::CancellationToken;

use autocast::cli::Cli;
use autocast::commands::run_cli;
use autocast::logging::init_tracing;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // Ctrl-C cancels a readiness wait instead of killing mid-request
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let exit_code = run_cli(cli, cancel).await;
    std::process::exit(exit_code.into());
}
