//! Eden - chat command bot with a persistent text and image tag cache.

use clap::Parser;
use std::process::ExitCode;

use eden::Commands;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging; the guard flushes the file writer on exit.
    let _guard = match eden::logging::init() {
        Ok((guard, _)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Parse command line arguments
    let args = Commands::parse();

    // Run the command
    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
