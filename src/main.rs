//! Herald CLI entry point

use std::process::ExitCode;

use clap::Parser;

use herald::cli::{app, Cli};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    app::run(cli).await
}
