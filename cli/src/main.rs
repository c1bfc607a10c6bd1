use std::io::IsTerminal;

use clap::Parser;
use pkauth_cli::Cli;
use tracing_subscriber::EnvFilter;

/// Exit code for errors that keep a command from producing an answer.
const EXIT_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let code = match pkauth_cli::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("pkauth: {err:#}");
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}
