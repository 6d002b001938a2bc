//! Molde CLI — declarative AWS Batch stack synthesis.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "molde",
    version,
    about = "Declarative AWS Batch stack synthesis — typed resource graph, CloudFormation output"
)]
struct Cli {
    #[command(subcommand)]
    command: molde::cli::Commands,
}

fn main() {
    // No logs shown by default, only human-friendly messages.
    // Enable synthesis tracing with RUST_LOG=debug.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();

    let cli = Cli::parse();
    if let Err(e) = molde::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
