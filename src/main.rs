use clap::Parser;
use portwarden::cli::{self, Cli};
use portwarden::{logging, output};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        output::print_error(&format!("failed to initialize logging: {e}"));
        return ExitCode::FAILURE;
    }

    match cli::execute(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
