//! Meter Load Tester - command-line entry point

use clap::Parser;
use meter_load_tester::{app::App, cli::Cli, config::EnvManager, error::AppError};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let use_color = cli.use_colors();

    if cli.env_help {
        print!("{}", EnvManager::display_env_help());
        return;
    }
    if cli.env_example {
        print!("{}", EnvManager::create_example_env_content());
        return;
    }

    if let Err(e) = App::new(cli).run().await {
        eprintln!("{}", e.format_for_console(use_color));
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Parse(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Required: --nb-children, --nb-iterations, --server-ip, --server-port, --output-directory");
            eprintln!("  - Each can also be set through LOAD_* variables or a .env file (see --env-help)");
            eprintln!("  - --connection-mode accepts REUSE_SESSION or NO_REUSE_SESSION");
        }
        AppError::Statistics(_) => {
            eprintln!();
            eprintln!("No measurement was collected:");
            eprintln!("  - Check that the server is reachable");
            eprintln!("  - Increase --harvest-timeout if workers were skipped");
        }
        AppError::Io(_) => {
            eprintln!();
            eprintln!("Check that the output directory is writable");
        }
        _ => {}
    }
}
