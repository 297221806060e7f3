use clap::Parser;
use ftp_mirror::cli::Cli;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Existing variables win over `.env` entries.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let _guard = match ftp_mirror::logging::init(&cli.log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", cli.log_file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match dotenv {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
    }

    match ftp_mirror::run(&cli).await {
        Ok(_) => ExitCode::SUCCESS,
        // Already logged by the session controller.
        Err(_) => ExitCode::FAILURE,
    }
}
