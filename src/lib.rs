//! # ftp-mirror
//!
//! Command-line front end: parses arguments, sets up logging and runs one
//! mirror session through `mirror-core`.

pub mod cli;
pub mod logging;

use cli::Cli;
use mirror_core::mirror::{ConnectionConfig, MirrorResult, SessionController, UploadSummary};

/// Mirror using connection settings from the process environment.
pub async fn run(cli: &Cli) -> MirrorResult<UploadSummary> {
    run_with_config(&ConnectionConfig::from_env(), cli).await
}

pub async fn run_with_config(config: &ConnectionConfig, cli: &Cli) -> MirrorResult<UploadSummary> {
    let options = cli.mirror_options();
    log::debug!(
        "Ignoring folders: {}",
        options.ignore.names().collect::<Vec<_>>().join(", ")
    );
    let mut controller = SessionController::new(cli.connector());
    controller.run(config, &options).await
}
