//! Command-line arguments.

use clap::Parser;
use mirror_core::mirror::{FtpConnector, IgnoreSet, MirrorOptions, SymlinkPolicy};
use std::path::PathBuf;

/// Mirror a local directory tree to an FTP/FTPS server.
///
/// Connection settings come from FTP_HOST, FTP_USER, FTP_PASSWORD, FTP_PORT
/// and FTP_SECURE, optionally seeded from a `.env` file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Local directory to upload
    #[arg(env = "FTP_LOCAL_ROOT", default_value = ".")]
    pub local_root: PathBuf,

    /// Remote directory to mirror into (relative paths start at the login directory)
    #[arg(long, env = "FTP_REMOTE_ROOT", default_value = ".")]
    pub remote_root: String,

    /// Folder name to skip, repeatable (default: .git, node_modules)
    #[arg(
        long = "ignore",
        value_name = "NAME",
        env = "FTP_IGNORE",
        value_delimiter = ',',
        action = clap::ArgAction::Append
    )]
    pub ignore: Vec<String>,

    /// Upload the targets of symbolic links instead of skipping them
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Validate the server certificate in FTPS mode
    #[arg(long)]
    pub verify_certs: bool,

    /// Network inactivity timeout in seconds
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = default_timeout(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Log file, appended to
    #[arg(long, value_name = "PATH", env = "FTP_LOG_FILE", default_value = "server.log")]
    pub log_file: PathBuf,
}

fn default_timeout() -> u64 {
    FtpConnector::default().timeout_sec
}

impl Cli {
    pub fn mirror_options(&self) -> MirrorOptions {
        let names: Vec<&str> = self
            .ignore
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        let ignore = if names.is_empty() {
            IgnoreSet::default()
        } else {
            IgnoreSet::from_names(names)
        };

        MirrorOptions {
            local_root: self.local_root.clone(),
            remote_root: self.remote_root.clone(),
            ignore,
            symlinks: if self.follow_symlinks {
                SymlinkPolicy::Follow
            } else {
                SymlinkPolicy::Skip
            },
        }
    }

    pub fn connector(&self) -> FtpConnector {
        FtpConnector {
            verify_certs: self.verify_certs,
            timeout_sec: self.timeout,
        }
    }
}
