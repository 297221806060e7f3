//! Connection settings and run options.

use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

pub const ENV_HOST: &str = "FTP_HOST";
pub const ENV_USER: &str = "FTP_USER";
pub const ENV_PASSWORD: &str = "FTP_PASSWORD";
pub const ENV_PORT: &str = "FTP_PORT";
pub const ENV_SECURE: &str = "FTP_SECURE";

/// Folder names skipped when no ignore list is configured.
pub const DEFAULT_IGNORED: &[&str] = &[".git", "node_modules"];

// ─── Connection ──────────────────────────────────────────────────────

/// Where and how to log in. Built once per run and never mutated.
#[derive(Debug)]
pub struct ConnectionConfig {
    pub host: String,
    pub user: String,
    pub password: SecretString,
    /// `None` when the variable is absent or not a usable port number.
    pub port: Option<u16>,
    /// Explicit FTPS (AUTH TLS).
    pub secure: bool,
}

impl ConnectionConfig {
    /// Build the config from a key lookup. Missing text values become empty
    /// strings; the server is left to reject them.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: lookup(ENV_HOST).unwrap_or_default(),
            user: lookup(ENV_USER).unwrap_or_default(),
            password: SecretString::new(lookup(ENV_PASSWORD).unwrap_or_default()),
            port: parse_port(lookup(ENV_PORT).as_deref()),
            secure: parse_secure(lookup(ENV_SECURE).as_deref()),
        }
    }

    /// Read the `FTP_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Ports outside 1..=65535 and anything non-numeric are treated as absent.
pub fn parse_port(raw: Option<&str>) -> Option<u16> {
    raw?.trim().parse::<u16>().ok().filter(|port| *port != 0)
}

/// Only the exact string `true` enables FTPS.
pub fn parse_secure(raw: Option<&str>) -> bool {
    raw == Some("true")
}

// ─── Ignore set ──────────────────────────────────────────────────────

/// Folder names excluded from the mirror, matched against whole path
/// components (so `node_modules_backup` is not excluded by `node_modules`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreSet {
    names: BTreeSet<String>,
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self::from_names(DEFAULT_IGNORED.iter().copied())
    }
}

impl IgnoreSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .filter(|n: &String| !n.is_empty())
                .collect(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Whether a single file or folder name is ignored.
    pub fn is_ignored_name(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|n| self.names.contains(n))
    }

    /// Whether any normal component of `path` is ignored.
    pub fn matches(&self, path: &Path) -> bool {
        path.components().any(|c| match c {
            Component::Normal(name) => self.is_ignored_name(name),
            _ => false,
        })
    }
}

// ─── Run options ─────────────────────────────────────────────────────

/// How the walker treats symbolic links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    /// Leave links out of the mirror.
    #[default]
    Skip,
    /// Upload link targets as if they were regular files and folders.
    Follow,
}

/// What to mirror and where.
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub local_root: PathBuf,
    /// Remote directory the tree is mirrored into. Relative paths are
    /// resolved by the server against the login directory.
    pub remote_root: String,
    pub ignore: IgnoreSet,
    pub symlinks: SymlinkPolicy,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("."),
            remote_root: ".".into(),
            ignore: IgnoreSet::default(),
            symlinks: SymlinkPolicy::Skip,
        }
    }
}
