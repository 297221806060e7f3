//! Shared types for the FTP crate.

use chrono::{DateTime, Utc};
use std::fmt;

// ─── Connection / Session ────────────────────────────────────────────

/// Security mode for the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtpSecurityMode {
    /// Plain-text FTP.
    #[default]
    None,
    /// Explicit FTPS: starts plain then upgrades via AUTH TLS.
    Explicit,
}

/// Transfer type (RFC 959 TYPE command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    Ascii,
    #[default]
    Binary,
}

impl TransferType {
    pub fn command(self) -> &'static str {
        match self {
            Self::Ascii => "TYPE A",
            Self::Binary => "TYPE I",
        }
    }
}

/// Passive mode selected for the data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataChannelMode {
    Passive,
    /// EPSV; the client drops to PASV for the rest of the session if the
    /// server rejects it.
    #[default]
    ExtendedPassive,
}

/// Configuration for a single FTP connection.
#[derive(Clone)]
pub struct FtpConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub security: FtpSecurityMode,
    pub transfer_type: TransferType,
    pub data_channel_mode: DataChannelMode,
    /// TCP connect timeout in seconds.
    pub connect_timeout_sec: u64,
    /// Inactivity timeout for control replies and data-channel I/O.
    pub timeout_sec: u64,
    /// Accept self-signed / untrusted certificates.
    pub accept_invalid_certs: bool,
    /// UTF-8 encoding (OPTS UTF8 ON).
    pub utf8: bool,
}

pub const DEFAULT_CONNECT_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_TIMEOUT_SEC: u64 = 300;

impl Default for FtpConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            username: "anonymous".into(),
            password: "anonymous@".into(),
            security: FtpSecurityMode::None,
            transfer_type: TransferType::Binary,
            data_channel_mode: DataChannelMode::ExtendedPassive,
            connect_timeout_sec: DEFAULT_CONNECT_TIMEOUT_SEC,
            timeout_sec: DEFAULT_TIMEOUT_SEC,
            accept_invalid_certs: false,
            utf8: true,
        }
    }
}

impl fmt::Debug for FtpConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security", &self.security)
            .field("transfer_type", &self.transfer_type)
            .field("data_channel_mode", &self.data_channel_mode)
            .field("connect_timeout_sec", &self.connect_timeout_sec)
            .field("timeout_sec", &self.timeout_sec)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("utf8", &self.utf8)
            .finish()
    }
}

/// Information about the connected session.
#[derive(Debug, Clone)]
pub struct FtpSessionInfo {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub security: FtpSecurityMode,
    pub connected: bool,
    /// Directory the server placed us in after login.
    pub home_directory: String,
    pub current_directory: String,
    pub server_banner: Option<String>,
    pub system_type: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub bytes_uploaded: u64,
}

// ─── Directory Listing ───────────────────────────────────────────────

/// Type of a remote filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpEntryKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

impl fmt::Display for FtpEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Unknown => "unknown",
        };
        f.pad(s)
    }
}

/// One entry from a directory listing (parsed from LIST or MLSD output).
#[derive(Debug, Clone, PartialEq)]
pub struct FtpEntry {
    pub name: String,
    pub kind: FtpEntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub link_target: Option<String>,
}

// ─── Transfer ────────────────────────────────────────────────────────

/// Progress snapshot for a single upload, emitted once per chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub transferred_bytes: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    pub fn new(transferred_bytes: u64, total_bytes: u64) -> Self {
        Self {
            transferred_bytes,
            total_bytes,
        }
    }

    /// Percentage of `total_bytes` transferred, clamped to `0.0..=100.0`.
    /// An empty file reports `0.0`.
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let pct = self.transferred_bytes as f64 / self.total_bytes as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }
}

// ─── FTP Response ────────────────────────────────────────────────────

/// A single FTP response (may be multi-line).
#[derive(Debug, Clone, PartialEq)]
pub struct FtpResponse {
    pub code: u16,
    pub lines: Vec<String>,
}

impl FtpResponse {
    /// Full response text (all lines joined).
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether the response code indicates success (1xx–3xx).
    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    /// Whether this is a positive-preliminary reply (1xx).
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Whether this is a positive-completion reply (2xx).
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

// ─── Server Capabilities ─────────────────────────────────────────────

/// Parsed FEAT response.
#[derive(Debug, Clone, Default)]
pub struct ServerFeatures {
    pub mlsd: bool,
    pub size: bool,
    pub utf8: bool,
    pub epsv: bool,
    pub auth_tls: bool,
    pub raw_features: Vec<String>,
}

impl ServerFeatures {
    /// Build from the body lines of a `211-` FEAT reply.
    pub fn from_feat_lines(lines: &[String]) -> Self {
        let raw: Vec<String> = lines
            .iter()
            .skip(1)
            .filter(|l| !l.starts_with("211"))
            .map(|l| l.trim().to_uppercase())
            .collect();

        let has = |feat: &str| raw.iter().any(|l| l.starts_with(feat));

        Self {
            mlsd: has("MLSD"),
            size: has("SIZE"),
            utf8: has("UTF8"),
            epsv: has("EPSV"),
            auth_tls: has("AUTH TLS"),
            raw_features: raw,
        }
    }
}
