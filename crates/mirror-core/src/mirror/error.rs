//! Mirror error type.

use mirror_ftp::ftp::FtpError;
use std::fmt;

/// Error raised by one of the mirror stages.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorError {
    pub kind: MirrorErrorKind,
    pub message: String,
    /// Local or remote path the failing operation was working on.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorErrorKind {
    /// Network, TLS negotiation or authentication failure while opening a session.
    ConnectionError,
    /// The remote directory listing could not be retrieved.
    ListError,
    /// A remote directory could not be created or entered.
    DirectoryCreateError,
    /// A file transfer failed or was interrupted.
    UploadError,
    /// The local tree could not be read.
    WalkError,
    /// Invalid option or environment input.
    ConfigError,
}

pub type MirrorResult<T> = Result<T, MirrorError>;

impl MirrorError {
    pub fn new(kind: MirrorErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(MirrorErrorKind::ConnectionError, msg)
    }

    pub fn list(msg: impl Into<String>) -> Self {
        Self::new(MirrorErrorKind::ListError, msg)
    }

    pub fn upload(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(MirrorErrorKind::UploadError, msg).with_path(path)
    }

    pub fn walk(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(MirrorErrorKind::WalkError, msg).with_path(path)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(MirrorErrorKind::ConfigError, msg)
    }

    /// Wrap an FTP failure under the kind of the operation that hit it.
    /// A lost or stalled connection is always a `ConnectionError`.
    pub fn from_ftp(kind: MirrorErrorKind, err: FtpError) -> Self {
        let kind = if err.is_connection_loss() {
            MirrorErrorKind::ConnectionError
        } else {
            kind
        };
        Self::new(kind, err.to_string())
    }
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{:?} at '{}': {}", self.kind, path, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for MirrorError {}
