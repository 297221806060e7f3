//! Remote store seam and its FTP implementation.

use crate::mirror::config::ConnectionConfig;
use crate::mirror::error::{MirrorError, MirrorErrorKind, MirrorResult};
use async_trait::async_trait;
use mirror_ftp::ftp::{
    FtpClient, FtpConnectionConfig, FtpSecurityMode, TransferProgress, DEFAULT_TIMEOUT_SEC,
};
use std::path::Path;

pub use mirror_ftp::ftp::{FtpEntry as DirectoryEntry, FtpEntryKind as EntryKind};

/// An opened, authenticated session on the remote side.
#[async_trait]
pub trait RemoteStore: Send {
    /// List the session's current working directory.
    async fn list(&mut self) -> MirrorResult<Vec<DirectoryEntry>>;

    /// Create `remote_dir` and any missing parents. Succeeds when the
    /// directory already exists and leaves the working directory unchanged.
    async fn ensure_directory(&mut self, remote_dir: &str) -> MirrorResult<()>;

    /// Stream `local` to `remote`, calling `on_progress` after each chunk.
    async fn upload_file(
        &mut self,
        local: &Path,
        remote: &str,
        on_progress: &mut (dyn FnMut(TransferProgress) + Send),
    ) -> MirrorResult<u64>;

    /// End the session.
    async fn close(&mut self) -> MirrorResult<()>;
}

/// Opens [`RemoteStore`] sessions.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    type Store: RemoteStore;

    async fn connect(&self, config: &ConnectionConfig) -> MirrorResult<Self::Store>;
}

// ─── FTP ─────────────────────────────────────────────────────────────

/// Connects to FTP/FTPS servers.
#[derive(Debug, Clone)]
pub struct FtpConnector {
    /// Validate server certificates against the platform roots.
    pub verify_certs: bool,
    /// Inactivity timeout for every network read and write.
    pub timeout_sec: u64,
}

impl Default for FtpConnector {
    fn default() -> Self {
        Self {
            verify_certs: false,
            timeout_sec: DEFAULT_TIMEOUT_SEC,
        }
    }
}

impl FtpConnector {
    fn client_config(&self, config: &ConnectionConfig, port: u16) -> FtpConnectionConfig {
        FtpConnectionConfig {
            host: config.host.clone(),
            port,
            username: config.user.clone(),
            password: config.password().to_string(),
            security: if config.secure {
                FtpSecurityMode::Explicit
            } else {
                FtpSecurityMode::None
            },
            accept_invalid_certs: !self.verify_certs,
            timeout_sec: self.timeout_sec,
            ..FtpConnectionConfig::default()
        }
    }
}

#[async_trait]
impl RemoteConnector for FtpConnector {
    type Store = FtpRemote;

    async fn connect(&self, config: &ConnectionConfig) -> MirrorResult<FtpRemote> {
        let port = config.port.ok_or_else(|| {
            MirrorError::connection("FTP_PORT is missing or is not a valid port number")
        })?;

        log::info!("Connecting to FTP server at {}:{}...", config.host, port);
        let client = FtpClient::connect(self.client_config(config, port))
            .await
            .map_err(|e| MirrorError::from_ftp(MirrorErrorKind::ConnectionError, e))?;

        log::info!(
            "Connected to FTP server successfully ({}, home directory {})",
            if client.is_secure() { "FTPS" } else { "plain FTP" },
            client.info.home_directory
        );
        Ok(FtpRemote { client })
    }
}

/// [`RemoteStore`] backed by an [`FtpClient`] session.
pub struct FtpRemote {
    client: FtpClient,
}

#[async_trait]
impl RemoteStore for FtpRemote {
    async fn list(&mut self) -> MirrorResult<Vec<DirectoryEntry>> {
        self.client
            .list(None)
            .await
            .map_err(|e| MirrorError::from_ftp(MirrorErrorKind::ListError, e))
    }

    async fn ensure_directory(&mut self, remote_dir: &str) -> MirrorResult<()> {
        self.client.mkdir_all(remote_dir).await.map_err(|e| {
            MirrorError::from_ftp(MirrorErrorKind::DirectoryCreateError, e).with_path(remote_dir)
        })
    }

    async fn upload_file(
        &mut self,
        local: &Path,
        remote: &str,
        on_progress: &mut (dyn FnMut(TransferProgress) + Send),
    ) -> MirrorResult<u64> {
        self.client
            .upload(local, remote, on_progress)
            .await
            .map_err(|e| MirrorError::from_ftp(MirrorErrorKind::UploadError, e).with_path(remote))
    }

    async fn close(&mut self) -> MirrorResult<()> {
        self.client
            .quit()
            .await
            .map_err(|e| MirrorError::from_ftp(MirrorErrorKind::ConnectionError, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(port: Option<u16>, secure: bool) -> ConnectionConfig {
        ConnectionConfig {
            host: "ftp.example.com".into(),
            user: "deploy".into(),
            password: secrecy::SecretString::new("pw".into()),
            port,
            secure,
        }
    }

    #[test]
    fn client_config_maps_security_and_certificates() {
        let connector = FtpConnector::default();
        let cfg = connector.client_config(&config(Some(21), true), 21);
        assert_eq!(cfg.security, FtpSecurityMode::Explicit);
        assert!(cfg.accept_invalid_certs);
        assert_eq!(cfg.username, "deploy");
        assert_eq!(cfg.password, "pw");
        assert_eq!(cfg.timeout_sec, 300);

        let strict = FtpConnector {
            verify_certs: true,
            timeout_sec: 10,
        };
        let cfg = strict.client_config(&config(Some(21), false), 21);
        assert_eq!(cfg.security, FtpSecurityMode::None);
        assert!(!cfg.accept_invalid_certs);
        assert_eq!(cfg.timeout_sec, 10);
    }

    #[tokio::test]
    async fn missing_port_is_a_connection_error() {
        let err = FtpConnector::default()
            .connect(&config(None, false))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind, MirrorErrorKind::ConnectionError);
    }
}
