//! Session controller: connect, list, upload, close.

use crate::mirror::config::{ConnectionConfig, MirrorOptions};
use crate::mirror::error::{MirrorError, MirrorResult};
use crate::mirror::orchestrator::{upload_all, UploadSummary};
use crate::mirror::remote::{RemoteConnector, RemoteStore};
use crate::mirror::walker::walk;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Listing,
    Uploading,
    Closed,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Listing => "listing",
            Self::Uploading => "uploading",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Drives one mirror run. Not reusable: a controller runs at most once.
pub struct SessionController<C: RemoteConnector> {
    connector: C,
    state: SessionState,
}

impl<C: RemoteConnector> SessionController<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("Session state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run the whole sequence. On failure the error is logged, the session
    /// is closed if it was opened, and the error is returned.
    pub async fn run(
        &mut self,
        config: &ConnectionConfig,
        options: &MirrorOptions,
    ) -> MirrorResult<UploadSummary> {
        if self.state != SessionState::Idle {
            return Err(MirrorError::config(format!(
                "Session controller already used (state: {})",
                self.state
            )));
        }

        self.transition(SessionState::Connecting);
        let mut store = match self.connector.connect(config).await {
            Ok(store) => store,
            Err(e) => {
                log::error!("Error connecting to FTP server: {}", e);
                self.transition(SessionState::Failed);
                return Err(e);
            }
        };
        self.transition(SessionState::Connected);

        let result = self.mirror(&mut store, options).await;

        match result {
            Ok(summary) => {
                store.close().await.map_err(|e| {
                    log::error!("Error closing FTP connection: {}", e);
                    self.transition(SessionState::Failed);
                    e
                })?;
                self.transition(SessionState::Closed);
                log::info!("FTP connection closed.");
                Ok(summary)
            }
            Err(e) => {
                log::error!("Error in FTP operations: {}", e);
                if let Err(close_err) = store.close().await {
                    log::warn!("Closing after failure also failed: {}", close_err);
                }
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn mirror(
        &mut self,
        store: &mut C::Store,
        options: &MirrorOptions,
    ) -> MirrorResult<UploadSummary> {
        self.transition(SessionState::Listing);
        log::info!("Fetching directory listing...");
        let entries = store.list().await.map_err(|e| {
            log::error!("Error fetching directory listing: {}", e);
            e
        })?;
        log::info!("Directory listing fetched successfully ({} entries):", entries.len());
        for entry in &entries {
            log::info!("  {:<9} {:>12}  {}", entry.kind, entry.size, entry.name);
        }

        self.transition(SessionState::Uploading);
        log::info!(
            "Mirroring {} to {}",
            options.local_root.display(),
            options.remote_root
        );
        let summary = upload_all(store, walk(options)).await?;
        log::info!(
            "Uploaded {} file(s), {} bytes, {} remote director(ies) ensured",
            summary.files_uploaded,
            summary.bytes_uploaded,
            summary.directories_ensured
        );
        Ok(summary)
    }
}
