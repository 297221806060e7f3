//! File-level operations: progress-tracked upload (STOR).

use crate::ftp::client::FtpClient;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::types::*;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

/// Chunk size for streaming transfers (64 KiB).
pub const DEFAULT_CHUNK: usize = 65_536;

impl FtpClient {
    // ─── UPLOAD (STOR) ───────────────────────────────────────────

    /// Upload a local file to a remote path, calling `on_progress` after
    /// every chunk written to the data channel (and once for empty files).
    ///
    /// Returns the number of bytes sent. A failure part-way leaves whatever
    /// the server already stored; nothing is cleaned up.
    pub async fn upload(
        &mut self,
        local_path: &Path,
        remote_path: &str,
        on_progress: &mut (dyn FnMut(TransferProgress) + Send),
    ) -> FtpResult<u64> {
        self.set_type(TransferType::Binary).await?;

        // Open the local side first so a missing file never touches the server.
        let mut file = fs::File::open(local_path).await.map_err(|e| {
            FtpError::io_error(format!("Cannot open {}: {}", local_path.display(), e))
        })?;
        let total_bytes = file.metadata().await?.len();

        let (mut ds, first) = self
            .begin_data_command(&format!("STOR {}", remote_path))
            .await?;

        let idle = self.io_timeout();
        let mut transferred: u64 = 0;
        let mut buf = vec![0u8; DEFAULT_CHUNK];
        let writer = ds.writer();

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            timeout(idle, writer.write_all(&buf[..n]))
                .await
                .map_err(|_| FtpError::timeout(format!("Upload of {} stalled", remote_path)))??;
            transferred += n as u64;
            on_progress(TransferProgress::new(transferred, total_bytes));
        }
        if transferred == 0 {
            on_progress(TransferProgress::new(0, total_bytes));
        }

        timeout(idle, async {
            writer.flush().await?;
            writer.shutdown().await
        })
        .await
        .map_err(|_| FtpError::timeout(format!("Closing upload of {} stalled", remote_path)))??;
        drop(ds);

        self.finish_data_command(&first).await?;

        self.info.bytes_uploaded += transferred;
        self.touch();
        Ok(transferred)
    }
}
