//! Directory operations: recursive mkdir.

use crate::ftp::client::FtpClient;
use crate::ftp::error::{FtpError, FtpResult};

impl FtpClient {
    // ─── MKD ─────────────────────────────────────────────────────

    /// Create a directory and all missing parents (emulated, FTP has no
    /// MKDIR -p). Walks the path one segment at a time with CWD, creating
    /// segments that cannot be entered. The working directory is restored
    /// afterwards, so calling this twice is harmless.
    pub async fn mkdir_all(&mut self, path: &str) -> FtpResult<()> {
        let original = self.info.current_directory.clone();
        let result = self.mkdir_all_inner(path).await;

        // Always try to go back, but let the original failure win.
        let restore = self.cwd(&original).await;
        result?;
        restore.map(|_| ())
    }

    async fn mkdir_all_inner(&mut self, path: &str) -> FtpResult<()> {
        if path.starts_with('/') {
            self.codec.expect_ok("CWD /").await?;
        }

        for segment in path.split('/').filter(|c| !c.is_empty() && *c != ".") {
            let cwd_resp = self.codec.execute(&format!("CWD {}", segment)).await?;
            if cwd_resp.is_completion() {
                continue;
            }

            let mkd_resp = self.codec.execute(&format!("MKD {}", segment)).await?;
            let entered = self.codec.execute(&format!("CWD {}", segment)).await?;
            if !entered.is_completion() {
                // Report the MKD failure when there was one; it names the cause.
                let (code, text) = if mkd_resp.is_completion() {
                    (entered.code, entered.text())
                } else {
                    (mkd_resp.code, mkd_resp.text())
                };
                return Err(FtpError::from_reply(
                    code,
                    &format!("Cannot create '{}' in '{}': {}", segment, path, text),
                ));
            }
            log::debug!("Created remote directory segment '{}' of '{}'", segment, path);
        }

        self.touch();
        Ok(())
    }
}
