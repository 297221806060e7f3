//! Sequential upload of transfer tasks.

use crate::mirror::error::{MirrorError, MirrorResult};
use crate::mirror::remote::RemoteStore;
use crate::mirror::walker::{remote_parent, TransferTask};
use mirror_ftp::ftp::TransferProgress;
use std::collections::HashSet;

/// What a completed run transferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub files_uploaded: u64,
    pub bytes_uploaded: u64,
    pub directories_ensured: u64,
}

/// Upload every task in order, creating remote parents as needed.
///
/// Stops at the first failure. Files uploaded before it stay on the server
/// and later tasks are never started.
pub async fn upload_all<S, I>(store: &mut S, tasks: I) -> MirrorResult<UploadSummary>
where
    S: RemoteStore + ?Sized,
    I: IntoIterator<Item = MirrorResult<TransferTask>>,
{
    let mut summary = UploadSummary::default();
    let mut ensured: HashSet<String> = HashSet::new();

    for task in tasks {
        let task = task.map_err(|e| {
            log::error!("Error reading local files: {}", e);
            e
        })?;

        let size = tokio::fs::metadata(&task.local_path)
            .await
            .map_err(|e| {
                let err = MirrorError::walk(task.local_path.display().to_string(), e.to_string());
                log::error!("Error reading file size: {}", err);
                err
            })?
            .len();

        if let Some(parent) = remote_parent(&task.remote_path) {
            if !ensured.contains(parent) {
                store.ensure_directory(parent).await.map_err(|e| {
                    log::error!("Error creating remote directory {}: {}", parent, e);
                    e
                })?;
                ensured.insert(parent.to_string());
                summary.directories_ensured += 1;
            }
        }

        log::info!(
            "Uploading file from {} to {} ({})",
            task.local_path.display(),
            task.remote_path,
            format_size(size)
        );
        let mut progress = ProgressLogger::new(&task.remote_path);
        let sent = store
            .upload_file(&task.local_path, &task.remote_path, &mut |p| progress.record(p))
            .await
            .map_err(|e| {
                log::error!("Error uploading file {}: {}", task.local_path.display(), e);
                e
            })?;
        progress.finish(sent, size);
        log::info!("File upload successful: {}", task.remote_path);

        summary.files_uploaded += 1;
        summary.bytes_uploaded += sent;
    }

    Ok(summary)
}

/// Logs progress at info level each time the whole percentage moves, and
/// every event at debug level.
struct ProgressLogger<'a> {
    remote_path: &'a str,
    last_logged: Option<u64>,
}

impl<'a> ProgressLogger<'a> {
    fn new(remote_path: &'a str) -> Self {
        Self {
            remote_path,
            last_logged: None,
        }
    }

    fn record(&mut self, p: TransferProgress) {
        let percent = p.percent();
        log::debug!(
            "{}: {} / {} bytes ({:.2}%)",
            self.remote_path,
            p.transferred_bytes,
            p.total_bytes,
            percent
        );
        let whole = percent.floor() as u64;
        if self.last_logged.map_or(true, |last| whole > last) {
            self.last_logged = Some(whole);
            log::info!("Progress {}: {:.2}%", self.remote_path, percent);
        }
    }

    /// Guarantee a closing line at the final percentage.
    fn finish(&mut self, sent: u64, total: u64) {
        let final_percent = TransferProgress::new(sent, total).percent();
        if self.last_logged != Some(final_percent.floor() as u64) {
            log::info!("Progress {}: {:.2}%", self.remote_path, final_percent);
        }
    }
}

fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}
