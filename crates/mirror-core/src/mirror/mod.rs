//! # Mirror
//!
//! - `error`: mirror error kinds
//! - `config`: connection settings and run options
//! - `walker`: lazy local tree traversal producing transfer tasks
//! - `remote`: `RemoteStore` / `RemoteConnector` traits and the FTP adapter
//! - `orchestrator`: sequential upload of transfer tasks
//! - `controller`: connect, list, upload, close state machine

pub mod error;
pub mod config;
pub mod walker;
pub mod remote;
pub mod orchestrator;
pub mod controller;

pub use config::{ConnectionConfig, IgnoreSet, MirrorOptions, SymlinkPolicy};
pub use controller::{SessionController, SessionState};
pub use error::{MirrorError, MirrorErrorKind, MirrorResult};
pub use orchestrator::{upload_all, UploadSummary};
pub use remote::{DirectoryEntry, EntryKind, FtpConnector, FtpRemote, RemoteConnector, RemoteStore};
pub use walker::{walk, TransferTask};

pub use mirror_ftp::ftp::TransferProgress;
