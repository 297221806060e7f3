//! # mirror-core
//!
//! Mirrors a local directory tree onto an FTP/FTPS server:
//!   • Connection settings from `FTP_*` environment variables
//!   • Lazy, ignore-aware walk of the local tree
//!   • `RemoteStore` seam with an FTP implementation on top of `mirror-ftp`
//!   • Sequential upload with per-file progress logging
//!   • Session controller sequencing connect, list, upload and close

pub mod mirror;
