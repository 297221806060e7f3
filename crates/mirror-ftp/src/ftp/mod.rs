//! # mirror-ftp: FTP/FTPS client
//!
//! Implementation of the subset of the FTP protocol (RFC 959) the mirror
//! needs, with extensions:
//! - **RFC 2228 / 4217**: AUTH TLS (explicit FTPS)
//! - **RFC 3659**: MLSD, SIZE
//! - **RFC 2389**: FEAT negotiation
//! - **RFC 2428**: EPSV
//!
//! Architecture:
//! - `types`: data structures, enums, config
//! - `error`: FTP-specific error type
//! - `protocol`: low-level command/response codec
//! - `connection`: TCP transport + timeout policy
//! - `tls`: rustls client config and TLS upgrade
//! - `transfer`: data channel management (EPSV/PASV)
//! - `client`: stateful FTP client (login, PWD, CWD, TYPE, LIST)
//! - `parser`: Unix/Windows/MLSD LIST response parsing
//! - `directory`: mkdir, recursive mkdir
//! - `file_ops`: upload with progress

pub mod types;
pub mod error;
pub mod protocol;
pub mod connection;
pub mod tls;
pub mod transfer;
pub mod client;
pub mod parser;
pub mod directory;
pub mod file_ops;

pub use client::FtpClient;
pub use error::{FtpError, FtpErrorKind, FtpResult};
pub use types::*;
