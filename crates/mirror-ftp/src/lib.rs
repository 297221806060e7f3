//! # mirror-ftp
//!
//! Async FTP/FTPS client used by the mirror:
//!   • Control connection over plain TCP or explicit TLS (AUTH TLS)
//!   • Login, FEAT probing, PWD/CWD, TYPE
//!   • EPSV/PASV data channels, TLS-wrapped when the session is secure
//!   • MLSD / LIST listing with Unix, Windows and fact-line parsing
//!   • Recursive MKD and progress-tracked STOR uploads

pub mod ftp;
