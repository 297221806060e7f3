//! TCP transport: establishes the FTP control connection.
//!
//! Handles the plain-TCP connect, the connect timeout from
//! `FtpConnectionConfig`, and reading the welcome banner.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::protocol::FtpCodec;
use crate::ftp::types::{FtpConnectionConfig, FtpResponse};
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// A freshly opened control connection.
pub struct ControlConnection {
    pub codec: FtpCodec,
    pub banner: FtpResponse,
    /// Address of the server end of the control socket.
    pub peer_ip: IpAddr,
}

/// Establish the control connection and read the server welcome banner.
///
/// For explicit FTPS the caller must later issue AUTH TLS themselves
/// (handled in `client.rs`).
pub async fn connect(config: &FtpConnectionConfig) -> FtpResult<ControlConnection> {
    if config.port == 0 {
        return Err(FtpError::invalid_config("Port must be between 1 and 65535"));
    }

    let addr = format!("{}:{}", config.host, config.port);
    let dur = Duration::from_secs(config.connect_timeout_sec);

    let tcp = timeout(dur, TcpStream::connect(&addr))
        .await
        .map_err(|_| FtpError::timeout(format!("TCP connect to {} timed out", addr)))?
        .map_err(|e| FtpError::connection_failed(format!("TCP connect to {}: {}", addr, e)))?;

    tcp.set_nodelay(true).ok();
    let peer_ip = tcp.peer_addr()?.ip();

    let mut codec = FtpCodec::from_tcp(tcp, Duration::from_secs(config.timeout_sec));
    let banner = codec.read_response().await?;
    if banner.code != 220 {
        return Err(FtpError::from_reply(banner.code, &banner.text()));
    }

    Ok(ControlConnection {
        codec,
        banner,
        peer_ip,
    })
}
