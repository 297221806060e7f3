//! Data-channel management for FTP transfers.
//!
//! Supports two passive modes (RFC 959 + RFC 2428):
//! - **EPSV**: extended passive, tried first
//! - **PASV**: classic passive, used when EPSV is rejected
//!
//! The data socket is TLS-wrapped for FTPS (PROT P). The handshake runs
//! concurrently with reading the preliminary reply, since most servers
//! only start TLS on the data socket after they have accepted the command.
//! A rejection reply abandons the handshake.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::protocol::FtpCodec;
use crate::ftp::tls;
use crate::ftp::types::{DataChannelMode, FtpResponse};
use lazy_static::lazy_static;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

lazy_static! {
    static ref PASV_RE: Regex =
        Regex::new(r"(\d+),(\d+),(\d+),(\d+),(\d+),(\d+)").expect("valid PASV regex");
    static ref EPSV_RE: Regex = Regex::new(r"\([^\d()]{3}(\d+)[^\d()]\)").expect("valid EPSV regex");
}

/// Abstraction over a plain or TLS-wrapped data stream.
pub enum DataStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl DataStream {
    /// Borrow the underlying stream as a writer.
    pub fn writer(&mut self) -> &mut (dyn AsyncWrite + Unpin + Send) {
        match self {
            Self::Plain(tcp) => tcp,
            Self::Tls(tls) => &mut **tls,
        }
    }

    /// Borrow the underlying stream as a reader.
    pub fn reader(&mut self) -> &mut (dyn AsyncRead + Unpin + Send) {
        match self {
            Self::Plain(tcp) => tcp,
            Self::Tls(tls) => &mut **tls,
        }
    }
}

/// TLS parameters for wrapping data sockets.
pub struct DataTls<'a> {
    pub host: &'a str,
    pub config: Arc<rustls::ClientConfig>,
}

/// Negotiate a passive data connection and connect to it.
///
/// `mode` is downgraded to `Passive` for the rest of the session when the
/// server rejects EPSV.
pub async fn open_data_socket(
    codec: &mut FtpCodec,
    mode: &mut DataChannelMode,
    control_peer: IpAddr,
) -> FtpResult<TcpStream> {
    let data_timeout = codec.timeout;

    if *mode == DataChannelMode::ExtendedPassive {
        let resp = codec.execute("EPSV").await?;
        if resp.code == 229 {
            let port = parse_epsv_response(&resp.text())?;
            return connect_data(SocketAddr::new(control_peer, port), data_timeout, "EPSV").await;
        }
        if resp.code == 421 {
            return Err(FtpError::from_reply(resp.code, &resp.text()));
        }
        log::debug!("EPSV rejected ({}), falling back to PASV", resp.code);
        *mode = DataChannelMode::Passive;
    }

    let resp = codec.expect_ok("PASV").await?;
    let advertised = parse_pasv_response(&resp.text())?;
    let addr = resolve_pasv_addr(advertised, control_peer);
    if addr != advertised {
        log::debug!(
            "PASV advertised {}, using control peer {} instead",
            advertised,
            addr
        );
    }
    connect_data(addr, data_timeout, "PASV").await
}

async fn connect_data(addr: SocketAddr, data_timeout: Duration, via: &str) -> FtpResult<TcpStream> {
    let tcp = timeout(data_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| FtpError::data_channel(format!("{} data connect timed out", via)))?
        .map_err(|e| FtpError::data_channel(format!("{} data connect to {}: {}", via, addr, e)))?;
    tcp.set_nodelay(true).ok();
    Ok(tcp)
}

/// Send a data command (LIST, MLSD, STOR …) over an already-connected data
/// socket and return the ready stream plus the server's first reply.
///
/// When the first reply is a 2xx the server has already finished and no
/// further completion reply will follow.
pub async fn start_data_command(
    codec: &mut FtpCodec,
    tcp: TcpStream,
    cmd: &str,
    tls: Option<DataTls<'_>>,
) -> FtpResult<(DataStream, FtpResponse)> {
    codec.send_command(cmd).await?;

    match tls {
        None => {
            let resp = codec.read_response().await?;
            check_preliminary(&resp)?;
            Ok((DataStream::Plain(tcp), resp))
        }
        Some(DataTls { host, config }) => {
            let handshake_timeout = codec.timeout;
            let handshake = async {
                timeout(handshake_timeout, tls::wrap_data_stream(tcp, host, config))
                    .await
                    .map_err(|_| FtpError::timeout("Data channel TLS handshake timed out"))?
            };
            tokio::pin!(handshake);

            // A rejected command explains a failed handshake better than the
            // handshake does, and the server may never answer the ClientHello.
            let (resp, stream) = tokio::select! {
                resp = codec.read_response() => {
                    let resp = resp?;
                    check_preliminary(&resp)?;
                    (resp, handshake.await)
                }
                stream = &mut handshake => {
                    let resp = codec.read_response().await?;
                    check_preliminary(&resp)?;
                    (resp, stream)
                }
            };
            Ok((DataStream::Tls(Box::new(stream?)), resp))
        }
    }
}

fn check_preliminary(resp: &FtpResponse) -> FtpResult<()> {
    if resp.is_preliminary() || resp.is_completion() {
        Ok(())
    } else {
        Err(FtpError::from_reply(resp.code, &resp.text()))
    }
}

// ─── PASV ────────────────────────────────────────────────────────────

/// Parse `h1,h2,h3,h4,p1,p2` from a 227 response.
///
/// Response format: `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
pub fn parse_pasv_response(text: &str) -> FtpResult<SocketAddr> {
    let caps = PASV_RE
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse PASV: {}", text)))?;

    let nums: Vec<u8> = (1..=6)
        .map(|i| {
            caps[i]
                .parse::<u8>()
                .map_err(|_| FtpError::protocol_error("PASV number out of range"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + (nums[5] as u16);
    Ok(SocketAddr::new(ip, port))
}

/// Servers behind NAT often advertise their internal address. Use the
/// control connection's peer instead whenever the advertised address is
/// unroutable from where we stand.
pub fn resolve_pasv_addr(advertised: SocketAddr, control_peer: IpAddr) -> SocketAddr {
    let adv_ip = advertised.ip();
    if adv_ip.is_unspecified() {
        return SocketAddr::new(control_peer, advertised.port());
    }
    if is_internal(adv_ip) && !is_internal(control_peer) {
        return SocketAddr::new(control_peer, advertised.port());
    }
    advertised
}

fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

// ─── EPSV ────────────────────────────────────────────────────────────

/// Parse the port from a 229 response.
///
/// Response format: `229 Entering Extended Passive Mode (|||port|)`
pub fn parse_epsv_response(text: &str) -> FtpResult<u16> {
    let caps = EPSV_RE
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse EPSV: {}", text)))?;
    caps[1]
        .parse::<u16>()
        .map_err(|_| FtpError::protocol_error("EPSV port out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn pasv_reply_is_parsed() {
        let addr = parse_pasv_response("227 Entering Passive Mode (192,168,1,20,195,80)").unwrap();
        assert_eq!(addr, "192.168.1.20:50000".parse().unwrap());
    }

    #[test]
    fn pasv_reply_without_parentheses() {
        let addr = parse_pasv_response("227 Entering Passive Mode 10,0,0,1,4,1").unwrap();
        assert_eq!(addr.port(), 1025);
    }

    #[test]
    fn pasv_reply_out_of_range() {
        assert!(parse_pasv_response("227 (300,1,1,1,1,1)").is_err());
        assert!(parse_pasv_response("227 nothing here").is_err());
    }

    #[test]
    fn epsv_reply_is_parsed() {
        assert_eq!(
            parse_epsv_response("229 Entering Extended Passive Mode (|||6446|)").unwrap(),
            6446
        );
        // Any delimiter is allowed by RFC 2428.
        assert_eq!(parse_epsv_response("229 ok (!!!21000!)").unwrap(), 21000);
        assert!(parse_epsv_response("229 ok (|||99999|)").is_err());
    }

    #[test]
    fn private_pasv_address_is_replaced_for_public_peer() {
        let adv: SocketAddr = "10.0.0.5:40000".parse().unwrap();
        let peer = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
        assert_eq!(resolve_pasv_addr(adv, peer), "203.0.113.7:40000".parse().unwrap());
    }

    #[test]
    fn private_pasv_address_is_kept_for_private_peer() {
        let adv: SocketAddr = "10.0.0.5:40000".parse().unwrap();
        let peer = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(resolve_pasv_addr(adv, peer), adv);
    }

    #[test]
    fn unspecified_pasv_address_uses_peer() {
        let adv: SocketAddr = "0.0.0.0:40000".parse().unwrap();
        let peer = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(resolve_pasv_addr(adv, peer), "127.0.0.1:40000".parse().unwrap());
    }

    #[tokio::test]
    async fn rejected_tls_data_command_abandons_the_handshake() {
        let control = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let data = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let control_addr = control.local_addr().unwrap();
        let data_addr = data.local_addr().unwrap();

        // Rejects the command but keeps the data socket open without
        // answering the ClientHello.
        tokio::spawn(async move {
            let (mut ctrl, _) = control.accept().await.unwrap();
            let (_data, _) = data.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = ctrl.read(&mut buf).await.unwrap();
            ctrl.write_all(b"553 Could not create file\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let ctrl = TcpStream::connect(control_addr).await.unwrap();
        let mut codec = FtpCodec::from_tcp(ctrl, Duration::from_secs(30));
        let tcp = TcpStream::connect(data_addr).await.unwrap();
        let config = tls::build_tls_config(true).unwrap();

        let result = timeout(
            Duration::from_secs(5),
            start_data_command(
                &mut codec,
                tcp,
                "STOR a.txt",
                Some(DataTls {
                    host: "127.0.0.1",
                    config,
                }),
            ),
        )
        .await
        .expect("rejection returned before the handshake timeout");

        let err = result.err().unwrap();
        assert_eq!(err.code, Some(553));
    }
}
