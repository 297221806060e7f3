//! Stateful FTP client: owns the control connection and issues commands.
//!
//! Lifecycle: `connect()` → optional AUTH TLS upgrade → authenticate →
//! FEAT/SYST/PWD probing → set TYPE.
//!
//! The client exposes low-level command helpers used by `directory.rs`
//! and `file_ops.rs` for higher-level operations.

use crate::ftp::connection;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::parser;
use crate::ftp::protocol::FtpCodec;
use crate::ftp::tls;
use crate::ftp::transfer::{self, DataStream, DataTls};
use crate::ftp::types::*;
use chrono::Utc;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

/// A connected FTP client session.
pub struct FtpClient {
    pub codec: FtpCodec,
    pub config: FtpConnectionConfig,
    pub info: FtpSessionInfo,
    pub features: ServerFeatures,
    tls_config: Option<Arc<rustls::ClientConfig>>,
    data_mode: DataChannelMode,
    transfer_type: TransferType,
    peer_ip: IpAddr,
}

impl FtpClient {
    /// Establish a new FTP session.
    pub async fn connect(config: FtpConnectionConfig) -> FtpResult<Self> {
        if config.host.is_empty() {
            return Err(FtpError::invalid_config("Host must not be empty"));
        }

        let connection::ControlConnection {
            mut codec,
            banner,
            peer_ip,
        } = connection::connect(&config).await?;
        let banner_text = banner.text();

        // ── Explicit FTPS: AUTH TLS ──────────────────────────────
        let mut tls_config = None;
        if config.security == FtpSecurityMode::Explicit {
            let resp = codec.execute("AUTH TLS").await?;
            if !resp.is_completion() {
                return Err(FtpError::tls_failed(format!(
                    "AUTH TLS rejected: {}",
                    resp.text()
                ))
                .with_code(resp.code));
            }
            let cfg = tls::build_tls_config(config.accept_invalid_certs)?;
            codec = tls::upgrade_to_tls(codec, &config.host, cfg.clone()).await?;
            tls_config = Some(cfg);

            // Protection level
            codec.expect_ok("PBSZ 0").await?;
            codec.expect_ok("PROT P").await?;
        }

        // ── Authenticate ─────────────────────────────────────────
        let user_resp = codec.execute(&format!("USER {}", config.username)).await?;
        match user_resp.code {
            230 => {}
            331 => {
                let pass_resp = codec
                    .execute(&format!("PASS {}", config.password))
                    .await?;
                if !pass_resp.is_completion() {
                    return Err(FtpError::auth_failed(format!(
                        "Login failed: {}",
                        pass_resp.text()
                    ))
                    .with_code(pass_resp.code));
                }
            }
            code => {
                return Err(FtpError::auth_failed(format!(
                    "USER rejected: {}",
                    user_resp.text()
                ))
                .with_code(code));
            }
        }

        // ── FEAT ─────────────────────────────────────────────────
        let features = Self::probe_features(&mut codec).await?;

        // ── OPTS UTF8 ON ─────────────────────────────────────────
        if config.utf8 && features.utf8 {
            let resp = codec.execute("OPTS UTF8 ON").await?;
            if !resp.is_success() {
                log::debug!("OPTS UTF8 ON ignored by server: {}", resp.text());
            }
        }

        // ── SYST ─────────────────────────────────────────────────
        let syst = codec.execute("SYST").await?;
        let system_type = syst
            .is_completion()
            .then(|| syst.text().trim_start_matches("215 ").to_string());

        // ── PWD ──────────────────────────────────────────────────
        let cwd = Self::get_pwd(&mut codec).await?;

        // ── TYPE ─────────────────────────────────────────────────
        codec.expect_ok(config.transfer_type.command()).await?;

        let now = Utc::now();
        let info = FtpSessionInfo {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            security: config.security,
            connected: true,
            home_directory: cwd.clone(),
            current_directory: cwd,
            server_banner: Some(banner_text),
            system_type,
            connected_at: now,
            last_activity: now,
            bytes_uploaded: 0,
        };

        Ok(Self {
            codec,
            data_mode: config.data_channel_mode,
            transfer_type: config.transfer_type,
            config,
            info,
            features,
            tls_config,
            peer_ip,
        })
    }

    // ─── PWD / CWD ──────────────────────────────────────────────

    /// Parse the current working directory from a PWD reply.
    pub async fn get_pwd(codec: &mut FtpCodec) -> FtpResult<String> {
        let resp = codec.expect_ok("PWD").await?;
        parse_pwd(&resp.text())
    }

    /// Change into `path` and update `current_directory`.
    pub async fn cwd(&mut self, path: &str) -> FtpResult<String> {
        self.codec.expect_ok(&format!("CWD {}", path)).await?;
        let new_pwd = Self::get_pwd(&mut self.codec).await?;
        self.info.current_directory = new_pwd.clone();
        self.touch();
        Ok(new_pwd)
    }

    // ─── FEAT probe ──────────────────────────────────────────────

    async fn probe_features(codec: &mut FtpCodec) -> FtpResult<ServerFeatures> {
        let resp = codec.execute("FEAT").await?;
        if !resp.is_completion() {
            return Ok(ServerFeatures::default());
        }
        Ok(ServerFeatures::from_feat_lines(&resp.lines))
    }

    // ─── TYPE command ────────────────────────────────────────────

    /// Switch transfer type, skipping the round-trip when already set.
    pub async fn set_type(&mut self, tt: TransferType) -> FtpResult<()> {
        if self.transfer_type == tt {
            return Ok(());
        }
        self.codec.expect_ok(tt.command()).await?;
        self.transfer_type = tt;
        Ok(())
    }

    // ─── Data channel helper ─────────────────────────────────────

    /// Open a passive data channel, send `cmd` on the control channel and
    /// return the (possibly TLS-wrapped) stream with the first reply.
    pub(crate) async fn begin_data_command(
        &mut self,
        cmd: &str,
    ) -> FtpResult<(DataStream, FtpResponse)> {
        let tcp: TcpStream =
            transfer::open_data_socket(&mut self.codec, &mut self.data_mode, self.peer_ip).await?;
        let tls = self.tls_config.clone().map(|config| DataTls {
            host: &self.config.host,
            config,
        });
        transfer::start_data_command(&mut self.codec, tcp, cmd, tls).await
    }

    /// Read the transfer-complete reply unless the server already sent it.
    pub(crate) async fn finish_data_command(&mut self, first: &FtpResponse) -> FtpResult<()> {
        if !first.is_preliminary() {
            return Ok(());
        }
        let done = self.codec.read_response().await?;
        if !done.is_completion() {
            return Err(FtpError::from_reply(done.code, &done.text()));
        }
        Ok(())
    }

    pub(crate) fn io_timeout(&self) -> Duration {
        self.codec.timeout
    }

    // ─── Listing ─────────────────────────────────────────────────

    /// Retrieve a directory listing (prefers MLSD, falls back to LIST).
    pub async fn list(&mut self, path: Option<&str>) -> FtpResult<Vec<FtpEntry>> {
        let verb = if self.features.mlsd { "MLSD" } else { "LIST" };
        let cmd = match path {
            Some(p) => format!("{} {}", verb, p),
            None => verb.to_string(),
        };
        let data = self.retrieve_data_as_string(&cmd).await?;
        self.touch();
        Ok(parser::parse_listing(&data))
    }

    /// Generic helper: open data channel, send command, collect body as String.
    pub async fn retrieve_data_as_string(&mut self, cmd: &str) -> FtpResult<String> {
        let (mut ds, first) = self.begin_data_command(cmd).await?;
        let data = read_data_stream_to_string(&mut ds, self.io_timeout()).await?;
        drop(ds);
        self.finish_data_command(&first).await?;
        Ok(data)
    }

    // ─── QUIT ────────────────────────────────────────────────────

    /// Gracefully close the session. The server's reply is best-effort.
    pub async fn quit(&mut self) -> FtpResult<()> {
        if !self.info.connected {
            return Ok(());
        }
        self.info.connected = false;
        if let Err(e) = self.codec.execute("QUIT").await {
            log::debug!("QUIT not acknowledged: {}", e);
        }
        Ok(())
    }

    // ─── Utility ─────────────────────────────────────────────────

    pub(crate) fn touch(&mut self) {
        self.info.last_activity = Utc::now();
    }

    pub fn is_secure(&self) -> bool {
        self.codec.is_tls()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Parse `257 "/some/path"` into the path string. Embedded quotes are
/// doubled by the server (`""`).
pub fn parse_pwd(text: &str) -> FtpResult<String> {
    let bad = || FtpError::protocol_error(format!("Cannot parse PWD: {}", text));
    let start = text.find('"').ok_or_else(bad)?;
    let mut out = String::new();
    let mut chars = text[start + 1..].chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
            } else {
                return Ok(out);
            }
        } else {
            out.push(c);
        }
    }
    Err(bad())
}

/// Read an entire data stream into a UTF-8 string, failing if the server
/// goes quiet for longer than `idle`.
async fn read_data_stream_to_string(ds: &mut DataStream, idle: Duration) -> FtpResult<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let reader = ds.reader();
    loop {
        let n = match tokio::time::timeout(idle, reader.read(&mut chunk))
            .await
            .map_err(|_| FtpError::timeout("Data channel read timed out"))?
        {
            Ok(n) => n,
            // Many servers drop the TLS data socket without close_notify.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => 0,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
