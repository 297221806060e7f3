//! Low-level FTP command/response codec (RFC 959 §4).
//!
//! Handles:
//! - Sending FTP commands terminated with `\r\n`
//! - Reading single-line and multi-line replies
//! - Parsing the 3-digit reply code
//! - Enforcing the inactivity timeout on every reply

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::types::FtpResponse;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;

/// Abstraction over plain TCP or TLS-wrapped read half.
pub enum ReadHalf {
    Plain(BufReader<OwnedReadHalf>),
    Tls(BufReader<tokio::io::ReadHalf<TlsStream<TcpStream>>>),
}

/// Abstraction over plain TCP or TLS-wrapped write half.
pub enum WriteHalf {
    Plain(OwnedWriteHalf),
    Tls(tokio::io::WriteHalf<TlsStream<TcpStream>>),
}

/// The FTP command/response codec operating on split halves.
pub struct FtpCodec {
    pub reader: ReadHalf,
    pub writer: WriteHalf,
    pub timeout: Duration,
}

impl FtpCodec {
    /// Create a codec from a plain TCP stream.
    pub fn from_tcp(stream: TcpStream, timeout: Duration) -> Self {
        let (rd, wr) = stream.into_split();
        Self {
            reader: ReadHalf::Plain(BufReader::new(rd)),
            writer: WriteHalf::Plain(wr),
            timeout,
        }
    }

    /// Create a codec from a TLS-wrapped TCP stream.
    pub fn from_tls(stream: TlsStream<TcpStream>, timeout: Duration) -> Self {
        let (rd, wr) = tokio::io::split(stream);
        Self {
            reader: ReadHalf::Tls(BufReader::new(rd)),
            writer: WriteHalf::Tls(wr),
            timeout,
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self.writer, WriteHalf::Tls(_))
    }

    /// Send a raw FTP command (CRLF is appended here).
    pub async fn send_command(&mut self, cmd: &str) -> FtpResult<()> {
        let line = format!("{}\r\n", cmd);
        let dur = self.timeout;
        let write = async {
            match &mut self.writer {
                WriteHalf::Plain(w) => {
                    w.write_all(line.as_bytes()).await?;
                    w.flush().await
                }
                WriteHalf::Tls(w) => {
                    w.write_all(line.as_bytes()).await?;
                    w.flush().await
                }
            }
        };
        timeout(dur, write)
            .await
            .map_err(|_| FtpError::timeout(format!("Sending '{}' timed out", redact(cmd))))??;
        log::trace!(">>> {}", redact(cmd));
        Ok(())
    }

    /// Read a complete FTP response (possibly multi-line).
    ///
    /// Multi-line responses look like:
    /// ```text
    /// 220-Welcome to my FTP server
    /// 220-This is line 2
    /// 220 End of greeting
    /// ```
    pub async fn read_response(&mut self) -> FtpResult<FtpResponse> {
        let dur = self.timeout;
        let read = async {
            match &mut self.reader {
                ReadHalf::Plain(r) => read_reply(r).await,
                ReadHalf::Tls(r) => read_reply(r).await,
            }
        };
        let resp = timeout(dur, read).await.map_err(|_| {
            FtpError::timeout(format!("No reply from server within {}s", dur.as_secs()))
        })??;
        log::trace!(
            "<<< {} {}",
            resp.code,
            resp.lines.last().map(String::as_str).unwrap_or("")
        );
        Ok(resp)
    }

    /// Send a command and return the response.
    pub async fn execute(&mut self, cmd: &str) -> FtpResult<FtpResponse> {
        self.send_command(cmd).await?;
        self.read_response().await
    }

    /// Convenience: send a command, expect a specific response-code class.
    pub async fn expect(&mut self, cmd: &str, expected_first_digit: u16) -> FtpResult<FtpResponse> {
        let resp = self.execute(cmd).await?;
        if resp.code / 100 != expected_first_digit {
            return Err(FtpError::from_reply(resp.code, &resp.text()));
        }
        Ok(resp)
    }

    /// Expect a 2xx reply.
    pub async fn expect_ok(&mut self, cmd: &str) -> FtpResult<FtpResponse> {
        self.expect(cmd, 2).await
    }
}

/// Read one reply from any buffered reader.
pub(crate) async fn read_reply<R>(reader: &mut R) -> FtpResult<FtpResponse>
where
    R: AsyncBufRead + Unpin,
{
    let first = read_line_raw(reader).await?;
    let first_trimmed = first.trim_end_matches(['\r', '\n']);

    let code = parse_code(first_trimmed)?;
    let mut lines = vec![first_trimmed.to_string()];

    // "NNN-" means more lines follow until "NNN " is seen.
    let is_multi = first_trimmed.as_bytes().get(3) == Some(&b'-');
    if is_multi {
        let code_str = code.to_string();
        let terminator = format!("{} ", code_str);
        loop {
            let next = read_line_raw(reader).await?;
            let next_trimmed = next.trim_end_matches(['\r', '\n']);
            lines.push(next_trimmed.to_string());
            if next_trimmed.starts_with(&terminator) || next_trimmed == code_str {
                break;
            }
        }
    }

    Ok(FtpResponse { code, lines })
}

async fn read_line_raw<R>(reader: &mut R) -> FtpResult<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = String::new();
    let n = reader.read_line(&mut buf).await?;
    if n == 0 {
        return Err(FtpError::disconnected("Server closed connection"));
    }
    Ok(buf)
}

/// Parse the 3-digit reply code from the start of a line.
fn parse_code(line: &str) -> FtpResult<u16> {
    let digits = line
        .get(..3)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| FtpError::protocol_error(format!("Invalid reply line: '{}'", line)))?;
    digits
        .parse::<u16>()
        .map_err(|_| FtpError::protocol_error(format!("Invalid reply code in: '{}'", line)))
}

/// Keep passwords out of trace logs.
fn redact(cmd: &str) -> &str {
    if cmd.get(..5).is_some_and(|verb| verb.eq_ignore_ascii_case("PASS ")) {
        "PASS ****"
    } else {
        cmd
    }
}
