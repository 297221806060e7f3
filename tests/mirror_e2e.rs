use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use ftp_mirror::cli::Cli;
use mirror_core::mirror::{
    ConnectionConfig, FtpConnector, MirrorErrorKind, RemoteConnector, RemoteStore,
};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

// ── In-process FTP server ────────────────────────────────────────────

#[derive(Debug, Default)]
struct ServerState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    commands: Vec<String>,
    cwd: String,
    /// Store uploads but never send the closing 226.
    stall_after_stor: bool,
}

struct FakeFtpServer {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
}

impl FakeFtpServer {
    /// Serve a single control connection with a virtual filesystem rooted at `/`.
    async fn start(home: &str, password: &str) -> Self {
        Self::start_with(home, password, false).await
    }

    async fn start_stalling(home: &str, password: &str) -> Self {
        Self::start_with(home, password, true).await
    }

    async fn start_with(home: &str, password: &str, stall_after_stor: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut state = ServerState {
            cwd: home.to_string(),
            stall_after_stor,
            ..ServerState::default()
        };
        let mut dir = String::new();
        state.dirs.insert("/".into());
        for segment in home.split('/').filter(|s| !s.is_empty()) {
            dir = format!("{}/{}", dir, segment);
            state.dirs.insert(dir.clone());
        }
        state.files.insert(format!("{}/existing.txt", home.trim_end_matches('/')), b"old".to_vec());
        let state = Arc::new(Mutex::new(state));

        let session_state = state.clone();
        let home = home.to_string();
        let password = password.to_string();
        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let _ = serve(stream, session_state, home, password).await;
            }
        });

        Self { addr, state }
    }

    fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.state.lock().unwrap().files.clone()
    }

    fn dirs(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().dirs.clone()
    }

    fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    fn cwd(&self) -> String {
        self.state.lock().unwrap().cwd.clone()
    }
}

async fn reply(w: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    w.write_all(format!("{}\r\n", line).as_bytes()).await
}

fn resolve(cwd: &str, arg: &str) -> String {
    let joined = if arg.starts_with('/') {
        arg.to_string()
    } else {
        format!("{}/{}", cwd, arg)
    };
    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/".into(),
        Some((parent, _)) => parent.into(),
    }
}

async fn serve(
    stream: TcpStream,
    state: Arc<Mutex<ServerState>>,
    home: String,
    password: String,
) -> std::io::Result<()> {
    let (r, mut w) = stream.into_split();
    let mut lines = BufReader::new(r).lines();
    let mut cwd = home;
    let mut passive: Option<TcpListener> = None;

    reply(&mut w, "220 fake ftp ready").await?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches('\r').to_string();
        let (verb, arg) = match line.split_once(' ') {
            Some((v, a)) => (v.to_ascii_uppercase(), a.to_string()),
            None => (line.to_ascii_uppercase(), String::new()),
        };
        state.lock().unwrap().commands.push(verb.clone());

        match verb.as_str() {
            "USER" => reply(&mut w, "331 Password required").await?,
            "PASS" if arg == password => reply(&mut w, "230 Logged in").await?,
            "PASS" => reply(&mut w, "530 Login incorrect").await?,
            "FEAT" => w.write_all(b"211-Features:\r\n EPSV\r\n SIZE\r\n211 End\r\n").await?,
            "SYST" => reply(&mut w, "215 UNIX Type: L8").await?,
            "PWD" => reply(&mut w, &format!("257 \"{}\" is the current directory", cwd)).await?,
            "TYPE" => reply(&mut w, "200 Type set").await?,
            "CWD" => {
                let target = resolve(&cwd, &arg);
                let entered = {
                    let mut st = state.lock().unwrap();
                    let found = st.dirs.contains(&target);
                    if found {
                        st.cwd = target.clone();
                    }
                    found
                };
                if entered {
                    cwd = target;
                    reply(&mut w, "250 Directory changed").await?;
                } else {
                    reply(&mut w, "550 No such file or directory").await?;
                }
            }
            "MKD" => {
                let target = resolve(&cwd, &arg);
                let created = {
                    let mut st = state.lock().unwrap();
                    st.dirs.contains(&parent_of(&target)) && st.dirs.insert(target.clone())
                };
                if created {
                    reply(&mut w, &format!("257 \"{}\" created", target)).await?;
                } else {
                    reply(&mut w, "550 Create directory operation failed").await?;
                }
            }
            "EPSV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                passive = Some(listener);
                reply(&mut w, &format!("229 Entering Extended Passive Mode (|||{}|)", port)).await?;
            }
            "LIST" => {
                let Some(listener) = passive.take() else {
                    reply(&mut w, "425 Use EPSV first").await?;
                    continue;
                };
                reply(&mut w, "150 Here comes the directory listing").await?;
                let (mut data, _) = listener.accept().await?;
                let listing = {
                    let st = state.lock().unwrap();
                    let prefix = format!("{}/", cwd.trim_end_matches('/'));
                    let mut out = String::new();
                    for d in st.dirs.iter().filter(|d| parent_of(d) == cwd && *d != "/") {
                        out.push_str(&format!(
                            "drwxr-xr-x 2 ftp ftp 4096 Jan  1 12:00 {}\r\n",
                            &d[prefix.len()..]
                        ));
                    }
                    for (f, body) in st.files.iter().filter(|(f, _)| parent_of(f) == cwd) {
                        out.push_str(&format!(
                            "-rw-r--r-- 1 ftp ftp {} Jan  1 12:00 {}\r\n",
                            body.len(),
                            &f[prefix.len()..]
                        ));
                    }
                    out
                };
                data.write_all(listing.as_bytes()).await?;
                drop(data);
                reply(&mut w, "226 Directory send OK").await?;
            }
            "STOR" => {
                let Some(listener) = passive.take() else {
                    reply(&mut w, "425 Use EPSV first").await?;
                    continue;
                };
                let target = resolve(&cwd, &arg);
                if !state.lock().unwrap().dirs.contains(&parent_of(&target)) {
                    reply(&mut w, "553 Could not create file").await?;
                    continue;
                }
                reply(&mut w, "150 Ok to send data").await?;
                let (mut data, _) = listener.accept().await?;
                let mut body = Vec::new();
                data.read_to_end(&mut body).await?;
                let stall = {
                    let mut st = state.lock().unwrap();
                    st.files.insert(target, body);
                    st.stall_after_stor
                };
                if stall {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                reply(&mut w, "226 Transfer complete").await?;
            }
            "QUIT" => {
                reply(&mut w, "221 Goodbye").await?;
                break;
            }
            _ => reply(&mut w, "502 Command not implemented").await?,
        }
    }
    Ok(())
}

// ── Fixtures ─────────────────────────────────────────────────────────

fn local_tree(root: &Path) {
    std::fs::write(root.join("a.txt"), b"alpha").unwrap();
    std::fs::create_dir_all(root.join("sub")).unwrap();
    std::fs::write(root.join("sub/b.txt"), b"bravo").unwrap();
    std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
    std::fs::write(root.join("node_modules/pkg/c.txt"), b"charlie").unwrap();
    std::fs::create_dir_all(root.join(".git")).unwrap();
    std::fs::write(root.join(".git/HEAD"), b"ref: refs/heads/main").unwrap();
}

fn connection(server: &FakeFtpServer, password: &str) -> ConnectionConfig {
    ConnectionConfig {
        host: "127.0.0.1".into(),
        user: "deploy".into(),
        password: SecretString::new(password.into()),
        port: Some(server.addr.port()),
        secure: false,
    }
}

fn cli(root: &Path, remote_root: &str) -> Cli {
    Cli::try_parse_from([
        "ftp-mirror",
        root.to_str().unwrap(),
        "--remote-root",
        remote_root,
        "--ignore",
        ".git,node_modules",
        "--timeout",
        "10",
    ])
    .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn mirrors_tree_into_absolute_remote_root() {
    let dir = tempfile::tempdir().unwrap();
    local_tree(dir.path());
    let server = FakeFtpServer::start("/", "s3cret").await;

    let summary = ftp_mirror::run_with_config(&connection(&server, "s3cret"), &cli(dir.path(), "/backup"))
        .await
        .unwrap();

    assert_eq!(summary.files_uploaded, 2);
    assert_eq!(summary.bytes_uploaded, 10);
    let files = server.files();
    assert_eq!(files.get("/backup/a.txt").map(Vec::as_slice), Some(&b"alpha"[..]));
    assert_eq!(files.get("/backup/sub/b.txt").map(Vec::as_slice), Some(&b"bravo"[..]));
    assert!(files.keys().all(|k| !k.contains("node_modules") && !k.contains(".git")));
    assert!(server.dirs().contains("/backup/sub"));

    let commands = server.commands();
    assert!(commands.contains(&"LIST".to_string()));
    assert_eq!(commands.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn relative_remote_root_lands_under_login_directory() {
    let dir = tempfile::tempdir().unwrap();
    local_tree(dir.path());
    let server = FakeFtpServer::start("/home/deploy", "pw").await;

    ftp_mirror::run_with_config(&connection(&server, "pw"), &cli(dir.path(), "site"))
        .await
        .unwrap();

    let files = server.files();
    assert!(files.contains_key("/home/deploy/site/a.txt"));
    assert!(files.contains_key("/home/deploy/site/sub/b.txt"));
    assert!(!server.dirs().contains("/home/deploy/site/sub/sub"));
}

#[tokio::test]
async fn wrong_password_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    local_tree(dir.path());
    let server = FakeFtpServer::start("/", "right").await;

    let err = ftp_mirror::run_with_config(&connection(&server, "wrong"), &cli(dir.path(), "/backup"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, MirrorErrorKind::ConnectionError);
    assert!(err.message.contains("530"));
    assert_eq!(server.files().len(), 1);
}

#[tokio::test]
async fn missing_port_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ConnectionConfig::from_lookup(|_| None);
    config.host = "127.0.0.1".into();

    let err = ftp_mirror::run_with_config(&config, &cli(dir.path(), "/"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, MirrorErrorKind::ConnectionError);
}

#[tokio::test]
async fn stalled_transfer_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    local_tree(dir.path());
    let server = FakeFtpServer::start_stalling("/", "pw").await;
    let cli = Cli::try_parse_from([
        "ftp-mirror",
        dir.path().to_str().unwrap(),
        "--remote-root",
        "/backup",
        "--timeout",
        "1",
    ])
    .unwrap();

    let err = ftp_mirror::run_with_config(&connection(&server, "pw"), &cli)
        .await
        .unwrap_err();

    assert_eq!(err.kind, MirrorErrorKind::ConnectionError);
    assert_eq!(err.path.as_deref(), Some("/backup/a.txt"));
    assert!(err.message.contains("Timeout"));
    assert!(server.files().contains_key("/backup/a.txt"));
    assert!(!server.files().contains_key("/backup/sub/b.txt"));
}

#[tokio::test]
async fn ensure_directory_twice_changes_nothing() {
    let server = FakeFtpServer::start("/home/u", "pw").await;
    let connector = FtpConnector {
        verify_certs: false,
        timeout_sec: 10,
    };
    let mut store = connector.connect(&connection(&server, "pw")).await.unwrap();

    store.ensure_directory("/x/y/z").await.unwrap();
    store.ensure_directory("rel/a").await.unwrap();
    let created = server.dirs();
    assert_eq!(server.cwd(), "/home/u");

    store.ensure_directory("/x/y/z").await.unwrap();
    store.ensure_directory("rel/a").await.unwrap();
    assert_eq!(server.dirs(), created);
    assert_eq!(server.cwd(), "/home/u");

    let expected: BTreeSet<String> = [
        "/", "/home", "/home/u", "/home/u/rel", "/home/u/rel/a", "/x", "/x/y", "/x/y/z",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(created, expected);

    store.close().await.unwrap();
}
