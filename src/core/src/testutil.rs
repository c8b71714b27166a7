//! Test doubles: a scripted external tool and an in-process HTTP responder.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{PipeError, Result};
use crate::tool::{CommandOutput, ExternalTool, TIMEOUT_EXIT_CODE};

/// Scripted [`ExternalTool`]. Every subcommand succeeds unless overridden.
///
/// `save -o <path>` writes a small archive to `<path>` and `clone <url> <dir>`
/// creates a template checkout in `<dir>`, like the real tools.
#[derive(Default)]
pub struct FakeTool {
    outputs: HashMap<String, CommandOutput>,
    run_exit: i32,
    run_spawn_fails: bool,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, subcommand: &str, code: i32, stderr: &str) -> Self {
        self.outputs.insert(
            subcommand.to_string(),
            CommandOutput {
                stderr: stderr.to_string(),
                exit_code: code,
                ..Default::default()
            },
        );
        self
    }

    pub fn time_out(mut self, subcommand: &str) -> Self {
        self.outputs.insert(
            subcommand.to_string(),
            CommandOutput {
                exit_code: TIMEOUT_EXIT_CODE,
                timed_out: true,
                ..Default::default()
            },
        );
        self
    }

    pub fn stdout(mut self, subcommand: &str, stdout: &str) -> Self {
        self.outputs.insert(
            subcommand.to_string(),
            CommandOutput {
                stdout: stdout.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub fn run_exit(mut self, code: i32) -> Self {
        self.run_exit = code;
        self
    }

    pub fn run_spawn_fails(mut self) -> Self {
        self.run_spawn_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| c.first().cloned())
            .collect()
    }
}

#[async_trait]
impl ExternalTool for FakeTool {
    fn program(&self) -> &str {
        "docker"
    }

    async fn execute(&self, args: &[String], _timeout: Duration) -> Result<CommandOutput> {
        self.calls.lock().push(args.to_vec());
        let subcommand = args.first().cloned().unwrap_or_default();
        let output = self.outputs.get(&subcommand).cloned().unwrap_or_default();

        if subcommand == "save" && output.success() {
            if let Some(pos) = args.iter().position(|a| a == "-o") {
                std::fs::write(&args[pos + 1], b"fake image archive")?;
            }
        }
        if subcommand == "clone" && output.success() {
            if let Some(dir) = args.last() {
                let dir = std::path::Path::new(dir);
                std::fs::create_dir_all(dir.join(".git"))?;
                std::fs::write(
                    dir.join("soldexer.json"),
                    r#"{"name": "pipe-template", "description": "Template pipe", "version": "0.1.0", "envSchema": {}}"#,
                )?;
            }
        }
        Ok(output)
    }

    async fn run_attached(&self, args: &[String]) -> Result<i32> {
        self.calls.lock().push(args.to_vec());
        if self.run_spawn_fails {
            return Err(PipeError::SpawnFailed {
                program: "docker".to_string(),
                message: "No such file or directory".to_string(),
            });
        }
        Ok(self.run_exit)
    }
}

/// A request captured by [`TestServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Canned response for a route.
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Content-Length to announce instead of the body's real size.
    pub declared_length: Option<usize>,
}

impl TestResponse {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
            declared_length: None,
        }
    }

    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: "application/octet-stream",
            body,
            declared_length: None,
        }
    }

    /// Announce `length` bytes but send only the body, then close.
    pub fn truncated(mut self, length: usize) -> Self {
        self.declared_length = Some(length);
        self
    }

    pub fn empty(status: u16) -> Self {
        Self::bytes(status, Vec::new())
    }
}

type Routes = Arc<HashMap<(String, String), TestResponse>>;

/// Minimal HTTP/1.1 server on 127.0.0.1 answering canned responses.
///
/// Unknown routes get 404. Each connection serves one request.
pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, &str, TestResponse)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Routes = Arc::new(
            routes
                .into_iter()
                .map(|(m, p, r)| ((m.to_string(), p.to_string()), r))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = handle_connection(stream, routes, recorded).await;
                });
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// URL of a local port with nothing listening on it.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn handle_connection(
    mut stream: TcpStream,
    routes: Routes,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let request = read_request(&mut stream).await?;
    let response = routes
        .get(&(request.method.clone(), request.path.clone()))
        .cloned()
        .unwrap_or_else(|| TestResponse::json(404, serde_json::json!({"error": "not found"})));
    recorded.lock().push(request);

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.content_type,
        response.declared_length.unwrap_or(response.body.len())
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.shutdown().await
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };

    let mut body = buf[header_end + 4..].to_vec();
    if let Some(len) = header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while body.len() < len {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    } else if header("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        while !body.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body = decode_chunked(&body);
    }

    Ok(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn decode_chunked(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = raw;
    while let Some(line_end) = find(rest, b"\r\n") {
        let size_str = String::from_utf8_lossy(&rest[..line_end]).to_string();
        let size = usize::from_str_radix(size_str.split(';').next().unwrap_or("0").trim(), 16)
            .unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        let end = (start + size).min(rest.len());
        out.extend_from_slice(&rest[start..end]);
        rest = &rest[(end + 2).min(rest.len())..];
    }
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
