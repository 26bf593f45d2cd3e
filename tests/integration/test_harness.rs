// Test harness for integration tests
// Starts a scripted origin server and an in-process proxy on free ports

use caching_proxy::cache::{Cache, CacheEntry, CacheKey, CacheStore};
use caching_proxy::config::{CacheConfig, Config, OriginConfig, ServerConfig};
use caching_proxy::server::ProxyServer;
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Ask the OS for a port that is currently free
pub fn free_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("Failed to bind ephemeral port");
    listener.local_addr().unwrap().port()
}

/// Request as seen by the mock origin
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl OriginRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted HTTP/1.1 origin that counts the requests it serves
///
/// Routes:
/// - `/data` 200 JSON with cookies, auth and server headers
/// - `/search` 200 echoing the query string
/// - `/missing` 404
/// - `/multi` 200 with two `X-Multi` header lines
/// - `/hang` accepts the request and never answers
/// - `/trickle` 200 whose body arrives one byte every 400ms
/// - anything else 200 `ok`
pub struct MockOrigin {
    pub port: u16,
    hits: Arc<AtomicUsize>,
    requests: Arc<parking_lot::Mutex<Vec<OriginRequest>>>,
}

impl MockOrigin {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock origin");
        let port = listener.local_addr().unwrap().port();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let accept_hits = hits.clone();
        let accept_requests = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let hits = accept_hits.clone();
                let requests = accept_requests.clone();
                tokio::spawn(async move {
                    let _ = serve_connection(stream, hits, requests).await;
                });
            }
        });

        Self {
            port,
            hits,
            requests,
        }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Number of requests the origin has answered
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<OriginRequest> {
        self.requests.lock().last().cloned()
    }
}

async fn serve_connection(
    stream: TcpStream,
    hits: Arc<AtomicUsize>,
    requests: Arc<parking_lot::Mutex<Vec<OriginRequest>>>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // Keep-alive: serve requests until the peer closes the connection
    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let target = parts.next().unwrap_or_default().to_string();

        let mut headers = Vec::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(());
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                let (name, value) = (name.trim().to_string(), value.trim().to_string());
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.parse().unwrap_or(0);
                }
                headers.push((name, value));
            }
        }

        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).await?;

        hits.fetch_add(1, Ordering::SeqCst);
        requests.lock().push(OriginRequest {
            method: method.clone(),
            target: target.clone(),
            headers,
        });

        match target.as_str() {
            "/hang" => std::future::pending::<()>().await,
            "/trickle" => {
                write_half
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 10\r\n\r\n")
                    .await?;
                write_half.flush().await?;
                for _ in 0..10 {
                    tokio::time::sleep(Duration::from_millis(400)).await;
                    write_half.write_all(b"x").await?;
                    write_half.flush().await?;
                }
            }
            _ => {
                let response = respond(&method, &target);
                write_half.write_all(&response).await?;
                write_half.flush().await?;
            }
        }
    }
}

fn respond(method: &str, target: &str) -> Vec<u8> {
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };

    let (status, extra_headers, body): (&str, Vec<(&str, &str)>, String) = match path {
        "/data" => (
            "200 OK",
            vec![
                ("Content-Type", "application/json"),
                ("Set-Cookie", "session=abc123"),
                ("Authorization", "Bearer origin-token"),
                ("Server", "mock-origin/1.0"),
                ("Date", "Mon, 01 Jan 2024 00:00:00 GMT"),
                ("X-Custom", "custom-value"),
            ],
            r#"{"message":"hello"}"#.to_string(),
        ),
        "/search" => (
            "200 OK",
            vec![("Content-Type", "text/plain")],
            format!("query={}", query),
        ),
        "/multi" => (
            "200 OK",
            vec![
                ("Content-Type", "text/plain"),
                ("X-Multi", "a"),
                ("X-Multi", "b"),
            ],
            "multi".to_string(),
        ),
        "/missing" => (
            "404 Not Found",
            vec![("Content-Type", "text/plain")],
            "not found".to_string(),
        ),
        _ => ("200 OK", vec![("Content-Type", "text/plain")], "ok".to_string()),
    };

    let mut response = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\n", status, body.len());
    for (name, value) in extra_headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str("\r\n");

    let mut bytes = response.into_bytes();
    if method != "HEAD" {
        bytes.extend_from_slice(body.as_bytes());
    }
    bytes
}

/// In-process proxy sharing its cache store with the test
pub struct ProxyHarness {
    pub port: u16,
    pub cache: Arc<CacheStore>,
    pub origin_url: String,
    _cache_dir: TempDir,
}

impl ProxyHarness {
    /// Start a proxy in front of `origin_url` and wait until it accepts connections
    pub async fn start(origin_url: &str) -> Self {
        Self::start_with_timeout(origin_url, 5).await
    }

    /// Same as `start` with a custom origin timeout in seconds
    pub async fn start_with_timeout(origin_url: &str, timeout: u64) -> Self {
        let cache_dir = TempDir::new().expect("Failed to create cache dir");
        let cache = Arc::new(CacheStore::with_dir(cache_dir.path().join("cache")).unwrap());
        let port = free_port();

        let config = Config {
            server: ServerConfig {
                address: "127.0.0.1".to_string(),
                port,
            },
            origin: OriginConfig {
                url: origin_url.to_string(),
                timeout,
            },
            cache: CacheConfig {
                dir: Some(cache.dir().to_path_buf()),
            },
        };

        let server =
            ProxyServer::with_cache(config, cache.clone()).expect("Failed to build proxy server");
        std::thread::spawn(move || {
            let pingora = server
                .build_pingora_server()
                .expect("Failed to create Pingora server");
            pingora.run_forever();
        });

        for _ in 0..50 {
            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Self {
            port,
            cache,
            origin_url: origin_url.to_string(),
            _cache_dir: cache_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn key(&self, method: &str, path: &str) -> CacheKey {
        CacheKey::new(method, &self.origin_url, path)
    }

    /// Wait for the proxy to finish storing an entry
    pub async fn wait_for_entry(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        for _ in 0..50 {
            if let Some(entry) = self.cache.get(key) {
                return Some(entry);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client")
}
