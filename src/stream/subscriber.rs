//! Announcement stream subscriber
//!
//! Maintains one long-lived signed websocket connection. The connection is
//! rebuilt from scratch on every attempt (fresh nonce, fresh timestamp,
//! fresh signature) and retried forever: a dead feed must recover on its own
//! without operator action. Keep-alive pings ride in the same select loop as
//! the reader; a failed ping tears the connection down like a read error.

use super::{FrameHandler, StreamError};
use futures_util::{SinkExt, StreamExt};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{client_async_tls, connect_async, MaybeTlsStream, WebSocketStream};

/// Announcement websocket endpoint
pub const STREAM_BASE_URL: &str = "wss://api.binance.com/sapi/wss";

const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const PING_INTERVAL: Duration = Duration::from_secs(30);
const NONCE_LEN: usize = 32;
const RECV_WINDOW: &str = "50000";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Stream subscriber configuration
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: String,
    pub api_key: String,
    pub secret_key: String,
    /// Forward proxy, e.g. "http://127.0.0.1:7890"; empty for direct connect
    pub proxy_url: String,
    pub topics: Vec<String>,
}

impl StreamConfig {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            url: STREAM_BASE_URL.to_string(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            proxy_url: String::new(),
            topics: Vec::new(),
        }
    }

    pub fn topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = proxy_url.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Handle to a running stream subscriber.
pub struct StreamHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl StreamHandle {
    /// Request termination; the current read loop closes the connection.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub async fn join(self) {
        let _ = self.join.await;
    }
}

/// Long-lived announcement feed subscriber.
pub struct StreamSubscriber {
    config: StreamConfig,
}

impl StreamSubscriber {
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Spawn the reconnect loop; every text frame goes to `handler`.
    pub fn spawn<H: FrameHandler>(self, handler: H) -> StreamHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(run_loop(self.config, handler, stop_rx));
        StreamHandle { stop_tx, join }
    }
}

async fn run_loop<H: FrameHandler>(
    config: StreamConfig,
    handler: H,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        if *stop_rx.borrow() {
            break;
        }

        let stream = match connect(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "stream connect failed, retrying");
                if wait_or_stop(CONNECT_RETRY_DELAY, &mut stop_rx).await {
                    break;
                }
                continue;
            }
        };

        tracing::info!(url = %config.url, topics = config.topics.len(), "announcement stream connected");

        if !read_until_error(stream, &handler, &mut stop_rx).await {
            break;
        }

        tracing::info!("announcement stream lost, reconnecting");
        if wait_or_stop(RECONNECT_DELAY, &mut stop_rx).await {
            break;
        }
    }
    tracing::info!("announcement stream stopped");
}

/// Sleep for `delay` unless stopped first. Returns true when stopped.
async fn wait_or_stop(delay: Duration, stop_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = sleep(delay) => false,
        _ = stop_rx.changed() => *stop_rx.borrow(),
    }
}

/// Drive one connection until it dies. Returns false when stop was requested.
async fn read_until_error<H: FrameHandler>(
    mut stream: WsStream,
    handler: &H,
    stop_rx: &mut watch::Receiver<bool>,
) -> bool {
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // Skip the interval's immediate first fire
    ping.tick().await;

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handler.handle(&text).await,
                    Some(Ok(Message::Ping(data))) => {
                        if stream.send(Message::Pong(data)).await.is_err() {
                            return true;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::warn!("announcement stream closed by peer");
                        return true;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "announcement stream read failed");
                        return true;
                    }
                }
            }
            _ = ping.tick() => {
                if let Err(e) = stream.send(Message::Ping(Vec::new())).await {
                    tracing::warn!(error = %e, "keep-alive ping failed");
                    return true;
                }
            }
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    let _ = stream.close(None).await;
                    return false;
                }
            }
        }
    }
}

async fn connect(config: &StreamConfig) -> Result<WsStream, StreamError> {
    let url = signed_connect_url(config, chrono::Utc::now().timestamp_millis(), &nonce())?;

    let mut request = url
        .clone()
        .into_client_request()
        .map_err(|e| StreamError::Connect(e.to_string()))?;
    request.headers_mut().insert(
        "X-MBX-APIKEY",
        config
            .api_key
            .parse()
            .map_err(|_| StreamError::Connect("invalid api key header".to_string()))?,
    );

    if config.proxy_url.is_empty() {
        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;
        Ok(stream)
    } else {
        let tcp = proxy_tunnel(&config.proxy_url, &config.url).await?;
        let (stream, _) = client_async_tls(request, tcp)
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;
        Ok(stream)
    }
}

/// Open an HTTP CONNECT tunnel to the websocket host through `proxy_url`.
async fn proxy_tunnel(proxy_url: &str, ws_url: &str) -> Result<TcpStream, StreamError> {
    let proxy_addr = host_port(proxy_url, 80)
        .ok_or_else(|| StreamError::Proxy(format!("unparseable proxy url: {}", proxy_url)))?;
    let target = host_port(ws_url, 443)
        .ok_or_else(|| StreamError::Proxy(format!("unparseable stream url: {}", ws_url)))?;

    let mut tcp = TcpStream::connect(&proxy_addr)
        .await
        .map_err(|e| StreamError::Proxy(e.to_string()))?;

    let connect_req = format!(
        "CONNECT {target} HTTP/1.1\r\nHost: {target}\r\nProxy-Connection: keep-alive\r\n\r\n"
    );
    tcp.write_all(connect_req.as_bytes())
        .await
        .map_err(|e| StreamError::Proxy(e.to_string()))?;

    let mut response = Vec::new();
    let mut byte = [0u8; 1];
    while !response.ends_with(b"\r\n\r\n") {
        let n = tcp
            .read(&mut byte)
            .await
            .map_err(|e| StreamError::Proxy(e.to_string()))?;
        if n == 0 {
            return Err(StreamError::Proxy("proxy closed during handshake".to_string()));
        }
        response.push(byte[0]);
        if response.len() > 8192 {
            return Err(StreamError::Proxy("oversized proxy response".to_string()));
        }
    }

    let status_line = String::from_utf8_lossy(&response);
    if !status_line.starts_with("HTTP/1.1 200") && !status_line.starts_with("HTTP/1.0 200") {
        let first = status_line.lines().next().unwrap_or_default().to_string();
        return Err(StreamError::Proxy(format!("proxy refused tunnel: {}", first)));
    }

    Ok(tcp)
}

/// `host:port` of a ws/wss/http url, with a scheme-appropriate default port.
fn host_port(url: &str, default_port: u16) -> Option<String> {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let authority = rest.split('/').next()?;
    if authority.is_empty() {
        return None;
    }
    if authority.contains(':') {
        Some(authority.to_string())
    } else {
        Some(format!("{}:{}", authority, default_port))
    }
}

/// Build the signed connection URL for one attempt.
///
/// Query keys are sorted before url-encoding; the signature is a hex
/// HMAC-SHA256 over that canonical string and is then merged back in.
fn signed_connect_url(
    config: &StreamConfig,
    timestamp_ms: i64,
    nonce: &str,
) -> Result<String, StreamError> {
    let mut params: Vec<(String, String)> = vec![
        ("random".to_string(), nonce.to_string()),
        ("recvWindow".to_string(), RECV_WINDOW.to_string()),
        ("timestamp".to_string(), timestamp_ms.to_string()),
    ];
    if !config.topics.is_empty() {
        params.push(("topic".to_string(), config.topics.join("|")));
    }

    let canonical = encode_query(&mut params);
    let signature = sign(&config.secret_key, &canonical)?;

    params.push(("signature".to_string(), signature));

    // A bare "ws://host:port" base would produce the invalid request line
    // "GET ?query"; the handshake needs a path before the query.
    let base = match config.url.split_once("://") {
        Some((_, rest)) if !rest.contains('/') => format!("{}/", config.url),
        _ => config.url.clone(),
    };
    Ok(format!("{}?{}", base, encode_query(&mut params)))
}

fn encode_query(params: &mut [(String, String)]) -> String {
    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencode(k), urlencode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn sign(secret: &str, data: &str) -> Result<String, StreamError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| StreamError::Signing(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn nonce() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..NONCE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
