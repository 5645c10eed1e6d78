#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use logdest_core::RawOptions;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

pub fn options(pairs: &[(&str, &str)]) -> RawOptions {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A URL on a port nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

type CannedResponse = (StatusCode, &'static str);

#[derive(Clone)]
struct MockState {
    requests: mpsc::UnboundedSender<CapturedRequest>,
    scripted: Arc<Mutex<VecDeque<CannedResponse>>>,
    fallback: CannedResponse,
}

impl MockState {
    fn next_response(&self) -> CannedResponse {
        self.scripted
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(self.fallback)
    }
}

async fn record_request(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let _ = state.requests.send(CapturedRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    let (status, body) = state.next_response();
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

/// HTTP endpoint that records every request and answers with canned responses.
pub struct MockServer {
    pub addr: SocketAddr,
    requests: mpsc::UnboundedReceiver<CapturedRequest>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Answers every request with the same status and body.
    pub async fn start(code: u16, body: &'static str) -> Self {
        Self::scripted(Vec::new(), (code, body)).await
    }

    /// Answers with `script` in order, then with `fallback` once it runs out.
    pub async fn scripted(script: Vec<(u16, &'static str)>, fallback: (u16, &'static str)) -> Self {
        let (tx, requests) = mpsc::unbounded_channel();
        let state = MockState {
            requests: tx,
            scripted: Arc::new(Mutex::new(
                script.into_iter().map(|(c, b)| (status(c), b)).collect(),
            )),
            fallback: (status(fallback.0), fallback.1),
        };
        let app = Router::new().fallback(record_request).with_state(state);
        let (addr, handle) = serve(app).await;

        Self {
            addr,
            requests,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn next_request(&mut self) -> CapturedRequest {
        tokio::time::timeout(Duration::from_secs(2), self.requests.recv())
            .await
            .expect("timed out waiting for a request")
            .expect("server stopped")
    }

    pub fn try_next_request(&mut self) -> Option<CapturedRequest> {
        self.requests.try_recv().ok()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(app: Router) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, handle)
}

/// An endpoint that accepts requests and never answers them.
pub async fn unresponsive_endpoint() -> (String, JoinHandle<()>) {
    async fn stall() -> StatusCode {
        std::future::pending().await
    }
    let (addr, handle) = serve(Router::new().fallback(stall)).await;
    (format!("http://{addr}/"), handle)
}

/// A TCP endpoint that reads the first KiB of a request and then resets the
/// connection, so a large body fails while it is still being written.
pub async fn resetting_endpoint() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut head = [0u8; 1024];
            let _ = socket.read_exact(&mut head).await;
            let _ = socket.set_linger(Some(Duration::ZERO));
            drop(socket);
        }
    });
    (format!("http://{addr}/"), handle)
}

/// A tracing layer that keeps formatted events in a bounded buffer.
pub struct CaptureLayer {
    buffer: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl CaptureLayer {
    pub fn new(buffer: Arc<Mutex<VecDeque<String>>>, capacity: usize) -> Self {
        Self { buffer, capacity }
    }
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);
        let formatted = format!("[{}] {}", event.metadata().level(), visitor.message);

        if let Ok(mut buf) = self.buffer.lock() {
            if buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(formatted);
        }
    }
}

/// Installs a capturing subscriber for the current thread until the guard drops.
pub fn capture_logs() -> (Arc<Mutex<VecDeque<String>>>, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let buffer = Arc::new(Mutex::new(VecDeque::new()));
    let subscriber =
        tracing_subscriber::Registry::default().with(CaptureLayer::new(Arc::clone(&buffer), 1000));
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

pub fn captured(buffer: &Arc<Mutex<VecDeque<String>>>) -> Vec<String> {
    buffer.lock().unwrap().iter().cloned().collect()
}
