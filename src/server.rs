//! Static file server and graceful shutdown.
//!
//! # One request per connection
//!
//! Each accepted connection is read until the end of the request head
//! (`\r\n\r\n`) or until the peer closes, answered once, and closed. Header
//! fields, bodies and keep-alive are not interpreted. A peer that has not
//! finished its head within the head timeout gets 408.
//!
//! ```text
//! bytes off the socket
//!        ↓ Request::try_from
//! Request                     ← 400 / 405 on failure
//!        ↓ Resolver::resolve  (spawn_blocking)
//! ResolvedPath                ← 400 / 403 / 404 / 500 on failure
//!        ↓ tokio::fs::File, length from metadata
//! 200, file streamed with tokio::io::copy
//! ```
//!
//! # Shutdown
//!
//! On SIGTERM or Ctrl-C (or the future passed to
//! [`Server::serve_with_shutdown`]) the server stops accepting, lets every
//! in-flight connection finish, and returns. Connections still open when the
//! drain timeout runs out are aborted.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::error::{Error, ResolveError};
use crate::method::Method;
use crate::request::Request;
use crate::resolver::Resolver;
use crate::response::{ContentType, IntoResponse, Response};
use crate::status::Status;

/// Largest request head accepted before answering 431.
pub const MAX_HEAD_SIZE: usize = 8 * 1024;

/// How long a connection may take to deliver its request head.
pub const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown waits for in-flight connections before aborting them.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

const HEAD_END: &[u8] = b"\r\n\r\n";

/// The HTTP file server.
pub struct Server {
    addr: SocketAddr,
    head_timeout: Duration,
    drain_timeout: Duration,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use turbine::Server;
    ///
    /// assert!(Server::bind("127.0.0.1:8080").is_ok());
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self {
            addr: addr.parse()?,
            head_timeout: HEAD_TIMEOUT,
            drain_timeout: DRAIN_TIMEOUT,
        })
    }

    /// Overrides [`HEAD_TIMEOUT`].
    pub fn head_timeout(mut self, timeout: Duration) -> Self {
        self.head_timeout = timeout;
        self
    }

    /// Overrides [`DRAIN_TIMEOUT`].
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Serves files from `resolver`'s document root until SIGTERM or Ctrl-C,
    /// then drains in-flight connections.
    pub async fn serve(self, resolver: Resolver) -> Result<(), Error> {
        self.serve_with_shutdown(resolver, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops when `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, resolver: Resolver, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let resolver = Arc::new(resolver);

        info!(
            addr = %self.addr,
            root = %resolver.root().as_path().display(),
            "turbine listening",
        );

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting even when
                // more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let resolver = Arc::clone(&resolver);
                    let head_timeout = self.head_timeout;
                    tasks.spawn(async move {
                        if let Err(e) = handle_connection(stream, resolver, head_timeout).await {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        let drain = async { while tasks.join_next().await.is_some() {} };
        if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
            warn!(remaining = tasks.len(), "drain timed out, aborting connections");
            tasks.shutdown().await;
        }

        info!("turbine stopped");
        Ok(())
    }
}

// ── Connection handling ───────────────────────────────────────────────────────

enum Head {
    Complete(BytesMut),
    TooLarge,
    TimedOut,
    Closed,
}

/// Reads one request head, answers it, and closes the write half.
async fn handle_connection<S>(
    mut stream: S,
    resolver: Arc<Resolver>,
    head_timeout: Duration,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let head = match tokio::time::timeout(head_timeout, read_head(&mut stream)).await {
        Ok(head) => head?,
        Err(_) => {
            debug!("request head timed out");
            Head::TimedOut
        }
    };

    let response = match head {
        Head::Complete(head) => respond(&head, resolver).await,
        Head::TooLarge => Response::status(Status::RequestHeaderFieldsTooLarge),
        Head::TimedOut => Response::status(Status::RequestTimeout),
        Head::Closed => return Ok(()),
    };

    response.write_to(&mut stream).await?;
    stream.shutdown().await
}

/// Accumulates bytes until `\r\n\r\n`, the peer closes, or the head outgrows
/// [`MAX_HEAD_SIZE`].
async fn read_head<S: AsyncRead + Unpin>(stream: &mut S) -> std::io::Result<Head> {
    let mut buf = BytesMut::with_capacity(1024);
    loop {
        if let Some(end) = find(&buf, HEAD_END) {
            buf.truncate(end + HEAD_END.len());
            return Ok(Head::Complete(buf));
        }
        if buf.len() >= MAX_HEAD_SIZE {
            return Ok(Head::TooLarge);
        }
        if stream.read_buf(&mut buf).await? == 0 {
            return Ok(if buf.is_empty() { Head::Closed } else { Head::Complete(buf) });
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Turns one request head into one response. Never fails: every error is
/// mapped to a status.
async fn respond(head: &[u8], resolver: Arc<Resolver>) -> Response {
    let request = match Request::try_from(head) {
        Ok(r) => r,
        Err(e) => {
            debug!("rejected request: {e}");
            return e.into_response();
        }
    };

    if request.method() != Method::Get {
        debug!(method = %request.method(), resource = request.resource(), "method not allowed");
        return Response::builder()
            .status(Status::MethodNotAllowed)
            .header("allow", Method::Get.as_str())
            .no_body();
    }

    let resource = request.resource().to_owned();
    let resolved = match tokio::task::spawn_blocking(move || resolver.resolve(&resource)).await {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("resolver task failed: {e}");
            return Response::status(Status::InternalServerError);
        }
    };

    let path = match resolved {
        Ok(path) => path,
        Err(e) => {
            if e.is_security_violation() {
                warn!(resource = request.resource(), "forbidden: {e}");
            } else {
                debug!(resource = request.resource(), "{e}");
            }
            return e.into_response();
        }
    };

    match open(path.as_path()).await {
        Ok((file, len)) => {
            info!(resource = request.resource(), bytes = len, "served");
            Response::file(ContentType::from_path(path.as_path()), file, len)
        }
        Err(e) => ResolveError::from(e).into_response(),
    }
}

async fn open(path: &std::path::Path) -> std::io::Result<(File, u64)> {
    let file = File::open(path).await?;
    let len = file.metadata().await?.len();
    Ok((file, len))
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C
/// is available. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use temp_dir::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::resolver::DocumentRoot;

    fn site() -> (TempDir, Arc<Resolver>) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.child("index.html"), "<h1>home</h1>").unwrap();
        fs::write(dir.child("style.css"), "body{}").unwrap();
        let resolver = Resolver::new(DocumentRoot::new(dir.path()).unwrap());
        (dir, Arc::new(resolver))
    }

    /// Sends `raw`, half-closes when `close` is set, and returns the reply.
    async fn exchange(resolver: Arc<Resolver>, raw: &[u8], close: bool) -> String {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(server, resolver, HEAD_TIMEOUT));

        client.write_all(raw).await.unwrap();
        if close {
            client.shutdown().await.unwrap();
        }
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        task.await.unwrap().unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn serves_index_for_root() {
        let (_dir, resolver) = site();
        let reply = exchange(resolver, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n", false).await;
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"), "{reply}");
        assert!(reply.contains("content-type: text/html; charset=utf-8\r\n"));
        assert!(reply.ends_with("\r\n\r\n<h1>home</h1>"));
    }

    #[tokio::test]
    async fn labels_content_type() {
        let (_dir, resolver) = site();
        let reply = exchange(resolver, b"GET /style.css HTTP/1.1\r\n\r\n", false).await;
        assert!(reply.contains("content-type: text/css\r\n"), "{reply}");
        assert!(reply.contains("content-length: 6\r\n"));
    }

    #[tokio::test]
    async fn head_may_end_at_peer_close() {
        let (_dir, resolver) = site();
        let reply = exchange(resolver, b"GET /style.css HTTP/1.1\r\n", true).await;
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"), "{reply}");
    }

    #[tokio::test]
    async fn statuses_for_failures() {
        let cases: [(&[u8], &str); 7] = [
            (b"GET /../secret HTTP/1.1\r\n\r\n", "403 Forbidden"),
            (b"GET /a\0b HTTP/1.1\r\n\r\n", "400 Bad Request"),
            (b"GET /missing.txt HTTP/1.1\r\n\r\n", "404 Not Found"),
            (b"GET missing.txt HTTP/1.1\r\n\r\n", "400 Bad Request"),
            (b"GET\r\n\r\n", "400 Bad Request"),
            (b"PUT /x HTTP/1.1\r\n\r\n", "405 Method Not Allowed"),
            (b"POST / HTTP/1.1\r\n\r\n", "405 Method Not Allowed"),
        ];
        let (_dir, resolver) = site();
        for (raw, status) in cases {
            let reply = exchange(Arc::clone(&resolver), raw, false).await;
            assert!(reply.starts_with(&format!("HTTP/1.1 {status}\r\n")), "{raw:?}: {reply}");
        }
    }

    #[tokio::test]
    async fn method_not_allowed_lists_get() {
        let (_dir, resolver) = site();
        let reply = exchange(resolver, b"POST / HTTP/1.1\r\n\r\n", false).await;
        assert!(reply.contains("allow: GET\r\n"), "{reply}");
    }

    #[tokio::test]
    async fn oversized_head_is_rejected() {
        let (_dir, resolver) = site();
        let mut raw = b"GET /".to_vec();
        raw.extend(std::iter::repeat_n(b'a', MAX_HEAD_SIZE + 1));
        let reply = exchange(resolver, &raw, false).await;
        assert!(reply.starts_with("HTTP/1.1 431 "), "{reply}");
    }

    #[tokio::test]
    async fn idle_peer_times_out_with_408() {
        let (_dir, resolver) = site();
        let (mut client, server) = tokio::io::duplex(1024);
        let task = tokio::spawn(handle_connection(server, resolver, Duration::from_millis(50)));

        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        task.await.unwrap().unwrap();

        let reply = String::from_utf8(out).unwrap();
        assert!(reply.starts_with("HTTP/1.1 408 Request Timeout\r\n"), "{reply}");
    }

    #[tokio::test]
    async fn silent_peer_gets_no_reply() {
        let (_dir, resolver) = site();
        assert_eq!(exchange(resolver, b"", true).await, "");
    }

    #[tokio::test]
    async fn serves_over_tcp_until_shutdown() {
        let (dir, _) = site();
        let addr = free_addr();

        let resolver = Resolver::new(DocumentRoot::new(dir.path()).unwrap());
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server = Server::bind(&addr.to_string()).unwrap();
        let handle = tokio::spawn(server.serve_with_shutdown(resolver, async {
            let _ = stopped.await;
        }));

        let mut stream = connect(addr).await;
        stream.write_all(b"GET /index.html HTTP/1.1\r\n\r\n").await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"), "{out}");

        stop.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    async fn connect(addr: SocketAddr) -> tokio::net::TcpStream {
        loop {
            match tokio::net::TcpStream::connect(addr).await {
                Ok(s) => break s,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
    }

    fn free_addr() -> SocketAddr {
        std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap()
    }

    #[tokio::test]
    async fn shutdown_with_idle_peer_finishes_after_head_timeout() {
        let (dir, _) = site();
        let addr = free_addr();
        let resolver = Resolver::new(DocumentRoot::new(dir.path()).unwrap());
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server = Server::bind(&addr.to_string())
            .unwrap()
            .head_timeout(Duration::from_millis(100));
        let handle = tokio::spawn(server.serve_with_shutdown(resolver, async {
            let _ = stopped.await;
        }));

        let mut idle = connect(addr).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.send(()).unwrap();

        let finished = tokio::time::timeout(Duration::from_secs(3), handle).await;
        assert!(finished.is_ok(), "shutdown hung on an idle connection");

        let mut out = String::new();
        idle.read_to_string(&mut out).await.unwrap();
        assert!(out.starts_with("HTTP/1.1 408 "), "{out}");
    }

    #[tokio::test]
    async fn drain_timeout_aborts_stuck_connections() {
        let (dir, _) = site();
        let addr = free_addr();
        let resolver = Resolver::new(DocumentRoot::new(dir.path()).unwrap());
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server = Server::bind(&addr.to_string())
            .unwrap()
            .head_timeout(Duration::from_secs(60))
            .drain_timeout(Duration::from_millis(100));
        let handle = tokio::spawn(server.serve_with_shutdown(resolver, async {
            let _ = stopped.await;
        }));

        let _idle = connect(addr).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.send(()).unwrap();

        let finished = tokio::time::timeout(Duration::from_secs(3), handle).await;
        assert!(finished.expect("shutdown hung").unwrap().is_ok());
    }
}
