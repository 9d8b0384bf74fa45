//! Supervised TCP listener with graceful and forced shutdown.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Run the accept loop as a tracked background task
//! - Serve each connection (HTTP/1.1 and HTTP/2) on its own task
//! - Stop gracefully within a deadline, force-close after it
//!
//! # Shutdown
//! ```text
//! stop requested
//!     → accept loop exits, socket dropped
//!     → every connection asked to finish its in-flight request and close
//!     → supervisor waits for all connections
//! deadline expired
//!     → supervisor aborted, which drops (and aborts) every connection task
//!     → HTTP/1.1: the in-flight handler future is dropped with its connection
//!     → HTTP/2: the socket closes, but stream handlers run on their own
//!       executor tasks and are not aborted with it
//! ```
//!
//! "Force-closed" is not "handler cancelled" for HTTP/2: a stream handler
//! ends only when it completes or when hyper observes the stream reset, and
//! its latency sample is recorded at that point, not at the deadline.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Body, extract::ConnectInfo, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tower::Service;
use tracing::Instrument;

use crate::net::connection::{ConnectionGuard, ConnectionTracker};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind(e) | ListenerError::Accept(e) => Some(e),
        }
    }
}

/// Why a listener did not stop cleanly.
#[derive(Debug, Error)]
pub enum StopError {
    #[error("graceful stop exceeded {timeout:?}, force-closed {abandoned} open connection(s)")]
    Timeout { timeout: Duration, abandoned: u64 },

    #[error("listener had already failed: {0}")]
    Serve(#[source] ListenerError),

    #[error("listener task failed: {0}")]
    Task(#[from] JoinError),
}

/// Per-connection settings.
#[derive(Debug, Clone, Copy)]
pub struct ServeOptions {
    /// Upper bound for reading a request's headers.
    pub read_timeout: Duration,
}

/// A running listener: its bound socket, serving task and stop channel.
#[derive(Debug)]
pub struct ListenerHandle {
    name: &'static str,
    local_addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Result<(), ListenerError>>,
    connections: ConnectionTracker,
}

impl ListenerHandle {
    /// Bind `address` and start serving `app` in the background.
    pub async fn start(
        name: &'static str,
        address: &str,
        app: Router,
        options: ServeOptions,
    ) -> Result<Self, ListenerError> {
        let addr: SocketAddr = address.parse().map_err(|e| {
            ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let connections = ConnectionTracker::new();

        let span = tracing::info_span!("listener", listener = name, address = %local_addr);
        let tracker = connections.clone();
        let task = tokio::spawn(
            async move {
                tracing::info!("Listener started");
                let result = serve(listener, app, options, stop_rx, tracker).await;
                match &result {
                    Ok(()) => tracing::info!("Listener stopped"),
                    Err(e) => tracing::error!(error = %e, "HTTP server failed"),
                }
                result
            }
            .instrument(span),
        );

        Ok(Self {
            name,
            local_addr,
            stop_tx,
            task,
            connections,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections currently open on this listener.
    pub fn open_connections(&self) -> u64 {
        self.connections.active_count()
    }

    /// True once the serving task has ended, for any reason.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting, let in-flight requests finish within `timeout`, then
    /// force-close whatever is left.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<(), StopError> {
        self.stop_tx.send_replace(true);

        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(StopError::Serve(e)),
            Ok(Err(e)) => Err(StopError::Task(e)),
            Err(_) => {
                let abandoned = self.connections.active_count();
                self.task.abort();
                // Cancelled is the expected outcome here.
                let _ = (&mut self.task).await;
                Err(StopError::Timeout { timeout, abandoned })
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if !self.task.is_finished() {
            self.stop_tx.send_replace(true);
            self.task.abort();
        }
    }
}

/// Accept loop. Returns once stopped and every connection has closed.
async fn serve(
    listener: TcpListener,
    app: Router,
    options: ServeOptions,
    mut stop: watch::Receiver<bool>,
    tracker: ConnectionTracker,
) -> Result<(), ListenerError> {
    let mut builder = AutoBuilder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(options.read_timeout);

    // Dropping the sender tells every connection to drain.
    let (drain_tx, drain_rx) = watch::channel(());
    let mut connections = JoinSet::new();

    let result = loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, remote_addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) if is_connection_error(&e) => {
                        tracing::debug!(error = %e, "Transient accept error");
                        continue;
                    }
                    Err(e) => break Err(ListenerError::Accept(e)),
                };

                if let Err(e) = socket.set_nodelay(true) {
                    tracing::warn!(error = %e, "Failed to set TCP_NODELAY");
                }

                tracing::debug!(peer_addr = %remote_addr, "Connection accepted");
                connections.spawn(
                    serve_connection(
                        builder.clone(),
                        socket,
                        remote_addr,
                        app.clone(),
                        drain_rx.clone(),
                        tracker.track(),
                    )
                    .in_current_span(),
                );
            }
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                log_connection_exit(joined);
            }
            _ = stop.changed() => break Ok(()),
        }
    };

    drop(listener);
    drop(drain_tx);
    tracing::info!(
        open_connections = tracker.active_count(),
        "Stopped accepting connections, draining"
    );

    while let Some(joined) = connections.join_next().await {
        log_connection_exit(joined);
    }

    result
}

async fn serve_connection(
    builder: AutoBuilder<TokioExecutor>,
    socket: TcpStream,
    remote_addr: SocketAddr,
    app: Router,
    mut drain: watch::Receiver<()>,
    guard: ConnectionGuard,
) {
    let service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
        let mut app = app.clone();
        let mut request = request.map(Body::new);
        request.extensions_mut().insert(ConnectInfo(remote_addr));
        async move { app.call(request).await }
    });

    let conn = builder.serve_connection_with_upgrades(TokioIo::new(socket), service);
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(connection_id = %guard.id(), error = %e, "Connection closed with error");
                }
                break;
            }
            _ = drain.changed(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

fn log_connection_exit(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "Connection task panicked");
        }
    }
}

fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
    )
}
