//! HTTP capture listener
//!
//! Accepts HTTP/1.1 connections, runs one task per connection, and hands
//! every request to a [`CaptureContext`]. The store is owned by the caller and
//! shared through an `Arc`, so several listeners can run side by side in one
//! process without seeing each other's captures.

pub mod forward;
pub mod handler;

pub use forward::{Forwarder, HttpForwarder, NotForwarded};
pub use handler::CaptureContext;

use crate::capture::{CaptureStore, CapturedRequest};
use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::metrics::CaptureMetrics;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

pub struct CaptureListener {
    config: Config,
    store: Arc<CaptureStore>,
    metrics: Arc<CaptureMetrics>,
    forwarder: Arc<dyn Forwarder>,
}

impl CaptureListener {
    /// Listener in baseline mode: every capture is answered with 501.
    pub fn new(config: Config, store: Arc<CaptureStore>, metrics: Arc<CaptureMetrics>) -> Self {
        Self {
            config,
            store,
            metrics,
            forwarder: Arc::new(NotForwarded),
        }
    }

    /// Builds the store, metrics and forwarder described by `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let metrics = Arc::new(CaptureMetrics::new());
        let store = Arc::new(CaptureStore::new(config.store.capacity).with_metrics(metrics.clone()));
        let forwarder: Arc<dyn Forwarder> = if config.forwarding.enabled {
            Arc::new(HttpForwarder::from_config(&config)?)
        } else {
            Arc::new(NotForwarded)
        };

        Ok(Self {
            config,
            store,
            metrics,
            forwarder,
        })
    }

    pub fn with_forwarder(mut self, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forwarder = forwarder;
        self
    }

    pub fn store(&self) -> &Arc<CaptureStore> {
        &self.store
    }

    /// Binds the listening socket and starts accepting connections.
    pub async fn bind(self) -> Result<ListenerHandle> {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let upstreams = &self.config.upstreams;
        info!(
            address = %local_addr,
            embedding_upstream = %format_args!("{}:{}", upstreams.embedding.host, upstreams.embedding.port),
            vector_store_upstream = %format_args!("{}:{}", upstreams.vector_store.host, upstreams.vector_store.port),
            forwarding = self.config.forwarding.enabled,
            capacity = self.store.capacity(),
            "Capture listener started"
        );

        let context = Arc::new(CaptureContext {
            store: self.store.clone(),
            classifier: self.config.classifier(),
            redaction: self.config.redaction_policy(),
            forwarder: self.forwarder,
            metrics: self.metrics.clone(),
            read_timeout: self.config.read_timeout(),
            max_body_bytes: self.config.listener.max_body_bytes,
            body_preview_chars: self.config.redaction.body_preview_chars,
        });

        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        let accept_task = tokio::spawn(accept_loop(
            listener,
            context,
            tracker.clone(),
            shutdown.clone(),
        ));

        Ok(ListenerHandle {
            local_addr,
            shutdown,
            accept_task,
            tracker,
            store: self.store,
            metrics: self.metrics,
            shutdown_grace: self.config.shutdown_grace(),
        })
    }
}

/// Running listener. Dropping the handle stops accepting new connections;
/// call [`ListenerHandle::stop`] to also drain in-flight requests and close
/// the store.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    accept_task: JoinHandle<()>,
    tracker: TaskTracker,
    store: Arc<CaptureStore>,
    metrics: Arc<CaptureMetrics>,
    shutdown_grace: Duration,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn store(&self) -> &Arc<CaptureStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<CaptureMetrics> {
        &self.metrics
    }

    /// Captures recorded so far, oldest first
    pub fn captured(&self) -> Vec<Arc<CapturedRequest>> {
        self.store.snapshot()
    }

    /// Releases the socket, lets in-flight requests finish within the grace
    /// period, then closes the store.
    pub async fn stop(mut self) -> Result<()> {
        self.shutdown.cancel();
        (&mut self.accept_task)
            .await
            .map_err(|e| ServerError::Join(e.to_string()))?;

        self.tracker.close();
        info!(
            active_connections = self.tracker.len(),
            timeout_ms = self.shutdown_grace.as_millis() as u64,
            "Waiting for active connections to drain"
        );
        if tokio::time::timeout(self.shutdown_grace, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                active_connections = self.tracker.len(),
                "Shutdown grace period elapsed, closing store with requests in flight"
            );
        }

        self.store.close();
        info!(
            captured = self.store.len(),
            evicted = self.store.evicted_count(),
            "Capture listener stopped"
        );
        Ok(())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    context: Arc<CaptureContext>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    tracker.spawn(serve_connection(
                        stream,
                        peer_addr,
                        context.clone(),
                        shutdown.child_token(),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    // Avoid a hot loop on persistent errors such as fd exhaustion.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received, stopping new connections");
                break;
            }
        }
    }
    // The listener is dropped here, which releases the port.
}

async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    context: Arc<CaptureContext>,
    shutdown: CancellationToken,
) {
    context.metrics.connection_opened();
    debug!(peer = %peer_addr, "Accepted connection");

    let io = TokioIo::new(stream);
    let service_context = context.clone();
    let service = service_fn(move |request| {
        let context = service_context.clone();
        async move { Ok::<_, Infallible>(context.handle(request).await) }
    });

    let conn = http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(context.read_timeout)
        .serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = &mut conn => {
            if let Err(e) = result {
                debug!(peer = %peer_addr, error = %e, "Connection closed with error");
            }
        }
        _ = shutdown.cancelled() => {
            conn.as_mut().graceful_shutdown();
            if let Err(e) = conn.await {
                debug!(peer = %peer_addr, error = %e, "Connection error during shutdown");
            }
        }
    }

    context.metrics.connection_closed();
}
