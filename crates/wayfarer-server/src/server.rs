//! The hyper serve loop.
//!
//! One Tokio task per connection. The body of each request is collected
//! up front, bounded by the configured body limit, so the pipeline and
//! handlers only ever see complete [`bytes::Bytes`] bodies. A body that
//! exceeds the bound while streaming is rejected with the same 413 the
//! in-pipeline bound produces.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use wayfarer_core::AppError;
use wayfarer_middleware::{ClientAddr, Response};

use crate::app::App;
use crate::config::ServerConfig;

/// Errors from the serve loop itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The bind address could not be parsed.
    #[error("invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    /// A socket operation failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// The HTTP server: an [`App`] bound to an address.
pub struct Server {
    app: Arc<App>,
    config: ServerConfig,
}

impl Server {
    /// Creates a server over an assembled application.
    #[must_use]
    pub fn new(app: App, config: ServerConfig) -> Self {
        Self {
            app: Arc::new(app),
            config,
        }
    }

    /// Serves until interrupted (Ctrl-C).
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            // Failure to install the handler would leave no way to stop.
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Serves until the given future resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: std::future::Future<Output = ()>,
    {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            addr = %addr,
            environment = %self.config.environment(),
            "server listening"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown signal received");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    let app = Arc::clone(&self.app);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |request| {
                            serve_request(Arc::clone(&app), peer, request)
                        });
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            tracing::debug!(peer = %peer, error = %err, "connection closed");
                        }
                    });
                }
            }
        }
    }
}

async fn serve_request(
    app: Arc<App>,
    peer: SocketAddr,
    request: http::Request<Incoming>,
) -> Result<Response, Infallible> {
    let limit = app.body_limit();
    let (parts, body) = request.into_parts();

    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            let app_err = if err.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                AppError::payload_too_large(limit)
            } else {
                AppError::internal(format!("body read failure: {err}"))
            };
            return Ok(app.render_error(&app_err));
        }
    };

    let mut request = http::Request::from_parts(parts, bytes);
    request.extensions_mut().insert(ClientAddr(peer));
    Ok(app.handle(request).await)
}
