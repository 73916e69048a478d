//! Admin API server.

use crate::admin_api::router::{route_request, RouterState};
use crate::namespace::NamespaceRegistry;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// HTTP server for control operations and proxied calls.
pub struct AdminApiServer {
    listener: TcpListener,
    state: Arc<RouterState>,
}

impl AdminApiServer {
    /// Bind the listener. Port 0 picks a free port; see [`Self::local_addr`].
    pub async fn bind(
        addr: SocketAddr,
        control_prefix: &str,
        registry: Arc<NamespaceRegistry>,
    ) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            state: Arc::new(RouterState {
                registry,
                control_prefix: control_prefix.to_string(),
                local_addr,
            }),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.state.local_addr
    }

    /// Serve until the process exits.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Serve until `shutdown` completes. In-flight connections are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Mockspace listening on http://{} (control prefix /{})",
            self.state.local_addr, self.state.control_prefix
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let io = TokioIo::new(stream);
                            let state = Arc::clone(&self.state);

                            tokio::spawn(async move {
                                let service = service_fn(move |req| {
                                    let state = Arc::clone(&state);
                                    async move { route_request(req, state).await }
                                });

                                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                    debug!("Connection error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Mockspace server shutting down");
                    return Ok(());
                }
            }
        }
    }
}
