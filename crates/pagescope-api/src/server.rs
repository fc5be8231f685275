// Pagescope
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! HTTP server implementation using Hyper

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::router::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// API server using Hyper
pub struct ApiServer {
    listener: TcpListener,
    router: Arc<Router>,
}

impl ApiServer {
    /// Bind the configured address and build the analysis pipeline
    pub async fn bind(config: Config) -> ApiResult<Self> {
        let bind_address: SocketAddr = config.bind_address.parse().map_err(|e| ApiError::Config {
            message: format!("Invalid bind address: {}", e),
        })?;

        let router = Router::from_config(config)?;
        let listener = TcpListener::bind(bind_address).await?;

        info!("API server created successfully");
        Ok(Self::with_router(listener, router))
    }

    /// Serve `router` on an already bound listener
    pub fn with_router(listener: TcpListener, router: Router) -> Self {
        Self {
            listener,
            router: Arc::new(router),
        }
    }

    /// Get the bound address
    pub fn local_addr(&self) -> ApiResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the server
    pub async fn run(self) -> ApiResult<()> {
        info!("Pagescope API listening on http://{}", self.local_addr()?);

        // Accept connections
        loop {
            let (stream, remote_addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            // Spawn a task to handle the connection
            tokio::task::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let router = router.clone();
                    async move { Ok::<_, Infallible>(router.handle(req).await) }
                });

                // Serve the connection
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_bind_address_is_a_config_error() {
        let mut config = Config::from_lookup(|_| None);
        config.bind_address = "not-an-address".to_string();
        config.analysis.audit_enabled = false;

        let err = ApiServer::bind(config).await.err().unwrap();
        assert!(matches!(err, ApiError::Config { .. }));
        assert!(err.to_string().starts_with("Invalid configuration: Invalid bind address"));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let mut config = Config::from_lookup(|_| None);
        config.bind_address = "127.0.0.1:0".to_string();
        config.analysis.audit_enabled = false;

        let server = ApiServer::bind(config).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }
}
