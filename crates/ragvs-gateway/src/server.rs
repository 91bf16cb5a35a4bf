use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use ragvs_core::RagService;
use ragvs_llm::any::AnyProvider;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::router::{RouterOptions, build_router};

pub type SharedService = Arc<RagService<AnyProvider>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub service: SharedService,
    pub started_at: Instant,
}

pub struct GatewayServer {
    addr: SocketAddr,
    options: RouterOptions,
    service: SharedService,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayServer {
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        service: SharedService,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let addr: SocketAddr = format!("{bind}:{port}").parse().unwrap_or_else(|e| {
            tracing::warn!("invalid bind '{bind}': {e}, falling back to 127.0.0.1:{port}");
            SocketAddr::from(([127, 0, 0, 1], port))
        });

        if bind == "0.0.0.0" {
            tracing::warn!("gateway binding to 0.0.0.0, all interfaces are exposed");
        }

        Self {
            addr,
            options: RouterOptions::default(),
            service,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, token: Option<String>) -> Self {
        self.options.auth_token = token;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, limit: u32) -> Self {
        self.options.rate_limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.options.max_body_size = size;
        self
    }

    #[must_use]
    pub fn with_cors(mut self, allow_any: bool) -> Self {
        self.options.cors_allow_any = allow_any;
        self
    }

    /// Serve until the shutdown channel flips to `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or encounters a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let state = AppState {
            service: self.service,
            started_at: Instant::now(),
        };

        let router = build_router(state, self.options);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| GatewayError::Bind(self.addr.to_string(), e))?;
        tracing::info!("gateway listening on {}", self.addr);

        let mut shutdown_rx = self.shutdown_rx;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            tracing::info!("gateway shutting down");
        })
        .await
        .map_err(|e| GatewayError::Server(format!("{e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ragvs_core::config::RagConfig;
    use ragvs_llm::mock::MockProvider;
    use ragvs_memory::{SqliteStore, StoreHandle};

    use super::*;

    async fn service() -> SharedService {
        Arc::new(RagService::new(
            AnyProvider::Mock(MockProvider::default()),
            StoreHandle::qdrant(None, "test"),
            SqliteStore::new(":memory:").await.unwrap(),
            &RagConfig::default(),
        ))
    }

    #[tokio::test]
    async fn server_builder_chain() {
        let (_stx, srx) = watch::channel(false);
        let server = GatewayServer::new("127.0.0.1", 8000, service().await, srx)
            .with_auth(Some("token".into()))
            .with_rate_limit(60)
            .with_max_body_size(512)
            .with_cors(false);

        assert_eq!(server.options.rate_limit, 60);
        assert_eq!(server.options.max_body_size, 512);
        assert!(server.options.auth_token.is_some());
        assert!(!server.options.cors_allow_any);
    }

    #[tokio::test]
    async fn server_invalid_bind_fallback() {
        let (_stx, srx) = watch::channel(false);
        let server = GatewayServer::new("not_an_ip", 9999, service().await, srx);
        assert_eq!(server.addr.port(), 9999);
        assert!(server.addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown_signal() {
        let (stx, srx) = watch::channel(false);
        let server = GatewayServer::new("127.0.0.1", 0, service().await, srx);
        let handle = tokio::spawn(server.serve());
        stx.send(true).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
