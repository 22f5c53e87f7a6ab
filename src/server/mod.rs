//! HTTP server module
//!
//! Accepts connections with `hyper` on `tokio` and hands each request to the
//! handlers in [`handlers`]. One task per connection; requests share only the
//! immutable [`AppState`].
//!
//! # Example
//!
//! ```no_run
//! use apigate::config::Config;
//! use apigate::server::Server;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.yaml")?;
//! let server = Server::new(config).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::{AudienceType, AuthorizationGuard, SigningSecrets, TokenEndpoint, TokenIssuer};
use crate::config::{Config, ConfigError};
use crate::store::{CredentialStore, MemoryStore, StoreError};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

mod admin;
pub mod handlers;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Failed to load credential store: {0}")]
    StoreError(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Request-independent state shared by every connection
pub struct AppState {
    pub(crate) tokens: TokenEndpoint,
    pub(crate) admin_guard: AuthorizationGuard,
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) max_body_bytes: usize,
}

impl AppState {
    /// Wire the auth core from validated configuration
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> Self {
        let secrets = SigningSecrets::from_config(&config.jwt);

        Self {
            tokens: TokenEndpoint::new(Arc::clone(&store), TokenIssuer::new(&secrets)),
            admin_guard: AuthorizationGuard::new(&secrets, AudienceType::Internal),
            store,
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("admin_guard", &self.admin_guard)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

/// HTTP Server
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Create a server backed by the store file named in the configuration
    pub async fn new(config: Config) -> Result<Self, ServerError> {
        let store = MemoryStore::load(&config.store.path)?;
        Self::with_store(&config, Arc::new(store)).await
    }

    /// Create a server over an existing credential store
    ///
    /// Validates `config` and binds immediately; port 0 lets the OS pick a
    /// port.
    pub async fn with_store(
        config: &Config,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let addr = config
            .server
            .socket_addr()
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!("Server bound to {}", local_addr);

        Ok(Self {
            state: Arc::new(AppState::new(config, store)),
            listener,
            local_addr,
        })
    }

    /// Address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves
    ///
    /// Stops accepting new connections once `shutdown` completes; connections
    /// already accepted finish on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Starting server on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handlers::handle_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }

        info!("Shutting down server");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdminJwtConfig, JwtConfig, MetricsConfig, ServerConfig, StoreConfig};

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                address: "127.0.0.1:0".into(),
                max_body_bytes: 1024,
            },
            jwt: JwtConfig {
                signing_secret: "external-secret-0123456789abcdefghij".into(),
                admin: AdminJwtConfig {
                    signing_secret: "internal-secret-0123456789abcdefghij".into(),
                },
            },
            store: StoreConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let server = Server::with_store(&test_config(), Arc::new(MemoryStore::default()))
            .await
            .unwrap();
        assert!(server.local_addr().port() > 0);
    }

    #[tokio::test]
    async fn test_server_invalid_address() {
        let mut config = test_config();
        config.server.address = "invalid".into();
        let server = Server::with_store(&config, Arc::new(MemoryStore::default())).await;
        assert!(matches!(server, Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_signing_secrets_refuse_to_start() {
        let mut config = test_config();
        config.jwt.signing_secret = String::new();
        config.jwt.admin.signing_secret = String::new();

        let server = Server::with_store(&config, Arc::new(MemoryStore::default())).await;

        assert!(matches!(
            server,
            Err(ServerError::Config(ConfigError::ValidationError(_)))
        ));
    }

    #[tokio::test]
    async fn test_short_admin_secret_refuses_to_start() {
        let mut config = test_config();
        config.jwt.admin.signing_secret = "short".into();

        let server = Server::with_store(&config, Arc::new(MemoryStore::default())).await;

        assert!(matches!(server, Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_store_file() {
        let mut config = test_config();
        config.store.path = "/nonexistent/apigate/principals.yaml".into();
        let server = Server::new(config).await;
        assert!(matches!(server, Err(ServerError::StoreError(_))));
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let server = Server::with_store(&test_config(), Arc::new(MemoryStore::default()))
            .await
            .unwrap();
        let result = server.run_until(async {}).await;
        assert!(result.is_ok());
    }
}
