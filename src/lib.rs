//! Apigate Library
//!
//! Management API for a reverse-proxy configuration store.
//!
//! # Features
//!
//! - **Two Audiences**: service accounts get `external` tokens, operators get
//!   `internal` tokens, each signed with its own secret
//! - **Timing-Safe Credentials**: unknown identifiers cost a full bcrypt
//!   comparison, same as a wrong secret
//! - **Guarded Admin API**: every `/admin/*` route requires an internal token
//! - **Stateless Tokens**: HS256 JWTs, nothing stored server-side
//!
//! # Example
//!
//! ```no_run
//! use apigate::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod metrics;
pub mod model;
pub mod router;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
