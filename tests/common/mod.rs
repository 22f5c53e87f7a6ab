//! Shared test fixtures
//!
//! - Signing secrets and a matching `Config`
//! - A seeded `MemoryStore` (cost-10 bcrypt hashes, as the store requires)
//! - A running HTTP server on an ephemeral port

#![allow(dead_code)]

use apigate::auth::SigningSecrets;
use apigate::config::{
    AdminJwtConfig, Config, JwtConfig, MetricsConfig, ServerConfig, StoreConfig,
};
use apigate::server::Server;
use apigate::store::MemoryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;

pub const EXTERNAL_SECRET: &str = "external-secret-0123456789abcdefghij";
pub const INTERNAL_SECRET: &str = "internal-secret-0123456789abcdefghij";

/// bcrypt("s3cr3t"), cost 10
pub const CLIENT_SECRET_HASH: &str =
    "$2b$10$CYQfOFIpaec8OXJWKFxQEeGTBjFF0MgvYPnrV3zsJUZ2HFElCRd9e";

/// bcrypt("hunter2-admin"), cost 10
pub const PASSWORD_HASH: &str = "$2b$10$.adD5laBgVDvmf22Gm7mv.kQaRlDbwv3zF7wRnx6ktj6ViVpNI1.W";

pub const SEED_YAML: &str = r#"
service_accounts:
  - id: 1
    org_id: 7
    identifier: "billing-sync"
    client_id: "c1"
    client_secret_hash: "$2b$10$CYQfOFIpaec8OXJWKFxQEeGTBjFF0MgvYPnrV3zsJUZ2HFElCRd9e"
  - id: 2
    org_id: 7
    identifier: "retired-job"
    client_id: "c2"
    client_secret_hash: "$2b$10$CYQfOFIpaec8OXJWKFxQEeGTBjFF0MgvYPnrV3zsJUZ2HFElCRd9e"
    inactivated_at: "2024-01-01T00:00:00Z"
internal_users:
  - id: 10
    email: "ops@example.com"
    password_hash: "$2b$10$.adD5laBgVDvmf22Gm7mv.kQaRlDbwv3zF7wRnx6ktj6ViVpNI1.W"
  - id: 11
    email: "former@example.com"
    password_hash: "$2b$10$.adD5laBgVDvmf22Gm7mv.kQaRlDbwv3zF7wRnx6ktj6ViVpNI1.W"
    inactivated_at: "2024-01-01T00:00:00Z"
"#;

pub fn secrets() -> SigningSecrets {
    SigningSecrets::new(EXTERNAL_SECRET, INTERNAL_SECRET)
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            address: "127.0.0.1:0".to_string(),
            max_body_bytes: 1024,
        },
        jwt: JwtConfig {
            signing_secret: EXTERNAL_SECRET.to_string(),
            admin: AdminJwtConfig {
                signing_secret: INTERNAL_SECRET.to_string(),
            },
        },
        store: StoreConfig::default(),
        metrics: MetricsConfig {
            enabled: false,
            port: 0,
        },
    }
}

pub fn seeded_store() -> MemoryStore {
    MemoryStore::from_yaml_str(SEED_YAML).expect("seed should parse")
}

/// A server running on an ephemeral port; stopped on drop
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let server = Server::with_store(&test_config(), Arc::new(seeded_store()))
            .await
            .expect("server should bind");
        let addr = server.local_addr();

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = server
                .run_until(async {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            shutdown: Some(tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
