//! Shared utilities for ingress integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use addon_ingress::config::{AddonConfig, IngressConfig, PanelConfig};
use addon_ingress::http::HttpServer;
use addon_ingress::lifecycle::Shutdown;
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const API_KEY: &str = "test-api-key";

/// Start an axum app on an ephemeral port, standing in for an add-on.
pub async fn start_backend(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn addon(slug: &str, token: &str, backend: SocketAddr, stream: bool) -> AddonConfig {
    AddonConfig {
        slug: slug.into(),
        token: token.into(),
        address: backend.ip().to_string(),
        port: backend.port(),
        stream,
        panel: PanelConfig {
            title: slug.to_uppercase(),
            icon: Some("mdi:puzzle".into()),
            admin: false,
            enabled: true,
        },
    }
}

pub fn config(addons: Vec<AddonConfig>) -> IngressConfig {
    let mut config = IngressConfig::default();
    config.api.api_key = API_KEY.into();
    config.addons = addons;
    config
}

/// A running ingress instance, stopped on drop.
pub struct TestIngress {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub config_updates: mpsc::UnboundedSender<IngressConfig>,
    shutdown: Shutdown,
}

impl TestIngress {
    pub async fn start(config: IngressConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let (config_updates, updates_rx) = mpsc::unbounded_channel();

        let server = HttpServer::new(config);
        let server_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, updates_rx, server_shutdown).await;
        });

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            addr,
            client,
            config_updates,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Issue a session through the privileged API.
    pub async fn session(&self) -> String {
        let res = self
            .client
            .post(self.url("/session"))
            .bearer_auth(API_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        body["data"]["session"].as_str().unwrap().to_string()
    }

    pub fn cookie(session: &str) -> String {
        format!("ingress_session={}", session)
    }
}

impl Drop for TestIngress {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
