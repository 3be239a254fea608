//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with ingress and API handlers
//! - Wire up middleware (tracing, request ID, body limits, decompression)
//! - Bind server to listener and run background tasks
//! - Gate ingress requests ahead of any body handling
//! - Dispatch admitted requests: resolve → transform → HTTP or WebSocket

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{FromRequestParts, State, WebSocketUpgrade},
    http::{HeaderName, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    decompression::RequestDecompressionLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::{self, auth::privileged_caller};
use crate::config::IngressConfig;
use crate::error::IngressError;
use crate::http::proxy::{upstream_client, HttpProxy};
use crate::http::request::{
    is_websocket_upgrade, peer_ip, requested_protocols, session_cookie, split_ingress_path,
    ProxiedRequest,
};
use crate::http::websocket::{self, RelayTarget};
use crate::lifecycle::shutdown::wait as shutdown_signal;
use crate::observability::metrics;
use crate::routing::{ConfigRegistry, RouteResolver};
use crate::security::guards::{self, GuardContext};
use crate::security::headers::outbound_request_headers;
use crate::session::{MemorySessionStore, SessionGate};

/// Request bodies accepted by the JSON API.
const API_BODY_LIMIT: usize = 64 * 1024;

/// Request-independent settings shared by every handler.
#[derive(Debug, Clone)]
pub struct IngressSettings {
    pub cookie_name: String,
    pub token_headers: Vec<HeaderName>,
    pub require_privileged_caller: bool,
    pub api_key: String,
}

impl IngressSettings {
    pub fn from_config(config: &IngressConfig) -> Self {
        let token_headers = config
            .proxy
            .token_headers
            .iter()
            .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
            .collect();

        Self {
            cookie_name: config.proxy.cookie_name.clone(),
            token_headers,
            require_privileged_caller: config.proxy.require_privileged_caller,
            api_key: config.api.api_key.clone(),
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: SessionGate,
    pub resolver: RouteResolver,
    pub proxy: HttpProxy,
    pub settings: Arc<IngressSettings>,
}

impl AppState {
    pub fn guard_context(&self) -> GuardContext<'_> {
        GuardContext {
            api_key: &self.settings.api_key,
            token_headers: &self.settings.token_headers,
        }
    }
}

/// HTTP server for the ingress.
pub struct HttpServer {
    router: Router,
    sessions: Option<MemorySessionStore>,
    registry: Option<Arc<ConfigRegistry>>,
    purge_interval: Duration,
}

impl HttpServer {
    /// Create a server backed by the in-memory session store and the config add-on table.
    pub fn new(config: IngressConfig) -> Self {
        let sessions = MemorySessionStore::new(Duration::from_secs(config.session.ttl_secs));
        let registry = Arc::new(ConfigRegistry::new(&config.addons));

        let state = AppState {
            gate: SessionGate::new(Arc::new(sessions.clone())),
            resolver: RouteResolver::new(registry.clone()),
            proxy: HttpProxy::new(
                upstream_client(),
                config.proxy.buffer_threshold_bytes,
                config.proxy.stream_chunk_bytes,
            ),
            settings: Arc::new(IngressSettings::from_config(&config)),
        };

        Self {
            router: Self::build_router(state),
            sessions: Some(sessions),
            registry: Some(registry),
            purge_interval: Duration::from_secs(config.session.purge_interval_secs),
        }
    }

    /// Create a server around externally built state (custom store or registry).
    ///
    /// No purge task runs and config updates are ignored.
    pub fn with_state(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
            sessions: None,
            registry: None,
            purge_interval: Duration::from_secs(60),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        // The gate wraps decompression so rejected requests never touch the body.
        let ingress = Router::new()
            .route("/{token}/", any(ingress_handler))
            .route("/{token}/{*path}", any(ingress_handler))
            .layer(RequestDecompressionLayer::new())
            .route_layer(middleware::from_fn_with_state(state.clone(), ingress_gate));

        let privileged = Router::new()
            .route("/session", post(api::handlers::create_session))
            .route("/validate_session", post(api::handlers::validate_session))
            .route_layer(middleware::from_fn_with_state(state.clone(), privileged_caller));

        let json_api = Router::new()
            .route("/panels", get(api::handlers::panels))
            .merge(privileged)
            .layer(RequestBodyLimitLayer::new(API_BODY_LIMIT));

        Router::new()
            .merge(ingress)
            .merge(json_api)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Validated configs received on `config_updates` replace the add-on table.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<IngressConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Ingress server starting");

        if let Some(sessions) = self.sessions {
            let interval = self.purge_interval;
            let purge_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                sessions.run_purge(interval, purge_shutdown).await;
            });
        }

        if let Some(registry) = self.registry {
            let mut reload_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        update = config_updates.recv() => match update {
                            Some(config) => registry.replace(&config.addons),
                            None => return,
                        },
                        _ = reload_shutdown.recv() => return,
                    }
                }
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("Ingress server stopped");
        Ok(())
    }
}

/// Admission for `/{token}/{path}`: privileged guard, then session gate.
async fn ingress_gate(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let response = match admit(&state, &request) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::debug!(method = %method, error = %e, "Ingress request rejected");
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

fn admit(state: &AppState, request: &Request<Body>) -> Result<(), IngressError> {
    if state.settings.require_privileged_caller {
        guards::enforce(guards::PRIVILEGED, request.headers(), &state.guard_context())?;
    }

    let credential = session_cookie(request.headers(), &state.settings.cookie_name);
    if !state.gate.authorize(credential) {
        return Err(IngressError::Unauthorized);
    }
    Ok(())
}

/// Handler for admitted ingress requests.
async fn ingress_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let method = request.method().clone();

    match dispatch(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(method = %method, error = %e, "Ingress request failed");
            e.into_response()
        }
    }
}

async fn dispatch(state: &AppState, request: Request<Body>) -> Result<Response, IngressError> {
    let (mut parts, body) = request.into_parts();

    let (token, path) = split_ingress_path(parts.uri.path())
        .map(|(token, path)| (token.to_string(), path.to_string()))
        .ok_or_else(|| IngressError::UnknownToken(String::new()))?;
    let backend = state.resolver.resolve(&token)?;

    let peer = peer_ip(&parts.extensions).ok_or(IngressError::MissingPeerAddress)?;
    let headers = outbound_request_headers(&parts.headers, Some(peer), &state.settings.token_headers)?;
    let query = parts.uri.query().map(str::to_string);

    if is_websocket_upgrade(&parts.headers) {
        let protocols = requested_protocols(&parts.headers);
        let ws = match WebSocketUpgrade::from_request_parts(&mut parts, state).await {
            Ok(ws) => ws,
            Err(rejection) => return Ok(rejection.into_response()),
        };
        let target = RelayTarget {
            url: backend.url(&path, query.as_deref()),
            slug: backend.slug,
            headers,
            protocols,
        };
        return Ok(websocket::upgrade(ws, state.proxy.plain_client(), target));
    }

    let body = state.proxy.prepare_body(&parts.method, &backend, body).await?;
    let request = ProxiedRequest {
        method: parts.method,
        path,
        query,
        headers,
        body,
        peer,
    };
    let response = state.proxy.forward(&backend, request).await?;
    Ok(response.into_response())
}
