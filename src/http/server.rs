//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the status route and the pass-through pipeline
//! - Wire up middleware (request ID, tracing, browser gate, timeout, body limit)
//! - Bind server to listener
//! - Apply gate settings from config reloads
//! - Graceful shutdown

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::DevGateConfig;
use crate::gate::{browser_gate_middleware, BrowserGate, SharedGate};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::upstream::{Pipeline, UpstreamError};
use crate::lifecycle::ShutdownHandle;
use crate::observability::metrics;

/// Path of the built-in status endpoint.
pub const STATUS_PATH: &str = "/__devgate/status";

/// Error type for server setup and operation.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("pipeline setup failed: {0}")]
    Pipeline(#[from] UpstreamError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub version: &'static str,
    pub status: &'static str,
    pub gate: GateStatus,
}

#[derive(Debug, Serialize)]
pub struct GateStatus {
    pub enabled: bool,
    pub blocked_major: u32,
}

/// The dev-server front.
pub struct DevGateServer {
    router: Router,
    config: DevGateConfig,
    gate: SharedGate,
}

impl DevGateServer {
    /// Create a new server with the given configuration.
    pub fn new(config: DevGateConfig) -> Result<Self, ServerError> {
        let gate = SharedGate::new(BrowserGate::new(config.gate));
        let pipeline = Pipeline::from_config(&config.pipeline)?;

        tracing::info!(pipeline = %pipeline.describe(), "Pipeline configured");

        let router = Self::build_router(&config, gate.clone(), pipeline);
        Ok(Self {
            router,
            config,
            gate,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The gate sits outside the body limit and timeout so blocked browsers
    /// always get the diagnostic page.
    fn build_router(config: &DevGateConfig, gate: SharedGate, pipeline: Pipeline) -> Router {
        Router::new()
            .route(STATUS_PATH, get(get_status))
            .with_state(gate.clone())
            .merge(pipeline.into_router())
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(middleware::from_fn_with_state(gate, browser_gate_middleware))
            .layer(middleware::from_fn(track_requests))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(req.headers()),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }))
            .layer(set_request_id_layer())
    }

    /// The router, for embedding or driving without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the live gate settings.
    pub fn gate(&self) -> SharedGate {
        self.gate.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &DevGateConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Gate settings from `config_updates` take effect immediately. The server
    /// stops accepting once `shutdown` resolves and returns after in-flight
    /// requests finish.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<DevGateConfig>,
        mut shutdown: ShutdownHandle,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        tokio::spawn(apply_config_updates(
            self.config.clone(),
            self.gate.clone(),
            config_updates,
            shutdown.clone(),
        ));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let reason = shutdown.stopped().await;
                tracing::info!(%reason, "Stopping HTTP server");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swap in gate settings from each reloaded config.
async fn apply_config_updates(
    mut current: DevGateConfig,
    gate: SharedGate,
    mut updates: mpsc::UnboundedReceiver<DevGateConfig>,
    mut shutdown: ShutdownHandle,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(new_config) = update else { break };

                if new_config.gate != current.gate {
                    gate.update(new_config.gate);
                    tracing::info!(
                        enabled = new_config.gate.enabled,
                        blocked_major = new_config.gate.blocked_major,
                        "Gate settings reloaded"
                    );
                }

                let mut rest = new_config.clone();
                rest.gate = current.gate;
                if rest != current {
                    tracing::warn!("Configuration changes outside [gate] require a restart");
                }

                current = new_config;
            }
            _ = shutdown.stopped() => break,
        }
    }
}

async fn get_status(State(gate): State<SharedGate>) -> Json<StatusReport> {
    let gate = gate.load();
    Json(StatusReport {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        gate: GateStatus {
            enabled: gate.enabled(),
            blocked_major: gate.blocked_major(),
        },
    })
}

async fn track_requests(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let response = next.run(req).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
