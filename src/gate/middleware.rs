//! Browser gate middleware.
//! Runs the gate ahead of the rest of the dev-server pipeline.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::GateConfig;
use crate::gate::decision::{BrowserGate, GateDecision};
use crate::gate::signature::UserAgentSignature;
use crate::observability::metrics;

/// Gate handle shared between the middleware and the config reload task.
#[derive(Clone, Debug)]
pub struct SharedGate {
    inner: Arc<ArcSwap<BrowserGate>>,
}

impl SharedGate {
    pub fn new(gate: BrowserGate) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(gate)),
        }
    }

    /// Current gate snapshot.
    pub fn load(&self) -> BrowserGate {
        **self.inner.load()
    }

    /// Replace the gate settings. In-flight requests keep the snapshot they read.
    pub fn update(&self, config: GateConfig) {
        self.inner.store(Arc::new(BrowserGate::new(config)));
    }
}

impl Default for SharedGate {
    fn default() -> Self {
        Self::new(BrowserGate::default())
    }
}

pub async fn browser_gate_middleware(
    State(gate): State<SharedGate>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let decision = gate.load().evaluate(req.headers());
    metrics::record_gate_decision(decision.as_str());

    match decision {
        GateDecision::Forward => next.run(req).await,
        GateDecision::RespondWith(response) => {
            let signature = UserAgentSignature::from_headers(req.headers());
            tracing::info!(
                browser = ?signature.map(|s| s.to_string()),
                path = %req.uri().path(),
                "Blocked browser build, serving diagnostic page"
            );
            response.into_response()
        }
    }
}
