//! Per-request gate decision.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::config::GateConfig;
use crate::gate::notice::NOTICE_HTML;
use crate::gate::signature::UserAgentSignature;

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Let the request continue down the middleware chain.
    Forward,
    /// Answer the request directly; no later handler runs.
    RespondWith(GateResponse),
}

impl GateDecision {
    pub fn is_forward(&self) -> bool {
        matches!(self, GateDecision::Forward)
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::Forward => "forward",
            GateDecision::RespondWith(_) => "respond",
        }
    }
}

/// A canned response produced by the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GateResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl GateResponse {
    /// The diagnostic page for blocked browser builds.
    pub fn notice() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        Self {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(NOTICE_HTML.as_bytes()),
        }
    }
}

impl IntoResponse for GateResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Browser-version gate.
///
/// Stateless: a decision depends only on the request headers and the gate's
/// own immutable settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserGate {
    enabled: bool,
    blocked_major: u32,
}

impl BrowserGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            enabled: config.enabled,
            blocked_major: config.blocked_major,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn blocked_major(&self) -> u32 {
        self.blocked_major
    }

    /// Decide what to do with a request based on its headers.
    pub fn evaluate(&self, headers: &HeaderMap) -> GateDecision {
        if !self.enabled {
            return GateDecision::Forward;
        }
        self.decide(UserAgentSignature::from_headers(headers))
    }

    /// Decision step on an already-extracted signature.
    pub fn decide(&self, signature: Option<UserAgentSignature>) -> GateDecision {
        match signature {
            Some(sig) if self.enabled && sig.major == self.blocked_major => {
                GateDecision::RespondWith(GateResponse::notice())
            }
            _ => GateDecision::Forward,
        }
    }
}

impl Default for BrowserGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}
