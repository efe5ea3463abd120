//! Pass-through pipeline for requests the gate forwards.
//!
//! # Responsibilities
//! - Proxy requests to an upstream dev server, streaming the response back
//! - Or serve a static directory when no upstream is configured
//! - Strip hop-by-hop headers in both directions
//! - Map upstream failures to 502 Bad Gateway

use std::path::PathBuf;
use std::str::FromStr;

use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use url::Url;

use crate::config::PipelineConfig;
use crate::http::request::request_id;
use crate::observability::metrics;

/// Headers that only apply to a single connection hop.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Error building an upstream target from a configured URL.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),

    #[error("upstream url has no host")]
    MissingHost,

    #[error("invalid upstream authority: {0}")]
    Authority(#[from] axum::http::uri::InvalidUri),
}

/// Where forwarded requests end up.
#[derive(Debug, Clone)]
pub enum Pipeline {
    Proxy(Arc<UpstreamProxy>),
    Static(PathBuf),
}

impl Pipeline {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, UpstreamError> {
        match &config.upstream {
            Some(upstream) => Ok(Pipeline::Proxy(Arc::new(UpstreamProxy::new(upstream)?))),
            None => Ok(Pipeline::Static(config.static_root.clone())),
        }
    }

    /// Router whose fallback runs this pipeline.
    pub fn into_router(self) -> Router {
        match self {
            Pipeline::Proxy(proxy) => Router::new()
                .fallback(proxy_handler)
                .with_state(proxy),
            Pipeline::Static(root) => Router::new().fallback_service(ServeDir::new(root)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Pipeline::Proxy(proxy) => format!("proxy to http://{}", proxy.authority()),
            Pipeline::Static(root) => format!("static files from {}", root.display()),
        }
    }
}

/// Reverse proxy to a single upstream dev server.
#[derive(Debug)]
pub struct UpstreamProxy {
    authority: Authority,
    client: Client<HttpConnector, Body>,
}

impl UpstreamProxy {
    pub fn new(upstream: &str) -> Result<Self, UpstreamError> {
        let url = Url::parse(upstream)?;
        let host = url.host_str().ok_or(UpstreamError::MissingHost)?;
        let authority = match url.port_or_known_default() {
            Some(port) => Authority::from_str(&format!("{host}:{port}"))?,
            None => Authority::from_str(host)?,
        };

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self { authority, client })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Rewrite a client request so it targets the upstream.
    fn upstream_request(&self, req: Request<Body>) -> Result<Request<Body>, axum::http::Error> {
        let (mut parts, body) = req.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        parts.uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers);
        if let Ok(host) = HeaderValue::from_str(self.authority.as_str()) {
            parts.headers.insert(header::HOST, host);
        }

        Ok(Request::from_parts(parts, body))
    }

    /// Forward one request and return the upstream's response.
    pub async fn forward(&self, req: Request<Body>) -> Response {
        let request_id = request_id(req.headers()).to_string();
        let path = req.uri().path().to_string();

        let upstream_req = match self.upstream_request(req) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(request_id = %request_id, path = %path, error = %e, "Failed to build upstream request");
                return (StatusCode::BAD_GATEWAY, "Invalid upstream request").into_response();
            }
        };

        tracing::debug!(
            request_id = %request_id,
            upstream = %self.authority,
            path = %path,
            "Forwarding request"
        );

        match self.client.request(upstream_req).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    upstream = %self.authority,
                    error = %e,
                    "Upstream error"
                );
                metrics::record_upstream_error();
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

async fn proxy_handler(State(proxy): State<Arc<UpstreamProxy>>, req: Request<Body>) -> Response {
    proxy.forward(req).await
}

/// Remove hop-by-hop headers, including any named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_str(name.trim()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}
