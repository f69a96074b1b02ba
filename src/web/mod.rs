//! HTTP front end for the gateway.
//!
//! A sync `tiny_http` listener shared by a fixed pool of worker threads.
//! Every request is read into an [`InboundRequest`], routed, answered with
//! CORS headers, and logged once.
//!
//! Launched via `aura-gateway serve` (default: `http://127.0.0.1:3002`).

mod api;
mod request;

use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Instant;

use anyhow::{Context, Result};
use tiny_http::{Header, Response, Server, StatusCode};

pub use request::InboundRequest;

use crate::auth::{self, TokenVerifier};
use crate::config::GatewayConfig;
use crate::data::{DashboardDataProvider, StaticDataProvider};
use crate::environment::EnvironmentProfile;
use crate::files::{FileDownload, FileStore, MemoryFileStore};
use crate::proxy::{KeycloakProxy, ProxiedResponse};
use crate::reply::JsonReply;
use crate::search::{ElasticsearchClient, SearchEngine};

pub type HttpResponse = Response<Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything a handler may read. Immutable once the gateway starts.
pub struct AppState {
    pub config: GatewayConfig,
    pub profile: EnvironmentProfile,
    pub verifier: TokenVerifier,
    pub proxy: KeycloakProxy,
    /// Client for the identity provider (proxy and token probe).
    pub identity_agent: ureq::Agent,
    pub search: Box<dyn SearchEngine>,
    pub data: Box<dyn DashboardDataProvider>,
    pub files: Box<dyn FileStore>,
}

impl AppState {
    /// Wire up the production collaborators for `config`.
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        let profile = EnvironmentProfile::from_config(&config);
        let identity_agent = ureq::AgentBuilder::new().build();
        let verifier = TokenVerifier::from_config(&config.auth, &profile, &identity_agent)
            .context("failed to set up token verification")?;
        let search = ElasticsearchClient::new(
            &config.elasticsearch.url,
            ureq::AgentBuilder::new().build(),
        );

        Ok(Self::new(
            config,
            profile,
            verifier,
            identity_agent,
            Box::new(search),
            Box::new(StaticDataProvider),
            Box::new(MemoryFileStore::with_samples()),
        ))
    }

    pub fn new(
        config: GatewayConfig,
        profile: EnvironmentProfile,
        verifier: TokenVerifier,
        identity_agent: ureq::Agent,
        search: Box<dyn SearchEngine>,
        data: Box<dyn DashboardDataProvider>,
        files: Box<dyn FileStore>,
    ) -> Self {
        let proxy = KeycloakProxy::new(&profile.admin_api_url(), identity_agent.clone());
        Self {
            config,
            profile,
            verifier,
            proxy,
            identity_agent,
            search,
            data,
            files,
        }
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// A bound listener plus the state its workers share.
pub struct Gateway {
    server: Server,
    state: AppState,
}

impl Gateway {
    /// Bind the listening socket. Binding is the only fatal step.
    pub fn bind(addr: &str, state: AppState) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

        if !state.verifier.is_verifying() {
            tracing::warn!(
                "auth mode is decode-only: bearer tokens are NOT signature-checked and role claims can be forged"
            );
        }

        Ok(Self { server, state })
    }

    /// Actual bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve until the listener fails. Blocks the current thread.
    pub fn run(self) -> Result<()> {
        let workers = self.state.config.server.workers.max(1);
        tracing::info!(
            addr = ?self.local_addr(),
            workers,
            environment = %self.state.profile.name,
            "gateway listening"
        );

        let server = &self.server;
        let state = &self.state;
        std::thread::scope(|scope| {
            for id in 0..workers {
                scope.spawn(move || worker_loop(id, server, state));
            }
        });

        Ok(())
    }
}

/// Bind `addr` and serve forever.
pub fn serve(addr: &str, state: AppState) -> Result<()> {
    Gateway::bind(addr, state)?.run()
}

fn worker_loop(id: usize, server: &Server, state: &AppState) {
    loop {
        match server.recv() {
            Ok(request) => handle(state, request),
            Err(error) => {
                tracing::error!(worker = id, %error, "listener failed; worker exiting");
                return;
            }
        }
    }
}

/// Answer one request. Never panics the worker on a bad request.
fn handle(state: &AppState, mut request: tiny_http::Request) {
    let started = Instant::now();

    let response = match InboundRequest::read_from(&mut request) {
        Ok(inbound) => {
            let response = dispatch(state, &inbound).unwrap_or_else(|e| {
                tracing::error!(error = %format!("{e:#}"), "handler failed");
                reply_response(JsonReply::error(500, e.to_string()))
            });
            with_cors(response, state)
        }
        Err(e) => with_cors(reply_response(JsonReply::error(400, format!("{e:#}"))), state),
    };

    let status = response.status_code().0;
    let method = request.method().to_string();
    let path = request.url().split('?').next().unwrap_or("").to_string();

    if let Err(error) = request.respond(response) {
        tracing::warn!(%error, "failed writing response");
    }

    tracing::info!(
        method = %method,
        path = %path,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Route an inbound request to its handler.
///
/// Everything under `/api` runs behind the role extractor; the role context
/// is computed once and handed to the handler.
pub fn dispatch(state: &AppState, req: &InboundRequest) -> Result<HttpResponse> {
    let path = req.path();

    if req.method == "OPTIONS" {
        return Ok(preflight(req));
    }

    match (req.method.as_str(), path) {
        ("GET", "/health") => api::health(state),
        ("GET", "/debug/config") => api::debug_config(state),
        _ if path == "/api" || path.starts_with("/api/") => {
            auth::with_role_context(req.authorization(), &state.verifier, |roles| {
                api::dispatch(state, req, &roles)
            })
        }
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// 404 response.
pub(crate) fn not_found() -> HttpResponse {
    reply_response(JsonReply::error(404, "not found"))
}

/// Put a [`JsonReply`] on the wire.
pub(crate) fn reply_response(reply: JsonReply) -> HttpResponse {
    Response::from_data(reply.body.to_string().into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(reply.status))
}

/// Relay a proxied upstream answer, keeping its content type.
pub(crate) fn proxied_response(proxied: ProxiedResponse) -> HttpResponse {
    let content_type = proxied
        .content_type
        .as_deref()
        .and_then(|ct| Header::from_bytes("Content-Type", ct).ok())
        .unwrap_or_else(content_type_json);

    Response::from_data(proxied.body.into_bytes())
        .with_header(content_type)
        .with_status_code(StatusCode(proxied.status))
}

/// Send a stored file as an attachment.
pub(crate) fn download_response(download: FileDownload) -> HttpResponse {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.filename.replace(['"', '\\'], "_")
    );
    let mut response = Response::from_data(download.body).with_status_code(StatusCode(200));
    for h in [
        header("Content-Type", &download.content_type),
        header("Content-Disposition", &disposition),
    ]
    .into_iter()
    .flatten()
    {
        response = response.with_header(h);
    }
    response
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn with_cors(response: HttpResponse, state: &AppState) -> HttpResponse {
    match header("Access-Control-Allow-Origin", &state.config.server.cors_origin) {
        Some(h) => response.with_header(h),
        None => response,
    }
}

/// CORS preflight: 204, permissive methods, requested headers echoed back.
fn preflight(req: &InboundRequest) -> HttpResponse {
    let allow_headers = req
        .header("Access-Control-Request-Headers")
        .unwrap_or("Content-Type, Authorization");

    let mut response = Response::from_data(Vec::new()).with_status_code(StatusCode(204));
    for h in [
        header("Access-Control-Allow-Methods", "GET,HEAD,PUT,PATCH,POST,DELETE"),
        header("Access-Control-Allow-Headers", allow_headers),
    ]
    .into_iter()
    .flatten()
    {
        response = response.with_header(h);
    }
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
