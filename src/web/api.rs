//! JSON API handlers.
//!
//! Each handler corresponds to an endpoint and returns a
//! `Response<Cursor<Vec<u8>>>`, JSON except for file downloads. The domain
//! modules do the work; this file only routes and serializes.

use anyhow::{Context, Result};
use serde::Serialize;
use tiny_http::{Response, StatusCode};

use crate::auth::{self, RoleContext};
use crate::config::AuthMode;
use crate::data::PlotQuery;
use crate::environment::{Environment, EnvironmentProfile};
use crate::files;
use crate::proxy::{self, userinfo};
use crate::search;

use super::{
    AppState, HttpResponse, InboundRequest, content_type_json, download_response, not_found,
    proxied_response, reply_response,
};

/// Prefix of the per-file routes: `{id}` and `{id}/download`.
const FILE_ROUTE_PREFIX: &str = "/api/uploaded-files/";

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    timestamp: String,
    environment: Environment,
    keycloak_url: &'a str,
    realm: &'a str,
    client_id: &'a str,
    auth_mode: AuthMode,
}

/// Diagnostic view served only while the profile has `debug_mode` on.
#[derive(Serialize)]
struct DebugConfigResponse<'a> {
    profile: &'a EnvironmentProfile,
    admin_api_url: String,
    bind: &'a str,
    workers: usize,
    cors_origin: &'a str,
    elasticsearch_url: &'a str,
    search_index: &'a str,
    auth_mode: AuthMode,
    audience: Option<&'a str>,
    has_hs256_secret: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

// ---------------------------------------------------------------------------
// /api router
// ---------------------------------------------------------------------------

/// Route a request under `/api`, with its role context already extracted.
pub(super) fn dispatch(
    state: &AppState,
    req: &InboundRequest,
    roles: &RoleContext,
) -> Result<HttpResponse> {
    let path = req.path();

    if proxy::is_proxy_path(path) {
        return Ok(keycloak(state, req));
    }

    if let Some(rest) = path.strip_prefix(FILE_ROUTE_PREFIX) {
        return Ok(uploaded_file(state, req, rest));
    }

    match (req.method.as_str(), path) {
        ("GET", "/api/ai-plot-data") => plot_data(state, req),
        ("GET", "/api/business-vitality") => business_vitality(state),
        ("POST", "/api/index") => Ok(index(state, req)),
        ("GET", "/api/search") => Ok(search(state, roles)),
        ("GET", "/api/test-token") => Ok(test_token(state, req)),
        ("POST", "/api/upload-batch") => Ok(upload_batch(state, req)),
        ("GET", "/api/uploaded-files") => Ok(uploaded_files(state, req)),
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Dashboard data
// ---------------------------------------------------------------------------

fn plot_data(state: &AppState, req: &InboundRequest) -> Result<HttpResponse> {
    let query = PlotQuery::from_query_string(req.query());
    let data = state.data.plot_data(&query).context("failed to load plot data")?;
    json_response(&data)
}

fn business_vitality(state: &AppState) -> Result<HttpResponse> {
    let data = state
        .data
        .business_vitality()
        .context("failed to load business vitality metrics")?;
    json_response(&data)
}

// ---------------------------------------------------------------------------
// Search / index
// ---------------------------------------------------------------------------

fn index(state: &AppState, req: &InboundRequest) -> HttpResponse {
    reply_response(search::index_document(state.search.as_ref(), &req.body_text()))
}

fn search(state: &AppState, roles: &RoleContext) -> HttpResponse {
    tracing::info!(
        access_role = ?roles.access_role,
        tenant_role = ?roles.tenant_role,
        "search requested"
    );
    reply_response(search::search_all(
        state.search.as_ref(),
        &state.config.elasticsearch.search_index,
    ))
}

// ---------------------------------------------------------------------------
// Uploaded files
// ---------------------------------------------------------------------------

fn bearer(req: &InboundRequest) -> Option<&str> {
    req.authorization()
        .and_then(|header| auth::bearer_token(header).ok())
}

fn upload_batch(state: &AppState, req: &InboundRequest) -> HttpResponse {
    let Some(token) = bearer(req) else {
        return reply_response(files::missing_token());
    };

    let uploaded_by = state
        .verifier
        .claims(token)
        .ok()
        .and_then(|claims| claims.preferred_username.or(claims.sub))
        .unwrap_or_else(|| "unknown".to_string());

    reply_response(files::upload_batch(
        state.files.as_ref(),
        &uploaded_by,
        req.header("Content-Type"),
        &req.body,
    ))
}

fn uploaded_files(state: &AppState, req: &InboundRequest) -> HttpResponse {
    if bearer(req).is_none() {
        return reply_response(files::missing_token());
    }
    reply_response(files::list_files(state.files.as_ref(), req.query()))
}

/// `DELETE {id}` and `GET {id}/download` below [`FILE_ROUTE_PREFIX`].
fn uploaded_file(state: &AppState, req: &InboundRequest, rest: &str) -> HttpResponse {
    let (id, download) = match rest.strip_suffix("/download") {
        Some(id) => (id, true),
        None => (rest, false),
    };
    if id.is_empty() || id.contains('/') {
        return not_found();
    }

    let store = state.files.as_ref();
    match (req.method.as_str(), download) {
        ("DELETE", false) | ("GET", true) if bearer(req).is_none() => {
            reply_response(files::missing_token())
        }
        ("DELETE", false) => reply_response(files::delete_file(store, id)),
        ("GET", true) => match files::download_file(store, id) {
            Ok(file) => download_response(file),
            Err(reply) => reply_response(reply),
        },
        _ => not_found(),
    }
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

fn keycloak(state: &AppState, req: &InboundRequest) -> HttpResponse {
    proxied_response(state.proxy.forward(
        &req.method,
        &req.url,
        req.authorization(),
        &req.body,
    ))
}

fn test_token(state: &AppState, req: &InboundRequest) -> HttpResponse {
    reply_response(userinfo::probe_token(
        &state.identity_agent,
        &state.profile,
        req.authorization(),
    ))
}

// ---------------------------------------------------------------------------
// Operational
// ---------------------------------------------------------------------------

pub(super) fn health(state: &AppState) -> Result<HttpResponse> {
    let profile = &state.profile;
    json_response(&HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
        environment: profile.name,
        keycloak_url: &profile.identity_url,
        realm: &profile.realm,
        client_id: &profile.client_id,
        auth_mode: state.config.auth.mode,
    })
}

pub(super) fn debug_config(state: &AppState) -> Result<HttpResponse> {
    if !state.profile.debug_mode {
        return Ok(not_found());
    }

    let config = &state.config;
    json_response(&DebugConfigResponse {
        profile: &state.profile,
        admin_api_url: state.profile.admin_api_url(),
        bind: &config.server.bind,
        workers: config.server.workers,
        cors_origin: &config.server.cors_origin,
        elasticsearch_url: &config.elasticsearch.url,
        search_index: &config.elasticsearch.search_index,
        auth_mode: config.auth.mode,
        audience: config.auth.audience.as_deref(),
        has_hs256_secret: config.auth.hs256_secret.is_some(),
    })
}
