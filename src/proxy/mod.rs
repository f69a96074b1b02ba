//! Transparent reverse proxy for the identity provider's admin REST API.
//!
//! `ANY /api/keycloak/<rest>` is forwarded to `{identity_url}/admin/<rest>`
//! with the same method, the caller's `Authorization` header, and a JSON
//! content type. The upstream status and raw body come back unchanged.
//!
//! The proxy adds no authentication of its own, and it does not retry,
//! time out, or rate-limit anything.

pub mod userinfo;

use std::io::Read;

use crate::reply::JsonReply;

/// Path prefix routed to the admin proxy.
pub const KEYCLOAK_PREFIX: &str = "/api/keycloak";

/// A fully built upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    /// `None` for GET/HEAD.
    pub body: Option<String>,
}

/// What goes back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl From<JsonReply> for ProxiedResponse {
    fn from(reply: JsonReply) -> Self {
        Self {
            status: reply.status,
            content_type: Some("application/json; charset=utf-8".to_string()),
            body: reply.body.to_string(),
        }
    }
}

/// Whether `path` (query string stripped) belongs to the proxy.
pub fn is_proxy_path(path: &str) -> bool {
    path.strip_prefix(KEYCLOAK_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Reverse proxy bound to one upstream admin API root.
#[derive(Debug, Clone)]
pub struct KeycloakProxy {
    admin_url: String,
    agent: ureq::Agent,
}

impl KeycloakProxy {
    /// `admin_url` is the upstream root, e.g. `http://localhost:8080/admin`.
    pub fn new(admin_url: &str, agent: ureq::Agent) -> Self {
        Self {
            admin_url: admin_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }

    /// Build the upstream call for an inbound request.
    ///
    /// `url` is the inbound path plus query string. The body is dropped for
    /// GET/HEAD; otherwise it must be JSON (an empty body becomes `{}`) and
    /// is forwarded byte for byte.
    pub fn build_request(
        &self,
        method: &str,
        url: &str,
        authorization: Option<&str>,
        body: &[u8],
    ) -> Result<UpstreamRequest, JsonReply> {
        let rest = url.strip_prefix(KEYCLOAK_PREFIX).unwrap_or(url);

        let body = if method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD") {
            None
        } else {
            Some(json_body(body)?)
        };

        Ok(UpstreamRequest {
            method: method.to_ascii_uppercase(),
            url: format!("{}{}", self.admin_url, rest),
            authorization: authorization.map(str::to_string),
            body,
        })
    }

    /// Execute an upstream call and relay whatever comes back.
    pub fn send(&self, request: &UpstreamRequest) -> ProxiedResponse {
        let mut call = self
            .agent
            .request(&request.method, &request.url)
            .set("Content-Type", "application/json");
        if let Some(auth) = &request.authorization {
            call = call.set("Authorization", auth);
        }

        let result = match &request.body {
            Some(body) => call.send_string(body),
            None => call.call(),
        };

        let response = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(error) => {
                tracing::error!(url = %request.url, %error, "identity provider unreachable");
                return JsonReply::error(500, error.to_string()).into();
            }
        };

        let status = response.status();
        let content_type = response.header("Content-Type").map(str::to_string);
        let mut raw = Vec::new();
        if let Err(error) = response.into_reader().read_to_end(&mut raw) {
            tracing::error!(url = %request.url, %error, "failed reading upstream body");
            return JsonReply::error(500, error.to_string()).into();
        }

        tracing::debug!(method = %request.method, url = %request.url, status, "proxied");
        ProxiedResponse {
            status,
            content_type,
            body: String::from_utf8_lossy(&raw).into_owned(),
        }
    }

    /// Build and send in one step; a rejected body short-circuits.
    pub fn forward(
        &self,
        method: &str,
        url: &str,
        authorization: Option<&str>,
        body: &[u8],
    ) -> ProxiedResponse {
        match self.build_request(method, url, authorization, body) {
            Ok(request) => self.send(&request),
            Err(reply) => reply.into(),
        }
    }
}

/// Validate an inbound body as JSON and return it unchanged.
fn json_body(body: &[u8]) -> Result<String, JsonReply> {
    let text = std::str::from_utf8(body)
        .map_err(|_| JsonReply::error(400, "request body is not valid UTF-8"))?;
    if text.trim().is_empty() {
        return Ok("{}".to_string());
    }
    serde_json::from_str::<serde_json::Value>(text)
        .map_err(|error| JsonReply::error(400, format!("request body is not valid JSON: {error}")))?;
    Ok(text.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
