//! Role extraction for inbound API requests.
//!
//! Every `/api` request passes through [`with_role_context`] before its
//! handler runs. The `Authorization` header is read, the bearer token is
//! turned into claims by the process-wide [`TokenVerifier`], and a small
//! [`RoleContext`] is handed to the next stage.
//!
//! Failures never reject the request: a missing, malformed, or unverifiable
//! token simply produces an anonymous context.

pub mod claims;
pub mod verifier;

use serde::Serialize;

pub use claims::{TokenClaims, TokenError};
pub use verifier::TokenVerifier;

/// Prefix identifying a tenant (customer organization) role.
pub const TENANT_ROLE_PREFIX: &str = "tenant_";

/// Coarse access level derived from realm roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRole {
    Admin,
    User,
}

impl AccessRole {
    fn from_role(role: &str) -> Option<Self> {
        match role {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for AccessRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request role information. Lives for exactly one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleContext {
    pub access_role: Option<AccessRole>,
    pub tenant_role: Option<String>,
}

impl RoleContext {
    /// Derive roles from decoded claims: the first realm role that is
    /// `admin` or `user`, and the first realm role prefixed `tenant_`.
    pub fn from_claims(claims: &TokenClaims) -> Self {
        let roles = claims.realm_roles();
        Self {
            access_role: roles.iter().find_map(|role| AccessRole::from_role(role)),
            tenant_role: roles
                .iter()
                .find(|role| role.starts_with(TENANT_ROLE_PREFIX))
                .cloned(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.access_role.is_none() && self.tenant_role.is_none()
    }
}

/// Pull the token out of a `Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Result<&str, TokenError> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next().ok_or(TokenError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::UnsupportedScheme(scheme.to_string()));
    }
    parts.next().ok_or(TokenError::MissingToken)
}

/// Compute the role context for one request's `Authorization` header.
pub fn extract_roles(authorization: Option<&str>, verifier: &TokenVerifier) -> RoleContext {
    let Some(header) = authorization else {
        return RoleContext::default();
    };

    match bearer_token(header).and_then(|token| verifier.claims(token)) {
        Ok(claims) => RoleContext::from_claims(&claims),
        Err(error) => {
            tracing::warn!(%error, "ignoring unusable bearer token; continuing without roles");
            RoleContext::default()
        }
    }
}

/// Run the next request stage with the role context for `authorization`.
///
/// `next` is invoked exactly once, whatever the header contains.
pub fn with_role_context<R>(
    authorization: Option<&str>,
    verifier: &TokenVerifier,
    next: impl FnOnce(RoleContext) -> R,
) -> R {
    next(extract_roles(authorization, verifier))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
