/// Bearer-token verification strategies.
///
/// The verifier is built once at startup and shared read-only by every
/// request. In `decode-only` mode it performs no cryptographic check at
/// all, so any caller can mint a token carrying whatever roles it wants.
use anyhow::{Context, Result};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};

use super::claims::{TokenClaims, TokenError, decode_unverified};
use crate::config::{AuthMode, schema::AuthConfig};
use crate::environment::EnvironmentProfile;

/// Turns a raw bearer token into [`TokenClaims`].
pub enum TokenVerifier {
    /// Payload is decoded, signature ignored.
    DecodeOnly,
    /// HMAC-SHA256 with a shared secret.
    Hs256 {
        key: DecodingKey,
        validation: Validation,
    },
    /// RS256 against a key set fetched from the identity provider.
    Jwks {
        keys: JwkSet,
        validation: Validation,
    },
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecodeOnly => f.write_str("TokenVerifier::DecodeOnly"),
            Self::Hs256 { .. } => f.write_str("TokenVerifier::Hs256"),
            Self::Jwks { keys, .. } => write!(f, "TokenVerifier::Jwks({} keys)", keys.keys.len()),
        }
    }
}

impl TokenVerifier {
    /// Build the verifier selected by `[auth] mode`.
    ///
    /// `jwks` mode fetches the realm's key set once, using `agent`; failure
    /// to fetch is a startup error.
    pub fn from_config(
        auth: &AuthConfig,
        profile: &EnvironmentProfile,
        agent: &ureq::Agent,
    ) -> Result<Self> {
        match auth.mode {
            AuthMode::DecodeOnly => Ok(Self::DecodeOnly),
            AuthMode::Hs256 => {
                let secret = auth
                    .hs256_secret
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .context("auth mode 'hs256' requires [auth] hs256_secret")?;
                Ok(Self::hs256(secret.as_bytes(), auth.audience.as_deref()))
            }
            AuthMode::Jwks => {
                let url = profile.openid_endpoint("certs");
                let keys: JwkSet = agent
                    .get(&url)
                    .call()
                    .with_context(|| format!("failed to fetch JWKS from {url}"))?
                    .into_json()
                    .context("JWKS response is not a valid key set")?;
                tracing::info!(url = %url, keys = keys.keys.len(), "loaded signing keys");
                Ok(Self::jwks(keys, auth.audience.as_deref()))
            }
        }
    }

    pub fn hs256(secret: &[u8], audience: Option<&str>) -> Self {
        Self::Hs256 {
            key: DecodingKey::from_secret(secret),
            validation: validation_for(Algorithm::HS256, audience),
        }
    }

    pub fn jwks(keys: JwkSet, audience: Option<&str>) -> Self {
        Self::Jwks {
            keys,
            validation: validation_for(Algorithm::RS256, audience),
        }
    }

    /// Whether claims produced by this verifier can be trusted.
    pub fn is_verifying(&self) -> bool {
        !matches!(self, Self::DecodeOnly)
    }

    /// Decode (and, outside `decode-only`, verify) a bearer token.
    pub fn claims(&self, token: &str) -> Result<TokenClaims, TokenError> {
        match self {
            Self::DecodeOnly => decode_unverified(token),
            Self::Hs256 { key, validation } => {
                Ok(decode::<TokenClaims>(token, key, validation)?.claims)
            }
            Self::Jwks { keys, validation } => {
                let header = decode_header(token)?;
                let kid = header.kid.clone();
                let jwk = kid
                    .as_deref()
                    .and_then(|kid| keys.find(kid))
                    .ok_or(TokenError::UnknownKey(kid))?;
                let key = DecodingKey::from_jwk(jwk)?;
                Ok(decode::<TokenClaims>(token, &key, validation)?.claims)
            }
        }
    }
}

fn validation_for(algorithm: Algorithm, audience: Option<&str>) -> Validation {
    let mut validation = Validation::new(algorithm);
    match audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }
    validation
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
