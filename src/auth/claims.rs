/// Access-token claims and unverified payload decoding.
///
/// Tokens are JWT-shaped: `base64url(header).base64url(payload).signature`.
/// [`decode_unverified`] reads the payload without looking at the
/// signature at all, which is what `decode-only` mode relies on.
use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a bearer token could not be turned into claims.
///
/// Never surfaced to HTTP callers: the role extractor logs it and treats the
/// request as anonymous.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("authorization header carries no token")]
    MissingToken,
    #[error("unsupported authorization scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("malformed token: {0}")]
    Malformed(&'static str),
    #[error("token segment is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("token segment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("token verification failed: {0}")]
    Verification(#[from] jsonwebtoken::errors::Error),
    #[error("no signing key for kid {0:?}")]
    UnknownKey(Option<String>),
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// A role list as found under `realm_access` or `resource_access.<client>`.
///
/// Entries that are not strings are dropped rather than failing the token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRoles {
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub roles: Vec<String>,
}

/// The subset of identity-token claims the gateway reads.
///
/// Every field is read leniently: a claim of an unexpected JSON type is
/// treated as absent so one odd display claim cannot hide the roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub preferred_username: Option<String>,
    /// NumericDate; fractional seconds are truncated.
    #[serde(
        default,
        deserialize_with = "lenient::numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<i64>,
    #[serde(
        default,
        deserialize_with = "lenient::access",
        skip_serializing_if = "Option::is_none"
    )]
    pub realm_access: Option<AccessRoles>,
    #[serde(
        default,
        deserialize_with = "lenient::access_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_access: Option<BTreeMap<String, AccessRoles>>,
}

impl TokenClaims {
    /// Realm roles, or an empty slice when the claim is absent.
    pub fn realm_roles(&self) -> &[String] {
        self.realm_access
            .as_ref()
            .map(|access| access.roles.as_slice())
            .unwrap_or(&[])
    }

    /// Realm roles followed by the roles granted on `client_id`, lowercased,
    /// first occurrence wins.
    pub fn effective_roles(&self, client_id: &str) -> Vec<String> {
        let client_roles = self
            .resource_access
            .as_ref()
            .and_then(|access| access.get(client_id))
            .map(|access| access.roles.as_slice())
            .unwrap_or(&[]);

        let mut roles: Vec<String> = Vec::new();
        for role in self.realm_roles().iter().chain(client_roles) {
            let role = role.to_lowercase();
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        roles
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode the payload of a JWT-shaped token without checking its signature.
///
/// Header and payload must both be JSON objects; the signature segment may
/// be empty.
pub fn decode_unverified(token: &str) -> Result<TokenClaims, TokenError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed("expected three dot-separated segments"));
    };

    if header.is_empty() || payload.is_empty() {
        return Err(TokenError::Malformed("empty header or payload segment"));
    }

    let header_bytes = decode_segment(header)?;
    let _: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&header_bytes)?;

    let payload_bytes = decode_segment(payload)?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)?;
    if !payload.is_object() {
        return Err(TokenError::Malformed("payload is not a JSON object"));
    }
    Ok(serde_json::from_value(payload)?)
}

/// Base64url-decode one segment, tolerating trailing `=` padding.
fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    Ok(URL_SAFE_NO_PAD.decode(segment.trim_end_matches('='))?)
}

// ---------------------------------------------------------------------------
// Lenient claim readers
// ---------------------------------------------------------------------------

mod lenient {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::AccessRoles;

    /// Strings pass through, numbers are rendered, anything else is absent.
    pub fn string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(de)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn numeric_date<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(de)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            _ => None,
        })
    }

    pub fn string_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
        Ok(roles_from(Value::deserialize(de)?))
    }

    pub fn access<'de, D: Deserializer<'de>>(de: D) -> Result<Option<AccessRoles>, D::Error> {
        Ok(access_from(Value::deserialize(de)?))
    }

    pub fn access_map<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<BTreeMap<String, AccessRoles>>, D::Error> {
        Ok(match Value::deserialize(de)? {
            Value::Object(clients) => Some(
                clients
                    .into_iter()
                    .filter_map(|(client, value)| access_from(value).map(|a| (client, a)))
                    .collect(),
            ),
            _ => None,
        })
    }

    fn access_from(value: Value) -> Option<AccessRoles> {
        match value {
            Value::Object(mut fields) => Some(AccessRoles {
                roles: fields.remove("roles").map(roles_from).unwrap_or_default(),
            }),
            _ => None,
        }
    }

    fn roles_from(value: Value) -> Vec<String> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(role) => Some(role),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn decodes_realm_roles() {
        let token = token_with_payload(r#"{"sub":"u1","realm_access":{"roles":["user","tenant_7"]}}"#);
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("u1"));
        assert_eq!(claims.realm_roles(), ["user", "tenant_7"]);
    }

    #[test]
    fn missing_realm_access_yields_no_roles() {
        let token = token_with_payload(r#"{"sub":"u1"}"#);
        let claims = decode_unverified(&token).unwrap();
        assert!(claims.realm_roles().is_empty());
    }

    #[test]
    fn accepts_empty_signature_segment() {
        let token = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"realm_access":{"roles":["admin"]}}"#)
        );
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.realm_roles(), ["admin"]);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(matches!(
            decode_unverified("abc.def"),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            decode_unverified("a.b.c.d"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            decode_unverified("!!!.???.sig"),
            Err(TokenError::Base64(_))
        ));
    }

    #[test]
    fn rejects_non_json_payload() {
        let token = format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode("not json")
        );
        assert!(matches!(decode_unverified(&token), Err(TokenError::Json(_))));
    }

    #[test]
    fn non_string_roles_are_skipped() {
        let token = token_with_payload(r#"{"realm_access":{"roles":[1,"user",null,2]}}"#);
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.realm_roles(), ["user"]);
    }

    #[test]
    fn odd_display_claims_do_not_hide_roles() {
        let token = token_with_payload(
            r#"{"sub":12345,"preferred_username":["x"],"exp":1900000000.75,"realm_access":{"roles":["admin"]}}"#,
        );
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("12345"));
        assert_eq!(claims.preferred_username, None);
        assert_eq!(claims.exp, Some(1_900_000_000));
        assert_eq!(claims.realm_roles(), ["admin"]);
    }

    #[test]
    fn non_object_access_claims_are_ignored() {
        let token = token_with_payload(
            r#"{"realm_access":"admin","resource_access":{"ea_aura":{"roles":["Sales-Agent"]},"broken":7}}"#,
        );
        let claims = decode_unverified(&token).unwrap();
        assert!(claims.realm_roles().is_empty());
        assert_eq!(claims.effective_roles("ea_aura"), vec!["sales-agent"]);
    }

    #[test]
    fn rejects_non_object_payload() {
        let token = token_with_payload("[1,2,3]");
        assert!(matches!(
            decode_unverified(&token),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn tolerates_padded_segments() {
        let header = base64::engine::general_purpose::URL_SAFE.encode(r#"{"alg":"none"}"#);
        let payload =
            base64::engine::general_purpose::URL_SAFE.encode(r#"{"realm_access":{"roles":["user"]}}"#);
        let claims = decode_unverified(&format!("{header}.{payload}.")).unwrap();
        assert_eq!(claims.realm_roles(), ["user"]);
    }

    #[test]
    fn effective_roles_merges_and_dedups() {
        let mut resource_access = BTreeMap::new();
        resource_access.insert(
            "ea_aura".to_string(),
            AccessRoles {
                roles: vec!["Admin".to_string(), "Sales-Agent".to_string()],
            },
        );
        resource_access.insert(
            "other".to_string(),
            AccessRoles {
                roles: vec!["ignored".to_string()],
            },
        );
        let claims = TokenClaims {
            realm_access: Some(AccessRoles {
                roles: vec!["admin".to_string(), "tenant_1".to_string()],
            }),
            resource_access: Some(resource_access),
            ..Default::default()
        };

        assert_eq!(
            claims.effective_roles("ea_aura"),
            vec!["admin", "tenant_1", "sales-agent"]
        );
        assert_eq!(claims.effective_roles("missing"), vec!["admin", "tenant_1"]);
    }
}
