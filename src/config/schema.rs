/// Configuration schema and defaults for the gateway process.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[server]`, `[environment]`, `[profile]`, `[elasticsearch]`, `[auth]` and
/// `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level gateway configuration.
///
/// Maps directly to the `~/.aura/config.toml` and `.aura.toml` file schemas.
/// All sections and fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub environment: EnvironmentConfig,
    pub profile: ProfileOverrides,
    pub elasticsearch: ElasticsearchConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the gateway binds to.
    pub bind: String,
    /// Number of worker threads pulling requests off the listener.
    pub workers: usize,
    /// Value of `Access-Control-Allow-Origin` on every response.
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3002".to_string(),
            workers: 4,
            cors_origin: "*".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [environment] / [profile]
// ---------------------------------------------------------------------------

/// Deployment environment selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// One of `development`, `staging`, `testing`, `production`. Anything
    /// else resolves to `development`.
    pub name: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "development".to_string(),
        }
    }
}

/// Optional overrides applied on top of the selected environment profile.
///
/// `None` (or an empty string) keeps the profile's built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

// ---------------------------------------------------------------------------
// [elasticsearch]
// ---------------------------------------------------------------------------

/// Search engine connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchConfig {
    /// Base URL of the Elasticsearch node.
    pub url: String,
    /// Index queried by `GET /api/search`.
    pub search_index: String,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            search_index: "your-index-name".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [auth]
// ---------------------------------------------------------------------------

/// How bearer tokens are turned into claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Decode the payload without checking the signature. Roles can be
    /// forged by any caller in this mode.
    #[default]
    DecodeOnly,
    /// Verify an HMAC-SHA256 signature with a shared secret.
    Hs256,
    /// Verify RS256 signatures against the realm's published key set.
    Jwks,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecodeOnly => write!(f, "decode-only"),
            Self::Hs256 => write!(f, "hs256"),
            Self::Jwks => write!(f, "jwks"),
        }
    }
}

/// Token handling settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Shared secret for `hs256` mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hs256_secret: Option<String>,
    /// Expected `aud` claim. Audience is not checked when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`"info"`, `"aura_gateway=debug"`, ...). Falls back
    /// to the environment profile's log level when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub format: LogFormat,
}

// ---------------------------------------------------------------------------
// Default TOML template
// ---------------------------------------------------------------------------

impl GatewayConfig {
    /// Annotated default configuration written by `config init`.
    pub fn default_toml() -> String {
        r#"# aura-gateway configuration
#
# Layers: built-in defaults -> ~/.aura/config.toml -> ./.aura.toml -> AURA_* env vars

[server]
bind = "127.0.0.1:3002"
workers = 4
cors_origin = "*"

[environment]
# development | staging | testing | production
name = "development"

[profile]
# Uncomment to override the environment profile.
# api_base_url = "http://localhost:8081/api"
# identity_url = "http://localhost:8080"
# realm = "ea_aura"
# client_id = "ea_aura"

[elasticsearch]
url = "http://localhost:9200"
search_index = "your-index-name"

[auth]
# decode-only | hs256 | jwks
# decode-only trusts unsigned role claims; use hs256 or jwks outside local development.
mode = "decode-only"
# hs256_secret = "change-me"
# audience = "account"

[logging]
# level = "info"
format = "pretty"
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:3002");
        assert_eq!(config.server.workers, 4);
        assert_eq!(config.environment.name, "development");
        assert_eq!(config.elasticsearch.search_index, "your-index-name");
        assert_eq!(config.auth.mode, AuthMode::DecodeOnly);
        assert!(config.logging.level.is_none());
        assert_eq!(config.profile, ProfileOverrides::default());
    }

    #[test]
    fn empty_toml_produces_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.cors_origin, "*");
        assert_eq!(config.elasticsearch.url, "http://localhost:9200");
    }

    #[test]
    fn deserialize_full_toml() {
        let toml_str = r#"
[server]
bind = "0.0.0.0:8000"
workers = 8
cors_origin = "http://localhost:5000"

[environment]
name = "staging"

[profile]
realm = "other_realm"

[elasticsearch]
url = "http://es:9200"
search_index = "user_prompts"

[auth]
mode = "hs256"
hs256_secret = "s3cret"
audience = "account"

[logging]
level = "debug"
format = "json"
"#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.workers, 8);
        assert_eq!(config.environment.name, "staging");
        assert_eq!(config.profile.realm.as_deref(), Some("other_realm"));
        assert!(config.profile.identity_url.is_none());
        assert_eq!(config.elasticsearch.search_index, "user_prompts");
        assert_eq!(config.auth.mode, AuthMode::Hs256);
        assert_eq!(config.auth.hs256_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn default_toml_parses_back() {
        let config: GatewayConfig = toml::from_str(&GatewayConfig::default_toml()).unwrap();
        assert_eq!(config.auth.mode, AuthMode::DecodeOnly);
        assert_eq!(config.server.bind, "127.0.0.1:3002");
    }

    #[test]
    fn auth_mode_display() {
        assert_eq!(AuthMode::DecodeOnly.to_string(), "decode-only");
        assert_eq!(AuthMode::Hs256.to_string(), "hs256");
        assert_eq!(AuthMode::Jwks.to_string(), "jwks");
    }
}
