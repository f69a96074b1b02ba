//! Deployment environment profiles.
//!
//! One [`EnvironmentProfile`] is resolved at startup from a discrete
//! environment name and stays fixed for the lifetime of the process.
//! Resolution never fails: an unrecognized name selects `development`.

use serde::{Deserialize, Serialize};

use crate::config::{GatewayConfig, ProfileOverrides};

// ---------------------------------------------------------------------------
// Environment names
// ---------------------------------------------------------------------------

/// The four deployment environments the dashboard ships to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Testing,
    Production,
}

impl Environment {
    /// Parse an environment name, falling back to `Development` for anything
    /// unrecognized (including the empty string).
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "staging" => Self::Staging,
            "testing" | "test" => Self::Testing,
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Testing => "testing",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Profile record
// ---------------------------------------------------------------------------

/// Feature toggles surfaced to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub debug_logging: bool,
    pub performance_monitoring: bool,
    pub analytics: bool,
}

/// Client-facing timeouts in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub api_request_ms: u64,
    pub session_timeout_ms: u64,
}

/// Fully resolved configuration for one deployment environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentProfile {
    pub name: Environment,
    pub api_base_url: String,
    /// Base URL of the identity provider (Keycloak), without `/admin`.
    pub identity_url: String,
    pub realm: String,
    pub client_id: String,
    pub debug_mode: bool,
    /// Default log filter for this environment (`debug`, `warn`, `error`).
    pub log_level: String,
    pub features: FeatureFlags,
    pub timeouts: Timeouts,
}

impl EnvironmentProfile {
    /// Built-in profile for `env`, with no overrides applied.
    pub fn builtin(env: Environment) -> Self {
        match env {
            Environment::Development => Self {
                name: env,
                api_base_url: "http://localhost:8081/api".to_string(),
                identity_url: "http://localhost:8080".to_string(),
                realm: "ea_aura".to_string(),
                client_id: "ea_aura".to_string(),
                debug_mode: true,
                log_level: "debug".to_string(),
                features: FeatureFlags {
                    debug_logging: true,
                    performance_monitoring: false,
                    analytics: false,
                },
                timeouts: Timeouts {
                    api_request_ms: 30_000,
                    session_timeout_ms: 3_600_000,
                },
            },
            Environment::Staging => Self {
                name: env,
                api_base_url: "http://staging.ea-aura.ai/api".to_string(),
                identity_url: "http://staging.ea-aura.ai/auth".to_string(),
                realm: "ea_aura".to_string(),
                client_id: "ea_aura".to_string(),
                debug_mode: true,
                log_level: "debug".to_string(),
                features: FeatureFlags {
                    debug_logging: false,
                    performance_monitoring: true,
                    analytics: true,
                },
                timeouts: Timeouts {
                    api_request_ms: 60_000,
                    session_timeout_ms: 7_200_000,
                },
            },
            Environment::Testing => Self {
                name: env,
                api_base_url: "https://test-api.ea-aura.ai".to_string(),
                identity_url: "https://test-auth.ea-aura.ai".to_string(),
                realm: "ea_aura_test".to_string(),
                client_id: "ea_aura_test".to_string(),
                debug_mode: true,
                log_level: "warn".to_string(),
                features: FeatureFlags {
                    debug_logging: true,
                    performance_monitoring: true,
                    analytics: false,
                },
                timeouts: Timeouts {
                    api_request_ms: 15_000,
                    session_timeout_ms: 1_800_000,
                },
            },
            Environment::Production => Self {
                name: env,
                api_base_url: "https://api.ea-aura.ai".to_string(),
                identity_url: "https://auth.ea-aura.ai".to_string(),
                realm: "ea_aura".to_string(),
                client_id: "ea_aura".to_string(),
                debug_mode: false,
                log_level: "error".to_string(),
                features: FeatureFlags {
                    debug_logging: false,
                    performance_monitoring: true,
                    analytics: true,
                },
                timeouts: Timeouts {
                    api_request_ms: 30_000,
                    session_timeout_ms: 7_200_000,
                },
            },
        }
    }

    /// Resolve a profile from an environment name and explicit overrides.
    ///
    /// Pure: reads nothing from the process. Empty override strings keep the
    /// built-in value.
    pub fn resolve(name: &str, overrides: &ProfileOverrides) -> Self {
        let mut profile = Self::builtin(Environment::parse(name));

        let pick = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(url) = pick(&overrides.api_base_url) {
            profile.api_base_url = url;
        }
        if let Some(url) = pick(&overrides.identity_url) {
            profile.identity_url = url;
        }
        if let Some(realm) = pick(&overrides.realm) {
            profile.realm = realm;
        }
        if let Some(client_id) = pick(&overrides.client_id) {
            profile.client_id = client_id;
        }

        profile
    }

    /// Resolve the profile selected by an already-loaded gateway config
    /// (whose env-var layer has been applied).
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::resolve(&config.environment.name, &config.profile)
    }

    /// `{identity_url}/admin`: the upstream root for the admin proxy.
    pub fn admin_api_url(&self) -> String {
        format!("{}/admin", self.identity_url.trim_end_matches('/'))
    }

    /// OpenID Connect endpoint under this profile's realm, e.g. `userinfo`
    /// or `certs`.
    pub fn openid_endpoint(&self, endpoint: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.identity_url.trim_end_matches('/'),
            self.realm,
            endpoint
        )
    }

    /// Join `path` onto the API base URL.
    pub fn api_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Environment::parse("PRODUCTION"), Environment::Production);
        assert_eq!(Environment::parse(" staging "), Environment::Staging);
        assert_eq!(Environment::parse("testing"), Environment::Testing);
    }

    #[test]
    fn parse_falls_back_to_development() {
        assert_eq!(Environment::parse(""), Environment::Development);
        assert_eq!(Environment::parse("qa-7"), Environment::Development);
    }

    #[test]
    fn admin_api_url_strips_trailing_slash() {
        let overrides = ProfileOverrides {
            identity_url: Some("http://kc:8080/".to_string()),
            ..Default::default()
        };
        let profile = EnvironmentProfile::resolve("development", &overrides);
        assert_eq!(profile.admin_api_url(), "http://kc:8080/admin");
    }

    #[test]
    fn openid_endpoint_uses_realm() {
        let profile = EnvironmentProfile::builtin(Environment::Testing);
        assert_eq!(
            profile.openid_endpoint("userinfo"),
            "https://test-auth.ea-aura.ai/realms/ea_aura_test/protocol/openid-connect/userinfo"
        );
    }

    #[test]
    fn blank_overrides_keep_builtin_values() {
        let overrides = ProfileOverrides {
            realm: Some("   ".to_string()),
            ..Default::default()
        };
        let profile = EnvironmentProfile::resolve("staging", &overrides);
        assert_eq!(profile.realm, "ea_aura");
    }

    #[test]
    fn api_endpoint_joins_path() {
        let profile = EnvironmentProfile::builtin(Environment::Development);
        assert_eq!(
            profile.api_endpoint("/search"),
            "http://localhost:8081/api/search"
        );
    }
}
