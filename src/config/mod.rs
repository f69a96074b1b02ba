/// Configuration system for the gateway.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::GatewayConfig::default()`]
/// 2. **User global config**: `~/.aura/config.toml`
/// 3. **Project local config**: `.aura.toml` in the current working directory
/// 4. **Environment variables**: `AURA_*` overrides (highest precedence)
///
/// File layers are merged at the TOML table level, so a project file that
/// only sets `[server] bind` keeps everything else from the global file.
///
/// # Usage
///
/// ```rust,ignore
/// use aura_gateway::config;
///
/// let cfg = config::load();
/// println!("binding {}", cfg.server.bind);
/// ```
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::{AuthMode, GatewayConfig, LogFormat, ProfileOverrides};

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved gateway configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> GatewayConfig {
    // Layers 2 and 3: ~/.aura/config.toml, then .aura.toml
    let layers = [global_config_path(), project_config_path()]
        .into_iter()
        .filter_map(load_toml_file);
    let mut config = merge_layers(layers);

    // Layer 4: environment variable overrides
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    config
}

/// Merge file layers over the built-in defaults, lowest priority first.
///
/// Each layer is checked against the schema on its own before it is merged.
/// A layer that fails is skipped with a warning and the other layers still
/// apply.
fn merge_layers(layers: impl IntoIterator<Item = (PathBuf, toml::Value)>) -> GatewayConfig {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for (path, layer) in layers {
        if let Err(error) = layer.clone().try_into::<GatewayConfig>() {
            tracing::warn!(path = %path.display(), %error, "skipping config file that does not match the schema");
            continue;
        }
        merge_tables(&mut merged, layer);
    }

    merged.try_into().unwrap_or_else(|error| {
        tracing::warn!(%error, "merged config files do not match the schema; using defaults");
        GatewayConfig::default()
    })
}

/// Load a TOML file as a raw value tree.
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is malformed. Malformed files are skipped so a typo never keeps
/// the gateway from starting.
fn load_toml_file(path: Option<PathBuf>) -> Option<(PathBuf, toml::Value)> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(value) => Some((path, value)),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "skipping malformed config file");
            None
        }
    }
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value in the overlay replaces the base value.
fn merge_tables(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_tables(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.aura/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".aura").join("config.toml"))
}

/// Path to the project local config: `.aura.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".aura.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// `lookup` abstracts `std::env::var` so tests can feed a fixed map.
///
/// Supported variables:
/// - `AURA_ENVIRONMENT`: profile name
/// - `AURA_API_BASE_URL`, `AURA_KEYCLOAK_URL`, `AURA_KEYCLOAK_REALM`,
///   `AURA_KEYCLOAK_CLIENT_ID`: profile overrides
/// - `AURA_BIND`, `AURA_WORKERS`, `AURA_CORS_ORIGIN`: listener
/// - `AURA_ELASTICSEARCH_URL`, `AURA_SEARCH_INDEX`: search engine
/// - `AURA_AUTH_MODE`, `AURA_AUTH_HS256_SECRET`, `AURA_AUTH_AUDIENCE`: tokens
/// - `AURA_LOG_LEVEL`, `AURA_LOG_FORMAT`: logging
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());

    // Environment + profile
    if let Some(val) = non_empty("AURA_ENVIRONMENT") {
        config.environment.name = val;
    }
    if let Some(val) = non_empty("AURA_API_BASE_URL") {
        config.profile.api_base_url = Some(val);
    }
    if let Some(val) = non_empty("AURA_KEYCLOAK_URL") {
        config.profile.identity_url = Some(val);
    }
    if let Some(val) = non_empty("AURA_KEYCLOAK_REALM") {
        config.profile.realm = Some(val);
    }
    if let Some(val) = non_empty("AURA_KEYCLOAK_CLIENT_ID") {
        config.profile.client_id = Some(val);
    }

    // Server
    if let Some(val) = non_empty("AURA_BIND") {
        config.server.bind = val;
    }
    if let Some(val) = non_empty("AURA_WORKERS")
        && let Ok(n) = val.parse::<usize>()
        && n > 0
    {
        config.server.workers = n;
    }
    if let Some(val) = non_empty("AURA_CORS_ORIGIN") {
        config.server.cors_origin = val;
    }

    // Search engine
    if let Some(val) = non_empty("AURA_ELASTICSEARCH_URL") {
        config.elasticsearch.url = val;
    }
    if let Some(val) = non_empty("AURA_SEARCH_INDEX") {
        config.elasticsearch.search_index = val;
    }

    // Auth
    if let Some(val) = non_empty("AURA_AUTH_MODE")
        && let Some(mode) = parse_auth_mode(&val)
    {
        config.auth.mode = mode;
    }
    if let Some(val) = non_empty("AURA_AUTH_HS256_SECRET") {
        config.auth.hs256_secret = Some(val);
    }
    if let Some(val) = non_empty("AURA_AUTH_AUDIENCE") {
        config.auth.audience = Some(val);
    }

    // Logging
    if let Some(val) = non_empty("AURA_LOG_LEVEL") {
        config.logging.level = Some(val);
    }
    if let Some(val) = non_empty("AURA_LOG_FORMAT")
        && let Some(format) = parse_log_format(&val)
    {
        config.logging.format = format;
    }
}

/// Parse an auth mode string.
fn parse_auth_mode(val: &str) -> Option<AuthMode> {
    match val.to_ascii_lowercase().as_str() {
        "decode-only" | "decode_only" | "decode" => Some(AuthMode::DecodeOnly),
        "hs256" => Some(AuthMode::Hs256),
        "jwks" | "rs256" => Some(AuthMode::Jwks),
        _ => None,
    }
}

/// Parse a log format string.
fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_ascii_lowercase().as_str() {
        "pretty" | "text" => Some(LogFormat::Pretty),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / show
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.aura/config.toml`.
///
/// Creates the `~/.aura/` directory if it doesn't exist. Returns an error
/// if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.aura/ directory")?;
    }

    fs::write(&path, GatewayConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Placeholder printed instead of secret values.
pub const REDACTED: &str = "<redacted>";

/// Show the effective (fully resolved) config as TOML, secrets redacted.
pub fn show_effective_config() -> Result<String> {
    render_config(&load())
}

/// Render `config` as TOML with secret values replaced by [`REDACTED`].
pub fn render_config(config: &GatewayConfig) -> Result<String> {
    let mut shown = config.clone();
    if shown.auth.hs256_secret.is_some() {
        shown.auth.hs256_secret = Some(REDACTED.to_string());
    }
    toml::to_string_pretty(&shown).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_profile_fields() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("AURA_ENVIRONMENT", "production"),
                ("AURA_KEYCLOAK_URL", "https://kc.internal"),
                ("AURA_KEYCLOAK_REALM", "acme"),
            ]),
        );
        assert_eq!(config.environment.name, "production");
        assert_eq!(
            config.profile.identity_url.as_deref(),
            Some("https://kc.internal")
        );
        assert_eq!(config.profile.realm.as_deref(), Some("acme"));
        assert!(config.profile.client_id.is_none());
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[("AURA_BIND", ""), ("AURA_KEYCLOAK_REALM", "  ")]),
        );
        assert_eq!(config.server.bind, "127.0.0.1:3002");
        assert!(config.profile.realm.is_none());
    }

    #[test]
    fn invalid_worker_count_is_ignored() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, lookup_from(&[("AURA_WORKERS", "zero")]));
        assert_eq!(config.server.workers, 4);
        apply_env_overrides(&mut config, lookup_from(&[("AURA_WORKERS", "0")]));
        assert_eq!(config.server.workers, 4);
        apply_env_overrides(&mut config, lookup_from(&[("AURA_WORKERS", "16")]));
        assert_eq!(config.server.workers, 16);
    }

    #[test]
    fn auth_and_logging_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("AURA_AUTH_MODE", "HS256"),
                ("AURA_AUTH_HS256_SECRET", "topsecret"),
                ("AURA_LOG_LEVEL", "warn"),
                ("AURA_LOG_FORMAT", "json"),
            ]),
        );
        assert_eq!(config.auth.mode, AuthMode::Hs256);
        assert_eq!(config.auth.hs256_secret.as_deref(), Some("topsecret"));
        assert_eq!(config.logging.level.as_deref(), Some("warn"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn parse_auth_mode_handles_variants() {
        assert_eq!(parse_auth_mode("decode-only"), Some(AuthMode::DecodeOnly));
        assert_eq!(parse_auth_mode("decode_only"), Some(AuthMode::DecodeOnly));
        assert_eq!(parse_auth_mode("hs256"), Some(AuthMode::Hs256));
        assert_eq!(parse_auth_mode("JWKS"), Some(AuthMode::Jwks));
        assert_eq!(parse_auth_mode("none"), None);
    }

    #[test]
    fn merge_tables_keeps_unrelated_keys() {
        let mut base: toml::Value = toml::from_str(
            r#"
[server]
bind = "127.0.0.1:1"
workers = 2
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[server]
bind = "0.0.0.0:9"

[auth]
mode = "jwks"
"#,
        )
        .unwrap();
        merge_tables(&mut base, overlay);

        let config: GatewayConfig = base.try_into().unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9");
        assert_eq!(config.server.workers, 2);
        assert_eq!(config.auth.mode, AuthMode::Jwks);
    }

    fn layer(path: &str, text: &str) -> (PathBuf, toml::Value) {
        (PathBuf::from(path), toml::from_str(text).unwrap())
    }

    #[test]
    fn invalid_layer_is_skipped_alone() {
        let config = merge_layers([
            layer("global.toml", "[server]\nbind = \"0.0.0.0:8080\"\nworkers = 8\n"),
            layer("project.toml", "[server]\nworkers = \"many\"\n"),
        ]);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.server.workers, 8);
    }

    #[test]
    fn later_valid_layer_wins() {
        let config = merge_layers([
            layer("global.toml", "[server]\nbind = \"0.0.0.0:8080\"\n"),
            layer("project.toml", "[server]\nbind = \"127.0.0.1:9000\"\n"),
        ]);
        assert_eq!(config.server.bind, "127.0.0.1:9000");
    }

    #[test]
    fn no_layers_yields_defaults() {
        assert_eq!(merge_layers([]), GatewayConfig::default());
    }

    #[test]
    fn render_config_round_trips_as_toml() {
        let toml_str = render_config(&GatewayConfig::default()).unwrap();
        let parsed: GatewayConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, GatewayConfig::default());
    }

    #[test]
    fn render_config_redacts_hs256_secret() {
        let mut config = GatewayConfig::default();
        config.auth.mode = AuthMode::Hs256;
        config.auth.hs256_secret = Some("topsecret".to_string());

        let toml_str = render_config(&config).unwrap();
        assert!(!toml_str.contains("topsecret"));
        assert!(toml_str.contains(REDACTED));
        assert_eq!(config.auth.hs256_secret.as_deref(), Some("topsecret"));
    }
}
