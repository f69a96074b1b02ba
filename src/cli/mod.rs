//! CLI command implementations for the gateway.
//!
//! Provides subcommand handlers for:
//! - `aura-gateway serve`: run the HTTP gateway
//! - `aura-gateway env [NAME]`: print a resolved environment profile
//! - `aura-gateway config show|init|path`: configuration management
//! - `aura-gateway decode-token <TOKEN>`: inspect a bearer token's roles
//! - `aura-gateway health`: check config files and upstream reachability

use anyhow::{Context, Result};
use colored::Colorize;

use crate::auth::{self, RoleContext, claims};
use crate::config::{self, GatewayConfig};
use crate::environment::EnvironmentProfile;
use crate::logging;
use crate::search::ElasticsearchClient;
use crate::web::{self, AppState};

/// Output format for `env`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Toml,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

// ---------------------------------------------------------------------------
// aura-gateway serve
// ---------------------------------------------------------------------------

/// Load config, apply command-line overrides, and serve until killed.
pub fn run_serve(bind: Option<String>, env: Option<String>) -> Result<()> {
    let mut cfg = config::load();
    if let Some(bind) = bind {
        cfg.server.bind = bind;
    }
    if let Some(env) = env {
        cfg.environment.name = env;
    }

    let profile = EnvironmentProfile::from_config(&cfg);
    logging::init(&cfg.logging, &profile);

    let addr = cfg.server.bind.clone();
    let state = AppState::from_config(cfg)?;

    println!(
        "{} aura-gateway running at http://{} ({})",
        "✓".green().bold(),
        addr,
        profile.name.to_string().bold()
    );
    println!("  {} {}", "Identity provider:".dimmed(), profile.identity_url);
    println!("  {}", "Press Ctrl+C to stop.".dimmed());
    println!();

    web::serve(&addr, state)
}

// ---------------------------------------------------------------------------
// aura-gateway env
// ---------------------------------------------------------------------------

/// Print the profile for `name`, or the configured one when omitted.
pub fn run_env(name: Option<&str>, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let profile = match name {
        Some(name) => EnvironmentProfile::resolve(name, &cfg.profile),
        None => EnvironmentProfile::from_config(&cfg),
    };

    let rendered = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&profile).context("failed to serialize profile")?
        }
        OutputFormat::Toml => {
            toml::to_string_pretty(&profile).context("failed to serialize profile")?
        }
    };
    println!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// aura-gateway config show | init | path
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective aura-gateway Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(config_exists(config::global_config_file()), "~/.aura/config.toml");
    print_source(config_exists(config::project_config_file()), ".aura.toml");
    println!("  {} {}", "·".dimmed(), "AURA_* environment variables".dimmed());

    Ok(())
}

fn print_source(found: bool, name: &str) {
    if found {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.aura/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!("  {}", "Edit the file to customize the gateway.".dimmed());
    Ok(())
}

/// Print where config files are read from.
pub fn run_config_path() -> Result<()> {
    let global = config::global_config_file().context("could not determine home directory")?;
    println!("{}", global.display());
    if let Some(project) = config::project_config_file() {
        println!("{}", project.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// aura-gateway decode-token
// ---------------------------------------------------------------------------

/// Decode a token's payload without verifying it and show what the role
/// extractor would derive from it.
pub fn run_decode_token(token: &str) -> Result<()> {
    let cfg = config::load();
    let profile = EnvironmentProfile::from_config(&cfg);

    let raw = auth::bearer_token(token).unwrap_or(token.trim());
    let claims = claims::decode_unverified(raw).context("token could not be decoded")?;
    let roles = RoleContext::from_claims(&claims);

    println!("{}", "Token Claims (signature NOT verified)".bold().cyan());
    println!("{}", "=".repeat(50));
    println!(
        "{}",
        serde_json::to_string_pretty(&claims).context("failed to serialize claims")?
    );
    println!();

    print_field("Access role", roles.access_role.map(|r| r.to_string()));
    print_field("Tenant role", roles.tenant_role.clone());
    print_field(
        "Effective roles",
        Some(claims.effective_roles(&profile.client_id).join(", ")).filter(|s| !s.is_empty()),
    );
    Ok(())
}

fn print_field(name: &str, value: Option<String>) {
    match value {
        Some(value) => println!("  {:<16} {}", format!("{name}:").bold(), value),
        None => println!("  {:<16} {}", format!("{name}:").bold(), "(none)".dimmed()),
    }
}

// ---------------------------------------------------------------------------
// aura-gateway health
// ---------------------------------------------------------------------------

/// Check config files, the resolved profile, and both upstreams.
pub fn run_health() -> Result<()> {
    println!("{}", "aura-gateway Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config_exists(config::global_config_file());
    let project_exists = config_exists(config::project_config_file());
    let cfg = config::load();
    let profile = EnvironmentProfile::from_config(&cfg);

    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.aura/config.toml found"
        } else {
            "not found (run `aura-gateway config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".aura.toml found"
        } else {
            "none (optional)"
        },
    );
    print_health_item(
        "Environment",
        true,
        &format!("{} (debug: {})", profile.name, profile.debug_mode),
    );
    print_health_item(
        "Auth mode",
        cfg.auth.mode != config::AuthMode::DecodeOnly,
        &auth_mode_detail(&cfg),
    );

    let agent = ureq::AgentBuilder::new()
        .timeout(std::time::Duration::from_secs(5))
        .build();

    let realm_url = format!(
        "{}/realms/{}",
        profile.identity_url.trim_end_matches('/'),
        profile.realm
    );
    let identity_ok = agent.get(&realm_url).call().is_ok();
    print_health_item(
        "Identity provider",
        identity_ok,
        &if identity_ok {
            format!("realm reachable at {realm_url}")
        } else {
            format!("not reachable at {realm_url}")
        },
    );

    let search = ElasticsearchClient::new(&cfg.elasticsearch.url, agent);
    let search_ok = search.ping();
    print_health_item(
        "Elasticsearch",
        search_ok,
        &if search_ok {
            format!("reachable at {}", search.base_url())
        } else {
            format!("not reachable at {}", search.base_url())
        },
    );

    Ok(())
}

fn auth_mode_detail(cfg: &GatewayConfig) -> String {
    match cfg.auth.mode {
        config::AuthMode::DecodeOnly => "decode-only (token signatures are not checked)".to_string(),
        mode => format!("{mode}"),
    }
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<20} {}", status, name, detail.dimmed());
}

fn config_exists(path: Option<std::path::PathBuf>) -> bool {
    path.map(|p| p.exists()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_defaults_to_toml() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Toml);
        assert_eq!(OutputFormat::from_str_opt(Some("yaml")), OutputFormat::Toml);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
    }

    #[test]
    fn decode_only_detail_warns() {
        let cfg = GatewayConfig::default();
        assert!(auth_mode_detail(&cfg).contains("not checked"));
    }
}
