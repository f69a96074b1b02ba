use anyhow::Result;
use clap::{Parser, Subcommand};

use aura_gateway::cli;

#[derive(Debug, Parser)]
#[command(name = "aura-gateway")]
#[command(about = "Backend gateway for the EA Aura dashboard")]
#[command(version)]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Address to bind (overrides [server] bind)
        #[arg(long)]
        bind: Option<String>,
        /// Environment profile: development, staging, testing, production
        #[arg(long)]
        env: Option<String>,
    },
    /// Print a resolved environment profile
    Env {
        /// Profile name (default: the configured environment)
        name: Option<String>,
        /// Output format: toml (default), json
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Decode a bearer token (without verifying it) and show its roles
    DecodeToken {
        /// The raw JWT, or a full "Bearer <jwt>" header value
        token: String,
    },
    /// Check config files and upstream reachability
    Health,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.aura/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file locations
    Path,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Serve { bind, env } => cli::run_serve(bind, env),
        Commands::Env { name, format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_env(name.as_deref(), fmt)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Path => cli::run_config_path(),
        },
        Commands::DecodeToken { token } => cli::run_decode_token(&token),
        Commands::Health => cli::run_health(),
    }
}
