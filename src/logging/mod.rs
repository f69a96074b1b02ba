//! Tracing subscriber setup.
//!
//! Filter precedence: `RUST_LOG` → `[logging] level` / `AURA_LOG_LEVEL` →
//! the environment profile's `log_level`. Output goes to stderr, as
//! human-readable lines or one JSON object per event.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, schema::LoggingConfig};
use crate::environment::EnvironmentProfile;

/// Pick the filter directive, ignoring `RUST_LOG` (handled in [`init`]).
pub fn filter_directive(logging: &LoggingConfig, profile: &EnvironmentProfile) -> String {
    logging
        .level
        .as_deref()
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .unwrap_or(profile.log_level.as_str())
        .to_string()
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(logging: &LoggingConfig, profile: &EnvironmentProfile) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(logging, profile)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    #[test]
    fn profile_level_is_the_fallback() {
        let profile = EnvironmentProfile::builtin(Environment::Production);
        assert_eq!(filter_directive(&LoggingConfig::default(), &profile), "error");
    }

    #[test]
    fn configured_level_wins() {
        let profile = EnvironmentProfile::builtin(Environment::Production);
        let logging = LoggingConfig {
            level: Some("aura_gateway=debug".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_directive(&logging, &profile), "aura_gateway=debug");
    }

    #[test]
    fn blank_level_is_ignored() {
        let profile = EnvironmentProfile::builtin(Environment::Testing);
        let logging = LoggingConfig {
            level: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_directive(&logging, &profile), "warn");
    }
}
