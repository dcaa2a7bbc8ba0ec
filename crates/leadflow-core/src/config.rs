use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("LEADFLOW_ENV", "development"));
    let bind_addr = parse_addr("LEADFLOW_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("LEADFLOW_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("LEADFLOW_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LEADFLOW_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LEADFLOW_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_request_timeout_secs = parse_u64("LEADFLOW_HTTP_REQUEST_TIMEOUT_SECS", "30")?;

    let ai_api_key = lookup("LEADFLOW_AI_API_KEY").ok();
    let ai_base_url = or_default("LEADFLOW_AI_BASE_URL", "https://api.openai.com/v1");
    let ai_max_retries = parse_u32("LEADFLOW_AI_MAX_RETRIES", "2")?;

    let discovery_api_key = lookup("LEADFLOW_DISCOVERY_API_KEY").ok();
    let discovery_base_url = or_default(
        "LEADFLOW_DISCOVERY_BASE_URL",
        "https://api.exa.ai/websets/v0",
    );
    let discovery_result_count = parse_u32("LEADFLOW_DISCOVERY_RESULT_COUNT", "25")?;
    let poll_interval_ms = parse_u64("LEADFLOW_POLL_INTERVAL_MS", "5000")?;
    let poll_max_attempts = parse_u32("LEADFLOW_POLL_MAX_ATTEMPTS", "60")?;

    let outbound_api_key = lookup("LEADFLOW_OUTBOUND_API_KEY").ok();
    let outbound_base_url = or_default(
        "LEADFLOW_OUTBOUND_BASE_URL",
        "https://api.instantly.ai/api/v2",
    );

    let notify_api_key = lookup("LEADFLOW_NOTIFY_API_KEY").ok();
    let notify_base_url = or_default("LEADFLOW_NOTIFY_BASE_URL", "https://api.resend.com");

    let retry_backoff_base_ms = parse_u64("LEADFLOW_RETRY_BACKOFF_BASE_MS", "1000")?;
    let max_retries = parse_u32("LEADFLOW_MAX_RETRIES", "3")?;

    let enrich_concurrency = parse_usize("LEADFLOW_ENRICH_CONCURRENCY", "3")?;
    let attach_concurrency = parse_usize("LEADFLOW_ATTACH_CONCURRENCY", "5")?;

    let digest_recipients: Vec<String> = or_default("LEADFLOW_DIGEST_RECIPIENTS", "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    let digest_from = or_default(
        "LEADFLOW_DIGEST_FROM",
        "leadflow <noreply@leadflow.local>",
    );

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_request_timeout_secs,
        ai_api_key,
        ai_base_url,
        ai_max_retries,
        discovery_api_key,
        discovery_base_url,
        discovery_result_count,
        poll_interval_ms,
        poll_max_attempts,
        outbound_api_key,
        outbound_base_url,
        notify_api_key,
        notify_base_url,
        retry_backoff_base_ms,
        max_retries,
        enrich_concurrency,
        attach_concurrency,
        digest_recipients,
        digest_from,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let map = HashMap::from([("DATABASE_URL", "postgres://localhost/leadflow")]);
        let config = build_app_config(lookup_from_map(&map)).expect("config should load");

        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.discovery_result_count, 25);
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.poll_max_attempts, 60);
        assert_eq!(config.enrich_concurrency, 3);
        assert_eq!(config.attach_concurrency, 5);
        assert!(config.ai_api_key.is_none());
        assert!(config.digest_recipients.is_empty());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let map = HashMap::new();
        let err = build_app_config(lookup_from_map(&map)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn invalid_numeric_value_is_an_error() {
        let map = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/leadflow"),
            ("LEADFLOW_POLL_MAX_ATTEMPTS", "sixty"),
        ]);
        let err = build_app_config(lookup_from_map(&map)).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar { var, .. } if var == "LEADFLOW_POLL_MAX_ATTEMPTS")
        );
    }

    #[test]
    fn digest_recipients_are_split_and_trimmed() {
        let map = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/leadflow"),
            (
                "LEADFLOW_DIGEST_RECIPIENTS",
                "ops@example.com, founder@example.com ,",
            ),
        ]);
        let config = build_app_config(lookup_from_map(&map)).expect("config should load");
        assert_eq!(
            config.digest_recipients,
            vec!["ops@example.com", "founder@example.com"]
        );
    }

    #[test]
    fn environment_parses_known_values() {
        assert_eq!(parse_environment("production"), Environment::Production);
        assert_eq!(parse_environment("test"), Environment::Test);
        assert_eq!(parse_environment("anything"), Environment::Development);
    }
}
