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
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Generic `FromStr` parse with a default, mapped into [`ConfigError::InvalidEnvVar`].
fn parse_with<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns [`ConfigError`] if a required variable is missing or any value
/// fails to parse or validate.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("BOXFINDER_ENV", "development"))?;

    let bind_addr: SocketAddr = parse_with(&lookup, "BOXFINDER_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("BOXFINDER_LOG_LEVEL", "info");
    let regions_path = PathBuf::from(or_default(
        "BOXFINDER_REGIONS_PATH",
        "./config/regions.yaml",
    ));
    let filter_rules_path = PathBuf::from(or_default(
        "BOXFINDER_FILTER_RULES_PATH",
        "./config/filter_rules.yaml",
    ));
    let places_api_key = lookup("PLACES_API_KEY").ok().filter(|k| !k.is_empty());
    let places_base_url = or_default(
        "BOXFINDER_PLACES_BASE_URL",
        "https://maps.googleapis.com/maps/api/place/",
    );
    let places_language = or_default("BOXFINDER_PLACES_LANGUAGE", "ko");

    let db_max_connections = parse_with(&lookup, "BOXFINDER_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_with(&lookup, "BOXFINDER_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs =
        parse_with(&lookup, "BOXFINDER_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let request_timeout_secs = parse_with(&lookup, "BOXFINDER_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("BOXFINDER_USER_AGENT", "boxfinder/0.1 (place-discovery)");
    let call_delay_ms = parse_with(&lookup, "BOXFINDER_CALL_DELAY_MS", "200")?;
    let page_token_delay_ms = parse_with(&lookup, "BOXFINDER_PAGE_TOKEN_DELAY_MS", "2000")?;
    let inter_region_delay_ms = parse_with(&lookup, "BOXFINDER_INTER_REGION_DELAY_MS", "500")?;
    let max_attempts: u32 = parse_with(&lookup, "BOXFINDER_MAX_ATTEMPTS", "3")?;
    if max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BOXFINDER_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let backoff_initial_ms = parse_with(&lookup, "BOXFINDER_BACKOFF_INITIAL_MS", "1000")?;
    let subdivision_threshold: usize =
        parse_with(&lookup, "BOXFINDER_SUBDIVISION_THRESHOLD", "60")?;
    if subdivision_threshold == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BOXFINDER_SUBDIVISION_THRESHOLD".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let subdivision_max_depth = parse_with(&lookup, "BOXFINDER_SUBDIVISION_MAX_DEPTH", "1")?;
    let max_concurrent_regions = parse_with(&lookup, "BOXFINDER_MAX_CONCURRENT_REGIONS", "1")?;

    let match_radius_km: f64 = parse_with(&lookup, "BOXFINDER_MATCH_RADIUS_KM", "1.0")?;
    if !match_radius_km.is_finite() || match_radius_km < 0.0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BOXFINDER_MATCH_RADIUS_KM".to_string(),
            reason: format!("must be a non-negative number, got {match_radius_km}"),
        });
    }

    let enrich_details = parse_with(&lookup, "BOXFINDER_ENRICH_DETAILS", "true")?;
    let discovery_cron = or_default("BOXFINDER_DISCOVERY_CRON", "0 0 3 * * MON");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        regions_path,
        filter_rules_path,
        places_api_key,
        places_base_url,
        places_language,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        request_timeout_secs,
        user_agent,
        call_delay_ms,
        page_token_delay_ms,
        inter_region_delay_ms,
        max_attempts,
        backoff_initial_ms,
        subdivision_threshold,
        subdivision_max_depth,
        max_concurrent_regions,
        match_radius_km,
        enrich_details,
        discovery_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BOXFINDER_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
