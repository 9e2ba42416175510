use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub regions_path: PathBuf,
    pub filter_rules_path: PathBuf,
    pub places_api_key: Option<String>,
    pub places_base_url: String,
    pub places_language: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Minimum pause before every outbound Places call.
    pub call_delay_ms: u64,
    /// Extra pause before following a next-page token.
    pub page_token_delay_ms: u64,
    pub inter_region_delay_ms: u64,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    pub backoff_initial_ms: u64,
    pub subdivision_threshold: usize,
    pub subdivision_max_depth: u32,
    pub max_concurrent_regions: usize,
    pub match_radius_km: f64,
    pub enrich_details: bool,
    pub discovery_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("regions_path", &self.regions_path)
            .field("filter_rules_path", &self.filter_rules_path)
            .field("database_url", &"[redacted]")
            .field(
                "places_api_key",
                &self.places_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("places_base_url", &self.places_base_url)
            .field("places_language", &self.places_language)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("call_delay_ms", &self.call_delay_ms)
            .field("page_token_delay_ms", &self.page_token_delay_ms)
            .field("inter_region_delay_ms", &self.inter_region_delay_ms)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_initial_ms", &self.backoff_initial_ms)
            .field("subdivision_threshold", &self.subdivision_threshold)
            .field("subdivision_max_depth", &self.subdivision_max_depth)
            .field("max_concurrent_regions", &self.max_concurrent_regions)
            .field("match_radius_km", &self.match_radius_km)
            .field("enrich_details", &self.enrich_details)
            .field("discovery_cron", &self.discovery_cron)
            .finish()
    }
}
