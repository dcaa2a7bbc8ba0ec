use std::net::SocketAddr;

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
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_request_timeout_secs: u64,
    pub ai_api_key: Option<String>,
    pub ai_base_url: String,
    pub ai_max_retries: u32,
    pub discovery_api_key: Option<String>,
    pub discovery_base_url: String,
    pub discovery_result_count: u32,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub outbound_api_key: Option<String>,
    pub outbound_base_url: String,
    pub notify_api_key: Option<String>,
    pub notify_base_url: String,
    pub retry_backoff_base_ms: u64,
    pub max_retries: u32,
    pub enrich_concurrency: usize,
    pub attach_concurrency: usize,
    pub digest_recipients: Vec<String>,
    pub digest_from: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "http_request_timeout_secs",
                &self.http_request_timeout_secs,
            )
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "[redacted]"))
            .field("ai_base_url", &self.ai_base_url)
            .field("ai_max_retries", &self.ai_max_retries)
            .field(
                "discovery_api_key",
                &self.discovery_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("discovery_base_url", &self.discovery_base_url)
            .field("discovery_result_count", &self.discovery_result_count)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field(
                "outbound_api_key",
                &self.outbound_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("outbound_base_url", &self.outbound_base_url)
            .field(
                "notify_api_key",
                &self.notify_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("notify_base_url", &self.notify_base_url)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("max_retries", &self.max_retries)
            .field("enrich_concurrency", &self.enrich_concurrency)
            .field("attach_concurrency", &self.attach_concurrency)
            .field("digest_recipients", &self.digest_recipients)
            .field("digest_from", &self.digest_from)
            .finish()
    }
}
