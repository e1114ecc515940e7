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
    pub teams_path: Option<PathBuf>,
    pub cron_secret: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub adapter_request_timeout_secs: u64,
    pub adapter_user_agent: String,
    pub fetch_limit: usize,
    pub worker_concurrency: usize,
    pub fetch_concurrency: usize,
    pub job_max_attempts: u32,
    pub job_backoff_base_secs: u64,
    pub clip_pair_min_score: i32,
    pub clip_min_similarity: f64,
    pub tei_url: Option<String>,
    pub qdrant_url: Option<String>,
    pub qdrant_collection: String,
    pub export_dir: PathBuf,
    pub source_tick_cron: String,
    pub query_tick_cron: String,
    pub stale_run_minutes: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("teams_path", &self.teams_path)
            .field("database_url", &"[redacted]")
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[redacted]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "adapter_request_timeout_secs",
                &self.adapter_request_timeout_secs,
            )
            .field("adapter_user_agent", &self.adapter_user_agent)
            .field("fetch_limit", &self.fetch_limit)
            .field("worker_concurrency", &self.worker_concurrency)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("job_max_attempts", &self.job_max_attempts)
            .field("job_backoff_base_secs", &self.job_backoff_base_secs)
            .field("clip_pair_min_score", &self.clip_pair_min_score)
            .field("clip_min_similarity", &self.clip_min_similarity)
            .field("tei_url", &self.tei_url)
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_collection", &self.qdrant_collection)
            .field("export_dir", &self.export_dir)
            .field("source_tick_cron", &self.source_tick_cron)
            .field("query_tick_cron", &self.query_tick_cron)
            .field("stale_run_minutes", &self.stale_run_minutes)
            .finish()
    }
}
