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

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_num = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let narrow = |var: &str, value: u64| -> Result<u32, ConfigError> {
        u32::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SCORELINE_ENV", "development"))?;

    let bind_addr = parse("SCORELINE_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("SCORELINE_LOG_LEVEL", "info");
    let teams_path = optional("SCORELINE_TEAMS_PATH").map(PathBuf::from);
    let cron_secret = optional("SCORELINE_CRON_SECRET");

    let db_max_connections = narrow(
        "SCORELINE_DB_MAX_CONNECTIONS",
        parse_num("SCORELINE_DB_MAX_CONNECTIONS", "10")?,
    )?;
    let db_min_connections = narrow(
        "SCORELINE_DB_MIN_CONNECTIONS",
        parse_num("SCORELINE_DB_MIN_CONNECTIONS", "1")?,
    )?;
    let db_acquire_timeout_secs = parse_num("SCORELINE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let adapter_request_timeout_secs = parse_num("SCORELINE_ADAPTER_REQUEST_TIMEOUT_SECS", "30")?;
    let adapter_user_agent = or_default(
        "SCORELINE_ADAPTER_USER_AGENT",
        "scoreline/0.1 (sports-news-ingest)",
    );
    let fetch_limit = to_usize("SCORELINE_FETCH_LIMIT", parse_num("SCORELINE_FETCH_LIMIT", "100")?)?;

    let worker_concurrency = to_usize(
        "SCORELINE_WORKER_CONCURRENCY",
        parse_num("SCORELINE_WORKER_CONCURRENCY", "5")?,
    )?;
    let fetch_concurrency = to_usize(
        "SCORELINE_FETCH_CONCURRENCY",
        parse_num("SCORELINE_FETCH_CONCURRENCY", "2")?,
    )?;
    if worker_concurrency == 0 || fetch_concurrency == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SCORELINE_WORKER_CONCURRENCY".to_string(),
            reason: "worker concurrency must be at least 1".to_string(),
        });
    }

    let job_max_attempts = narrow(
        "SCORELINE_JOB_MAX_ATTEMPTS",
        parse_num("SCORELINE_JOB_MAX_ATTEMPTS", "3")?,
    )?;
    if job_max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SCORELINE_JOB_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let job_backoff_base_secs = parse_num("SCORELINE_JOB_BACKOFF_BASE_SECS", "5")?;

    let clip_pair_min_score = i32::try_from(parse_num("SCORELINE_CLIP_PAIR_MIN_SCORE", "50")?)
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "SCORELINE_CLIP_PAIR_MIN_SCORE".to_string(),
            reason: e.to_string(),
        })?;
    let clip_min_similarity = parse_fraction(
        "SCORELINE_CLIP_MIN_SIMILARITY",
        &or_default("SCORELINE_CLIP_MIN_SIMILARITY", "0.75"),
    )?;
    let tei_url = optional("SCORELINE_TEI_URL");
    let qdrant_url = optional("SCORELINE_QDRANT_URL");
    let qdrant_collection = or_default("SCORELINE_QDRANT_COLLECTION", "clip_candidates");

    let export_dir = PathBuf::from(or_default("SCORELINE_EXPORT_DIR", "./exports"));
    let source_tick_cron = or_default("SCORELINE_SOURCE_TICK_CRON", "0 * * * * *");
    let query_tick_cron = or_default("SCORELINE_QUERY_TICK_CRON", "0 */5 * * * *");
    let stale_run_minutes = i64::try_from(parse_num("SCORELINE_STALE_RUN_MINUTES", "120")?)
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "SCORELINE_STALE_RUN_MINUTES".to_string(),
            reason: e.to_string(),
        })?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        teams_path,
        cron_secret,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        adapter_request_timeout_secs,
        adapter_user_agent,
        fetch_limit,
        worker_concurrency,
        fetch_concurrency,
        job_max_attempts,
        job_backoff_base_secs,
        clip_pair_min_score,
        clip_min_similarity,
        tei_url,
        qdrant_url,
        qdrant_collection,
        export_dir,
        source_tick_cron,
        query_tick_cron,
        stale_run_minutes,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SCORELINE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn to_usize(var: &str, value: u64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_fraction(var: &str, raw: &str) -> Result<f64, ConfigError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })?;

    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("{value} is outside [0, 1]"),
        });
    }

    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
