use std::time::Duration;

/// Central place for runtime configuration.
///
/// Loads values from the environment (via `.env` if present) and gives
/// callers a typed, validated struct instead of raw strings everywhere.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub min_run_lease_duration: Duration,
    pub max_run_lease_duration: Duration,
    pub migrate_on_startup: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let bind_addr = env_or_default("BIND_ADDR", "0.0.0.0:8080");

        let min_run_lease_duration = env_secs("MIN_RUN_LEASE_DURATION", 30);
        let max_run_lease_duration = env_secs("MAX_RUN_LEASE_DURATION", 120);

        let migrate_on_startup = env_bool("RUN_MIGRATIONS_ON_STARTUP").unwrap_or(false);

        Ok(Self {
            database_url,
            bind_addr,
            min_run_lease_duration,
            max_run_lease_duration,
            migrate_on_startup,
        })
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_secs_falls_back_to_default_when_unset() {
        std::env::remove_var("SOME_UNUSED_LEASE_VAR");
        assert_eq!(env_secs("SOME_UNUSED_LEASE_VAR", 42), Duration::from_secs(42));
    }

    #[test]
    fn env_bool_accepts_common_truthy_spellings() {
        std::env::set_var("RUNFLOW_TEST_BOOL", "yes");
        assert_eq!(env_bool("RUNFLOW_TEST_BOOL"), Some(true));
        std::env::set_var("RUNFLOW_TEST_BOOL", "0");
        assert_eq!(env_bool("RUNFLOW_TEST_BOOL"), Some(false));
        std::env::remove_var("RUNFLOW_TEST_BOOL");
    }
}
