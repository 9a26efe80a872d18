//! Server configuration, read from `BLOODBRIDGE_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::warn;

use bloodbridge_notify::NotifierConfig;

/// Placeholder JWT secrets that MUST NOT be used in production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Testing,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "testing" | "test" => Ok(Self::Testing),
            other => bail!("unknown environment {:?}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub jwt_secret: String,
    pub session_ttl: chrono::Duration,
    pub notifier: NotifierConfig,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("BLOODBRIDGE_{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = match get("ENV") {
            Some(v) => v.parse()?,
            None => Environment::Development,
        };
        let production = environment == Environment::Production;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) if production && PLACEHOLDER_SECRETS.contains(&secret.as_str()) => {
                bail!("BLOODBRIDGE_JWT_SECRET is still a placeholder")
            }
            Some(secret) => secret,
            None if production => bail!("BLOODBRIDGE_JWT_SECRET must be set in production"),
            None => {
                warn!("BLOODBRIDGE_JWT_SECRET not set, using the development secret");
                DEV_SECRET.to_string()
            }
        };

        let db_path = match get("DB_PATH") {
            Some(p) if p == ":memory:" => None,
            Some(p) => Some(PathBuf::from(p)),
            None if environment == Environment::Testing => None,
            None => Some(PathBuf::from("bloodbridge.db")),
        };

        let port = match get("PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid BLOODBRIDGE_PORT {p:?}"))?,
            None => 5000,
        };

        let session_days: i64 = match get("SESSION_DAYS") {
            Some(d) => d
                .parse()
                .with_context(|| format!("invalid BLOODBRIDGE_SESSION_DAYS {d:?}"))?,
            None => 7,
        };
        if session_days < 1 {
            bail!("BLOODBRIDGE_SESSION_DAYS must be at least 1");
        }

        let notifier = NotifierConfig {
            enabled: get("SMS_ENABLED").is_some_and(|v| is_truthy(&v))
                && environment != Environment::Testing,
            endpoint: get("SMS_ENDPOINT"),
            api_key: get("SMS_API_KEY"),
            sender_id: get("SMS_SENDER_ID").unwrap_or_else(|| "BloodBridge".into()),
            alerts_topic: get("ALERTS_TOPIC"),
            emergency_topic: get("EMERGENCY_TOPIC"),
            timeout: Duration::from_secs(10),
        };

        let seed_demo = match get("SEED_DEMO") {
            Some(v) => is_truthy(&v),
            None => !production,
        };

        Ok(Self {
            environment,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path,
            jwt_secret,
            session_ttl: chrono::Duration::days(session_days),
            notifier,
            seed_demo,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (format!("BLOODBRIDGE_{k}"), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn development_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.db_path, Some(PathBuf::from("bloodbridge.db")));
        assert_eq!(cfg.jwt_secret, DEV_SECRET);
        assert_eq!(cfg.session_ttl, chrono::Duration::days(7));
        assert!(!cfg.notifier.enabled);
        assert!(cfg.seed_demo);
    }

    #[test]
    fn production_requires_real_secret() {
        assert!(config(&[("ENV", "production")]).is_err());
        assert!(config(&[("ENV", "production"), ("JWT_SECRET", "dev-secret-change-me")]).is_err());

        let cfg = config(&[("ENV", "production"), ("JWT_SECRET", "s3cr3t-from-vault")]).unwrap();
        assert_eq!(cfg.jwt_secret, "s3cr3t-from-vault");
        assert!(!cfg.seed_demo);
    }

    #[test]
    fn memory_database_and_sms() {
        let cfg = config(&[
            ("DB_PATH", ":memory:"),
            ("SMS_ENABLED", "true"),
            ("SMS_ENDPOINT", "https://sms.example.com/send"),
            ("EMERGENCY_TOPIC", "emergency"),
            ("PORT", "8080"),
        ])
        .unwrap();
        assert!(cfg.db_path.is_none());
        assert!(cfg.notifier.enabled);
        assert_eq!(cfg.notifier.emergency_topic.as_deref(), Some("emergency"));
        assert!(cfg.notifier.alerts_topic.is_none());
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn testing_never_sends() {
        let cfg = config(&[("ENV", "testing"), ("SMS_ENABLED", "true")]).unwrap();
        assert!(cfg.db_path.is_none());
        assert!(!cfg.notifier.enabled);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("ENV", "staging")]).is_err());
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("SESSION_DAYS", "0")]).is_err());
    }
}
