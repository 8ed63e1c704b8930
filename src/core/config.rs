use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, info};
use zeroize::Zeroizing;

use super::logging::LoggingConfig;

pub const DEFAULT_ENVIRONMENT: &str = "test";
pub const DEFAULT_S3_PREFIX: &str = "certs";
pub const DEFAULT_RENEWAL_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_LOOKUP_LIMIT: usize = 1000;
pub const DEFAULT_DNS_PROPAGATION_TIMEOUT_SECS: u64 = 120;

const VENTILATOR_NAME: &str = "certbot-ventilator";

/// Runtime settings shared by both binaries, sourced from the environment.
#[derive(Clone)]
pub struct Settings {
    pub environment: String,
    pub domain_table: String,
    pub s3_prefix: String,
    pub renewal_window_days: i64,
    pub lookup_limit: usize,
    pub scratch_dir: PathBuf,
    pub dns_propagation_timeout: Duration,
    pub acme_account_key_pem: Option<Zeroizing<String>>,
    pub logging: LoggingConfig,
    /// Fallbacks taken while loading, logged once the logger is installed.
    pub notices: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut notices = Vec::new();

        let environment = match get("PIXSVC_ENV") {
            Some(env) => env,
            None => {
                notices.push(format!(
                    "Unable to find PIXSVC_ENV environment variable; using {DEFAULT_ENVIRONMENT}."
                ));
                DEFAULT_ENVIRONMENT.to_string()
            }
        };
        let domain_table = get("CERT_DOMAIN_TABLE")
            .unwrap_or_else(|| format!("{environment}-{VENTILATOR_NAME}-certificates"));

        let s3_prefix = get("CERT_S3_PREFIX")
            .map(|prefix| prefix.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_S3_PREFIX.to_string());
        if s3_prefix.is_empty() {
            return Err(anyhow!("CERT_S3_PREFIX must contain at least one path segment"));
        }

        let renewal_window_days = parse_or(
            get("CERT_RENEWAL_WINDOW_DAYS"),
            "CERT_RENEWAL_WINDOW_DAYS",
            DEFAULT_RENEWAL_WINDOW_DAYS,
        )?;
        if renewal_window_days < 0 {
            return Err(anyhow!("CERT_RENEWAL_WINDOW_DAYS cannot be negative"));
        }
        let lookup_limit =
            parse_or(get("CERT_LOOKUP_LIMIT"), "CERT_LOOKUP_LIMIT", DEFAULT_LOOKUP_LIMIT)?;
        if lookup_limit == 0 {
            return Err(anyhow!("CERT_LOOKUP_LIMIT must be at least 1"));
        }
        let propagation_secs = parse_or(
            get("CERT_DNS_PROPAGATION_TIMEOUT_SECS"),
            "CERT_DNS_PROPAGATION_TIMEOUT_SECS",
            DEFAULT_DNS_PROPAGATION_TIMEOUT_SECS,
        )?;

        let scratch_dir = get("CERT_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        let log_level = parse_or(get("CERT_LOG_LEVEL"), "CERT_LOG_LEVEL", LevelFilter::Info)?;

        Ok(Self {
            environment,
            domain_table,
            s3_prefix,
            renewal_window_days,
            lookup_limit,
            scratch_dir,
            dns_propagation_timeout: Duration::from_secs(propagation_secs),
            acme_account_key_pem: get("ACME_ACCOUNT_KEY_PEM").map(Zeroizing::new),
            logging: LoggingConfig::with_level(log_level),
            notices,
        })
    }

    /// Logs the fallbacks recorded by [`Settings::from_lookup`]. Call after
    /// `init_logging`.
    pub fn log_notices(&self) {
        for notice in &self.notices {
            info!("[config] {notice}");
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {value}")),
        None => Ok(default),
    }
}
