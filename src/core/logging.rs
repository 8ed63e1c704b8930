//! Logger construction for both binaries.
//!
//! Third-party crates that can echo request or response bodies (and with
//! them certificate or key material) are listed in
//! [`LoggingConfig::quiet_targets`] and are always forced off, regardless of
//! any `RUST_LOG` override.

use anyhow::{Result, anyhow};
use env_logger::{Builder, Logger};
use log::LevelFilter;

/// Module targets silenced by default.
pub const DEFAULT_QUIET_TARGETS: &[&str] = &[
    "acme_lib",
    "aws_config",
    "aws_smithy_runtime",
    "aws_smithy_runtime_api",
    "aws_sdk_acm",
    "aws_sdk_dynamodb",
    "aws_sdk_route53",
    "aws_sdk_s3",
    "h2",
    "hyper",
    "hyper_util",
    "rustls",
    "ureq",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub default_level: LevelFilter,
    pub quiet_targets: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: LevelFilter::Info,
            quiet_targets: DEFAULT_QUIET_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: LevelFilter) -> Self {
        Self {
            default_level: level,
            ..Self::default()
        }
    }
}

/// Builds the logger without installing it. `overrides` uses the
/// `RUST_LOG` directive syntax.
pub fn build_logger(config: &LoggingConfig, overrides: Option<&str>) -> Logger {
    let mut builder = Builder::new();
    builder.filter_level(config.default_level);
    if let Some(spec) = overrides {
        builder.parse_filters(spec);
    }
    // Later directives for the same target replace earlier ones.
    for target in &config.quiet_targets {
        builder.filter_module(target, LevelFilter::Off);
    }
    builder.format_timestamp_millis();
    builder.build()
}

/// Installs the process-wide logger. Call once at binary startup.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let overrides = std::env::var("RUST_LOG").ok();
    let logger = build_logger(config, overrides.as_deref());
    let max_level = logger.filter();
    log::set_boxed_logger(Box::new(logger))
        .map_err(|err| anyhow!("failed to install logger: {err}"))?;
    log::set_max_level(max_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata};

    fn enabled(logger: &Logger, target: &str, level: Level) -> bool {
        logger.enabled(&Metadata::builder().target(target).level(level).build())
    }

    #[test]
    fn quiet_targets_are_silenced() {
        let logger = build_logger(&LoggingConfig::default(), None);
        assert!(!enabled(&logger, "acme_lib::api", Level::Error));
        assert!(!enabled(&logger, "aws_smithy_runtime::client", Level::Warn));
        assert!(enabled(&logger, "cert_fleet::provisioning", Level::Info));
        assert!(!enabled(&logger, "cert_fleet::provisioning", Level::Debug));
    }

    #[test]
    fn overrides_cannot_unmute_quiet_targets() {
        let logger = build_logger(&LoggingConfig::default(), Some("debug,acme_lib=trace"));
        assert!(enabled(&logger, "cert_fleet::issuance", Level::Debug));
        assert!(!enabled(&logger, "acme_lib", Level::Error));
    }

    #[test]
    fn default_level_is_configurable() {
        let logger = build_logger(&LoggingConfig::with_level(LevelFilter::Warn), None);
        assert!(!enabled(&logger, "cert_fleet", Level::Info));
        assert!(enabled(&logger, "cert_fleet", Level::Warn));
    }
}
