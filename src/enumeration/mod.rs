//! Domain enumeration for the ventilator.
//!
//! Reads every domain record from the durable table and produces the job
//! descriptor the workflow engine fans out to runners.

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;
use thiserror::Error;

use crate::{
    core::types::{JobDescriptor, VentilatorRequest},
    domain::normalize_domain_for_storage,
};

mod dynamodb;
mod memory;

pub use dynamodb::{DOMAIN_ATTRIBUTE, DynamoDbDomainTable};
pub use memory::MemoryDomainTable;

#[derive(Error, Debug)]
pub enum EnumerationError {
    #[error("No domains returned from scan of {0}.")]
    NoDomains(String),
    #[error("Invalid domain record {value} in {table}: {reason}")]
    InvalidRecord {
        table: String,
        value: String,
        reason: String,
    },
}

/// A source of domain records, read in full on every invocation.
#[async_trait]
pub trait DomainSource: Send + Sync {
    /// Human-readable name for logs (table name for DynamoDB).
    fn name(&self) -> &str;
    async fn scan_domains(&self) -> Result<Vec<String>>;
}

/// Scans `source` and returns normalized, de-duplicated domains in scan order.
/// Any row that is not a valid domain fails the scan, as does an empty table.
pub async fn enumerate_domains(source: &dyn DomainSource) -> Result<Vec<String>> {
    let raw = source.scan_domains().await?;
    let mut domains: Vec<String> = Vec::with_capacity(raw.len());
    for value in raw {
        match normalize_domain_for_storage(&value) {
            Ok(domain) if !domains.contains(&domain) => domains.push(domain),
            Ok(_) => {}
            Err(err) => {
                return Err(EnumerationError::InvalidRecord {
                    table: source.name().to_string(),
                    value: format!("{value:?}"),
                    reason: err.to_string(),
                }
                .into());
            }
        }
    }

    if domains.is_empty() {
        return Err(EnumerationError::NoDomains(source.name().to_string()).into());
    }
    info!(
        "[ventilator] found {} domain(s) in {}",
        domains.len(),
        source.name()
    );
    Ok(domains)
}

/// Ventilator entry point: validates the event and enumerates domains.
pub async fn handle_event(event: &Value, source: &dyn DomainSource) -> Result<JobDescriptor> {
    let request = VentilatorRequest::from_event(event).inspect_err(|err| {
        error!("[ventilator] {err}");
    })?;
    let domains = enumerate_domains(source).await.inspect_err(|err| {
        error!("[ventilator] {err:#}");
    })?;
    Ok(request.into_job(domains))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::JobError;
    use serde_json::json;

    fn event() -> Value {
        json!({
            "certbot_server": "https://acme-staging-v02.api.letsencrypt.org/directory",
            "email": "ops@pxsys.net",
            "s3_bucket": "cert-bucket"
        })
    }

    #[tokio::test]
    async fn returns_table_domains() {
        let table = MemoryDomainTable::new("test-certbot-ventilator-certificates")
            .with_domains(["test-domain.pxsys.net"]);
        let job = handle_event(&event(), &table).await.unwrap();
        assert_eq!(job.domains, vec!["test-domain.pxsys.net".to_string()]);
        assert_eq!(job.email, "ops@pxsys.net");
        assert_eq!(job.s3_bucket, "cert-bucket");
    }

    #[tokio::test]
    async fn empty_table_is_an_error() {
        let table = MemoryDomainTable::new("empty");
        let err = handle_event(&event(), &table).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EnumerationError>(),
            Some(EnumerationError::NoDomains(name)) if name == "empty"
        ));
    }

    #[tokio::test]
    async fn duplicate_spellings_collapse() {
        let table = MemoryDomainTable::new("mixed").with_domains(["a.example.com", "A.example.com."]);
        let domains = enumerate_domains(&table).await.unwrap();
        assert_eq!(domains, vec!["a.example.com".to_string()]);
    }

    #[tokio::test]
    async fn invalid_record_fails_the_invocation() {
        let table = MemoryDomainTable::new("mixed")
            .with_domains(["good.example.com", "", "Good.Example.com"]);
        let err = handle_event(&event(), &table).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EnumerationError>(),
            Some(EnumerationError::InvalidRecord { table, value, .. })
                if table == "mixed" && value == "\"\""
        ));
    }

    #[tokio::test]
    async fn validation_happens_before_scan() {
        let table = MemoryDomainTable::new("t").with_domains(["a.example.com"]);
        let mut bad = event();
        bad["s3_bucket"] = json!("");
        let err = handle_event(&bad, &table).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<JobError>(),
            Some(&JobError::EmptyValue("s3_bucket".into()))
        );
        assert_eq!(table.scan_count(), 0);
    }

    #[tokio::test]
    async fn scan_failures_propagate() {
        let table = MemoryDomainTable::new("broken").failing("throttled");
        let err = handle_event(&event(), &table).await.unwrap_err();
        assert!(format!("{err:#}").contains("throttled"));
    }
}
