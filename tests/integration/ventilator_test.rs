use anyhow::Result;
use cert_fleet::{
    core::types::{JobDescriptor, ProvisionJob},
    enumeration::{EnumerationError, MemoryDomainTable, handle_event},
};
use serde_json::json;

use super::test_utils::{BUCKET, STAGING_DIRECTORY, ventilator_event};

#[tokio::test]
async fn table_domains_become_the_job_descriptor() -> Result<()> {
    let table = MemoryDomainTable::new("test-certbot-ventilator-certificates")
        .with_domains(["test-domain.pxsys.net"]);

    let job = handle_event(&ventilator_event(), &table).await?;
    assert_eq!(
        serde_json::to_value(&job)?,
        json!({
            "certbot_server": STAGING_DIRECTORY,
            "domains": ["test-domain.pxsys.net"],
            "email": "ops@pxsys.net",
            "s3_bucket": BUCKET,
        })
    );
    Ok(())
}

#[tokio::test]
async fn descriptor_feeds_the_runner() -> Result<()> {
    let table = MemoryDomainTable::new("t").with_domains(["b.example.com", "*.example.com"]);
    let job: JobDescriptor = handle_event(&ventilator_event(), &table).await?;

    let provision = ProvisionJob::from_descriptor(&job)?;
    assert_eq!(
        provision.domains.as_slice(),
        ["b.example.com".to_string(), "*.example.com".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn empty_table_fails_the_invocation() {
    let table = MemoryDomainTable::new("empty-table");
    let err = handle_event(&ventilator_event(), &table).await.unwrap_err();
    assert!(err.downcast_ref::<EnumerationError>().is_some());
    assert!(err.to_string().contains("empty-table"));
}

#[tokio::test]
async fn blank_row_fails_instead_of_shrinking_the_fan_out() {
    let table = MemoryDomainTable::new("certs")
        .with_domains(["good.example.com", "", "Good.Example.com"]);
    let err = handle_event(&ventilator_event(), &table).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EnumerationError>(),
        Some(EnumerationError::InvalidRecord { .. })
    ));
}

#[tokio::test]
async fn scan_failure_propagates() {
    let table = MemoryDomainTable::new("broken").failing("AccessDeniedException");
    let err = handle_event(&ventilator_event(), &table).await.unwrap_err();
    assert!(format!("{err:#}").contains("AccessDeniedException"));
}
