//! Live Route 53 checks. Needs AWS credentials and `CERT_TEST_ROUTE53_ZONE`
//! naming a public hosted zone the credentials can write to.

use std::time::Duration;

use anyhow::Result;
use aws_config::BehaviorVersion;
use cert_fleet::issuance::dns_providers::{DnsProviderAdapter, Route53Adapter, record_name};
use tokio::runtime::Handle;

use super::test_utils::require_env;

#[tokio::test(flavor = "multi_thread")]
async fn route53_publishes_and_removes_txt_values() -> Result<()> {
    let zone = require_env("CERT_TEST_ROUTE53_ZONE")?;
    let name = record_name(&format!("cert-fleet-it-{}.{zone}", std::process::id()));
    let values = vec!["integration-a".to_string(), "integration-b".to_string()];

    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let adapter = Route53Adapter::from_config(&aws, Handle::current(), Duration::from_secs(180));

    tokio::task::spawn_blocking(move || -> Result<()> {
        adapter.create_txt(&name, &values)?;
        adapter.cleanup_txt(&name, &values)
    })
    .await??;
    Ok(())
}
