use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use aws_sdk_route53::{
    Client,
    types::{
        Change, ChangeAction, ChangeBatch, ChangeStatus, ResourceRecord, ResourceRecordSet,
        RrType,
    },
};
use log::{info, warn};
use tokio::runtime::Handle;

use super::{
    DnsProviderAdapter, challenge_domain, format_txt_content, matches_zone,
    retry_provider_verification,
};

const TXT_TTL: i64 = 10;
const CHANGE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// DNS-01 records in Route 53, using the ambient AWS credentials.
///
/// The adapter is called from blocking code (the ACME flow), so it drives the
/// async SDK through a runtime handle captured at construction.
pub struct Route53Adapter {
    client: Client,
    runtime: Handle,
    propagation_timeout: Duration,
}

impl Route53Adapter {
    pub fn new(client: Client, runtime: Handle, propagation_timeout: Duration) -> Self {
        Self {
            client,
            runtime,
            propagation_timeout,
        }
    }

    pub fn from_config(
        config: &aws_config::SdkConfig,
        runtime: Handle,
        propagation_timeout: Duration,
    ) -> Self {
        Self::new(Client::new(config), runtime, propagation_timeout)
    }

    /// Longest public hosted zone whose name is a suffix of `domain`.
    async fn discover_hosted_zone_id(&self, domain: &str) -> Result<String> {
        let mut paginator = self
            .client
            .list_hosted_zones()
            .into_paginator()
            .send();

        let mut best: Option<(usize, String)> = None;
        while let Some(page) = paginator.next().await {
            let page = page.context("Failed to list Route 53 hosted zones")?;
            for zone in page.hosted_zones() {
                let is_private = zone
                    .config()
                    .map(|config| config.private_zone())
                    .unwrap_or(false);
                if is_private {
                    continue;
                }
                let zone_name = zone.name().trim_end_matches('.');
                if matches_zone(domain, zone_name)
                    && best.as_ref().is_none_or(|(len, _)| zone_name.len() > *len)
                {
                    best = Some((zone_name.len(), zone.id().to_string()));
                }
            }
        }

        best.map(|(_, id)| id)
            .ok_or_else(|| anyhow!("No Route 53 hosted zone found for domain: {}", domain))
    }

    async fn change_txt_record(
        &self,
        action: ChangeAction,
        record_name: &str,
        values: &[String],
    ) -> Result<String> {
        let hosted_zone_id = self
            .discover_hosted_zone_id(challenge_domain(record_name))
            .await?;

        let mut records = Vec::with_capacity(values.len());
        for value in values {
            records.push(
                ResourceRecord::builder()
                    .value(format_txt_content(value))
                    .build()
                    .map_err(|e| anyhow!("Failed to build ResourceRecord: {}", e))?,
            );
        }

        let record_set = ResourceRecordSet::builder()
            .name(record_name)
            .set_resource_records(Some(records))
            .ttl(TXT_TTL)
            .set_type(Some(RrType::Txt))
            .build()
            .map_err(|e| anyhow!("Failed to build ResourceRecordSet: {}", e))?;

        let change = Change::builder()
            .action(action)
            .resource_record_set(record_set)
            .build()
            .map_err(|e| anyhow!("Failed to build Change: {}", e))?;

        let change_batch = ChangeBatch::builder()
            .comment("ACME DNS-01 challenge")
            .changes(change)
            .build()
            .map_err(|e| anyhow!("Failed to build ChangeBatch: {}", e))?;

        let result = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(&hosted_zone_id)
            .change_batch(change_batch)
            .send()
            .await
            .with_context(|| format!("Failed to change Route 53 record {record_name}"))?;

        result
            .change_info()
            .map(|info| info.id().to_string())
            .ok_or_else(|| anyhow!("Route 53 returned no change id for {record_name}"))
    }

    async fn change_in_sync(&self, change_id: &str) -> Result<bool> {
        let response = self
            .client
            .get_change()
            .id(change_id)
            .send()
            .await
            .with_context(|| format!("Failed to read Route 53 change {change_id}"))?;
        Ok(response
            .change_info()
            .is_some_and(|info| info.status() == &ChangeStatus::Insync))
    }
}

impl DnsProviderAdapter for Route53Adapter {
    fn create_txt(&self, record_name: &str, values: &[String]) -> Result<()> {
        let change_id = self.runtime.block_on(self.change_txt_record(
            ChangeAction::Upsert,
            record_name,
            values,
        ))?;
        info!("[route53] waiting for {record_name} to propagate (change {change_id})");
        retry_provider_verification(
            record_name,
            "Route 53 change",
            self.propagation_timeout,
            CHANGE_POLL_INTERVAL,
            || self.runtime.block_on(self.change_in_sync(&change_id)),
        )
    }

    fn cleanup_txt(&self, record_name: &str, values: &[String]) -> Result<()> {
        match self.runtime.block_on(self.change_txt_record(
            ChangeAction::Delete,
            record_name,
            values,
        )) {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!("[route53] failed to delete {record_name}: {err:#}");
                Err(err)
            }
        }
    }
}
