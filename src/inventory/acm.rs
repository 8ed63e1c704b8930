use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_acm::{Client, primitives::Blob, types::Tag};
use chrono::{DateTime, Utc};
use log::debug;

use super::{CertificateManager, ExistingCertificate, ImportRequest};

/// AWS Certificate Manager backend.
pub struct AcmCertificateManager {
    client: Client,
}

impl AcmCertificateManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl CertificateManager for AcmCertificateManager {
    async fn list_certificate_arns(&self, limit: usize) -> Result<Vec<String>> {
        let mut paginator = self.client.list_certificates().into_paginator().send();

        let mut arns = Vec::new();
        while let Some(page) = paginator.next().await {
            let page = page.context("Failed to list ACM certificates")?;
            for summary in page.certificate_summary_list() {
                if let Some(arn) = summary.certificate_arn() {
                    arns.push(arn.to_string());
                }
                if arns.len() >= limit {
                    return Ok(arns);
                }
            }
        }
        Ok(arns)
    }

    async fn describe_certificate(&self, arn: &str) -> Result<ExistingCertificate> {
        let response = self
            .client
            .describe_certificate()
            .certificate_arn(arn)
            .send()
            .await
            .with_context(|| format!("Failed to describe ACM certificate {arn}"))?;

        let detail = response
            .certificate()
            .ok_or_else(|| anyhow!("ACM returned no detail for {arn}"))?;
        let not_after = match detail.not_after() {
            Some(ts) => Some(
                DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos())
                    .ok_or_else(|| anyhow!("NotAfter out of range for {arn}"))?,
            ),
            None => None,
        };

        Ok(ExistingCertificate {
            arn: arn.to_string(),
            subject_alternative_names: detail.subject_alternative_names().to_vec(),
            not_after,
        })
    }

    async fn import_certificate(&self, request: ImportRequest<'_>) -> Result<String> {
        let material = request.material;
        let mut call = self
            .client
            .import_certificate()
            .set_certificate_arn(request.existing_arn.map(str::to_string))
            .certificate(Blob::new(material.certificate.as_bytes()))
            .private_key(Blob::new(material.private_key.as_bytes()))
            .certificate_chain(Blob::new(material.certificate_chain.as_bytes()));

        // ACM refuses tags on re-import.
        if request.existing_arn.is_none() {
            for (key, value) in request.tags {
                let tag = Tag::builder()
                    .key(key)
                    .value(value)
                    .build()
                    .map_err(|e| anyhow!("Failed to build ACM tag: {}", e))?;
                call = call.tags(tag);
            }
        }

        let response = call
            .send()
            .await
            .context("Failed to import certificate into ACM")?;

        let arn = response
            .certificate_arn()
            .map(str::to_string)
            .or_else(|| request.existing_arn.map(str::to_string))
            .ok_or_else(|| anyhow!("ACM import returned no certificate ARN"))?;
        debug!("[acm] import completed for {arn}");
        Ok(arn)
    }
}
