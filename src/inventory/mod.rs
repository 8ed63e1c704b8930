//! Certificate-manager inventory: finding the certificate that already
//! serves a domain set, and importing new material.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::{core::material::CertificateMaterial, domain::DomainSet};

mod acm;
mod memory;
pub mod x509;

pub use acm::AcmCertificateManager;
pub use memory::{ImportRecord, MemoryCertificateManager};

/// Certificate already present in the certificate manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingCertificate {
    pub arn: String,
    pub subject_alternative_names: Vec<String>,
    /// Absent while a certificate is still pending issuance.
    pub not_after: Option<DateTime<Utc>>,
}

/// Import of new material, either as a fresh certificate or over an existing ARN.
pub struct ImportRequest<'a> {
    pub existing_arn: Option<&'a str>,
    pub material: &'a CertificateMaterial,
    /// Applied to new certificates only.
    pub tags: Vec<(String, String)>,
}

#[async_trait]
pub trait CertificateManager: Send + Sync {
    /// Returns at most `limit` certificate ARNs.
    async fn list_certificate_arns(&self, limit: usize) -> Result<Vec<String>>;
    async fn describe_certificate(&self, arn: &str) -> Result<ExistingCertificate>;
    /// Returns the ARN holding the imported material.
    async fn import_certificate(&self, request: ImportRequest<'_>) -> Result<String>;
}

/// Returns the first certificate whose SANs are all among `domains`.
///
/// Stops at the first match; with several overlapping certificates the one
/// listed first wins, not the one with the longest validity.
pub async fn find_existing_cert(
    manager: &dyn CertificateManager,
    domains: &DomainSet,
    limit: usize,
) -> Result<Option<ExistingCertificate>> {
    info!("[acm] Checking to see if a certificate already exists for: {domains}");
    let arns = manager.list_certificate_arns(limit).await?;
    debug!("[acm] inspecting {} certificate(s)", arns.len());

    for arn in arns {
        let certificate = manager.describe_certificate(&arn).await?;
        if domains.covers(
            certificate
                .subject_alternative_names
                .iter()
                .map(String::as_str),
        ) {
            info!("[acm] Found an existing certificate for: {domains} ({arn})");
            return Ok(Some(certificate));
        }
    }

    Ok(None)
}
