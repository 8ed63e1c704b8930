use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicUsize, Ordering},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{CertificateManager, ExistingCertificate, ImportRequest, x509::inspect_certificate};

/// One call to [`CertificateManager::import_certificate`], as recorded by
/// [`MemoryCertificateManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub arn: String,
    pub reimport: bool,
    pub tags: Vec<(String, String)>,
}

/// Certificate manager kept in memory. Imported material is parsed so the
/// stored SANs and expiry reflect the actual certificate.
#[derive(Debug, Default)]
pub struct MemoryCertificateManager {
    certificates: Mutex<Vec<ExistingCertificate>>,
    imports: Mutex<Vec<ImportRecord>>,
    describes: AtomicUsize,
}

impl MemoryCertificateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a certificate and returns its ARN.
    pub fn insert<I, S>(&self, sans: I, not_after: Option<DateTime<Utc>>) -> String
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let arn = allocate_arn();
        lock(&self.certificates).push(ExistingCertificate {
            arn: arn.clone(),
            subject_alternative_names: sans.into_iter().map(Into::into).collect(),
            not_after,
        });
        arn
    }

    pub fn certificates(&self) -> Vec<ExistingCertificate> {
        lock(&self.certificates).clone()
    }

    pub fn imports(&self) -> Vec<ImportRecord> {
        lock(&self.imports).clone()
    }

    pub fn describe_count(&self) -> usize {
        self.describes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CertificateManager for MemoryCertificateManager {
    async fn list_certificate_arns(&self, limit: usize) -> Result<Vec<String>> {
        Ok(lock(&self.certificates)
            .iter()
            .take(limit)
            .map(|cert| cert.arn.clone())
            .collect())
    }

    async fn describe_certificate(&self, arn: &str) -> Result<ExistingCertificate> {
        self.describes.fetch_add(1, Ordering::SeqCst);
        lock(&self.certificates)
            .iter()
            .find(|cert| cert.arn == arn)
            .cloned()
            .ok_or_else(|| anyhow!("certificate not found: {arn}"))
    }

    async fn import_certificate(&self, request: ImportRequest<'_>) -> Result<String> {
        let facts = inspect_certificate(&request.material.certificate)?;
        let mut certificates = lock(&self.certificates);

        let (arn, reimport) = match request.existing_arn {
            Some(arn) => {
                let existing = certificates
                    .iter_mut()
                    .find(|cert| cert.arn == arn)
                    .ok_or_else(|| anyhow!("certificate not found: {arn}"))?;
                existing.subject_alternative_names = facts.subject_alternative_names;
                existing.not_after = Some(facts.not_after);
                (arn.to_string(), true)
            }
            None => {
                let arn = allocate_arn();
                certificates.push(ExistingCertificate {
                    arn: arn.clone(),
                    subject_alternative_names: facts.subject_alternative_names,
                    not_after: Some(facts.not_after),
                });
                (arn, false)
            }
        };
        drop(certificates);

        lock(&self.imports).push(ImportRecord {
            arn: arn.clone(),
            reimport,
            tags: if reimport { Vec::new() } else { request.tags },
        });
        Ok(arn)
    }
}

fn allocate_arn() -> String {
    format!(
        "arn:aws:acm:us-west-2:000000000000:certificate/{}",
        Uuid::new_v4()
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
