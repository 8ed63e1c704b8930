use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use log::{error, info};
use serde_json::Value;

use super::policy::{ProvisionDecision, should_provision};
use crate::{
    core::{
        config::{DEFAULT_LOOKUP_LIMIT, DEFAULT_RENEWAL_WINDOW_DAYS, DEFAULT_S3_PREFIX, Settings},
        material::CertificateMaterial,
        types::{ProvisionJob, RunnerResponse},
    },
    distribution::{ObjectStore, upload_to_s3},
    domain::DomainSet,
    inventory::{CertificateManager, ExistingCertificate, ImportRequest, find_existing_cert},
    issuance::{CertificateIssuer, IssueRequest},
};

pub const DOMAIN_SET_TAG: &str = "cert-fleet:domain-set";
pub const LINEAGE_TAG: &str = "cert-fleet:lineage";

/// Steps of a runner invocation, in the order they are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    CheckExisting,
    Skip,
    Provision,
    UploadS3,
    UploadAcm,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "START",
            Stage::CheckExisting => "CHECK_EXISTING",
            Stage::Skip => "SKIP",
            Stage::Provision => "PROVISION",
            Stage::UploadS3 => "UPLOAD_S3",
            Stage::UploadAcm => "UPLOAD_ACM",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionerOptions {
    pub s3_prefix: String,
    pub renewal_window_days: i64,
    pub lookup_limit: usize,
    pub scratch_dir: PathBuf,
}

impl Default for ProvisionerOptions {
    fn default() -> Self {
        Self {
            s3_prefix: DEFAULT_S3_PREFIX.to_string(),
            renewal_window_days: DEFAULT_RENEWAL_WINDOW_DAYS,
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl From<&Settings> for ProvisionerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            s3_prefix: settings.s3_prefix.clone(),
            renewal_window_days: settings.renewal_window_days,
            lookup_limit: settings.lookup_limit,
            scratch_dir: settings.scratch_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Skipped {
        arn: String,
        days_until_expiry: i64,
    },
    Provisioned {
        /// ARN holding the new material; equal to the old ARN on re-import.
        arn: String,
        reimported: bool,
        object_keys: Vec<String>,
    },
}

/// Runs one provisioning job against the certificate manager, object store
/// and issuer it was built with.
pub struct Provisioner {
    certificates: Arc<dyn CertificateManager>,
    objects: Arc<dyn ObjectStore>,
    issuer: Arc<dyn CertificateIssuer>,
    options: ProvisionerOptions,
}

impl Provisioner {
    pub fn new(
        certificates: Arc<dyn CertificateManager>,
        objects: Arc<dyn ObjectStore>,
        issuer: Arc<dyn CertificateIssuer>,
        options: ProvisionerOptions,
    ) -> Self {
        Self {
            certificates,
            objects,
            issuer,
            options,
        }
    }

    pub fn options(&self) -> &ProvisionerOptions {
        &self.options
    }

    pub async fn run(&self, job: &ProvisionJob) -> Result<ProvisionOutcome> {
        log_stage(Stage::Start, &job.domains);

        log_stage(Stage::CheckExisting, &job.domains);
        let existing = find_existing_cert(
            self.certificates.as_ref(),
            &job.domains,
            self.options.lookup_limit,
        )
        .await
        .context("Failed to look up existing certificates")?;

        let decision = should_provision(
            existing.as_ref(),
            Utc::now(),
            self.options.renewal_window_days,
        );
        if let (ProvisionDecision::StillValid { days }, Some(existing)) = (decision, &existing) {
            log_stage(Stage::Skip, &job.domains);
            info!(
                "[runner] {} expires in {days} day(s), outside the {}-day renewal window",
                existing.arn, self.options.renewal_window_days
            );
            return Ok(ProvisionOutcome::Skipped {
                arn: existing.arn.clone(),
                days_until_expiry: days,
            });
        }
        info!("[runner] provisioning {}: {decision:?}", job.domains);

        log_stage(Stage::Provision, &job.domains);
        let material = self.provision_cert(job).await?;

        log_stage(Stage::UploadS3, &job.domains);
        let object_keys = upload_to_s3(
            self.objects.as_ref(),
            &job.bucket,
            &self.options.s3_prefix,
            job.domains.lineage(),
            &material,
            &self.options.scratch_dir,
        )
        .await?;

        log_stage(Stage::UploadAcm, &job.domains);
        let new_arn = self
            .upload_to_acm(&material, existing.as_ref(), &job.domains)
            .await?;

        log_stage(Stage::Done, &job.domains);
        let outcome = match (new_arn, existing) {
            (Some(arn), _) => ProvisionOutcome::Provisioned {
                arn,
                reimported: false,
                object_keys,
            },
            (None, Some(existing)) => ProvisionOutcome::Provisioned {
                arn: existing.arn,
                reimported: true,
                object_keys,
            },
            (None, None) => return Err(anyhow!("certificate import returned no ARN")),
        };
        Ok(outcome)
    }

    /// Issues a certificate for the whole domain set on a blocking worker.
    pub async fn provision_cert(&self, job: &ProvisionJob) -> Result<CertificateMaterial> {
        let issuer = Arc::clone(&self.issuer);
        let request = IssueRequest {
            domains: job.domains.clone(),
            email: job.email.clone(),
            server: job.server.clone(),
        };

        let material = tokio::task::spawn_blocking(move || issuer.issue(&request))
            .await
            .context("certificate issuer task panicked")?
            .with_context(|| format!("Failed to provision a certificate for {}", job.domains))?;
        Ok(material)
    }

    /// Imports `material`. Re-imports into `existing` when present and
    /// returns `None`; otherwise returns the ARN of the new certificate.
    pub async fn upload_to_acm(
        &self,
        material: &CertificateMaterial,
        existing: Option<&ExistingCertificate>,
        domains: &DomainSet,
    ) -> Result<Option<String>> {
        match existing {
            Some(existing) => {
                info!("[acm] Re-importing certificate into {}", existing.arn);
                self.certificates
                    .import_certificate(ImportRequest {
                        existing_arn: Some(&existing.arn),
                        material,
                        tags: Vec::new(),
                    })
                    .await
                    .with_context(|| format!("Failed to re-import certificate {}", existing.arn))?;
                Ok(None)
            }
            None => {
                info!("[acm] Importing a new certificate for: {domains}");
                let arn = self
                    .certificates
                    .import_certificate(ImportRequest {
                        existing_arn: None,
                        material,
                        tags: vec![
                            (DOMAIN_SET_TAG.to_string(), domains.fingerprint()),
                            (LINEAGE_TAG.to_string(), domains.lineage().to_string()),
                        ],
                    })
                    .await
                    .with_context(|| format!("Failed to import a certificate for {domains}"))?;
                info!("[acm] Imported certificate {arn}");
                Ok(Some(arn))
            }
        }
    }
}

fn log_stage(stage: Stage, domains: &DomainSet) {
    info!("[runner] {stage}: {domains}");
}

/// Runner entry point: validates the event, then provisions if needed.
pub async fn handle_event(event: &Value, provisioner: &Provisioner) -> Result<RunnerResponse> {
    let job = ProvisionJob::from_event(event).inspect_err(|err| {
        error!("[runner] {err}");
    })?;

    let outcome = provisioner.run(&job).await.inspect_err(|err| {
        error!("[runner] {err:#}");
    })?;

    let message = match outcome {
        ProvisionOutcome::Provisioned { .. } => format!(
            "A new certificate has been provisioned and uploaded to both S3 and ACM for: {}",
            job.domains
        ),
        ProvisionOutcome::Skipped { .. } => format!(
            "A certificate with at least {} days until expiration already exists in both S3 and ACM for: {}",
            provisioner.options().renewal_window_days,
            job.domains
        ),
    };
    Ok(RunnerResponse::success(message))
}
