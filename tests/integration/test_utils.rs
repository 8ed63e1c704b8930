use std::{
    env,
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow};
use cert_fleet::{
    core::material::CertificateMaterial,
    distribution::MemoryObjectStore,
    inventory::MemoryCertificateManager,
    issuance::{CertificateIssuer, IssueRequest, IssuerError},
    provisioning::{Provisioner, ProvisionerOptions},
};
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const STAGING_DIRECTORY: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";
pub const BUCKET: &str = "cert-bucket";

/// Leaf for `domains` signed by a throwaway CA: (fullchain, leaf key).
pub fn issue_chain(domains: &[String]) -> Result<(String, String)> {
    let mut ca_params = CertificateParams::new(vec!["Integration CA".to_string()])?;
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca_key = KeyPair::generate()?;
    let ca = ca_params.self_signed(&ca_key)?;

    let leaf_params = CertificateParams::new(domains.to_vec())?;
    let leaf_key = KeyPair::generate()?;
    let leaf = leaf_params.signed_by(&leaf_key, &ca, &ca_key)?;

    Ok((format!("{}{}", leaf.pem(), ca.pem()), leaf_key.serialize_pem()))
}

/// Issuer that mints local certificates and records every request.
#[derive(Default)]
pub struct LocalIssuer {
    pub requests: Mutex<Vec<IssueRequest>>,
    pub failure: Option<String>,
}

impl LocalIssuer {
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl CertificateIssuer for LocalIssuer {
    fn issue(&self, request: &IssueRequest) -> Result<CertificateMaterial, IssuerError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(reason) = &self.failure {
            return Err(IssuerError::Unavailable(reason.clone()));
        }
        let (chain, key) = issue_chain(request.domains.as_slice())
            .map_err(|e| IssuerError::Operation(e.to_string()))?;
        CertificateMaterial::from_fullchain(&chain, &key)
            .map_err(|e| IssuerError::Operation(e.to_string()))
    }
}

pub struct Harness {
    pub certificates: Arc<MemoryCertificateManager>,
    pub objects: Arc<MemoryObjectStore>,
    pub issuer: Arc<LocalIssuer>,
    pub provisioner: Provisioner,
    pub scratch: TempDir,
}

pub fn harness(issuer: LocalIssuer, objects: MemoryObjectStore) -> Result<Harness> {
    let scratch = tempfile::tempdir()?;
    let certificates = Arc::new(MemoryCertificateManager::new());
    let objects = Arc::new(objects);
    let issuer = Arc::new(issuer);
    let provisioner = Provisioner::new(
        certificates.clone(),
        objects.clone(),
        issuer.clone(),
        ProvisionerOptions {
            scratch_dir: scratch.path().to_path_buf(),
            ..Default::default()
        },
    );
    Ok(Harness {
        certificates,
        objects,
        issuer,
        provisioner,
        scratch,
    })
}

pub fn runner_event(domains: Value) -> Value {
    json!({
        "certbot_server": STAGING_DIRECTORY,
        "domains": domains,
        "email": "ops@pxsys.net",
        "s3_bucket": BUCKET,
    })
}

pub fn ventilator_event() -> Value {
    json!({
        "certbot_server": STAGING_DIRECTORY,
        "email": "ops@pxsys.net",
        "s3_bucket": BUCKET,
    })
}

#[allow(dead_code)]
pub fn require_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| anyhow!("{key} must be set for live integration tests"))
}
