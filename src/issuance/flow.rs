use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use acme_lib::{
    Certificate, Error as AcmeError,
    persist::{Persist, PersistKey, PersistKind},
};
use anyhow::{Result, anyhow};
use log::info;
use zeroize::Zeroizing;

use super::{
    acme_workflow::{
        PublishedRecords, cleanup_dns_challenges, create_acme_order, finalize_acme_certificate,
        generate_private_key, publish_dns_challenges, setup_acme_account,
        validate_acme_challenges,
    },
    dns_providers::DnsProviderAdapter,
    issuer::{CertificateIssuer, IssueRequest, IssuerError},
};
use crate::{core::material::CertificateMaterial, inventory::x509::inspect_certificate};

/// In-memory persistence for acme-lib: nothing touches the (read-only or
/// shared) filesystem, and an existing ACME account key can be seeded.
#[derive(Clone, Default)]
pub struct EphemeralPersist {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl EphemeralPersist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_account_key(&self, realm: &str, pem: &[u8]) -> Result<()> {
        let key = PersistKey::new(realm, PersistKind::AccountPrivateKey, "acme_account");
        self.put(&key, pem).map_err(|e| anyhow!(e.to_string()))
    }
}

impl Persist for EphemeralPersist {
    fn put(&self, key: &PersistKey, value: &[u8]) -> acme_lib::Result<()> {
        let mut lock = self
            .inner
            .lock()
            .map_err(|e| AcmeError::Other(e.to_string()))?;
        lock.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &PersistKey) -> acme_lib::Result<Option<Vec<u8>>> {
        let lock = self
            .inner
            .lock()
            .map_err(|e| AcmeError::Other(e.to_string()))?;
        Ok(lock.get(&key.to_string()).cloned())
    }
}

/// Non-interactive ACME issuance with DNS-01 challenges.
pub struct AcmeDns01Issuer {
    dns: Arc<dyn DnsProviderAdapter>,
    account_key_pem: Option<Zeroizing<String>>,
}

impl AcmeDns01Issuer {
    pub fn new(dns: Arc<dyn DnsProviderAdapter>) -> Self {
        Self {
            dns,
            account_key_pem: None,
        }
    }

    /// Reuses an existing ACME account instead of registering a new one.
    pub fn with_account_key(mut self, account_key_pem: Option<Zeroizing<String>>) -> Self {
        self.account_key_pem = account_key_pem;
        self
    }

    fn obtain(&self, request: &IssueRequest) -> Result<Certificate, IssuerError> {
        let (_directory, account) = setup_acme_account(
            &request.server,
            &request.email,
            self.account_key_pem.as_deref().map(String::as_str),
        )
        .map_err(|e| IssuerError::Unavailable(format!("{e:#}")))?;

        let order = create_acme_order(&account, request.domains.as_slice())
            .map_err(|e| IssuerError::Operation(format!("{e:#}")))?;

        let mut published = PublishedRecords::new();
        let result = publish_dns_challenges(&order, self.dns.as_ref(), &mut published)
            .map_err(|e| IssuerError::Dns(format!("{e:#}")))
            .and_then(|auths| {
                validate_acme_challenges(&auths)
                    .map_err(|e| IssuerError::Dns(format!("{e:#}")))
            })
            .and_then(|()| {
                let key_pem = Zeroizing::new(
                    generate_private_key()
                        .map_err(|e| IssuerError::Operation(format!("{e:#}")))?,
                );
                finalize_acme_certificate(order, &key_pem)
                    .map_err(|e| IssuerError::Operation(format!("{e:#}")))
            });
        cleanup_dns_challenges(self.dns.as_ref(), &published);
        result
    }
}

impl CertificateIssuer for AcmeDns01Issuer {
    fn issue(&self, request: &IssueRequest) -> Result<CertificateMaterial, IssuerError> {
        info!(
            "[acme] Calling {} to provision a certificate for: {}",
            request.server, request.domains
        );
        let certificate = self.obtain(request)?;
        let material =
            CertificateMaterial::from_fullchain(certificate.certificate(), certificate.private_key())
                .map_err(|e| IssuerError::Operation(format!("{e:#}")))?;

        match inspect_certificate(&material.certificate) {
            Ok(facts) => info!(
                "[acme] Done provisioning certificate for: {} (serial {}, expires {})",
                request.domains, facts.serial, facts.not_after
            ),
            Err(err) => info!(
                "[acme] Done provisioning certificate for: {} (unreadable leaf: {err:#})",
                request.domains
            ),
        }
        Ok(material)
    }
}
