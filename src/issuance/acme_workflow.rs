use std::time::Duration;

use acme_lib::{
    Certificate, Directory, DirectoryUrl, create_rsa_key,
    order::{Auth, NewOrder},
};
use anyhow::{Result, anyhow};
use log::{debug, info, warn};

use super::{
    dns_providers::{DnsProviderAdapter, group_challenges},
    flow::EphemeralPersist,
};

const CHALLENGE_POLL_DELAY_MS: u64 = 2000;
const FINALIZE_POLL_DELAY_MS: u64 = 5000;
const ORDER_REFRESH_ATTEMPTS: u32 = 30;
const ORDER_REFRESH_INTERVAL: Duration = Duration::from_secs(2);
const RSA_KEY_BITS: u32 = 2048;

/// TXT records published for an order, kept for cleanup.
pub type PublishedRecords = Vec<(String, Vec<String>)>;

/// Generates the certificate private key (RSA 2048, PKCS#8 PEM).
pub fn generate_private_key() -> Result<String> {
    let key = create_rsa_key(RSA_KEY_BITS);
    let key_pem = key
        .private_key_to_pem_pkcs8()
        .map_err(|e| anyhow!("failed to serialize private key: {e}"))?;

    String::from_utf8(key_pem).map_err(|_| anyhow!("private key PEM contained invalid UTF-8"))
}

/// Creates an ACME directory connection and account. acme-lib agrees to the
/// directory's terms of service when it registers the account.
///
/// With no `account_key_pem` a fresh account key is generated.
pub fn setup_acme_account(
    directory_url: &str,
    contact_email: &str,
    account_key_pem: Option<&str>,
) -> Result<(Directory<EphemeralPersist>, acme_lib::Account<EphemeralPersist>)> {
    let persist = EphemeralPersist::new();
    if let Some(pem) = account_key_pem {
        persist.seed_account_key(contact_email, pem.as_bytes())?;
    }

    let directory = Directory::from_url(persist.clone(), DirectoryUrl::Other(directory_url))
        .map_err(|e: acme_lib::Error| anyhow!(e.to_string()))?;

    let account = directory
        .account_with_realm(
            contact_email,
            Some(vec![format!("mailto:{}", contact_email)]),
        )
        .map_err(|e: acme_lib::Error| anyhow!(e.to_string()))?;

    Ok((directory, account))
}

/// Creates a single order covering every domain; the first is the primary name.
pub fn create_acme_order(
    account: &acme_lib::Account<EphemeralPersist>,
    domains: &[String],
) -> Result<NewOrder<EphemeralPersist>> {
    let primary = domains
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("primary domain missing"))?;

    let alt_names: Vec<&str> = domains.iter().skip(1).map(|s| s.as_str()).collect();

    account
        .new_order(&primary, &alt_names)
        .map_err(|e: acme_lib::Error| anyhow!(e.to_string()))
}

/// Publishes the DNS-01 proof of every pending authorization.
///
/// Each record is appended to `published` before it is created, so callers
/// clean up `published` whether or not this returns an error.
pub fn publish_dns_challenges(
    order: &NewOrder<EphemeralPersist>,
    adapter: &dyn DnsProviderAdapter,
    published: &mut PublishedRecords,
) -> Result<Vec<Auth<EphemeralPersist>>> {
    let auths: Vec<Auth<EphemeralPersist>> = order
        .authorizations()
        .map_err(|e: acme_lib::Error| anyhow!(e.to_string()))?;

    let pending: Vec<Auth<EphemeralPersist>> = auths
        .into_iter()
        .filter(|auth| {
            let needed = auth.need_challenge();
            if !needed {
                debug!("[acme] {} is already authorized", auth.domain_name());
            }
            needed
        })
        .collect();

    let proofs: Vec<(String, String)> = pending
        .iter()
        .map(|auth| (auth.domain_name().to_string(), auth.dns_challenge().dns_proof()))
        .collect();

    for (record_name, values) in
        group_challenges(proofs.iter().map(|(d, p)| (d.as_str(), p.as_str())))
    {
        info!("[acme] publishing DNS-01 record {record_name}");
        published.push((record_name.clone(), values.clone()));
        adapter.create_txt(&record_name, &values)?;
    }

    Ok(pending)
}

/// Asks the CA to validate every published challenge.
pub fn validate_acme_challenges(auths: &[Auth<EphemeralPersist>]) -> Result<()> {
    for auth in auths {
        let dns = auth.dns_challenge();
        dns.validate(CHALLENGE_POLL_DELAY_MS)
            .map_err(|e| anyhow!("validation failed for {}: {}", auth.domain_name(), e))?;
    }
    Ok(())
}

/// Finalizes the order with `private_key_pem` and downloads the certificate.
pub fn finalize_acme_certificate(
    mut order: NewOrder<EphemeralPersist>,
    private_key_pem: &str,
) -> Result<Certificate> {
    let mut attempts = 0;
    let csr_order = loop {
        if let Some(csr) = order.confirm_validations() {
            break csr;
        }
        attempts += 1;
        if attempts > ORDER_REFRESH_ATTEMPTS {
            return Err(anyhow!(
                "order was not ready after {} refreshes",
                ORDER_REFRESH_ATTEMPTS
            ));
        }
        std::thread::sleep(ORDER_REFRESH_INTERVAL);
        order.refresh().map_err(|e| anyhow!(e.to_string()))?;
    };

    let cert_order = csr_order
        .finalize(private_key_pem, FINALIZE_POLL_DELAY_MS)
        .map_err(|e| anyhow!(e.to_string()))?;

    cert_order
        .download_and_save_cert()
        .map_err(|e| anyhow!(e.to_string()))
}

/// Removes published challenge records. Failures are logged, not returned:
/// a leftover TXT record does not invalidate an issued certificate.
pub fn cleanup_dns_challenges(adapter: &dyn DnsProviderAdapter, published: &PublishedRecords) {
    for (record_name, values) in published {
        if let Err(err) = adapter.cleanup_txt(record_name, values) {
            warn!("[acme] could not remove challenge record {record_name}: {err:#}");
        }
    }
}
