use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use x509_parser::{extensions::GeneralName, pem::parse_x509_pem};

/// Fields read back from an issued or imported leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFacts {
    pub subject_alternative_names: Vec<String>,
    pub not_after: DateTime<Utc>,
    pub serial: String,
}

pub fn inspect_certificate(pem: &str) -> Result<CertificateFacts> {
    let (_, pem_block) = parse_x509_pem(pem.as_bytes())
        .map_err(|e| anyhow!("failed to parse certificate PEM: {e}"))?;
    let cert = pem_block.parse_x509().map_err(|e| anyhow!(e.to_string()))?;

    let not_after = DateTime::<Utc>::from_timestamp(cert.validity().not_after.timestamp(), 0)
        .ok_or_else(|| anyhow!("certificate notAfter is out of range"))?;

    let mut subject_alternative_names = Vec::new();
    if let Some(san) = cert
        .subject_alternative_name()
        .map_err(|e| anyhow!("invalid subjectAltName extension: {e}"))?
    {
        for name in &san.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                subject_alternative_names.push(dns.to_string());
            }
        }
    }

    Ok(CertificateFacts {
        subject_alternative_names,
        not_after,
        serial: cert.raw_serial_as_string(),
    })
}
