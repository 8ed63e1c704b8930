use std::fmt;

use anyhow::{Result, anyhow};
use pem::{EncodeConfig, LineEnding, Pem};
use zeroize::Zeroizing;

/// Certificate and key produced by a single issuance. Transient: it is
/// written to object storage and the certificate manager, then dropped.
#[derive(Clone)]
pub struct CertificateMaterial {
    pub certificate: String,
    pub private_key: Zeroizing<String>,
    pub certificate_chain: String,
}

impl CertificateMaterial {
    /// Builds the material from the full chain returned by the CA
    /// (leaf first, then intermediates).
    pub fn from_fullchain(fullchain_pem: &str, private_key_pem: &str) -> Result<Self> {
        let (certificate, certificate_chain) = split_certificate_chain(fullchain_pem)?;
        if private_key_pem.trim().is_empty() {
            return Err(anyhow!("issued certificate is missing its private key"));
        }
        Ok(Self {
            certificate,
            private_key: Zeroizing::new(private_key_pem.to_string()),
            certificate_chain,
        })
    }

    pub fn fullchain(&self) -> String {
        format!("{}{}", self.certificate, self.certificate_chain)
    }
}

impl fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateMaterial")
            .field("certificate", &format_args!("{} bytes", self.certificate.len()))
            .field("private_key", &"<redacted>")
            .field(
                "certificate_chain",
                &format_args!("{} bytes", self.certificate_chain.len()),
            )
            .finish()
    }
}

fn split_certificate_chain(chain_pem: &str) -> Result<(String, String)> {
    let blocks = pem::parse_many(chain_pem)
        .map_err(|err| anyhow!("failed to parse certificate chain PEM: {err}"))?;
    let cert_blocks: Vec<Pem> = blocks
        .into_iter()
        .filter(|block| block.tag() == "CERTIFICATE")
        .collect();

    if cert_blocks.is_empty() {
        return Err(anyhow!("no certificate PEM blocks found"));
    }

    let encoded: Vec<String> = cert_blocks
        .iter()
        .map(|block| {
            pem::encode_config(block, EncodeConfig::new().set_line_ending(LineEnding::LF))
        })
        .collect();
    if encoded.len() < 2 {
        return Err(anyhow!("issuer chain is missing; cannot write chain.pem"));
    }
    Ok((encoded[0].clone(), encoded[1..].join("")))
}
