use thiserror::Error;

use crate::{core::material::CertificateMaterial, domain::DomainSet};

/// Obtains a certificate for a domain set. Blocking; callers on an async
/// runtime should run it on a blocking worker.
pub trait CertificateIssuer: Send + Sync {
    fn issue(&self, request: &IssueRequest) -> Result<CertificateMaterial, IssuerError>;
}

#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub domains: DomainSet,
    pub email: String,
    /// ACME directory URL.
    pub server: String,
}

#[derive(Error, Debug)]
pub enum IssuerError {
    #[error("issuer unavailable: {0}")]
    Unavailable(String),
    #[error("DNS challenge failed: {0}")]
    Dns(String),
    #[error("issuer operation failed: {0}")]
    Operation(String),
}
