//! ACME DNS-01 issuance.

pub mod acme_workflow;
pub mod dns_providers;
pub mod flow;
pub mod issuer;

pub use flow::AcmeDns01Issuer;
pub use issuer::{CertificateIssuer, IssueRequest, IssuerError};
