//! Per-domain-set provisioning: decide, issue, publish to S3 and ACM.

mod policy;
mod runner;

pub use policy::{ProvisionDecision, days_until_expiry, should_provision};
pub use runner::{
    DOMAIN_SET_TAG, LINEAGE_TAG, ProvisionOutcome, Provisioner, ProvisionerOptions, Stage,
    handle_event,
};
