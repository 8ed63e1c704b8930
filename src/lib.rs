//! Fleet-wide certificate provisioning.
//!
//! The ventilator enumerates the domain table into a job descriptor; the
//! workflow engine fans that out to runners, each of which checks the
//! certificate manager for a certificate serving its domain set and, when
//! none is valid for long enough, issues one through ACME DNS-01 and
//! publishes it to S3 and ACM.

pub mod core;
pub mod distribution;
pub mod domain;
pub mod enumeration;
pub mod inventory;
pub mod issuance;
pub mod provisioning;
