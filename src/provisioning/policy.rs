use chrono::{DateTime, Utc};

use crate::inventory::ExistingCertificate;

const SECONDS_PER_DAY: i64 = 86_400;

/// Why a domain set is, or is not, being provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionDecision {
    NoExistingCertificate,
    /// The certificate exists but has no expiry yet (pending issuance).
    NoExpiryRecorded,
    ExpiresSoon { days: i64 },
    StillValid { days: i64 },
}

impl ProvisionDecision {
    pub fn should_provision(self) -> bool {
        !matches!(self, ProvisionDecision::StillValid { .. })
    }
}

/// Whole days until `not_after`, rounded toward negative infinity, so an
/// expired certificate yields a negative count.
pub fn days_until_expiry(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// A certificate is renewed once it is within `renewal_window_days` of
/// expiry, boundary included.
pub fn should_provision(
    existing: Option<&ExistingCertificate>,
    now: DateTime<Utc>,
    renewal_window_days: i64,
) -> ProvisionDecision {
    let Some(certificate) = existing else {
        return ProvisionDecision::NoExistingCertificate;
    };
    let Some(not_after) = certificate.not_after else {
        return ProvisionDecision::NoExpiryRecorded;
    };

    let days = days_until_expiry(not_after, now);
    if days <= renewal_window_days {
        ProvisionDecision::ExpiresSoon { days }
    } else {
        ProvisionDecision::StillValid { days }
    }
}
