use anyhow::Result;

use crate::domain::normalize_domain_for_storage;

mod retry;
mod route53;

pub use retry::retry_provider_verification;
pub use route53::Route53Adapter;

const CHALLENGE_LABEL: &str = "_acme-challenge.";

/// Publishes and removes DNS-01 TXT records. A record name can carry several
/// values at once (a wildcard and its base domain share one name).
pub trait DnsProviderAdapter: Send + Sync {
    fn create_txt(&self, record_name: &str, values: &[String]) -> Result<()>;
    fn cleanup_txt(&self, record_name: &str, values: &[String]) -> Result<()>;
}

pub fn record_name(domain: &str) -> String {
    let trimmed = domain.trim_end_matches('.');
    let trimmed = trimmed.strip_prefix("*.").unwrap_or(trimmed);
    if trimmed.starts_with(CHALLENGE_LABEL) {
        trimmed.to_string()
    } else {
        format!("{CHALLENGE_LABEL}{trimmed}")
    }
}

/// Domain a challenge record belongs to, i.e. the record name without the
/// `_acme-challenge.` label.
pub(crate) fn challenge_domain(record_name: &str) -> &str {
    let trimmed = record_name.trim_end_matches('.');
    trimmed.strip_prefix(CHALLENGE_LABEL).unwrap_or(trimmed)
}

pub(crate) fn matches_zone(domain_suffix: &str, zone_name: &str) -> bool {
    let domain_suffix = match normalize_domain_for_storage(domain_suffix) {
        Ok(value) => value,
        Err(_) => return false,
    };
    let zone_name = match normalize_domain_for_storage(zone_name) {
        Ok(value) => value,
        Err(_) => return false,
    };
    zone_name == domain_suffix || domain_suffix.ends_with(&format!(".{}", zone_name))
}

pub(crate) fn format_txt_content(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed.to_string()
    } else {
        format!("\"{}\"", trimmed.trim_matches('"'))
    }
}

/// Groups `(domain, proof)` pairs by challenge record name, keeping first-seen order.
pub fn group_challenges<'a, I>(challenges: I) -> Vec<(String, Vec<String>)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (domain, proof) in challenges {
        let name = record_name(domain);
        match grouped.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => {
                if !values.iter().any(|v| v == proof) {
                    values.push(proof.to_string());
                }
            }
            None => grouped.push((name, vec![proof.to_string()])),
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_zone_name() {
        assert!(matches_zone("example.com", "example.com"));
        assert!(!matches_zone("example.com", "other.com"));
    }

    #[test]
    fn matches_subdomain_suffix() {
        assert!(matches_zone("sub.example.com", "example.com"));
        assert!(!matches_zone("example.com", "sub.example.com"));
        assert!(!matches_zone("badexample.com", "example.com"));
    }

    #[test]
    fn matches_idn_suffix() {
        assert!(matches_zone("testé.ezs3.net", "ezs3.net"));
        assert!(matches_zone("testé.fr", "xn--test-epa.fr"));
        assert!(!matches_zone("example.com", "xn--test-epa.fr"));
    }

    #[test]
    fn record_names() {
        assert_eq!(record_name("example.com."), "_acme-challenge.example.com");
        assert_eq!(record_name("*.example.com"), "_acme-challenge.example.com");
        assert_eq!(
            record_name("_acme-challenge.example.com"),
            "_acme-challenge.example.com"
        );
        assert_eq!(challenge_domain("_acme-challenge.www.example.com."), "www.example.com");
    }

    #[test]
    fn txt_values_are_quoted_once() {
        assert_eq!(format_txt_content("abc"), "\"abc\"");
        assert_eq!(format_txt_content(" \"abc\" "), "\"abc\"");
    }

    #[test]
    fn wildcard_and_base_share_a_record() {
        let grouped = group_challenges([
            ("example.com", "proof-a"),
            ("www.example.com", "proof-b"),
            ("*.example.com", "proof-c"),
            ("example.com", "proof-a"),
        ]);
        assert_eq!(
            grouped,
            vec![
                (
                    "_acme-challenge.example.com".to_string(),
                    vec!["proof-a".to_string(), "proof-c".to_string()]
                ),
                (
                    "_acme-challenge.www.example.com".to_string(),
                    vec!["proof-b".to_string()]
                ),
            ]
        );
    }
}
