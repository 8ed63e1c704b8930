use std::{collections::BTreeSet, fmt};

use anyhow::{Result, anyhow};
use sha2::{Digest, Sha256};

pub fn normalize_domain_for_storage(input: &str) -> Result<String> {
    let trimmed = input.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(anyhow!("domain name is required"));
    }
    if let Some(base) = trimmed.strip_prefix("*.") {
        return Ok(format!("*.{}", normalize_domain_for_storage(base)?));
    }
    let ascii = idna::domain_to_ascii(trimmed)
        .map_err(|err| anyhow!("invalid domain name: {err}"))?;
    Ok(ascii.to_lowercase())
}

/// Canonical form used when comparing names reported by external services.
/// Falls back to a plain lowercase comparison for names IDNA rejects.
pub fn canonical_name(input: &str) -> String {
    normalize_domain_for_storage(input)
        .unwrap_or_else(|_| input.trim().trim_end_matches('.').to_lowercase())
}

/// Ordered, de-duplicated set of domains requested for a single certificate.
///
/// The first entry is the primary name of the ACME order and, without any
/// wildcard label, names the certificate lineage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSet {
    ordered: Vec<String>,
    members: BTreeSet<String>,
}

impl DomainSet {
    pub fn new<I, S>(domains: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered = Vec::new();
        let mut members = BTreeSet::new();
        for raw in domains {
            let raw = raw.as_ref();
            if raw.trim().is_empty() {
                continue;
            }
            let normalized = normalize_domain_for_storage(raw)?;
            if members.insert(normalized.clone()) {
                ordered.push(normalized);
            }
        }
        if ordered.is_empty() {
            return Err(anyhow!("At least one domain is required"));
        }
        Ok(Self { ordered, members })
    }

    /// Parses the comma-separated form used by the runner event.
    pub fn parse_list(raw: &str) -> Result<Self> {
        Self::new(raw.split(','))
    }

    pub fn primary(&self) -> &str {
        &self.ordered[0]
    }

    pub fn lineage(&self) -> &str {
        let primary = self.primary();
        primary.strip_prefix("*.").unwrap_or(primary)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.members.contains(&canonical_name(domain))
    }

    /// True when every name in `sans` is one of the requested domains.
    /// An empty SAN list never satisfies a request.
    pub fn covers<'a, I>(&self, sans: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen_any = false;
        for san in sans {
            seen_any = true;
            if !self.contains(san) {
                return false;
            }
        }
        seen_any
    }

    /// SHA-256 over the sorted member list, stable across request ordering.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (idx, domain) in self.members.iter().enumerate() {
            if idx > 0 {
                hasher.update(b",");
            }
            hasher.update(domain.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for DomainSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ordered.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_trailing_dot() {
        assert_eq!(
            normalize_domain_for_storage(" Example.COM. ").unwrap(),
            "example.com"
        );
    }

    #[test]
    fn normalizes_wildcards() {
        assert_eq!(
            normalize_domain_for_storage("*.Example.com").unwrap(),
            "*.example.com"
        );
    }

    #[test]
    fn converts_idn_to_ascii() {
        assert_eq!(
            normalize_domain_for_storage("testé.fr").unwrap(),
            "xn--test-epa.fr"
        );
    }

    #[test]
    fn parse_list_preserves_order_and_dedups() {
        let set = DomainSet::parse_list("b.example.com, a.example.com,B.example.com,").unwrap();
        assert_eq!(set.as_slice(), ["b.example.com", "a.example.com"]);
        assert_eq!(set.primary(), "b.example.com");
        assert_eq!(set.lineage(), "b.example.com");
        assert_eq!(set.to_string(), "b.example.com,a.example.com");
    }

    #[test]
    fn wildcard_lineage_drops_wildcard_label() {
        let set = DomainSet::new(["*.example.com", "example.com"]).unwrap();
        assert_eq!(set.primary(), "*.example.com");
        assert_eq!(set.lineage(), "example.com");
    }

    #[test]
    fn rejects_empty_sets() {
        assert!(DomainSet::parse_list(" , ,").is_err());
        assert!(DomainSet::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn covers_requires_subset() {
        let set = DomainSet::new(["example.com", "www.example.com"]).unwrap();
        assert!(set.covers(["example.com"]));
        assert!(set.covers(["WWW.example.com.", "example.com"]));
        assert!(!set.covers(["example.com", "api.example.com"]));
        assert!(!set.covers(std::iter::empty()));
    }

    #[test]
    fn fingerprint_ignores_order() {
        let a = DomainSet::new(["a.example.com", "b.example.com"]).unwrap();
        let b = DomainSet::new(["b.example.com", "a.example.com"]).unwrap();
        let c = DomainSet::new(["a.example.com"]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
