//! Source host allowlisting
//!
//! Rejects transform requests whose source URL points at a host outside
//! the configured allowlist. The allowlist is explicit configuration;
//! nothing here reads process state.

use std::collections::HashSet;

use http::Uri;

use crate::config::RepixConfig;
use crate::error::RepixError;

/// Guards source URLs against a fixed set of allowed hosts
#[derive(Debug, Clone)]
pub struct HostAllowlistGuard {
    allowed: HashSet<String>,
}

impl HostAllowlistGuard {
    /// Build a guard from host names; matching is case-insensitive
    pub fn new(hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed: hosts
                .into_iter()
                .map(|h| h.into().trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &RepixConfig) -> Self {
        Self::new(config.allowed_hosts.iter().cloned())
    }

    /// Check a source URL, failing with `HostNotAllowed` when its host is
    /// absent or not in the allowlist
    pub fn check(&self, source_url: &str) -> Result<(), RepixError> {
        let host = source_url
            .parse::<Uri>()
            .ok()
            .and_then(|uri| uri.host().map(|h| h.to_lowercase()))
            .ok_or_else(|| RepixError::HostNotAllowed {
                host: source_url.to_string(),
            })?;

        if self.allowed.contains(&host) {
            Ok(())
        } else {
            Err(RepixError::HostNotAllowed { host })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> HostAllowlistGuard {
        HostAllowlistGuard::new(["cdn.example.com", "img.example.org"])
    }

    #[test]
    fn test_allowed_host_passes() {
        assert!(guard().check("https://cdn.example.com/photos/cat.jpg").is_ok());
    }

    #[test]
    fn test_host_match_is_case_insensitive() {
        assert!(guard().check("https://CDN.Example.COM/cat.jpg").is_ok());
    }

    #[test]
    fn test_unlisted_host_rejected() {
        let result = guard().check("https://evil.example.net/cat.jpg");
        assert!(matches!(
            result,
            Err(RepixError::HostNotAllowed { ref host }) if host == "evil.example.net"
        ));
    }

    #[test]
    fn test_subdomain_is_not_a_match() {
        let result = guard().check("https://sub.cdn.example.com/cat.jpg");
        assert!(matches!(result, Err(RepixError::HostNotAllowed { .. })));
    }

    #[test]
    fn test_relative_path_has_no_host() {
        let result = guard().check("/photos/cat.jpg");
        assert!(matches!(result, Err(RepixError::HostNotAllowed { .. })));
    }

    #[test]
    fn test_port_is_ignored_for_matching() {
        assert!(guard().check("http://cdn.example.com:8080/cat.jpg").is_ok());
    }
}
