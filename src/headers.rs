//! HTTP caching headers for transformed images
//!
//! Computes Last-Modified, Expires, and Cache-Control from a TTL so
//! transformed blobs can be served from downstream caches. The clock is
//! passed in; the policy reads no global state.

use chrono::{DateTime, Duration, Utc};

use crate::config::RepixConfig;

/// IMF-fixdate, e.g. `Wed, 21 Oct 2015 13:48:28 GMT`
fn imf_fixdate(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Header set for one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeaders {
    pub content_type: String,
    pub content_length: usize,
    pub last_modified: String,
    pub expires: String,
    pub cache_control: String,
}

impl CacheHeaders {
    /// Header name/value pairs in emit order
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", self.content_type.clone()),
            ("Content-Length", self.content_length.to_string()),
            ("Last-Modified", self.last_modified.clone()),
            ("Expires", self.expires.clone()),
            ("Cache-Control", self.cache_control.clone()),
        ]
    }
}

/// Cache header policy derived from a TTL in hours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheHeaderPolicy {
    ttl_hours: u32,
    must_revalidate: bool,
}

impl CacheHeaderPolicy {
    pub fn new(ttl_hours: u32) -> Self {
        Self {
            ttl_hours,
            must_revalidate: false,
        }
    }

    pub fn with_must_revalidate(mut self, must_revalidate: bool) -> Self {
        self.must_revalidate = must_revalidate;
        self
    }

    pub fn from_config(config: &RepixConfig) -> Self {
        Self {
            ttl_hours: config.cache_expiration_hours,
            must_revalidate: config.must_revalidate,
        }
    }

    /// Compute the header set for a response body at the given instant
    pub fn headers(
        &self,
        content_type: &str,
        content_length: usize,
        now: DateTime<Utc>,
    ) -> CacheHeaders {
        let max_age_seconds = u64::from(self.ttl_hours) * 3600;
        let expires = now + Duration::hours(i64::from(self.ttl_hours));

        let cache_control = if self.must_revalidate {
            format!("max-age={}, must-revalidate", max_age_seconds)
        } else {
            format!("max-age={}", max_age_seconds)
        };

        CacheHeaders {
            content_type: content_type.to_string(),
            content_length,
            last_modified: imf_fixdate(now),
            expires: imf_fixdate(expires),
            cache_control,
        }
    }
}
