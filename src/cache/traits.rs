//! Core types for the offline cache gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of an intercepted request.
///
/// Only method and URL take part in the key, so two requests that differ in
/// headers share a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheRequest {
  pub method: String,
  pub url: String,
}

impl CacheRequest {
  pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      method: method.into().to_uppercase(),
      url: url.into(),
    }
  }

  pub fn get(url: impl Into<String>) -> Self {
    Self::new("GET", url)
  }

  /// Stable, fixed-length storage key for this request.
  pub fn cache_key(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// How the response relates to the application origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
  /// Same-origin response
  Basic,
  /// Response served from a foreign origin
  CrossOrigin,
}

impl ResponseKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Basic => "basic",
      Self::CrossOrigin => "cross_origin",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "basic" => Some(Self::Basic),
      "cross_origin" => Some(Self::CrossOrigin),
      _ => None,
    }
  }
}

/// A response as stored in (or served from) a cache generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub kind: ResponseKind,
}

impl CachedResponse {
  /// Only plain same-origin 200 responses are written back at runtime.
  pub fn is_cacheable(&self) -> bool {
    self.status == 200 && self.kind == ResponseKind::Basic
  }
}

/// Summary of one cache generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
  pub name: String,
  pub entries: usize,
  pub created_at: DateTime<Utc>,
}

/// Result from a gateway fetch, including where the response came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  pub fn bypassed(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Bypass,
    }
  }
}

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Cache miss, fetched from network
  Network,
  /// Served from a cache generation without touching the network
  Cache,
  /// Gateway not active, request went straight to the network
  Bypass,
}

impl std::fmt::Display for CacheSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Network => write!(f, "network"),
      Self::Cache => write!(f, "cache"),
      Self::Bypass => write!(f, "network (uncontrolled)"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cache_key_depends_on_method_and_url() {
    let a = CacheRequest::get("https://example.test/inventory");
    let b = CacheRequest::new("get", "https://example.test/inventory");
    let c = CacheRequest::new("POST", "https://example.test/inventory");
    assert_eq!(a.cache_key(), b.cache_key());
    assert_ne!(a.cache_key(), c.cache_key());
    assert_eq!(a.cache_key().len(), 64);
  }

  #[test]
  fn test_only_basic_200_is_cacheable() {
    let mut response = CachedResponse {
      status: 200,
      headers: Vec::new(),
      body: b"ok".to_vec(),
      kind: ResponseKind::Basic,
    };
    assert!(response.is_cacheable());

    response.status = 404;
    assert!(!response.is_cacheable());

    response.status = 200;
    response.kind = ResponseKind::CrossOrigin;
    assert!(!response.is_cacheable());
  }

  #[test]
  fn test_response_kind_round_trips_through_text() {
    for kind in [ResponseKind::Basic, ResponseKind::CrossOrigin] {
      assert_eq!(ResponseKind::parse(kind.as_str()), Some(kind));
    }
    assert_eq!(ResponseKind::parse("opaque"), None);
  }
}
