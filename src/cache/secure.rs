//! Secure-context check for gateway registration.

use color_eyre::{eyre::eyre, Result};
use url::{Host, Url};

/// Whether an origin counts as a secure context.
///
/// `https` always does. Plain `http` only does on a loopback host.
pub fn is_secure_origin(origin: &Url) -> bool {
  match origin.scheme() {
    "https" => true,
    "http" => match origin.host() {
      Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
      Some(Host::Ipv4(ip)) => ip.is_loopback(),
      Some(Host::Ipv6(ip)) => ip.is_loopback(),
      None => false,
    },
    _ => false,
  }
}

/// Refuse to register the gateway outside a secure context.
pub fn ensure_secure_origin(origin: &Url) -> Result<()> {
  if is_secure_origin(origin) {
    Ok(())
  } else {
    Err(eyre!(
      "Refusing to register the offline cache on {}: a secure context (HTTPS or localhost) is required",
      origin
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_https_is_secure() {
    assert!(is_secure_origin(&url("https://warehouse.example.com")));
    assert!(is_secure_origin(&url("https://192.168.1.20:5000")));
  }

  #[test]
  fn test_loopback_http_is_secure() {
    assert!(is_secure_origin(&url("http://localhost:5000")));
    assert!(is_secure_origin(&url("http://127.0.0.1:5000")));
    assert!(is_secure_origin(&url("http://[::1]:5000")));
  }

  #[test]
  fn test_plain_http_is_rejected() {
    assert!(!is_secure_origin(&url("http://warehouse.example.com")));
    assert!(!is_secure_origin(&url("http://192.168.1.20:5000")));
    assert!(ensure_secure_origin(&url("http://192.168.1.20:5000")).is_err());
  }
}
