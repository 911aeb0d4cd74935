//! Network side of the gateway.

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use reqwest::Method;
use url::Url;

use super::traits::{CacheRequest, CachedResponse, ResponseKind};

/// Something that can perform a request over the network.
///
/// A rejected future means a network error. HTTP error statuses are ordinary
/// responses.
pub trait Transport: Send + Sync {
  fn fetch<'a>(&'a self, request: &'a CacheRequest) -> BoxFuture<'a, Result<CachedResponse>>;
}

/// HTTP transport backed by reqwest.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  /// Application origin, used to classify responses
  origin: Url,
}

impl HttpTransport {
  pub fn new(origin: Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("stockroom/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  async fn send(&self, request: &CacheRequest) -> Result<CachedResponse> {
    let url = Url::parse(&request.url).map_err(|e| eyre!("Invalid URL {}: {}", request.url, e))?;
    let method = Method::from_bytes(request.method.as_bytes())
      .map_err(|e| eyre!("Invalid method {}: {}", request.method, e))?;

    let response = self
      .client
      .request(method, url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

    // Classify by the final URL so redirects to another host are not cached
    let kind = if response.url().origin() == self.origin.origin() {
      ResponseKind::Basic
    } else {
      ResponseKind::CrossOrigin
    };
    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", request.url, e))?
      .to_vec();

    Ok(CachedResponse {
      status,
      headers,
      body,
      kind,
    })
  }
}

impl Transport for HttpTransport {
  fn fetch<'a>(&'a self, request: &'a CacheRequest) -> BoxFuture<'a, Result<CachedResponse>> {
    Box::pin(self.send(request))
  }
}
