//! Cache-first gateway with versioned generations.

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::storage::CacheStorage;
use super::traits::{CacheRequest, CacheResult, CachedResponse};
use super::transport::Transport;

/// Lifecycle of one gateway instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Registering,
  Installing,
  /// Installed, waiting to take over from the previous version
  Waiting,
  Active,
  /// Install failed; this instance never serves requests
  Redundant,
}

/// Gateway that serves requests cache-first.
///
/// Each instance is bound to one version token. Installing seeds the
/// generation named by that token; activating evicts every other generation.
/// While active, requests are answered from any generation when possible and
/// successful same-origin misses are written back to the current one.
pub struct Gateway<S: CacheStorage, T: Transport> {
  storage: Arc<S>,
  transport: Arc<T>,
  version: String,
  seed_urls: Vec<String>,
  state: Mutex<WorkerState>,
  /// Background write-backs that have not been awaited yet
  pending_writes: Mutex<JoinSet<()>>,
}

impl<S, T> Gateway<S, T>
where
  S: CacheStorage + 'static,
  T: Transport + 'static,
{
  /// Create a gateway instance for `version` that has not been installed yet.
  pub fn new(
    storage: Arc<S>,
    transport: Arc<T>,
    version: impl Into<String>,
    seed_urls: Vec<String>,
  ) -> Self {
    Self {
      storage,
      transport,
      version: version.into(),
      seed_urls,
      state: Mutex::new(WorkerState::Registering),
      pending_writes: Mutex::new(JoinSet::new()),
    }
  }

  /// Pick up the version that was activated in an earlier run, if any.
  pub fn resume(storage: Arc<S>, transport: Arc<T>, seed_urls: Vec<String>) -> Result<Option<Self>> {
    let Some(version) = storage.active_version()? else {
      return Ok(None);
    };

    let gateway = Self::new(storage, transport, version, seed_urls);
    *gateway.lock_state() = WorkerState::Active;
    Ok(Some(gateway))
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  pub fn state(&self) -> WorkerState {
    *self.lock_state()
  }

  fn lock_state(&self) -> MutexGuard<'_, WorkerState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn transition(&self, from: WorkerState, to: WorkerState) -> Result<()> {
    let mut state = self.lock_state();
    if *state != from {
      return Err(eyre!(
        "Offline cache {} cannot move to {:?} while {:?}",
        self.version,
        to,
        *state
      ));
    }
    *state = to;
    Ok(())
  }

  /// Install and activate this version.
  ///
  /// Returns the names of the evicted generations. Registering the version
  /// that is already active is a no-op.
  pub async fn register(&self) -> Result<Vec<String>> {
    if self.storage.active_version()?.as_deref() == Some(self.version.as_str()) {
      self.transition(WorkerState::Registering, WorkerState::Active)?;
      info!(version = %self.version, "Offline cache already active");
      return Ok(Vec::new());
    }

    self.install().await?;
    self.activate()
  }

  /// Fetch every seed URL and store them as this version's generation.
  ///
  /// All seeds are fetched before anything is written. A single failure
  /// leaves storage untouched and marks the instance redundant.
  pub async fn install(&self) -> Result<()> {
    self.transition(WorkerState::Registering, WorkerState::Installing)?;
    info!(version = %self.version, seeds = self.seed_urls.len(), "Installing offline cache");

    let fetches = self.seed_urls.iter().map(|url| async move {
      let request = CacheRequest::get(url.as_str());
      let response = self
        .transport
        .fetch(&request)
        .await
        .map_err(|e| eyre!("Seed fetch failed for {}: {}", url, e))?;

      if !(200..300).contains(&response.status) {
        return Err(eyre!(
          "Seed fetch failed for {}: status {}",
          url,
          response.status
        ));
      }

      Ok::<_, color_eyre::Report>((request, response))
    });

    let stored = match try_join_all(fetches).await {
      Ok(entries) => self.storage.add_all(&self.version, &entries),
      Err(e) => Err(e),
    };

    if let Err(e) = stored {
      *self.lock_state() = WorkerState::Redundant;
      warn!(version = %self.version, error = %e, "Offline cache install failed");
      return Err(e.wrap_err(format!("Failed to install offline cache {}", self.version)));
    }

    *self.lock_state() = WorkerState::Waiting;
    Ok(())
  }

  /// Take over as the current version, deleting every other generation.
  pub fn activate(&self) -> Result<Vec<String>> {
    let state = self.state();
    if state != WorkerState::Waiting {
      return Err(eyre!(
        "Offline cache {} cannot activate while {:?}",
        self.version,
        state
      ));
    }

    let mut evicted = Vec::new();
    for generation in self.storage.generations()? {
      if generation.name != self.version {
        self.storage.delete_generation(&generation.name)?;
        evicted.push(generation.name);
      }
    }

    self.storage.set_active_version(&self.version)?;
    *self.lock_state() = WorkerState::Active;
    info!(version = %self.version, evicted = ?evicted, "Offline cache activated");

    Ok(evicted)
  }

  /// Answer a request, cache-first.
  ///
  /// Cached responses are returned without any network attempt or freshness
  /// check. An instance that is not active passes requests straight through,
  /// and so does any request that is not a GET.
  pub async fn fetch(&self, request: CacheRequest) -> Result<CacheResult<CachedResponse>> {
    if self.state() != WorkerState::Active || request.method != "GET" {
      let response = self.transport.fetch(&request).await?;
      return Ok(CacheResult::bypassed(response));
    }

    if let Some(cached) = self.storage.match_any(&request)? {
      debug!(url = %request.url, "Offline cache hit");
      return Ok(CacheResult::from_cache(cached));
    }

    debug!(url = %request.url, "Offline cache miss");
    let response = self.transport.fetch(&request).await?;

    if response.is_cacheable() {
      self.write_back(request, response.clone());
    }

    Ok(CacheResult::from_network(response))
  }

  /// Store a response in the current generation without blocking the caller.
  fn write_back(&self, request: CacheRequest, response: CachedResponse) {
    let storage = Arc::clone(&self.storage);
    let version = self.version.clone();

    let mut pending = self
      .pending_writes
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    pending.spawn_blocking(move || {
      if let Err(e) = storage.put(&version, &request, &response) {
        warn!(url = %request.url, error = %e, "Failed to write response to offline cache");
      }
    });
  }

  /// Wait for all background write-backs started so far.
  pub async fn settle(&self) {
    let mut pending = std::mem::take(
      &mut *self
        .pending_writes
        .lock()
        .unwrap_or_else(PoisonError::into_inner),
    );

    while let Some(result) = pending.join_next().await {
      if let Err(e) = result {
        warn!(error = %e, "Offline cache write task failed");
      }
    }
  }
}
