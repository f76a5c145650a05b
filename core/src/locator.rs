use crate::cache::IdentifierCache;
use crate::document::Document;
use crate::document::Element;
use crate::error::LocateError;
use crate::error::OracleError;
use crate::error::PatchError;
use crate::oracle::Oracle;
use crate::patch;
use crate::patch::IdentifierMapping;
use crate::patch::PatchOutcome;
use selfheal_async_utils::Coalescer;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Finds elements by id, asking the oracle for a replacement when the
/// requested id has gone stale.
///
/// Owns the run's identifier cache and the set of in-flight resolutions.
/// Clones share both, so one `Resolver` per run is passed by reference (or
/// cloned) to every call site.
#[derive(Clone)]
pub struct Resolver {
    oracle: Arc<dyn Oracle>,
    cache: IdentifierCache,
    pending: Coalescer<String, String, OracleError>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("cached", &self.cache.len())
            .field("in_flight", &self.pending.len())
            .finish()
    }
}

impl Resolver {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self::with_cache(oracle, IdentifierCache::new())
    }

    pub fn with_cache(oracle: Arc<dyn Oracle>, cache: IdentifierCache) -> Self {
        Self {
            oracle,
            cache,
            pending: Coalescer::new(),
        }
    }

    pub fn cache(&self) -> &IdentifierCache {
        &self.cache
    }

    /// Snapshot of every mapping discovered so far.
    pub fn mapping(&self) -> IdentifierMapping {
        self.cache.snapshot()
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Returns the element for `id`, resolving a stale id through the cache
    /// or the oracle.
    ///
    /// A cached mapping whose target has since disappeared fails with
    /// [`LocateError::ElementNotFound`] and is not re-resolved.
    pub async fn locate<D>(&self, document: &D, id: &str) -> Result<Element, LocateError>
    where
        D: Document + ?Sized,
    {
        if let Some(element) = document.element_by_id(id) {
            return Ok(element);
        }

        if let Some(resolved) = self.cache.get(id) {
            debug!(stale_id = id, resolved_id = %resolved, "identifier cache hit");
            return document.element_by_id(&resolved).ok_or_else(|| {
                warn!(
                    stale_id = id,
                    resolved_id = %resolved,
                    "cached identifier no longer present in document"
                );
                LocateError::ElementNotFound {
                    requested: id.to_string(),
                    resolved,
                }
            });
        }

        let resolved = self.resolve_id(id, document.serialize()).await?;
        document
            .element_by_id(&resolved)
            .ok_or_else(|| LocateError::ElementNotFound {
                requested: id.to_string(),
                resolved,
            })
    }

    /// Resolves `stale_id` against `snapshot` with at most one oracle call
    /// in flight per id.
    ///
    /// The cache is filled from inside the spawned resolution, so the result
    /// is kept even if every caller has given up waiting.
    pub async fn resolve_id(&self, stale_id: &str, snapshot: String) -> Result<String, OracleError> {
        let oracle = Arc::clone(&self.oracle);
        let cache = self.cache.clone();
        let key = stale_id.to_string();
        self.pending
            .resolve(stale_id.to_string(), move || async move {
                // A resolution that settled just before this one registered
                // has already filled the cache.
                if let Some(resolved) = cache.get(&key) {
                    return Ok(resolved);
                }
                match oracle.query(&key, &snapshot).await {
                    Ok(answer) => {
                        let resolved = cache.put(&key, &answer);
                        info!(stale_id = %key, resolved_id = %resolved, "resolved stale identifier");
                        Ok(resolved)
                    }
                    Err(err) => {
                        warn!(stale_id = %key, error = %err, "oracle resolution failed");
                        Err(err)
                    }
                }
            })
            .await
    }

    /// Waits for every in-flight resolution, then rewrites `path` with the
    /// mappings discovered during the run.
    pub async fn persist(&self, path: &Path) -> Result<PatchOutcome, PatchError> {
        self.pending.settled().await;
        patch::persist(&self.cache.snapshot(), path)
    }
}
