//! Bounded, deduplicating async image loader.
//!
//! The provider owns its cache and in-flight table; every access goes through its methods and the
//! lock is never held across an `.await`. Concurrent requests for one uncached index share a single
//! decode.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt as _;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

use crate::assets::decode::AssetDecoder;
use crate::assets::{RenderAsset, source_name};
use crate::foundation::error::AssetLoadError;
use crate::foundation::lru::BoundedLru;
use crate::logging::RenderLogger;

pub type AssetResult = Result<Arc<RenderAsset>, AssetLoadError>;

type DecodeFuture = Shared<BoxFuture<'static, AssetResult>>;

/// Point-in-time counters for metrics lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssetProviderStats {
    pub cached: usize,
    pub capacity: usize,
    pub in_flight: usize,
    pub decodes_started: u64,
    pub decode_failures: u64,
    pub evictions: u64,
    pub cached_bytes: usize,
}

#[derive(Clone)]
pub struct AssetProvider {
    inner: Arc<Inner>,
}

struct Inner {
    sources: Vec<PathBuf>,
    decoder: Arc<dyn AssetDecoder>,
    prefetch_slots: Arc<Semaphore>,
    logger: RenderLogger,
    state: Mutex<State>,
    decodes_started: AtomicU64,
    decode_failures: AtomicU64,
}

struct State {
    cache: BoundedLru<usize, Arc<RenderAsset>>,
    in_flight: HashMap<usize, DecodeFuture>,
    /// Indices handed to a prefetch batch and not yet finished.
    scheduled: HashSet<usize>,
    prefetch_tasks: Vec<JoinHandle<()>>,
}

impl AssetProvider {
    pub fn new(
        sources: Vec<PathBuf>,
        decoder: Arc<dyn AssetDecoder>,
        capacity: usize,
        prefetch_max_concurrent: usize,
        logger: RenderLogger,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sources,
                decoder,
                prefetch_slots: Arc::new(Semaphore::new(prefetch_max_concurrent.max(1))),
                logger,
                state: Mutex::new(State {
                    cache: BoundedLru::new(capacity),
                    in_flight: HashMap::new(),
                    scheduled: HashSet::new(),
                    prefetch_tasks: Vec::new(),
                }),
                decodes_started: AtomicU64::new(0),
                decode_failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sources.is_empty()
    }

    /// Decoded asset for `index`, decoding at most once no matter how many callers wait on it.
    pub async fn asset(&self, index: usize) -> AssetResult {
        let Some(source) = self.inner.sources.get(index) else {
            return Err(AssetLoadError {
                index,
                source_name: "<none>".to_string(),
                message: format!("index out of range (have {} sources)", self.len()),
            });
        };

        let pending = {
            let mut st = self.inner.state.lock();
            if let Some(hit) = st.cache.get(&index) {
                return Ok(Arc::clone(hit));
            }
            st.in_flight
                .entry(index)
                .or_insert_with(|| self.start_decode(index, source.clone()))
                .clone()
        };
        pending.await
    }

    /// Decode the window `[around - radius, around + radius]` in the background.
    ///
    /// Indices already cached, in flight, or queued by an earlier call are skipped. Candidates are
    /// started nearest first, and across all calls at most `prefetch_max_concurrent` prefetch
    /// decodes run at once. Failures are dropped here and resurface only if the index is requested
    /// through [`AssetProvider::asset`].
    pub fn prefetch(&self, around: usize, radius: usize) {
        let Some(last) = self.len().checked_sub(1) else {
            return;
        };
        let around = around.min(last);
        let lo = around.saturating_sub(radius);
        let hi = around.saturating_add(radius).min(last);

        let mut candidates: Vec<usize> = {
            let mut st = self.inner.state.lock();
            let picked: Vec<usize> = (lo..=hi)
                .filter(|i| {
                    !st.cache.contains(i)
                        && !st.in_flight.contains_key(i)
                        && !st.scheduled.contains(i)
                })
                .collect();
            st.scheduled.extend(picked.iter().copied());
            picked
        };
        if candidates.is_empty() {
            return;
        }
        // Nearest first; ahead of `around` before behind it.
        candidates.sort_by_key(|&i| (i.abs_diff(around), i < around));

        let provider = self.clone();
        let task = tokio::spawn(async move {
            let mut workers = JoinSet::new();
            for index in candidates {
                let Ok(permit) = Arc::clone(&provider.inner.prefetch_slots)
                    .acquire_owned()
                    .await
                else {
                    break;
                };
                let p = provider.clone();
                workers.spawn(async move {
                    if !p.is_cached(index) {
                        let _ = p.asset(index).await;
                    }
                    p.inner.state.lock().scheduled.remove(&index);
                    drop(permit);
                });
            }
            while workers.join_next().await.is_some() {}
        });

        let mut st = self.inner.state.lock();
        st.prefetch_tasks.retain(|t| !t.is_finished());
        st.prefetch_tasks.push(task);
    }

    /// Wait for every prefetch batch started so far.
    pub async fn settle_prefetch(&self) {
        let tasks = std::mem::take(&mut self.inner.state.lock().prefetch_tasks);
        for task in tasks {
            let _ = task.await;
        }
    }

    /// Abort background prefetch work and drop cached assets. Decodes already running on worker
    /// threads finish and are discarded.
    pub fn shutdown(&self) {
        let mut st = self.inner.state.lock();
        for task in st.prefetch_tasks.drain(..) {
            task.abort();
        }
        st.scheduled.clear();
        st.cache.clear();
    }

    pub fn is_cached(&self, index: usize) -> bool {
        self.inner.state.lock().cache.contains(&index)
    }

    /// Cached indices, least recently used first.
    pub fn cached_indices(&self) -> Vec<usize> {
        self.inner.state.lock().cache.keys_by_recency().copied().collect()
    }

    pub fn stats(&self) -> AssetProviderStats {
        let st = self.inner.state.lock();
        AssetProviderStats {
            cached: st.cache.len(),
            capacity: st.cache.capacity(),
            in_flight: st.in_flight.len(),
            decodes_started: self.inner.decodes_started.load(Ordering::Relaxed),
            decode_failures: self.inner.decode_failures.load(Ordering::Relaxed),
            evictions: st.cache.evictions(),
            cached_bytes: st.cache.values().map(|a| a.byte_len()).sum(),
        }
    }

    fn start_decode(&self, index: usize, source: PathBuf) -> DecodeFuture {
        let inner = Arc::clone(&self.inner);
        inner.decodes_started.fetch_add(1, Ordering::Relaxed);

        async move {
            let decoder = Arc::clone(&inner.decoder);
            let path = source.clone();
            let joined =
                tokio::task::spawn_blocking(move || decoder.decode(index, &path)).await;
            let outcome = match joined {
                Ok(Ok(asset)) => Ok(Arc::new(asset)),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(e) => Err(format!("decode worker failed: {e}")),
            };

            let mut st = inner.state.lock();
            st.in_flight.remove(&index);
            match outcome {
                Ok(asset) => {
                    for (evicted, _) in st.cache.put(index, Arc::clone(&asset)) {
                        tracing::trace!(index = evicted, "asset evicted");
                    }
                    Ok(asset)
                }
                Err(message) => {
                    drop(st);
                    inner.decode_failures.fetch_add(1, Ordering::Relaxed);
                    let name = source_name(&source);
                    tracing::warn!(index, source = %name, error = %message, "asset decode failed");
                    inner.logger.event(
                        "asset_failed",
                        &[("index", &index), ("source", &name), ("error", &message)],
                    );
                    Err(AssetLoadError {
                        index,
                        source_name: name,
                        message,
                    })
                }
            }
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/provider.rs"]
mod tests;
