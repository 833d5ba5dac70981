//! LRU cache of composed clips sitting in front of the asset provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt as _;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use crate::assets::AssetProvider;
use crate::compose::composer::{ComposedClip, FrameComposer};
use crate::foundation::error::{AssetLoadError, RenderError, RenderResult};
use crate::foundation::lru::BoundedLru;
use crate::timeline::TimelineLayer;

/// Enough for both sides of a crossfade plus the next clip.
pub const DEFAULT_CLIP_CACHE_CAPACITY: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClipCacheStats {
    pub cached: usize,
    pub capacity: usize,
    pub builds: u64,
    pub hits: u64,
    pub evictions: u64,
    pub cached_bytes: usize,
}

/// Why a clip build failed, shared by every caller waiting on that build.
#[derive(Clone, Debug)]
enum BuildError {
    Asset(AssetLoadError),
    Validation(String),
    Pipeline(String),
}

impl From<BuildError> for RenderError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Asset(e) => e.into(),
            BuildError::Validation(msg) => RenderError::Validation(msg),
            BuildError::Pipeline(msg) => RenderError::ExportPipelineFailed(msg),
        }
    }
}

type BuildFuture = Shared<BoxFuture<'static, Result<Arc<ComposedClip>, BuildError>>>;

/// Memoizes [`FrameComposer::make_clip`] per source index.
///
/// Clips are built on the blocking pool. Concurrent requests for one uncached index share a single
/// build; the lock is never held across an `.await`.
pub struct ClipCache {
    inner: Arc<Inner>,
}

struct Inner {
    provider: AssetProvider,
    composer: Arc<FrameComposer>,
    state: Mutex<State>,
    builds: AtomicU64,
    hits: AtomicU64,
}

struct State {
    cache: BoundedLru<usize, Arc<ComposedClip>>,
    in_flight: HashMap<usize, BuildFuture>,
}

impl ClipCache {
    pub fn new(provider: AssetProvider, composer: Arc<FrameComposer>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                composer,
                state: Mutex::new(State {
                    cache: BoundedLru::new(capacity),
                    in_flight: HashMap::new(),
                }),
                builds: AtomicU64::new(0),
                hits: AtomicU64::new(0),
            }),
        }
    }

    pub fn provider(&self) -> &AssetProvider {
        &self.inner.provider
    }

    /// Composed clip for `index`, building it from the decoded asset on a miss.
    pub async fn clip(&self, index: usize) -> RenderResult<Arc<ComposedClip>> {
        let pending = {
            let mut st = self.inner.state.lock();
            if let Some(hit) = st.cache.get(&index) {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(hit));
            }
            st.in_flight
                .entry(index)
                .or_insert_with(|| self.start_build(index))
                .clone()
        };
        pending.await.map_err(RenderError::from)
    }

    fn start_build(&self, index: usize) -> BuildFuture {
        let inner = Arc::clone(&self.inner);
        async move {
            let built = build(&inner, index).await;
            let mut st = inner.state.lock();
            st.in_flight.remove(&index);
            let clip = Arc::new(built?);
            inner.builds.fetch_add(1, Ordering::Relaxed);
            if let Some((evicted, _)) = st.cache.put(index, Arc::clone(&clip)) {
                tracing::trace!(index = evicted, "clip evicted");
            }
            Ok(clip)
        }
        .boxed()
        .shared()
    }

    /// Clips for every layer of a snapshot, in layer order.
    pub async fn resolve(
        &self,
        layers: &[TimelineLayer],
    ) -> RenderResult<Vec<(TimelineLayer, Arc<ComposedClip>)>> {
        let mut out = Vec::with_capacity(layers.len());
        for layer in layers {
            out.push((*layer, self.clip(layer.clip_index).await?));
        }
        Ok(out)
    }

    /// `true` if `index` is cached. Does not touch recency.
    pub fn is_cached(&self, index: usize) -> bool {
        self.inner.state.lock().cache.peek(&index).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().cache.is_empty()
    }

    /// Drop every cached clip.
    pub fn clear(&self) {
        self.inner.state.lock().cache.clear();
    }

    pub fn stats(&self) -> ClipCacheStats {
        let st = self.inner.state.lock();
        let cache = &st.cache;
        ClipCacheStats {
            cached: cache.len(),
            capacity: cache.capacity(),
            builds: self.inner.builds.load(Ordering::Relaxed),
            hits: self.inner.hits.load(Ordering::Relaxed),
            evictions: cache.evictions(),
            cached_bytes: cache.values().map(|c| c.byte_len()).sum(),
        }
    }
}

async fn build(inner: &Inner, index: usize) -> Result<ComposedClip, BuildError> {
    let asset = inner.provider.asset(index).await.map_err(BuildError::Asset)?;
    let composer = Arc::clone(&inner.composer);
    tokio::task::spawn_blocking(move || composer.make_clip(&asset))
        .await
        .map_err(|e| BuildError::Pipeline(format!("clip #{index} worker failed: {e}")))?
        .map_err(|e| match e {
            RenderError::Validation(msg) => BuildError::Validation(msg),
            RenderError::Other(e) => BuildError::Pipeline(format!("compose clip #{index}: {e:#}")),
            other => BuildError::Pipeline(other.to_string()),
        })
}

#[cfg(test)]
#[path = "../../tests/unit/render/clip_cache.rs"]
mod tests;
