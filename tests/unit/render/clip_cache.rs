use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicUsize;

use super::*;
use crate::assets::{AssetDecoder, RenderAsset};
use crate::compose::surface::Surface;
use crate::foundation::core::Rgba8Premul;
use crate::logging::RenderLogger;
use crate::settings::RenderSettings;

#[derive(Default)]
struct FlatDecoder {
    calls: AtomicUsize,
    failing: Option<usize>,
}

impl AssetDecoder for FlatDecoder {
    fn decode(&self, index: usize, source: &Path) -> anyhow::Result<RenderAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing == Some(index) {
            anyhow::bail!("corrupt jpeg");
        }
        Ok(RenderAsset::new(
            index,
            source,
            Surface::filled(40, 30, Rgba8Premul::gray(0.5)),
        ))
    }
}

fn cache(n: usize, capacity: usize, decoder: Arc<FlatDecoder>) -> ClipCache {
    let settings = RenderSettings {
        output_width: 160,
        output_height: 120,
        ..RenderSettings::default()
    };
    let sources: Vec<PathBuf> = (0..n).map(|i| PathBuf::from(format!("{i}.jpg"))).collect();
    let provider = AssetProvider::new(sources, decoder, 8, 1, RenderLogger::disabled());
    let composer = FrameComposer::with_fontdb(&settings, Arc::new(usvg::fontdb::Database::new()));
    ClipCache::new(provider, Arc::new(composer), capacity)
}

#[tokio::test]
async fn hit_returns_the_same_clip_without_rebuilding() {
    let cache = cache(2, DEFAULT_CLIP_CACHE_CAPACITY, Arc::new(FlatDecoder::default()));
    let a = cache.clip(0).await.unwrap();
    let b = cache.clip(0).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    let stats = cache.stats();
    assert_eq!(stats.builds, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.cached, 1);
    assert!(stats.cached_bytes > 0);
}

#[tokio::test]
async fn evicts_least_recently_used_clip() {
    let cache = cache(3, 2, Arc::new(FlatDecoder::default()));
    cache.clip(0).await.unwrap();
    cache.clip(1).await.unwrap();
    cache.clip(0).await.unwrap();
    cache.clip(2).await.unwrap();

    assert!(cache.is_cached(0));
    assert!(!cache.is_cached(1));
    assert!(cache.is_cached(2));
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test]
async fn asset_failure_keeps_its_index() {
    let decoder = Arc::new(FlatDecoder {
        failing: Some(1),
        ..FlatDecoder::default()
    });
    let cache = cache(3, 3, decoder);
    let err = cache.clip(1).await.unwrap_err();
    assert_eq!(err.asset_index(), Some(1));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn resolve_preserves_layer_order() {
    let cache = cache(3, 3, Arc::new(FlatDecoder::default()));
    let layers = [
        TimelineLayer {
            clip_index: 1,
            opacity: 0.4,
            progress: 0.9,
        },
        TimelineLayer {
            clip_index: 2,
            opacity: 0.6,
            progress: 0.1,
        },
    ];
    let resolved = cache.resolve(&layers).await.unwrap();
    let indices: Vec<usize> = resolved.iter().map(|(_, c)| c.index).collect();
    assert_eq!(indices, vec![1, 2]);
    assert_eq!(resolved[0].0, layers[0]);

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.provider().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_share_one_build() {
    let decoder = Arc::new(FlatDecoder::default());
    let cache = cache(2, DEFAULT_CLIP_CACHE_CAPACITY, Arc::clone(&decoder));

    let (a, b) = tokio::join!(cache.clip(0), cache.clip(0));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.stats().builds, 1);
    assert_eq!(decoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_build_is_retried_on_next_request() {
    let decoder = Arc::new(FlatDecoder {
        failing: Some(0),
        ..FlatDecoder::default()
    });
    let cache = cache(1, 1, Arc::clone(&decoder));
    assert!(cache.clip(0).await.is_err());
    assert!(cache.clip(0).await.is_err());
    assert_eq!(decoder.calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.stats().builds, 0);
}
