use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use super::*;
use crate::compose::surface::Surface;
use crate::foundation::core::Rgba8Premul;

#[derive(Default)]
struct CountingDecoder {
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Duration,
    failing: HashSet<usize>,
}

impl CountingDecoder {
    fn slow(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            ..Self::default()
        }
    }

    fn failing(indices: &[usize]) -> Self {
        Self {
            failing: indices.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AssetDecoder for CountingDecoder {
    fn decode(&self, index: usize, source: &Path) -> anyhow::Result<RenderAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&index) {
            anyhow::bail!("boom");
        }
        Ok(RenderAsset::new(
            index,
            source,
            Surface::filled(2, 2, Rgba8Premul::gray(0.5)),
        ))
    }
}

fn sources(n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| PathBuf::from(format!("img-{i}.jpg"))).collect()
}

fn provider(
    n: usize,
    capacity: usize,
    max_concurrent: usize,
    decoder: &Arc<CountingDecoder>,
) -> AssetProvider {
    AssetProvider::new(
        sources(n),
        Arc::clone(decoder) as Arc<dyn AssetDecoder>,
        capacity,
        max_concurrent,
        RenderLogger::disabled(),
    )
}

#[tokio::test]
async fn concurrent_requests_share_one_decode() {
    let decoder = Arc::new(CountingDecoder::slow(30));
    let p = provider(1, 4, 2, &decoder);

    let results = futures::future::join_all((0..8).map(|_| p.asset(0))).await;
    assert_eq!(decoder.calls(), 1);
    let first = results[0].as_ref().unwrap();
    for r in &results {
        assert!(Arc::ptr_eq(first, r.as_ref().unwrap()));
    }
    assert_eq!(p.stats().in_flight, 0);
    assert_eq!(p.stats().decodes_started, 1);
}

#[tokio::test]
async fn evicts_least_recently_used() {
    let decoder = Arc::new(CountingDecoder::default());
    let p = provider(4, 2, 1, &decoder);

    for i in [0, 1, 2] {
        p.asset(i).await.unwrap();
    }
    assert!(!p.is_cached(0));
    assert_eq!(p.cached_indices(), vec![1, 2]);

    // Touching 1 protects it from the next eviction.
    p.asset(1).await.unwrap();
    p.asset(3).await.unwrap();
    assert_eq!(p.cached_indices(), vec![1, 3]);
    assert_eq!(decoder.calls(), 4);
    assert_eq!(p.stats().evictions, 2);
}

#[tokio::test]
async fn cache_hit_does_not_decode_again() {
    let decoder = Arc::new(CountingDecoder::default());
    let p = provider(2, 2, 1, &decoder);
    let a = p.asset(1).await.unwrap();
    let b = p.asset(1).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(decoder.calls(), 1);
}

#[tokio::test]
async fn failure_carries_index_and_is_not_cached() {
    let decoder = Arc::new(CountingDecoder::failing(&[1]));
    let p = provider(3, 3, 1, &decoder);

    let err = p.asset(1).await.unwrap_err();
    assert_eq!(err.index, 1);
    assert_eq!(err.source_name, "img-1.jpg");
    assert!(err.message.contains("boom"));
    assert!(!p.is_cached(1));

    // A later demand retries the decode.
    assert!(p.asset(1).await.is_err());
    assert_eq!(decoder.calls(), 2);
    assert_eq!(p.stats().decode_failures, 2);
}

#[tokio::test]
async fn out_of_range_index_is_an_error() {
    let decoder = Arc::new(CountingDecoder::default());
    let p = provider(2, 2, 1, &decoder);
    let err = p.asset(5).await.unwrap_err();
    assert_eq!(err.index, 5);
    assert_eq!(decoder.calls(), 0);
}

#[tokio::test]
async fn prefetch_respects_concurrency_bound() {
    let decoder = Arc::new(CountingDecoder::slow(20));
    let p = provider(7, 8, 2, &decoder);

    p.prefetch(3, 3);
    p.settle_prefetch().await;

    assert_eq!(decoder.calls(), 7);
    assert!(decoder.max_active.load(Ordering::SeqCst) <= 2);
    assert_eq!(p.stats().cached, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_prefetch_calls_share_one_concurrency_bound() {
    let decoder = Arc::new(CountingDecoder::slow(60));
    let p = provider(9, 9, 2, &decoder);

    for _ in 0..3 {
        p.prefetch(4, 4);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    p.settle_prefetch().await;

    assert_eq!(decoder.calls(), 9);
    assert!(decoder.max_active.load(Ordering::SeqCst) <= 2);
    assert_eq!(p.stats().cached, 9);
}

#[tokio::test]
async fn prefetch_clamps_window_and_skips_cached() {
    let decoder = Arc::new(CountingDecoder::default());
    let p = provider(3, 4, 2, &decoder);

    p.asset(1).await.unwrap();
    p.prefetch(0, 10);
    p.settle_prefetch().await;
    assert_eq!(decoder.calls(), 3);

    p.prefetch(2, 1);
    p.settle_prefetch().await;
    assert_eq!(decoder.calls(), 3);
}

#[tokio::test]
async fn prefetch_failures_surface_only_on_demand() {
    let decoder = Arc::new(CountingDecoder::failing(&[2]));
    let p = provider(4, 4, 2, &decoder);

    p.prefetch(1, 1);
    p.settle_prefetch().await;
    assert!(p.is_cached(0) && p.is_cached(1));
    assert!(!p.is_cached(2));

    let err = p.asset(2).await.unwrap_err();
    assert_eq!(err.index, 2);
}

#[tokio::test]
async fn shutdown_drops_cache() {
    let decoder = Arc::new(CountingDecoder::default());
    let p = provider(2, 2, 1, &decoder);
    p.asset(0).await.unwrap();
    p.shutdown();
    assert_eq!(p.stats().cached, 0);
}
