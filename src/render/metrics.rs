//! Periodic resource snapshots written to the render log.

use crate::assets::AssetProviderStats;
use crate::encode::buffer_pool::BufferPoolStats;
use crate::logging::RenderLogger;
use crate::render::clip_cache::ClipCacheStats;
use crate::render::job::StageTimings;

/// Everything one `metrics` line reports.
#[derive(Clone, Debug, Default)]
pub struct FrameMetrics {
    pub frame: u64,
    pub total_frames: u64,
    pub timings: StageTimings,
    pub assets: AssetProviderStats,
    pub clips: ClipCacheStats,
    pub pool: Option<BufferPoolStats>,
    pub rss_bytes: Option<u64>,
}

impl FrameMetrics {
    pub fn write_to(&self, logger: &RenderLogger, event: &str) {
        let t = &self.timings;
        let pool = self.pool.unwrap_or_default();
        let rss_mb = self
            .rss_bytes
            .map(|b| format!("{:.1}", b as f64 / (1024.0 * 1024.0)))
            .unwrap_or_else(|| "na".to_string());
        logger.event(
            event,
            &[
                ("frame", &self.frame),
                ("total", &self.total_frames),
                ("resolve_ms", &t.resolve.as_millis()),
                ("compose_ms", &t.compose.as_millis()),
                ("encode_ms", &t.encode.as_millis()),
                ("backpressure_ms", &t.backpressure.as_millis()),
                ("assets_cached", &self.assets.cached),
                ("assets_in_flight", &self.assets.in_flight),
                ("assets_decoded", &self.assets.decodes_started),
                ("assets_evicted", &self.assets.evictions),
                ("clips_cached", &self.clips.cached),
                ("clips_built", &self.clips.builds),
                ("pool_available", &pool.available),
                ("pool_exhausted", &pool.exhausted),
                ("rss_mb", &rss_mb),
            ],
        );
    }
}

/// Resident set size of this process, where the platform exposes it.
pub fn resident_memory_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        parse_vm_rss(&status)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// `VmRSS:  123456 kB` -> bytes.
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let mut parts = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    match parts.next() {
        Some("kB") | None => value.checked_mul(1024),
        Some(_) => None,
    }
}
