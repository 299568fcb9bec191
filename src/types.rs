use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type VideoId = usize;
pub type EndpointId = usize;
pub type CacheId = usize;

/// A parsed placement problem.
///
/// All caches share the same `cache_capacity`. Sizes, latencies and capacity
/// are expressed in the units of the input file (megabytes and milliseconds in
/// the usual data sets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub video_sizes: Vec<u64>,
    pub endpoints: Vec<Endpoint>,
    pub requests: Vec<Request>,
    pub cache_count: usize,
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Endpoint {
    pub datacenter_latency: u64,
    /// Latency to each cache reachable from this endpoint.
    pub cache_latencies: BTreeMap<CacheId, u64>,
}

/// `count` identical requests for `video` arriving at `endpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub video: VideoId,
    pub endpoint: EndpointId,
    pub count: u64,
}

/// Which videos are stored in which cache.
///
/// Caches holding no video are never present in the map.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Placement {
    pub caches: BTreeMap<CacheId, Vec<VideoId>>,
}

impl Problem {
    pub fn video_count(&self) -> usize {
        self.video_sizes.len()
    }

    /// Total number of individual requests across all request records,
    /// saturating at `u64::MAX`.
    pub fn total_requests(&self) -> u64 {
        self.requests
            .iter()
            .fold(0u64, |sum, r| sum.saturating_add(r.count))
    }
}

impl Placement {
    /// Number of caches holding at least one video.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    pub fn insert(&mut self, cache: CacheId, video: VideoId) {
        self.caches.entry(cache).or_default().push(video);
    }

    pub fn videos(&self, cache: CacheId) -> &[VideoId] {
        self.caches.get(&cache).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, cache: CacheId, video: VideoId) -> bool {
        self.videos(cache).contains(&video)
    }
}
