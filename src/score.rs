//! Scoring a placement directly against the problem, without the model.

use crate::relevance::aggregate_demand;
use crate::types::{CacheId, Placement, Problem, VideoId};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScoreError {
    #[error("cache {cache} does not exist (only {limit} caches)")]
    UnknownCache { cache: CacheId, limit: usize },
    #[error("video {video} does not exist (only {limit} videos)")]
    UnknownVideo { video: VideoId, limit: usize },
    #[error("video {video} is listed twice in cache {cache}")]
    DuplicateVideo { cache: CacheId, video: VideoId },
    #[error("cache {cache} holds {used} but its capacity is {capacity}")]
    OverCapacity {
        cache: CacheId,
        used: u64,
        capacity: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    /// Sum over all requests of the latency saved versus the datacenter.
    pub saved_latency: u64,
    pub total_requests: u64,
    /// `saved_latency * 1000 / total_requests`, rounded down.
    ///
    /// Sums saturate at `u64::MAX` rather than wrap.
    pub points: u64,
}

impl Score {
    pub fn new(saved_latency: u64, total_requests: u64) -> Self {
        let points = (u128::from(saved_latency) * 1000)
            .checked_div(u128::from(total_requests))
            .map_or(0, |points| u64::try_from(points).unwrap_or(u64::MAX));
        Self {
            saved_latency,
            total_requests,
            points,
        }
    }
}

/// Validate the placement, then score it.
pub fn score(problem: &Problem, placement: &Placement) -> Result<Score, ScoreError> {
    validate(problem, placement)?;
    Ok(evaluate(problem, placement))
}

/// Score a placement assumed to be valid.
pub fn evaluate(problem: &Problem, placement: &Placement) -> Score {
    Score::new(saved_latency(problem, placement), problem.total_requests())
}

/// Each request is served by the fastest reachable cache holding its video,
/// or by the datacenter if that is faster or no such cache exists.
pub fn saved_latency(problem: &Problem, placement: &Placement) -> u64 {
    let stored: BTreeSet<(CacheId, VideoId)> = placement
        .caches
        .iter()
        .flat_map(|(&cache, videos)| videos.iter().map(move |&video| (cache, video)))
        .collect();

    aggregate_demand(&problem.requests)
        .into_iter()
        .map(|((video, endpoint), count)| {
            let endpoint = &problem.endpoints[endpoint];
            let best = endpoint
                .cache_latencies
                .iter()
                .filter(|&(&cache, _)| stored.contains(&(cache, video)))
                .map(|(_, &latency)| latency)
                .min();
            best.map_or(0, |latency| {
                endpoint
                    .datacenter_latency
                    .saturating_sub(latency)
                    .saturating_mul(count)
            })
        })
        .fold(0, u64::saturating_add)
}

pub fn validate(problem: &Problem, placement: &Placement) -> Result<(), ScoreError> {
    for (&cache, videos) in &placement.caches {
        if cache >= problem.cache_count {
            return Err(ScoreError::UnknownCache {
                cache,
                limit: problem.cache_count,
            });
        }

        let mut seen = BTreeSet::new();
        let mut used = 0;
        for &video in videos {
            let Some(&size) = problem.video_sizes.get(video) else {
                return Err(ScoreError::UnknownVideo {
                    video,
                    limit: problem.video_count(),
                });
            };
            if !seen.insert(video) {
                return Err(ScoreError::DuplicateVideo { cache, video });
            }
            used += size;
        }

        if used > problem.cache_capacity {
            return Err(ScoreError::OverCapacity {
                cache,
                used,
                capacity: problem.cache_capacity,
            });
        }
    }
    Ok(())
}
