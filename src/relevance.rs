use crate::types::{CacheId, EndpointId, Problem, Request, VideoId};
use std::collections::{BTreeMap, BTreeSet};

/// Total demand per `(video, endpoint)` pair.
pub type Demand = BTreeMap<(VideoId, EndpointId), u64>;

/// Every `(cache, video)` pair where the video is requested at an endpoint
/// that can reach the cache.
///
/// No latency or size threshold is applied: a pair whose cache is slower than
/// the datacenter is still relevant here and simply never earns any gain.
pub fn relevant_pairs(problem: &Problem) -> BTreeSet<(CacheId, VideoId)> {
    problem
        .requests
        .iter()
        .flat_map(|request| {
            problem.endpoints[request.endpoint]
                .cache_latencies
                .keys()
                .map(move |&cache| (cache, request.video))
        })
        .collect()
}

/// Sum the counts of request records sharing the same video and endpoint.
///
/// Totals saturate at `u64::MAX`. Pairs whose total is zero are left out.
pub fn aggregate_demand(requests: &[Request]) -> Demand {
    let mut demand = Demand::new();
    for request in requests {
        let total = demand.entry((request.video, request.endpoint)).or_insert(0);
        *total = total.saturating_add(request.count);
    }
    demand.retain(|_, count| *count > 0);
    demand
}
