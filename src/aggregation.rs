use std::ops::Deref;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::debug;

use crate::assertions::assert_options;
use crate::clustering::{Centers, EvalPoint};
use crate::error::Result;
use crate::evaluation::EvaluationOptions;
use crate::metric::{merge_cluster_metrics, ClusterMetric, ClusterMetrics};
use crate::space::DistanceFn;

/// Folds one shard of points into per-cluster statistics.
///
/// Every point is resolved to its cluster (label or nearest center) and its distance to that
/// center is accumulated. Clusters that receive no point have no entry.
/// The first failing point aborts the shard.
pub fn aggregate_shard<P, D>(centers: &Centers, shard: &[P], distance: &D) -> Result<ClusterMetrics>
where
    P: EvalPoint,
    D: DistanceFn + ?Sized,
{
    let mut metrics = ClusterMetrics::with_capacity(centers.m());
    for point in shard {
        let (id, d) = centers.resolve(point, distance)?;
        metrics
            .entry(id)
            .and_modify(|m| m.push(d))
            .or_insert_with(|| ClusterMetric::of_point(d));
    }
    Ok(metrics)
}

/// Computes the statistics of all clusters over a slice of points.
///
/// The slice is cut into shards of options.shard_size points, which are folded in parallel;
/// see [fetch_cluster_metrics_sharded].
pub fn fetch_cluster_metrics<P, D>(
    centers: &Centers,
    points: &[P],
    distance: &D,
    options: &EvaluationOptions,
) -> Result<ClusterMetrics>
where
    P: EvalPoint,
    D: DistanceFn + ?Sized,
{
    assert_options(options)?;
    let shards: Vec<&[P]> = points.chunks(options.shard_size).collect();
    fetch_cluster_metrics_sharded(centers, &shards, distance, options)
}

/// Computes the statistics of all clusters over points that are already split into shards.
///
/// Each shard is folded on its own by a worker of a thread pool with options.thread_count
/// threads; workers share nothing but the read-only centers. The partial results are merged in
/// shard order once all workers are done, so for fixed shards the result does not depend on
/// the number of threads or on which worker finishes first.
///
/// # Errors
/// Any point error (see [Centers::resolve]) aborts the whole aggregation.
pub fn fetch_cluster_metrics_sharded<S, P, D>(
    centers: &Centers,
    shards: &[S],
    distance: &D,
    options: &EvaluationOptions,
) -> Result<ClusterMetrics>
where
    S: Deref<Target = [P]> + Sync,
    P: EvalPoint,
    D: DistanceFn + ?Sized,
{
    assert_options(options)?;
    let thread_count = options.threads();
    let thread_pool = ThreadPoolBuilder::new().num_threads(thread_count).build()?;

    let partials: Vec<ClusterMetrics> = thread_pool.install(|| {
        shards
            .par_iter()
            .map(|shard| aggregate_shard(centers, &**shard, distance))
            .collect::<Result<Vec<ClusterMetrics>>>()
    })?;

    let metrics = partials
        .into_iter()
        .fold(ClusterMetrics::with_capacity(centers.m()), merge_cluster_metrics);

    debug!(
        shards = shards.len(),
        threads = thread_count,
        clusters = metrics.len(),
        "aggregated cluster metrics"
    );
    Ok(metrics)
}
