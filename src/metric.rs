use std::collections::HashMap;

use crate::types::{ClusterId, PointCount, Value};

/// Distance statistics of the points of one cluster to its center.
///
/// A ClusterMetric is at the same time the partial accumulator of a shard and the final
/// statistic: partials are combined with [ClusterMetric::add], which only sums (and takes a
/// max), so any partitioning and merge order gives the same result up to floating point
/// summation order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterMetric {
    count: PointCount,
    sum_dist: Value,
    sum_squared_dist: Value,
    max_dist: Value,
}

impl ClusterMetric {
    /// The statistic of a single point at distance dist from its center.
    pub fn of_point(dist: Value) -> ClusterMetric {
        ClusterMetric {
            count: 1,
            sum_dist: dist,
            sum_squared_dist: dist * dist,
            max_dist: dist,
        }
    }

    /// Adds the statistic of another shard of the same cluster.
    pub fn add(&self, other: &ClusterMetric) -> ClusterMetric {
        ClusterMetric {
            count: self.count + other.count,
            sum_dist: self.sum_dist + other.sum_dist,
            sum_squared_dist: self.sum_squared_dist + other.sum_squared_dist,
            max_dist: self.max_dist.max(other.max_dist),
        }
    }

    /// Folds one more point into the statistic.
    pub fn push(&mut self, dist: Value) {
        *self = self.add(&ClusterMetric::of_point(dist));
    }

    pub fn count(&self) -> PointCount {
        self.count
    }

    pub fn sum_dist(&self) -> Value {
        self.sum_dist
    }

    pub fn sum_squared_dist(&self) -> Value {
        self.sum_squared_dist
    }

    pub fn max_dist(&self) -> Value {
        self.max_dist
    }

    /// The mean distance of the points to their center, i.e., the scatter of the cluster.
    pub fn mean_dist(&self) -> Value {
        if self.count == 0 {
            0.0
        } else {
            self.sum_dist / self.count as Value
        }
    }
}

/// Statistics per cluster id. Clusters without points have no entry.
pub type ClusterMetrics = HashMap<ClusterId, ClusterMetric>;

/// Merges two partial results by summing the statistics of equal cluster ids.
/// Commutative and associative (up to floating point summation order).
pub fn merge_cluster_metrics(mut left: ClusterMetrics, right: ClusterMetrics) -> ClusterMetrics {
    // fold the smaller map into the bigger one
    if left.len() < right.len() {
        return merge_cluster_metrics(right, left);
    }
    for (id, metric) in right {
        left.entry(id)
            .and_modify(|m| *m = m.add(&metric))
            .or_insert(metric);
    }
    left
}

/// The scatter of cluster id; 0.0 if the cluster received no points.
pub fn scatter_of(metrics: &ClusterMetrics, id: ClusterId) -> Value {
    metrics.get(&id).map_or(0.0, |m| m.mean_dist())
}
