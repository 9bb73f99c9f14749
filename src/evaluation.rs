use std::ops::Deref;
use std::time::Instant;

use tracing::{debug, info};

use crate::aggregation::{fetch_cluster_metrics, fetch_cluster_metrics_sharded};
use crate::assertions::assert_options;
use crate::clustering::{Centers, EvalPoint};
use crate::davies_bouldin::{davies_bouldin_index, DegeneratePairPolicy};
use crate::error::Result;
use crate::metric::ClusterMetrics;
use crate::space::{DistanceFn, Euclidean};
use crate::types::{DurationInSec, PointCount, Value};

/// Number of points a slice is cut into per parallel task, unless configured otherwise.
pub const DEFAULT_SHARD_SIZE: PointCount = 4096;

/// Optional parameters of an evaluation.
///
/// * thread_count = #cores (number of threads folding shards in parallel)
/// * shard_size = 4096 (points per shard when a plain slice is evaluated; the result is
///   bitwise reproducible for a fixed shard_size)
/// * degenerate_pairs = Fail (see [DegeneratePairPolicy])
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOptions {
    pub thread_count: Option<usize>,
    pub shard_size: PointCount,
    pub degenerate_pairs: DegeneratePairPolicy,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        EvaluationOptions {
            thread_count: None,
            shard_size: DEFAULT_SHARD_SIZE,
            degenerate_pairs: DegeneratePairPolicy::Fail,
        }
    }
}

impl EvaluationOptions {
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = Some(thread_count);
        self
    }

    pub fn with_shard_size(mut self, shard_size: PointCount) -> Self {
        self.shard_size = shard_size;
        self
    }

    pub fn with_degenerate_pairs(mut self, policy: DegeneratePairPolicy) -> Self {
        self.degenerate_pairs = policy;
        self
    }

    /// The number of threads actually used.
    pub fn threads(&self) -> usize {
        self.thread_count.unwrap_or_else(num_cpus::get)
    }
}

/// A scoring function on top of the per-cluster statistics. All internal metrics of a k-means
/// clustering share the aggregation step and only differ here.
pub trait ClusterEvaluation: Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Scores the clustering given by centers and the statistics of their points.
    fn score<D: DistanceFn + ?Sized>(
        &self,
        centers: &Centers,
        metrics: &ClusterMetrics,
        distance: &D,
        options: &EvaluationOptions,
    ) -> Result<Value>;
}

/// The Davies-Bouldin Index (lower is better); see [crate::davies_bouldin].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaviesBouldinIndex;

impl ClusterEvaluation for DaviesBouldinIndex {
    fn name(&self) -> &'static str {
        "davies-bouldin"
    }

    fn score<D: DistanceFn + ?Sized>(
        &self,
        centers: &Centers,
        metrics: &ClusterMetrics,
        distance: &D,
        options: &EvaluationOptions,
    ) -> Result<Value> {
        davies_bouldin_index(centers, metrics, distance, options.degenerate_pairs)
    }
}

/// The outcome of an evaluation together with what it was computed from.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub score: Value,
    pub cluster_metrics: ClusterMetrics,
    pub point_count: PointCount,
    pub running_time: DurationInSec,
}

/// Evaluates point sets against a fixed set of cluster centers.
///
/// # Example
///
/// ```rust
/// use kmeans_validity::{Centers, Euclidean, KMeansEvaluator, LabeledPoint};
/// let centers = Centers::from_vectors(vec![vec![0.0, 0.0], vec![10.0, 0.0]]).unwrap();
/// let evaluator = KMeansEvaluator::new(centers, Euclidean);
/// let points = vec![
///     LabeledPoint::new(0, vec![1.0, 0.0]),
///     LabeledPoint::new(0, vec![0.0, 1.0]),
///     LabeledPoint::new(1, vec![11.0, 0.0]),
///     LabeledPoint::new(1, vec![10.0, 3.0]),
/// ];
/// let dbi = evaluator.evaluate(&points).unwrap();
/// assert!((dbi - 0.3).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct KMeansEvaluator<D: DistanceFn = Euclidean, E: ClusterEvaluation = DaviesBouldinIndex> {
    centers: Centers,
    distance: D,
    evaluation: E,
    options: EvaluationOptions,
}

impl<D: DistanceFn> KMeansEvaluator<D, DaviesBouldinIndex> {
    /// Creates an evaluator computing the Davies-Bouldin Index with default options.
    pub fn new(centers: Centers, distance: D) -> Self {
        KMeansEvaluator {
            centers,
            distance,
            evaluation: DaviesBouldinIndex,
            options: EvaluationOptions::default(),
        }
    }
}

impl<D: DistanceFn, E: ClusterEvaluation> KMeansEvaluator<D, E> {
    /// Replaces the scoring function.
    pub fn with_evaluation<F: ClusterEvaluation>(self, evaluation: F) -> KMeansEvaluator<D, F> {
        KMeansEvaluator {
            centers: self.centers,
            distance: self.distance,
            evaluation,
            options: self.options,
        }
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn centers(&self) -> &Centers {
        &self.centers
    }

    pub fn distance(&self) -> &D {
        &self.distance
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    /// Returns the score of the given points.
    pub fn evaluate<P: EvalPoint>(&self, points: &[P]) -> Result<Value> {
        Ok(self.report(points)?.score)
    }

    /// Returns the score of points that are already split into shards.
    pub fn evaluate_sharded<S, P>(&self, shards: &[S]) -> Result<Value>
    where
        S: Deref<Target = [P]> + Sync,
        P: EvalPoint,
    {
        Ok(self.report_sharded(shards)?.score)
    }

    /// Evaluates the given points and returns the score with its per-cluster statistics.
    pub fn report<P: EvalPoint>(&self, points: &[P]) -> Result<EvaluationReport> {
        let start = Instant::now();
        assert_options(&self.options)?;
        if self.centers.is_empty() {
            return Ok(self.empty_report(start));
        }
        let metrics = fetch_cluster_metrics(&self.centers, points, &self.distance, &self.options)?;
        self.finish(metrics, start)
    }

    /// As [KMeansEvaluator::report] for points that are already split into shards.
    pub fn report_sharded<S, P>(&self, shards: &[S]) -> Result<EvaluationReport>
    where
        S: Deref<Target = [P]> + Sync,
        P: EvalPoint,
    {
        let start = Instant::now();
        assert_options(&self.options)?;
        if self.centers.is_empty() {
            return Ok(self.empty_report(start));
        }
        let metrics =
            fetch_cluster_metrics_sharded(&self.centers, shards, &self.distance, &self.options)?;
        self.finish(metrics, start)
    }

    // without centers there is no pair to compare; points are not inspected
    fn empty_report(&self, start: Instant) -> EvaluationReport {
        debug!(evaluation = self.evaluation.name(), "no cluster centers, score is 0");
        EvaluationReport {
            score: 0.0,
            cluster_metrics: ClusterMetrics::new(),
            point_count: 0,
            running_time: start.elapsed().as_secs_f64(),
        }
    }

    fn finish(&self, metrics: ClusterMetrics, start: Instant) -> Result<EvaluationReport> {
        let score = self
            .evaluation
            .score(&self.centers, &metrics, &self.distance, &self.options)?;
        let point_count = metrics.values().map(|m| m.count()).sum();
        let running_time = start.elapsed().as_secs_f64();
        info!(
            evaluation = self.evaluation.name(),
            clusters = self.centers.m(),
            points = point_count,
            score,
            running_time,
            "evaluated clustering"
        );
        Ok(EvaluationReport {
            score,
            cluster_metrics: metrics,
            point_count,
            running_time,
        })
    }
}

/// Computes the Davies-Bouldin Index of the points against the given centers with default
/// options. Points are resolved to clusters by their label or, if unlabeled, by their nearest
/// center.
///
/// # Example
///
/// ```rust
/// use kmeans_validity::{evaluate, Centers, Euclidean};
/// let centers = Centers::from_vectors(vec![vec![0.0], vec![10.0]]).unwrap();
/// let points = vec![vec![1.0], vec![-1.0], vec![12.0], vec![8.0]];
/// // scatters 1 and 2, centers 10 apart
/// assert!((evaluate(&centers, &points, &Euclidean).unwrap() - 0.3).abs() < 1e-12);
/// ```
pub fn evaluate<P, D>(centers: &Centers, points: &[P], distance: &D) -> Result<Value>
where
    P: EvalPoint,
    D: DistanceFn + ?Sized,
{
    let options = EvaluationOptions::default();
    if centers.is_empty() {
        return Ok(0.0);
    }
    let metrics = fetch_cluster_metrics(centers, points, distance, &options)?;
    DaviesBouldinIndex.score(centers, &metrics, distance, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::{ClusterCenter, LabeledPoint};
    use crate::error::EvaluationError;
    use crate::metric::scatter_of;
    use crate::space::{Cosine, SquaredEuclidean};
    use crate::types::ClusterId;
    use rand::seq::SliceRandom;
    use rand::Rng;

    fn close(a: Value, b: Value) -> bool {
        (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
    }

    fn scenario() -> (Centers, Vec<LabeledPoint>) {
        let centers = Centers::from_vectors(vec![vec![0.0, 0.0], vec![10.0, 0.0]]).unwrap();
        let points = vec![
            LabeledPoint::new(0, vec![1.0, 0.0]),
            LabeledPoint::new(0, vec![0.0, 1.0]),
            LabeledPoint::new(1, vec![11.0, 0.0]),
            LabeledPoint::new(1, vec![10.0, -3.0]),
        ];
        (centers, points)
    }

    fn random_blobs(k: usize, n: usize, dim: usize) -> (Centers, Vec<LabeledPoint>) {
        let mut rng = rand::thread_rng();
        let centers: Vec<Vec<Value>> = (0..k)
            .map(|_| (0..dim).map(|_| rng.gen_range(-50.0..50.0)).collect())
            .collect();
        let points = (0..n)
            .map(|_| {
                let c = rng.gen_range(0..k);
                let position = centers[c]
                    .iter()
                    .map(|x| *x + rng.gen_range(-3.0..3.0))
                    .collect();
                LabeledPoint::new(c, position)
            })
            .collect();
        (Centers::from_vectors(centers).unwrap(), points)
    }

    #[test]
    fn scenario_test() {
        let (centers, points) = scenario();
        let evaluator = KMeansEvaluator::new(centers, Euclidean);
        let report = evaluator.report(&points).unwrap();
        assert!(close(report.score, 0.3));
        assert_eq!(report.point_count, 4);
        assert_eq!(scatter_of(&report.cluster_metrics, 0), 1.0);
        assert_eq!(scatter_of(&report.cluster_metrics, 1), 2.0);
        assert!(report.running_time >= 0.0);
    }

    #[test]
    fn free_function_matches_evaluator_test() {
        let (centers, points) = random_blobs(5, 2000, 3);
        let direct = evaluate(&centers, &points, &Euclidean).unwrap();
        let evaluator = KMeansEvaluator::new(centers, Euclidean);
        assert_eq!(direct, evaluator.evaluate(&points).unwrap());
        assert!(direct.is_finite() && direct >= 0.0);
    }

    #[test]
    fn repeatable_test() {
        let (centers, points) = random_blobs(8, 10_000, 5);
        let evaluator = KMeansEvaluator::new(centers, Euclidean)
            .with_options(EvaluationOptions::default().with_shard_size(333));
        let first = evaluator.evaluate(&points).unwrap();
        let second = evaluator.evaluate(&points).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn shuffled_and_sharded_test() {
        let (centers, mut points) = random_blobs(6, 4000, 2);
        let evaluator = KMeansEvaluator::new(centers, Euclidean);
        let reference = evaluator.evaluate(&points).unwrap();

        let mut rng = rand::thread_rng();
        points.shuffle(&mut rng);
        let shard_count = rng.gen_range(2..20);
        let shards: Vec<Vec<LabeledPoint>> = points
            .chunks((points.len() + shard_count - 1) / shard_count)
            .map(|c| c.to_vec())
            .collect();
        assert!(close(evaluator.evaluate_sharded(&shards).unwrap(), reference));
    }

    #[test]
    fn few_clusters_test() {
        let empty = KMeansEvaluator::new(Centers::new(vec![]).unwrap(), Euclidean);
        let points: Vec<Vec<Value>> = vec![vec![1.0, 2.0]];
        assert_eq!(empty.evaluate(&points).unwrap(), 0.0);
        assert_eq!(evaluate(empty.centers(), &points, &Euclidean).unwrap(), 0.0);

        let single =
            KMeansEvaluator::new(Centers::from_vectors(vec![vec![0.0, 0.0]]).unwrap(), Euclidean);
        assert_eq!(single.evaluate(&points).unwrap(), 0.0);
        // the single cluster still validates its points
        let stray = vec![LabeledPoint::new(3, vec![0.0, 0.0])];
        assert!(matches!(
            single.evaluate(&stray),
            Err(EvaluationError::InvalidClusterReference { id: 3 })
        ));
    }

    #[test]
    fn cluster_without_points_test() {
        let centers = Centers::new(vec![
            ClusterCenter::new(0, vec![0.0, 0.0]),
            ClusterCenter::new(1, vec![10.0, 0.0]),
            ClusterCenter::new(2, vec![0.0, 20.0]),
        ])
        .unwrap();
        let (_, points) = scenario();
        let report = KMeansEvaluator::new(centers, Euclidean).report(&points).unwrap();
        assert!(!report.cluster_metrics.contains_key(&2));
        // D(0) = max(3/10, 1/20), D(1) = max(3/10, 2/sqrt(500)), D(2) = max(1/20, 2/sqrt(500))
        let expected = (0.3 + 0.3 + 2.0 / Value::sqrt(500.0)) / 3.0;
        assert!(close(report.score, expected));
    }

    #[test]
    fn coinciding_centers_test() {
        let centers = Centers::from_vectors(vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let points = vec![
            LabeledPoint::new(0, vec![1.0, 2.0]),
            LabeledPoint::new(1, vec![1.0, 4.0]),
        ];
        let evaluator = KMeansEvaluator::new(centers, Euclidean);
        assert!(matches!(
            evaluator.evaluate(&points),
            Err(EvaluationError::DegenerateClusterPair { first: 0, second: 1 })
        ));

        let skipping = evaluator.with_options(
            EvaluationOptions::default().with_degenerate_pairs(DegeneratePairPolicy::Skip),
        );
        assert_eq!(skipping.evaluate(&points).unwrap(), 0.0);
    }

    #[test]
    fn better_clustering_scores_lower_test() {
        // the same two point clouds, once split correctly and once with swapped halves
        let centers = Centers::from_vectors(vec![vec![0.0], vec![100.0]]).unwrap();
        let mut good: Vec<(ClusterId, Vec<Value>)> = Vec::new();
        let mut bad: Vec<(ClusterId, Vec<Value>)> = Vec::new();
        for x in [-2.0, -1.0, 1.0, 2.0] {
            good.push((0, vec![x]));
            good.push((1, vec![100.0 + x]));
            bad.push(((x > 0.0) as ClusterId, vec![x]));
            bad.push(((x < 0.0) as ClusterId, vec![100.0 + x]));
        }
        let evaluator = KMeansEvaluator::new(centers, Euclidean);
        assert!(evaluator.evaluate(&good).unwrap() < evaluator.evaluate(&bad).unwrap());
    }

    #[test]
    fn other_distances_test() {
        let (centers, points) = random_blobs(4, 500, 3);
        for dbi in [
            evaluate(&centers, &points, &SquaredEuclidean).unwrap(),
            evaluate(&centers, &points, &Cosine).unwrap(),
            evaluate(&centers, &points, &|a: &[Value], b: &[Value]| -> Value {
                a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0, Value::max)
            })
            .unwrap(),
        ] {
            assert!(dbi.is_finite() && dbi >= 0.0);
        }
    }

    struct MaxScatter;

    impl ClusterEvaluation for MaxScatter {
        fn name(&self) -> &'static str {
            "max-scatter"
        }

        fn score<D: DistanceFn + ?Sized>(
            &self,
            _centers: &Centers,
            metrics: &ClusterMetrics,
            _distance: &D,
            _options: &EvaluationOptions,
        ) -> Result<Value> {
            Ok(metrics.values().map(|m| m.mean_dist()).fold(0.0, Value::max))
        }
    }

    #[test]
    fn custom_evaluation_test() {
        let (centers, points) = scenario();
        let evaluator = KMeansEvaluator::new(centers, Euclidean).with_evaluation(MaxScatter);
        assert_eq!(evaluator.evaluate(&points).unwrap(), 2.0);
    }

    #[test]
    fn invalid_options_test() {
        let (centers, points) = scenario();
        let evaluator = KMeansEvaluator::new(centers, Euclidean)
            .with_options(EvaluationOptions::default().with_thread_count(0));
        assert!(matches!(
            evaluator.evaluate(&points),
            Err(EvaluationError::InvalidOptions(_))
        ));
    }
}
