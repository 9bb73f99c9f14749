//! Internal cluster-validity metrics for k-means clusterings of large point sets.
//!
//! An evaluation has two phases:
//! 1. the points are folded shard by shard (in parallel) into per-cluster distance statistics,
//!    which are merged additively ([fetch_cluster_metrics]);
//! 2. the small per-cluster table is scored on a single thread, here by the Davies-Bouldin
//!    Index ([davies_bouldin_index]).
//!
//! [KMeansEvaluator] bundles both phases; [evaluate] is the one-call shortcut.

pub mod types;
pub use types::{ClusterId, Dimension, DurationInSec, PointCount, Value};

mod error;
pub use error::{EvaluationError, Result};

pub mod space;
pub use space::{Cosine, DistanceFn, DistanceMetric, Euclidean, SquaredEuclidean};

mod clustering;
pub use clustering::{Centers, ClusterCenter, EvalPoint, LabeledPoint};

mod assertions;

mod metric;
pub use metric::{merge_cluster_metrics, scatter_of, ClusterMetric, ClusterMetrics};

mod aggregation;
pub use aggregation::{aggregate_shard, fetch_cluster_metrics, fetch_cluster_metrics_sharded};

pub mod davies_bouldin;
pub use davies_bouldin::{davies_bouldin_index, worst_partners, DegeneratePairPolicy, WorstPartner};

mod evaluation;
pub use evaluation::{
    evaluate, ClusterEvaluation, DaviesBouldinIndex, EvaluationOptions, EvaluationReport,
    KMeansEvaluator, DEFAULT_SHARD_SIZE,
};

#[cfg(feature = "python")]
mod python_interface;
