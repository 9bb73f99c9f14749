//////////////////////////////////////////////////////////////
///////////////// module: davies_bouldin ////////////////////
//////////////////////////////////////////////////////////////

//! The Davies-Bouldin Index of a clustering (lower is better).
//!
//! For clusters i, j with scatters S(i), S(j) (mean distance of their points to their center)
//! the separation ratio is R(i,j) = (S(i) + S(j)) / dist(center_i, center_j).
//! Each cluster i is charged with its worst ratio D(i) = max_{j != i} R(i,j), and the index is
//! the mean of D(i) over all clusters.
//!
//! Conventions:
//! * a cluster without points has scatter 0.0;
//! * with fewer than two clusters D(i) = 0.0, with no clusters the index is 0.0;
//! * two distinct clusters whose centers coincide are handled by [DegeneratePairPolicy].

use tracing::{trace, warn};

use crate::clustering::{checked_dist, Centers};
use crate::error::{EvaluationError, Result};
use crate::metric::{scatter_of, ClusterMetrics};
use crate::space::DistanceFn;
use crate::types::{ClusterId, Value};

/// Treatment of two distinct clusters whose centers are at distance 0, for which the
/// separation ratio is undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DegeneratePairPolicy {
    /// Abort with [EvaluationError::DegenerateClusterPair].
    #[default]
    Fail,
    /// Leave the pair out of the maximisation of both clusters. A cluster all of whose pairs
    /// are left out gets D(i) = 0.0.
    Skip,
}

/// The worst separation ratio D(i) of one cluster and the partner attaining it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorstPartner {
    pub cluster: ClusterId,
    /// None if the cluster has no (non-skipped) partner.
    pub partner: Option<ClusterId>,
    pub ratio: Value,
}

/// Computes D(i) for every cluster i, in the order of the centers.
///
/// The maximisation runs over all ordered pairs: the partner that maximises the ratio for i
/// is in general not the one that maximises it for j. On ties the partner that comes first
/// is reported.
///
/// # Errors
/// * [EvaluationError::InvalidClusterReference] if metrics contain an id without center;
/// * [EvaluationError::DegenerateClusterPair] for coinciding centers under
///   [DegeneratePairPolicy::Fail];
/// * [EvaluationError::InvalidDistance] if the distance function misbehaves.
pub fn worst_partners<D: DistanceFn + ?Sized>(
    centers: &Centers,
    metrics: &ClusterMetrics,
    distance: &D,
    policy: DegeneratePairPolicy,
) -> Result<Vec<WorstPartner>> {
    if let Some(&id) = metrics.keys().filter(|&&id| !centers.contains(id)).min() {
        return Err(EvaluationError::InvalidClusterReference { id });
    }

    let scatter: Vec<Value> = centers.iter().map(|c| scatter_of(metrics, c.id)).collect();

    let mut partners: Vec<WorstPartner> = Vec::with_capacity(centers.m());
    for (i, c_i) in centers.iter().enumerate() {
        let mut worst = WorstPartner {
            cluster: c_i.id,
            partner: None,
            ratio: 0.0,
        };
        for (j, c_j) in centers.iter().enumerate() {
            if i == j {
                continue;
            }
            let d = checked_dist(distance, &c_i.center, &c_j.center)?;
            let ratio = (scatter[i] + scatter[j]) / d;
            if d == 0.0 || !ratio.is_finite() {
                match policy {
                    DegeneratePairPolicy::Fail => {
                        return Err(EvaluationError::DegenerateClusterPair {
                            first: c_i.id,
                            second: c_j.id,
                        })
                    }
                    DegeneratePairPolicy::Skip => {
                        warn!(first = c_i.id, second = c_j.id, d, "skipping degenerate cluster pair");
                        continue;
                    }
                }
            }
            trace!(first = c_i.id, second = c_j.id, ratio);
            if worst.partner.is_none() || ratio > worst.ratio {
                worst.partner = Some(c_j.id);
                worst.ratio = ratio;
            }
        }
        partners.push(worst);
    }
    Ok(partners)
}

/// Returns the Davies-Bouldin Index, i.e., the mean of D(i) over all clusters of centers.
///
/// # Example
///
/// ```rust
/// use kmeans_validity::{davies_bouldin_index, Centers, ClusterMetric, ClusterMetrics,
///                       DegeneratePairPolicy, Euclidean};
/// let centers = Centers::from_vectors(vec![vec![0.0, 0.0], vec![10.0, 0.0]]).unwrap();
/// let mut metrics = ClusterMetrics::new();
/// metrics.insert(0, ClusterMetric::of_point(1.0));
/// metrics.insert(1, ClusterMetric::of_point(2.0));
/// let dbi = davies_bouldin_index(&centers, &metrics, &Euclidean, DegeneratePairPolicy::Fail).unwrap();
/// assert!((dbi - 0.3).abs() < 1e-12);
/// ```
pub fn davies_bouldin_index<D: DistanceFn + ?Sized>(
    centers: &Centers,
    metrics: &ClusterMetrics,
    distance: &D,
    policy: DegeneratePairPolicy,
) -> Result<Value> {
    let partners = worst_partners(centers, metrics, distance, policy)?;
    Ok(mean_ratio(&partners))
}

/// The mean of the worst ratios; 0.0 without clusters.
pub(crate) fn mean_ratio(partners: &[WorstPartner]) -> Value {
    if partners.is_empty() {
        return 0.0;
    }
    partners.iter().map(|p| p.ratio).sum::<Value>() / partners.len() as Value
}
