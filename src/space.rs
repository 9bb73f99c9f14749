///////////////////////////////////////////////////////////////
///////////////////// module: space ///////////////////////////
///////////////////////////////////////////////////////////////

/// Module space contains the distance functions the evaluation is generic over.
///
/// All functionality is provided by the public trait DistanceFn:
/// - Distances are obtained by dist(a: &[Value], b: &[Value]) -> Value
/// - The metric properties on a finite sample can be checked by is_metric_on(points)
///
/// Built-in metrics are Euclidean, SquaredEuclidean and Cosine. Every closure of type
/// Fn(&[Value], &[Value]) -> Value + Sync is a DistanceFn as well, so custom metrics can be
/// injected without defining a type.
///
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::EvaluationError;
use crate::types::Value;

/// A distance between two vectors of equal length.
///
/// The result must be finite and non-negative. Equal length of both arguments is a
/// precondition of the caller; implementations only check it in debug builds.
pub trait DistanceFn: Sync {
    /// Returns the distance between a and b.
    fn dist(&self, a: &[Value], b: &[Value]) -> Value;

    /// Checks whether dist satisfies the metric properties on the given points, in which case
    /// true is returned. The first violation found is logged.
    /// Care: this needs O(n<sup>3</sup>) time.
    fn is_metric_on(&self, points: &[&[Value]]) -> bool {
        // check for symmetry, non-negativity and identity of indiscernibles
        for (i, x) in points.iter().enumerate() {
            for (j, y) in points.iter().enumerate() {
                let dist_xy = self.dist(x, y);
                let dist_yx = self.dist(y, x);
                if dist_xy != dist_yx {
                    warn!(i, j, dist_xy, dist_yx, "symmetry is violated");
                    return false;
                }
                if dist_xy < 0.0 || !dist_xy.is_finite() {
                    warn!(i, j, dist_xy, "non-negativity or finiteness is violated");
                    return false;
                }
                if i == j && dist_xy != 0.0 {
                    warn!(i, dist_xy, "identity of indiscernibles is violated");
                    return false;
                }
            }
        }

        // check for triangle inequality (with a little slack for rounding)
        for x in points.iter() {
            for y in points.iter() {
                let dist_xy = self.dist(x, y);
                for z in points.iter() {
                    let detour = self.dist(x, z) + self.dist(z, y);
                    if dist_xy > detour * (1.0 + 1e-12) + 1e-12 {
                        warn!(dist_xy, detour, "triangle inequality is violated");
                        return false;
                    }
                }
            }
        }
        true
    }
}

impl<F> DistanceFn for F
where
    F: Fn(&[Value], &[Value]) -> Value + Sync,
{
    fn dist(&self, a: &[Value], b: &[Value]) -> Value {
        self(a, b)
    }
}

//////////////////// Euclidean /////////////////////////

/// The euclidean norm of a - b.
///
/// # Example
///
/// ```rust
/// use kmeans_validity::{DistanceFn, Euclidean};
/// assert_eq!(Euclidean.dist(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl DistanceFn for Euclidean {
    fn dist(&self, a: &[Value], b: &[Value]) -> Value {
        SquaredEuclidean.dist(a, b).sqrt()
    }
}

/// The squared euclidean norm of a - b. Not a metric (violates the triangle inequality), but
/// cheaper and commonly used for k-means objectives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquaredEuclidean;

impl DistanceFn for SquaredEuclidean {
    fn dist(&self, a: &[Value], b: &[Value]) -> Value {
        debug_assert_eq!(a.len(), b.len(), "vectors of different length");
        a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}

//////////////////// Cosine /////////////////////////

/// 1 - cosine similarity; lies in [0, 2]. A zero vector has distance 1.0 to everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cosine;

impl DistanceFn for Cosine {
    fn dist(&self, a: &[Value], b: &[Value]) -> Value {
        debug_assert_eq!(a.len(), b.len(), "vectors of different length");
        let mut dot = 0.0;
        let mut na = 0.0;
        let mut nb = 0.0;
        for (x, y) in a.iter().zip(b.iter()) {
            dot += x * y;
            na += x * x;
            nb += y * y;
        }
        if na == 0.0 || nb == 0.0 {
            return 1.0;
        }
        // rounding can push the similarity slightly out of [-1, 1]
        let similarity = (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0);
        1.0 - similarity
    }
}

//////////////////// DistanceMetric /////////////////////////

/// Selects one of the built-in distance functions by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    SquaredEuclidean,
    Cosine,
}

impl DistanceFn for DistanceMetric {
    fn dist(&self, a: &[Value], b: &[Value]) -> Value {
        match self {
            DistanceMetric::Euclidean => Euclidean.dist(a, b),
            DistanceMetric::SquaredEuclidean => SquaredEuclidean.dist(a, b),
            DistanceMetric::Cosine => Cosine.dist(a, b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "squared_euclidean" | "sqeuclidean" => Ok(DistanceMetric::SquaredEuclidean),
            "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(EvaluationError::InvalidOptions(format!(
                "unknown distance metric '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DistanceMetric::Euclidean => write!(f, "euclidean"),
            DistanceMetric::SquaredEuclidean => write!(f, "squared_euclidean"),
            DistanceMetric::Cosine => write!(f, "cosine"),
        }
    }
}
