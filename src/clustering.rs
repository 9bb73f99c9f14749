//////////////////////////////////////////////////////////////
//////////////////// module: clustering //////////////////////
//////////////////////////////////////////////////////////////

/// Contains the read-only input of an evaluation:
///
/// centers: the cluster centers of a k-means model, each with its cluster id
/// points: anything implementing [EvalPoint], either already labeled with a cluster id or
/// resolved to its nearest center
///
use std::collections::HashMap;

use crate::assertions::assert_centers;
use crate::error::{EvaluationError, Result};
use crate::space::DistanceFn;
use crate::types::{ClusterId, Dimension, PointCount, Value};

/// The center of one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterCenter {
    pub id: ClusterId,
    pub center: Vec<Value>,
}

impl ClusterCenter {
    pub fn new(id: ClusterId, center: Vec<Value>) -> ClusterCenter {
        ClusterCenter { id, center }
    }
}

/// The immutable set of cluster centers of one evaluation run.
/// Ids are unique and all centers share the same dimension.
/// Iteration follows the order in which the centers were given.
#[derive(Debug, Clone)]
pub struct Centers {
    centers: Vec<ClusterCenter>,
    position_of: HashMap<ClusterId, usize>,
    dim: Dimension,
}

impl Centers {
    /// Creates a new set of centers.
    ///
    /// # Errors
    ///
    /// * [EvaluationError::DuplicateClusterId] if two centers share an id;
    /// * [EvaluationError::DimensionMismatch] if the centers differ in dimension;
    /// * [EvaluationError::NonFiniteCoordinate] if a coordinate is NaN or infinite.
    pub fn new(centers: Vec<ClusterCenter>) -> Result<Centers> {
        let dim = assert_centers(&centers)?;
        let position_of = centers
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.id, pos))
            .collect();
        Ok(Centers {
            centers,
            position_of,
            dim,
        })
    }

    /// Creates a new set of centers where the i-th vector gets cluster id i.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kmeans_validity::{Centers, Euclidean};
    /// let centers = Centers::from_vectors(vec![vec![0.0, 0.0], vec![10.0, 0.0]]).unwrap();
    /// assert_eq!(centers.m(), 2);
    /// assert_eq!(centers.dim(), 2);
    /// let (id, d) = centers.nearest(&[9.0, 0.0], &Euclidean).unwrap();
    /// assert_eq!((id, d), (1, 1.0));
    /// ```
    pub fn from_vectors(vectors: Vec<Vec<Value>>) -> Result<Centers> {
        Centers::new(
            vectors
                .into_iter()
                .enumerate()
                .map(|(id, center)| ClusterCenter { id, center })
                .collect(),
        )
    }

    /// Returns the number of centers m.
    pub fn m(&self) -> PointCount {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Returns the dimension shared by all centers (0 if there are none).
    pub fn dim(&self) -> Dimension {
        self.dim
    }

    /// Returns the center with the given id.
    pub fn get(&self, id: ClusterId) -> Option<&ClusterCenter> {
        self.position_of.get(&id).map(|&pos| &self.centers[pos])
    }

    pub fn contains(&self, id: ClusterId) -> bool {
        self.position_of.contains_key(&id)
    }

    /// Provides an iterator of the centers in construction order.
    pub fn iter(&self) -> std::slice::Iter<ClusterCenter> {
        self.centers.iter()
    }

    /// Returns the id of the center closest to point together with that distance.
    /// Ties are resolved in favour of the center that comes first.
    ///
    /// # Errors
    ///
    /// * [EvaluationError::UnassignablePoint] if there are no centers;
    /// * [EvaluationError::InvalidDistance] if a distance is NaN, infinite or negative.
    pub fn nearest<D: DistanceFn + ?Sized>(
        &self,
        point: &[Value],
        distance: &D,
    ) -> Result<(ClusterId, Value)> {
        let mut current: Option<(ClusterId, Value)> = None;
        for c in self.centers.iter() {
            let d = checked_dist(distance, &c.center, point)?;
            match current {
                Some((_, best)) if d >= best => {}
                _ => current = Some((c.id, d)),
            }
        }
        current.ok_or(EvaluationError::UnassignablePoint)
    }

    /// Resolves the cluster of a point and returns it together with the distance of the point
    /// to that cluster's center. Labeled points must refer to an existing center; unlabeled
    /// points go to their nearest center.
    ///
    /// # Errors
    ///
    /// * [EvaluationError::DimensionMismatch] if the point has the wrong dimension;
    /// * [EvaluationError::InvalidClusterReference] if the label has no center;
    /// * see [Centers::nearest] for unlabeled points.
    pub fn resolve<P, D>(&self, point: &P, distance: &D) -> Result<(ClusterId, Value)>
    where
        P: EvalPoint + ?Sized,
        D: DistanceFn + ?Sized,
    {
        let position = point.position();
        if !self.is_empty() && position.len() != self.dim {
            return Err(EvaluationError::DimensionMismatch {
                expected: self.dim,
                found: position.len(),
            });
        }
        match point.label() {
            Some(id) => {
                let center = self
                    .get(id)
                    .ok_or(EvaluationError::InvalidClusterReference { id })?;
                Ok((id, checked_dist(distance, &center.center, position)?))
            }
            None => self.nearest(position, distance),
        }
    }
}

/// Evaluates distance and rejects values that would poison the aggregation.
pub(crate) fn checked_dist<D: DistanceFn + ?Sized>(
    distance: &D,
    a: &[Value],
    b: &[Value],
) -> Result<Value> {
    let d = distance.dist(a, b);
    if d.is_finite() && d >= 0.0 {
        Ok(d)
    } else {
        Err(EvaluationError::InvalidDistance { value: d })
    }
}

/// A point to be evaluated. Points either carry the id of the cluster they were assigned to
/// by the model or leave the assignment to nearest-center resolution.
pub trait EvalPoint: Sync {
    /// The coordinates of the point.
    fn position(&self) -> &[Value];

    /// The cluster the point is assigned to, if known.
    fn label(&self) -> Option<ClusterId> {
        None
    }
}

impl EvalPoint for Vec<Value> {
    fn position(&self) -> &[Value] {
        self
    }
}

impl EvalPoint for [Value] {
    fn position(&self) -> &[Value] {
        self
    }
}

impl<P: EvalPoint + ?Sized> EvalPoint for &P {
    fn position(&self) -> &[Value] {
        (**self).position()
    }

    fn label(&self) -> Option<ClusterId> {
        (**self).label()
    }
}

impl EvalPoint for (ClusterId, Vec<Value>) {
    fn position(&self) -> &[Value] {
        &self.1
    }

    fn label(&self) -> Option<ClusterId> {
        Some(self.0)
    }
}

/// A point together with the cluster it was assigned to.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPoint {
    pub cluster: ClusterId,
    pub position: Vec<Value>,
}

impl LabeledPoint {
    pub fn new(cluster: ClusterId, position: Vec<Value>) -> LabeledPoint {
        LabeledPoint { cluster, position }
    }
}

impl EvalPoint for LabeledPoint {
    fn position(&self) -> &[Value] {
        &self.position
    }

    fn label(&self) -> Option<ClusterId> {
        Some(self.cluster)
    }
}
