use thiserror::Error;

use crate::types::{ClusterId, Dimension, Value};

/// Everything that can abort an evaluation. There is no partial result: the index is only
/// meaningful over a complete, consistent view of all clusters.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("cluster id {id} has no corresponding center")]
    InvalidClusterReference { id: ClusterId },

    #[error("dimension mismatch: expected vectors of length {expected}, found {found}")]
    DimensionMismatch { expected: Dimension, found: Dimension },

    #[error("centers of clusters {first} and {second} coincide (distance 0)")]
    DegenerateClusterPair { first: ClusterId, second: ClusterId },

    #[error("cluster id {id} is used by more than one center")]
    DuplicateClusterId { id: ClusterId },

    #[error("center of cluster {id} has a non-finite coordinate")]
    NonFiniteCoordinate { id: ClusterId },

    #[error("distance function returned {value}; distances must be finite and non-negative")]
    InvalidDistance { value: Value },

    #[error("point cannot be assigned: there are no cluster centers")]
    UnassignablePoint,

    #[error("invalid evaluation options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, EvaluationError>;
