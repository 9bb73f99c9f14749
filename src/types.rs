/// Identifier of a cluster (as handed out by the clustering model).
pub type ClusterId = usize;
/// Type of coordinates, distances, scatters and scores.
pub type Value = f64;
/// Type of the number of points (or clusters).
pub type PointCount = usize;
/// Length of a vector.
pub type Dimension = usize;
/// Wall-clock time of an evaluation.
pub type DurationInSec = f64;
