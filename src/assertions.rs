use std::collections::HashSet;

use crate::clustering::ClusterCenter;
use crate::error::{EvaluationError, Result};
use crate::evaluation::EvaluationOptions;
use crate::types::Dimension;

/// Asserts a set of cluster centers and returns their common dimension (0 for no centers).
///
/// # Errors
/// Fails if one of the following does not hold:
/// * each cluster id is used by exactly one center.
/// * all centers have the dimension of the first center.
/// * all coordinates are finite.
pub(crate) fn assert_centers(centers: &[ClusterCenter]) -> Result<Dimension> {
    let dim = match centers.first() {
        Some(c) => c.center.len(),
        None => return Ok(0),
    };

    let mut seen = HashSet::with_capacity(centers.len());
    for c in centers {
        if !seen.insert(c.id) {
            return Err(EvaluationError::DuplicateClusterId { id: c.id });
        }
        if c.center.len() != dim {
            return Err(EvaluationError::DimensionMismatch {
                expected: dim,
                found: c.center.len(),
            });
        }
        if c.center.iter().any(|x| !x.is_finite()) {
            return Err(EvaluationError::NonFiniteCoordinate { id: c.id });
        }
    }
    Ok(dim)
}

/// Asserts the evaluation options.
///
/// # Errors
/// Fails with [EvaluationError::InvalidOptions] if
/// * thread_count is Some(0).
/// * shard_size is 0.
pub(crate) fn assert_options(options: &EvaluationOptions) -> Result<()> {
    if options.thread_count == Some(0) {
        return Err(EvaluationError::InvalidOptions(
            "thread_count must be at least 1".to_string(),
        ));
    }
    if options.shard_size == 0 {
        return Err(EvaluationError::InvalidOptions(
            "shard_size must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_test() {
        assert!(assert_options(&EvaluationOptions::default()).is_ok());
        assert!(assert_options(&EvaluationOptions::default().with_thread_count(3)).is_ok());
        assert!(matches!(
            assert_options(&EvaluationOptions::default().with_thread_count(0)),
            Err(EvaluationError::InvalidOptions(_))
        ));
        assert!(matches!(
            assert_options(&EvaluationOptions::default().with_shard_size(0)),
            Err(EvaluationError::InvalidOptions(_))
        ));
    }

    #[test]
    fn centers_dimension_test() {
        assert_eq!(assert_centers(&[]).unwrap(), 0);
        let centers = vec![
            ClusterCenter::new(0, vec![1.0, 2.0, 3.0]),
            ClusterCenter::new(4, vec![0.0, 0.0, 0.0]),
        ];
        assert_eq!(assert_centers(&centers).unwrap(), 3);
    }
}
