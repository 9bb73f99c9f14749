use std::collections::HashMap;

use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyValueError};
use pyo3::prelude::{pyclass, pyfunction, pymethods, pymodule, wrap_pyfunction, PyErr, PyModule, PyResult, Python};

use crate::clustering::{Centers, ClusterCenter, LabeledPoint};
use crate::error::EvaluationError;
use crate::evaluation::{EvaluationOptions, EvaluationReport, KMeansEvaluator};
use crate::metric::scatter_of;
use crate::space::DistanceMetric;
use crate::types::{ClusterId, PointCount, Value};

create_exception!(kmeans_validity, EvaluationFailedError, PyException);
create_exception!(kmeans_validity, InvalidClusterReferenceError, EvaluationFailedError);
create_exception!(kmeans_validity, DimensionMismatchError, EvaluationFailedError);
create_exception!(kmeans_validity, DegenerateClusterPairError, EvaluationFailedError);

const NOEVALUATION: &str = "No evaluation computed yet. Run evaluate(data, labels)";

impl From<EvaluationError> for PyErr {
    fn from(error: EvaluationError) -> PyErr {
        let msg = error.to_string();
        match error {
            EvaluationError::InvalidClusterReference { .. } => InvalidClusterReferenceError::new_err(msg),
            EvaluationError::DimensionMismatch { .. } => DimensionMismatchError::new_err(msg),
            EvaluationError::DegenerateClusterPair { .. } => DegenerateClusterPairError::new_err(msg),
            EvaluationError::InvalidOptions(_) => PyValueError::new_err(msg),
            _ => EvaluationFailedError::new_err(msg),
        }
    }
}

fn build_centers(centers: Vec<Vec<Value>>, ids: Option<Vec<ClusterId>>) -> PyResult<Centers> {
    match ids {
        None => Ok(Centers::from_vectors(centers)?),
        Some(ids) => {
            if ids.len() != centers.len() {
                return Err(PyValueError::new_err(format!(
                    "Got {} ids for {} centers.", ids.len(), centers.len())));
            }
            Ok(Centers::new(ids.into_iter().zip(centers).map(|(id, c)| ClusterCenter::new(id, c)).collect())?)
        }
    }
}

fn build_options(thread_count: usize, skip_degenerate: bool) -> EvaluationOptions {
    let mut options = EvaluationOptions::default();
    if thread_count > 0 {
        options = options.with_thread_count(thread_count);
    }
    if skip_degenerate {
        options = options.with_degenerate_pairs(crate::DegeneratePairPolicy::Skip);
    }
    options
}

// Runs the evaluation without holding the GIL.
fn run(py: Python, evaluator: &KMeansEvaluator<DistanceMetric>, data: Vec<Vec<Value>>, labels: Option<Vec<ClusterId>>) -> PyResult<EvaluationReport> {
    let report = match labels {
        None => py.allow_threads(|| evaluator.report(&data)),
        Some(labels) => {
            if labels.len() != data.len() {
                return Err(PyValueError::new_err(format!(
                    "Got {} labels for {} points.", labels.len(), data.len())));
            }
            let points: Vec<LabeledPoint> = labels.into_iter().zip(data).map(|(l, p)| LabeledPoint::new(l, p)).collect();
            py.allow_threads(|| evaluator.report(&points))
        }
    };
    Ok(report?)
}

#[pyclass]
pub(crate) struct DaviesBouldin {
    // parameters
    evaluator: KMeansEvaluator<DistanceMetric>,

    // attributes
    report: Option<EvaluationReport>,
}

impl DaviesBouldin {
    fn get_report(&self) -> PyResult<&EvaluationReport> {
        self.report.as_ref().ok_or_else(|| EvaluationFailedError::new_err(NOEVALUATION))
    }
}

#[pymethods]
impl DaviesBouldin {
    /// Input:
    /// * 2d-Array of cluster centers (one row per center).
    ///
    /// # Optional input as keyword-arguments:
    /// * ids = None (cluster id of each center; by default the row index)
    /// * metric = "euclidean" ("euclidean", "squared_euclidean" or "cosine")
    /// * thread_count = #cores (number of threads used to aggregate the points)
    /// * skip_degenerate = False (whether coinciding centers are ignored instead of raising
    /// DegenerateClusterPairError)
    #[new]
    #[args(centers, "*", ids = "None", metric = "\"euclidean\"", thread_count = "0", skip_degenerate = "false")]
    fn new(centers: Vec<Vec<Value>>, ids: Option<Vec<ClusterId>>, metric: &str, thread_count: usize, skip_degenerate: bool) -> PyResult<DaviesBouldin> {
        let distance: DistanceMetric = metric.parse()?;
        let evaluator = KMeansEvaluator::new(build_centers(centers, ids)?, distance)
            .with_options(build_options(thread_count, skip_degenerate));
        Ok(DaviesBouldin { evaluator, report: None })
    }

    /// Computes the Davies-Bouldin Index (lower is better) of the data.
    ///
    /// # Input:
    /// * 2d-Array. An array of datapoints of the same dimension as the centers.
    /// * labels = None. The cluster id of each datapoint; if omitted each point is assigned to
    /// its nearest center.
    #[args(data, labels = "None")]
    fn evaluate(&mut self, py: Python, data: Vec<Vec<Value>>, labels: Option<Vec<ClusterId>>) -> PyResult<Value> {
        let report = run(py, &self.evaluator, data, labels)?;
        let score = report.score;
        self.report = Some(report);
        Ok(score)
    }

    #[getter]
    fn get_metric(&self) -> String {
        self.evaluator.distance().to_string()
    }

    #[getter]
    fn get_number_of_centers(&self) -> PointCount {
        self.evaluator.centers().m()
    }

    /// Returns the last computed index.
    #[getter]
    fn get_score(&self) -> PyResult<Value> {
        Ok(self.get_report()?.score)
    }

    /// Returns the scatter (mean distance of the points to their center) of each cluster of
    /// the last evaluation. Clusters without points have scatter 0.0.
    #[getter]
    fn get_scatter(&self) -> PyResult<HashMap<ClusterId, Value>> {
        let report = self.get_report()?;
        Ok(self.evaluator.centers().iter().map(|c| (c.id, scatter_of(&report.cluster_metrics, c.id))).collect())
    }

    /// Returns the number of points of each cluster of the last evaluation.
    #[getter]
    fn get_cluster_sizes(&self) -> PyResult<HashMap<ClusterId, PointCount>> {
        let report = self.get_report()?;
        Ok(self.evaluator.centers().iter()
           .map(|c| (c.id, report.cluster_metrics.get(&c.id).map_or(0, |m| m.count()))).collect())
    }

    /// Return as float specifying the running time of the last evaluation in sec.
    #[getter]
    fn get_running_time(&self) -> PyResult<Value> {
        Ok(self.get_report()?.running_time)
    }
}

/// Computes the Davies-Bouldin Index of data against centers in one call.
/// Labels are optional; without them each point is assigned to its nearest center.
#[pyfunction(centers, data, "*", labels = "None", metric = "\"euclidean\"")]
pub(crate) fn davies_bouldin_score(py: Python, centers: Vec<Vec<Value>>, data: Vec<Vec<Value>>, labels: Option<Vec<ClusterId>>, metric: &str) -> PyResult<Value> {
    let distance: DistanceMetric = metric.parse()?;
    let evaluator = KMeansEvaluator::new(Centers::from_vectors(centers)?, distance);
    Ok(run(py, &evaluator, data, labels)?.score)
}

/// The python module kmeans_validity.
#[pymodule]
fn kmeans_validity(py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<DaviesBouldin>()?;
    m.add_function(wrap_pyfunction!(davies_bouldin_score, m)?)?;
    m.add("EvaluationError", py.get_type::<EvaluationFailedError>())?;
    m.add("InvalidClusterReferenceError", py.get_type::<InvalidClusterReferenceError>())?;
    m.add("DimensionMismatchError", py.get_type::<DimensionMismatchError>())?;
    m.add("DegenerateClusterPairError", py.get_type::<DegenerateClusterPairError>())?;
    Ok(())
}
