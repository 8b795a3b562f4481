use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array2, Axis};

use crate::data::model::SampleTable;
use crate::error::DimensionalityError;

// ---------------------------------------------------------------------------
// PCA engine: center/scale, eigendecomposition, projection
// ---------------------------------------------------------------------------

/// A sample standard deviation below this counts as zero variance. Constant
/// decimal columns can leave sub-ulp residuals after centering, so an exact
/// comparison against 0.0 is not enough.
const ZERO_VARIANCE_EPS: f64 = 1e-12;

/// Preprocessing applied to the feature matrix before decomposition.
#[derive(Debug, Clone, Copy)]
pub struct PcaOptions {
    /// Subtract each feature's column mean.
    pub center: bool,
    /// Divide each feature by its sample standard deviation (n - 1
    /// denominator) so every feature contributes unit variance.
    pub scale: bool,
}

impl Default for PcaOptions {
    fn default() -> Self {
        PcaOptions {
            center: true,
            scale: true,
        }
    }
}

/// Principal-component scores and the decomposition that produced them.
#[derive(Debug, Clone)]
pub struct PcaResult {
    /// Per-sample component scores, `n_samples × k`, one row per input row,
    /// columns in descending explained variance.
    pub scores: Array2<f64>,
    /// Component loadings, `n_features × k`.
    pub components: Array2<f64>,
    /// Sample variance captured by each retained component.
    pub explained_variance: Vec<f64>,
    /// Fraction of total variance captured by each retained component.
    pub explained_variance_ratio: Vec<f64>,
}

impl PcaResult {
    /// Number of retained components.
    pub fn n_components(&self) -> usize {
        self.scores.ncols()
    }
}

/// Compute a PCA over the table's feature matrix (the group column plays no
/// part here).
///
/// The preprocessed matrix is decomposed through its sample covariance with
/// [`SymmetricEigen`]; eigenpairs are reordered by descending eigenvalue and
/// each sample is projected onto the retained directions. Retains
/// `min(n_components, n_features)` components. Pure function of its inputs.
pub fn compute_pca(
    table: &SampleTable,
    options: PcaOptions,
    n_components: usize,
) -> Result<PcaResult, DimensionalityError> {
    let n = table.len();
    let p = table.n_features();
    if n < 2 {
        return Err(DimensionalityError::TooFewSamples(n));
    }
    if p < 2 {
        return Err(DimensionalityError::TooFewFeatures(p));
    }

    let mut work = table.values.clone();
    if options.center {
        let mean = work.mean_axis(Axis(0)).expect("at least one row");
        work -= &mean;
    }
    if options.scale {
        let std = work.std_axis(Axis(0), 1.0);
        for (j, &s) in std.iter().enumerate() {
            if s < ZERO_VARIANCE_EPS {
                return Err(DimensionalityError::ZeroVariance(
                    table.feature_names[j].clone(),
                ));
            }
        }
        work /= &std;
    }

    // Sample covariance (p × p). Symmetric, so the fill order of the
    // column-major DMatrix does not matter.
    let cov = work.t().dot(&work) / (n as f64 - 1.0);
    let cov_mat = DMatrix::from_iterator(p, p, cov.iter().cloned());
    let eig = SymmetricEigen::new(cov_mat);

    // nalgebra does not guarantee eigenvalue order.
    let mut order: Vec<usize> = (0..p).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let k = n_components.min(p);
    let total_variance: f64 = eig.eigenvalues.iter().map(|&l| l.max(0.0)).sum();

    let mut components = Array2::<f64>::zeros((p, k));
    let mut explained_variance = Vec::with_capacity(k);
    for (out_idx, &src_idx) in order.iter().take(k).enumerate() {
        explained_variance.push(eig.eigenvalues[src_idx].max(0.0));

        // Fix each component's sign so its largest-magnitude loading is
        // positive.
        let column = eig.eigenvectors.column(src_idx);
        let mut sign = 1.0;
        let mut max_abs = 0.0;
        for &v in column.iter() {
            if v.abs() > max_abs {
                max_abs = v.abs();
                sign = if v < 0.0 { -1.0 } else { 1.0 };
            }
        }
        for (j, &v) in column.iter().enumerate() {
            components[[j, out_idx]] = sign * v;
        }
    }

    let explained_variance_ratio = explained_variance
        .iter()
        .map(|&l| if total_variance > 0.0 { l / total_variance } else { 0.0 })
        .collect();

    let scores = work.dot(&components);

    Ok(PcaResult {
        scores,
        components,
        explained_variance,
        explained_variance_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: Vec<(&str, Vec<f64>)>) -> SampleTable {
        let n_features = rows[0].1.len();
        let feature_names = (0..n_features).map(|i| format!("m{i}")).collect();
        SampleTable::from_rows(
            "group",
            feature_names,
            rows.into_iter().map(|(g, v)| (g.to_string(), v)).collect(),
        )
        .unwrap()
    }

    /// 6 samples, 3 groups of 2, 4 features.
    fn six_sample_table() -> SampleTable {
        table(vec![
            ("control", vec![1.0, 10.0, 5.0, 0.2]),
            ("control", vec![1.2, 11.0, 5.5, 0.1]),
            ("treated", vec![3.0, 14.0, 4.0, 0.9]),
            ("treated", vec![3.3, 13.5, 4.2, 1.1]),
            ("qc", vec![2.0, 12.0, 4.8, 0.5]),
            ("qc", vec![2.1, 12.2, 4.9, 0.6]),
        ])
    }

    #[test]
    fn scores_have_one_row_per_sample() {
        let t = six_sample_table();
        let pca = compute_pca(&t, PcaOptions::default(), 3).unwrap();
        assert_eq!(pca.scores.nrows(), 6);
        assert_eq!(pca.scores.ncols(), 3);
        assert!(pca.n_components() >= 2);
        assert_eq!(pca.components.nrows(), 4);
        assert_eq!(pca.components.ncols(), 3);
    }

    #[test]
    fn explained_variance_is_nonnegative_and_sorted() {
        let t = six_sample_table();
        let pca = compute_pca(&t, PcaOptions::default(), 4).unwrap();
        for pair in pca.explained_variance.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        assert!(pca.explained_variance.iter().all(|&l| l >= 0.0));
        let ratio_sum: f64 = pca.explained_variance_ratio.iter().sum();
        assert!(ratio_sum <= 1.0 + 1e-9);
    }

    #[test]
    fn score_variance_matches_eigenvalue() {
        let t = six_sample_table();
        let pca = compute_pca(&t, PcaOptions::default(), 2).unwrap();
        for j in 0..pca.n_components() {
            let col = pca.scores.column(j);
            let mean = col.mean().unwrap();
            let var: f64 =
                col.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (col.len() as f64 - 1.0);
            assert!((var - pca.explained_variance[j]).abs() < 1e-9);
        }
    }

    #[test]
    fn centered_scores_have_zero_mean() {
        let t = six_sample_table();
        let pca = compute_pca(&t, PcaOptions::default(), 3).unwrap();
        for j in 0..pca.n_components() {
            let mean = pca.scores.column(j).mean().unwrap();
            assert!(mean.abs() < 1e-10);
        }
    }

    #[test]
    fn two_samples_two_features_is_enough() {
        let t = table(vec![("a", vec![1.0, 2.0]), ("b", vec![3.0, 5.0])]);
        let pca = compute_pca(&t, PcaOptions::default(), 2).unwrap();
        assert_eq!(pca.scores.nrows(), 2);
        assert_eq!(pca.scores.ncols(), 2);
    }

    #[test]
    fn one_sample_is_too_few() {
        let t = table(vec![("a", vec![1.0, 2.0])]);
        let err = compute_pca(&t, PcaOptions::default(), 2).unwrap_err();
        assert!(matches!(err, DimensionalityError::TooFewSamples(1)));
    }

    #[test]
    fn one_feature_is_too_few() {
        let t = table(vec![("a", vec![1.0]), ("b", vec![2.0]), ("c", vec![3.0])]);
        let err = compute_pca(&t, PcaOptions::default(), 2).unwrap_err();
        assert!(matches!(err, DimensionalityError::TooFewFeatures(1)));
    }

    #[test]
    fn constant_feature_fails_under_scaling() {
        let t = table(vec![
            ("a", vec![1.0, 5.0]),
            ("b", vec![2.0, 5.0]),
            ("c", vec![3.0, 5.0]),
        ]);
        let err = compute_pca(&t, PcaOptions::default(), 2).unwrap_err();
        assert!(matches!(err, DimensionalityError::ZeroVariance(f) if f == "m1"));
    }

    #[test]
    fn constant_feature_is_fine_without_scaling() {
        let t = table(vec![
            ("a", vec![1.0, 5.0]),
            ("b", vec![2.0, 5.0]),
            ("c", vec![3.0, 5.0]),
        ]);
        let opts = PcaOptions {
            center: true,
            scale: false,
        };
        assert!(compute_pca(&t, opts, 2).is_ok());
    }

    #[test]
    fn scaling_makes_scores_invariant_to_feature_units() {
        let base = six_sample_table();
        let mut rescaled = base.clone();
        // Power-of-two factor, so the rescaled column standardises to the
        // bit-identical matrix.
        for v in rescaled.values.column_mut(1) {
            *v *= 4.0;
        }

        let a = compute_pca(&base, PcaOptions::default(), 3).unwrap();
        let b = compute_pca(&rescaled, PcaOptions::default(), 3).unwrap();
        for (x, y) in a.scores.iter().zip(b.scores.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn identical_runs_are_identical() {
        let t = six_sample_table();
        let a = compute_pca(&t, PcaOptions::default(), 3).unwrap();
        let b = compute_pca(&t, PcaOptions::default(), 3).unwrap();
        assert_eq!(a.scores, b.scores);
        assert_eq!(a.explained_variance, b.explained_variance);
    }
}
