//! # NIPALS component extraction
//!
//! Power iteration on a residual matrix `E` (observations × variables). Each
//! extraction alternates
//!
//! ```text
//! p = Eᵗ·t / ‖Eᵗ·t‖
//! t = E·p
//! ```
//!
//! until the score vector `t` settles, records `tᵗt` as the eigenvalue and
//! deflates `E ← E − t·pᵗ`. Every deflation removes `p` from the row space of
//! the residual, so loadings come out mutually orthogonal and at most
//! `min(n_rows, n_cols)` non-trivial components exist.

use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView, ArrayView1, ArrayView2, Axis, Dimension, Zip};
use rayon::prelude::*;

use crate::dimred::pca::config::{ConvergenceCriterion, InitStrategy, NipalsConfig};
use crate::dense::ensure_finite;
use crate::dimred::pca::result::Component;
use crate::error::{NipalsError, Result};

/// Extracts components one at a time from a shrinking residual.
pub struct ComponentExtractor<'a> {
    config: &'a NipalsConfig,
    residual: Array2<f64>,
    total_ss: f64,
    loadings: Vec<Array1<f64>>,
}

impl<'a> ComponentExtractor<'a> {
    /// Takes ownership of the preprocessed matrix as the initial residual.
    pub fn new(residual: Array2<f64>, config: &'a NipalsConfig) -> Result<Self> {
        let (n_rows, n_cols) = residual.dim();
        if n_rows == 0 || n_cols == 0 {
            return Err(NipalsError::dimensions(format!(
                "cannot decompose a {}x{} matrix",
                n_rows, n_cols
            )));
        }

        ensure_finite(&residual)?;

        let total_ss = sum_of_squares(residual.view());

        Ok(Self {
            config,
            residual,
            total_ss,
            loadings: Vec::new(),
        })
    }

    /// Upper bound on the number of components: min(n_rows, n_cols).
    pub fn max_components(&self) -> usize {
        let (n_rows, n_cols) = self.residual.dim();
        n_rows.min(n_cols)
    }

    /// Number of components extracted so far.
    pub fn extracted(&self) -> usize {
        self.loadings.len()
    }

    /// Sum of squares of the matrix the extractor started from.
    pub fn total_ss(&self) -> f64 {
        self.total_ss
    }

    pub fn residual(&self) -> ArrayView2<'_, f64> {
        self.residual.view()
    }

    pub fn into_residual(self) -> Array2<f64> {
        self.residual
    }

    /// Extracts the next component and deflates the residual.
    pub fn extract(&mut self) -> Result<Component> {
        let index = self.extracted();
        if index >= self.max_components() {
            return Err(NipalsError::dimensions(format!(
                "a {}x{} matrix has at most {} components",
                self.residual.nrows(),
                self.residual.ncols(),
                self.max_components()
            )));
        }
        if self.config.is_cancelled() {
            return Err(NipalsError::Cancelled { component: index });
        }

        let residual_ss = sum_of_squares(self.residual.view());
        if residual_ss <= self.config.null_tolerance * self.total_ss {
            debug!(
                "Residual exhausted before component {} (ss {:.4e}), completing with a null component",
                index, residual_ss
            );
            return Ok(self.null_component(index));
        }

        let mut t = self.seed();
        let mut p: Array1<f64>;
        let mut iterations = 0;
        loop {
            if self.config.is_cancelled() {
                return Err(NipalsError::Cancelled { component: index });
            }

            let p_raw = self.project_scores(&t);
            let norm = p_raw.dot(&p_raw).sqrt();
            if !(norm > 0.0) {
                debug!(
                    "Component {} projected to zero, completing with a null component",
                    index
                );
                return Ok(self.null_component(index));
            }
            p = p_raw / norm;

            let t_new = self.project_loading(&p);
            iterations += 1;
            let (converged, delta) =
                has_converged(self.config.criterion, &t, &t_new, self.config.tolerance);
            t = t_new;
            trace!("Component {} iteration {}: delta {:.4e}", index, iterations, delta);

            if converged {
                break;
            }
            if iterations >= self.config.max_iter {
                return Err(NipalsError::NotConverged {
                    component: index,
                    iterations,
                    delta,
                    tolerance: self.config.tolerance,
                });
            }
        }

        let eigenvalue = t.dot(&t);
        self.deflate(&t, &p);
        debug!(
            "Component {} converged after {} iterations, eigenvalue {:.6e}",
            index, iterations, eigenvalue
        );

        self.loadings.push(p.clone());
        Ok(Component {
            eigenvalue,
            scores: t,
            loadings: p,
            extraction_index: index,
            iterations,
        })
    }

    /// Picks the residual column that seeds the score vector.
    fn seed(&self) -> Array1<f64> {
        let columns = self.residual.axis_iter(Axis(1));
        let index = match self.config.init {
            InitStrategy::MaxVariance => {
                let mut best = 0;
                let mut best_key = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for (j, column) in columns.enumerate() {
                    let key = (centered_ss(column), sum_of_squares(column));
                    if key.0 > best_key.0 || (key.0 == best_key.0 && key.1 > best_key.1) {
                        best = j;
                        best_key = key;
                    }
                }
                best
            }
            InitStrategy::FirstColumn => columns
                .into_iter()
                .position(|column| column.iter().any(|&v| v != 0.0))
                .unwrap_or(0),
        };
        self.residual.column(index).to_owned()
    }

    /// `Eᵗ·t`
    fn project_scores(&self, t: &Array1<f64>) -> Array1<f64> {
        if self.config.parallel {
            let values: Vec<f64> = self
                .residual
                .axis_iter(Axis(1))
                .into_par_iter()
                .map(|column| column.dot(t))
                .collect();
            Array1::from(values)
        } else {
            self.residual.t().dot(t)
        }
    }

    /// `E·p`
    fn project_loading(&self, p: &Array1<f64>) -> Array1<f64> {
        if self.config.parallel {
            let values: Vec<f64> = self
                .residual
                .axis_iter(Axis(0))
                .into_par_iter()
                .map(|row| row.dot(p))
                .collect();
            Array1::from(values)
        } else {
            self.residual.dot(p)
        }
    }

    /// `E ← E − t·pᵗ`
    fn deflate(&mut self, t: &Array1<f64>, p: &Array1<f64>) {
        let zip = Zip::from(self.residual.rows_mut()).and(t);
        if self.config.parallel {
            zip.par_for_each(|mut row, &ti| row.scaled_add(-ti, p));
        } else {
            zip.for_each(|mut row, &ti| row.scaled_add(-ti, p));
        }
    }

    /// Zero-eigenvalue component whose loading completes the orthonormal set
    /// of earlier loadings. The residual is left untouched.
    fn null_component(&mut self, index: usize) -> Component {
        let n_cols = self.residual.ncols();
        let mut best: Option<(f64, Array1<f64>)> = None;
        for j in 0..n_cols {
            let mut candidate = Array1::<f64>::zeros(n_cols);
            candidate[j] = 1.0;
            // two passes of Gram-Schmidt keep the result orthogonal to rounding
            for _ in 0..2 {
                for previous in &self.loadings {
                    let overlap = previous.dot(&candidate);
                    candidate.scaled_add(-overlap, previous);
                }
            }
            let norm = candidate.dot(&candidate).sqrt();
            if best.as_ref().map_or(true, |(best_norm, _)| norm > *best_norm) {
                best = Some((norm, candidate));
            }
        }

        let loadings = match best {
            Some((norm, candidate)) if norm > 0.0 => candidate / norm,
            _ => Array1::zeros(n_cols),
        };
        self.loadings.push(loadings.clone());

        Component {
            eigenvalue: 0.0,
            scores: Array1::zeros(self.residual.nrows()),
            loadings,
            extraction_index: index,
            iterations: 0,
        }
    }
}

fn has_converged(
    criterion: ConvergenceCriterion,
    t_old: &Array1<f64>,
    t_new: &Array1<f64>,
    tolerance: f64,
) -> (bool, f64) {
    match criterion {
        ConvergenceCriterion::ScoreDelta => {
            let delta = (t_old - t_new).mapv(|v| v * v).sum().sqrt();
            let scale = t_new.dot(t_new).sqrt();
            (delta < tolerance * scale, delta)
        }
        ConvergenceCriterion::EigenvalueDelta => {
            let tau_old = t_old.dot(t_old);
            let tau_new = t_new.dot(t_new);
            let delta = (tau_new - tau_old).abs();
            (delta < tolerance * tau_new, delta)
        }
    }
}

fn sum_of_squares<D: Dimension>(values: ArrayView<'_, f64, D>) -> f64 {
    values.iter().map(|v| v * v).sum()
}

fn centered_ss(column: ArrayView1<'_, f64>) -> f64 {
    let mean = column.mean().unwrap_or(0.0);
    column.iter().map(|v| (v - mean) * (v - mean)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::CancellationToken;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_rank_one_matrix() {
        init();
        let config = NipalsConfig::default();
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let mut extractor = ComponentExtractor::new(x, &config).unwrap();

        let first = extractor.extract().unwrap();
        // sum of squares of a rank-one matrix is its only eigenvalue
        assert_relative_eq!(first.eigenvalue, 70.0, epsilon = 1e-9);
        assert_relative_eq!(first.loadings.dot(&first.loadings), 1.0, epsilon = 1e-12);
        assert_relative_eq!(first.loadings[1] / first.loadings[0], 2.0, epsilon = 1e-9);

        let second = extractor.extract().unwrap();
        assert_eq!(second.eigenvalue, 0.0);
        assert_eq!(second.iterations, 0);
        assert_relative_eq!(second.loadings.dot(&second.loadings), 1.0, epsilon = 1e-12);
        assert_relative_eq!(second.loadings.dot(&first.loadings), 0.0, epsilon = 1e-12);

        assert!(sum_of_squares(extractor.residual()) < 1e-20);
        assert!(matches!(
            extractor.extract(),
            Err(NipalsError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_deflation_preserves_model_identity() {
        let config = NipalsConfig::default();
        let x = array![[2.0, 0.5, 1.0], [1.0, 3.0, -1.0], [0.0, 1.0, 4.0], [1.5, -2.0, 0.5]];
        let mut extractor = ComponentExtractor::new(x.clone(), &config).unwrap();

        let mut model = Array2::<f64>::zeros(x.dim());
        let mut previous = f64::INFINITY;
        for _ in 0..extractor.max_components() {
            let c = extractor.extract().unwrap();
            assert!(c.eigenvalue <= previous + 1e-9);
            previous = c.eigenvalue;
            let outer = c
                .scores
                .view()
                .insert_axis(Axis(1))
                .dot(&c.loadings.view().insert_axis(Axis(0)));
            model += &outer;
        }

        // X = T·Pᵗ + E
        let rebuilt = &model + &extractor.residual();
        for (a, b) in rebuilt.iter().zip(x.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }
        assert!(sum_of_squares(extractor.residual()) < 1e-16);
    }

    #[test]
    fn test_rejects_non_finite_input() {
        let config = NipalsConfig::default();
        let x = array![[1.0, 2.0], [f64::NAN, 3.0]];
        let err = ComponentExtractor::new(x, &config).err().unwrap();

        assert!(matches!(
            err,
            NipalsError::NonFiniteInput { row: 1, column: 0, .. }
        ));
    }

    #[test]
    fn test_rejects_empty_matrix() {
        let config = NipalsConfig::default();
        assert!(ComponentExtractor::new(Array2::zeros((0, 2)), &config).is_err());
        assert!(ComponentExtractor::new(Array2::zeros((2, 0)), &config).is_err());
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        init();
        // nearly equal leading singular values, seeded far from the dominant direction
        let config = NipalsConfig {
            max_iter: 50,
            ..Default::default()
        };
        let x = array![[1.0, 1.0], [1.0, -0.999]];
        let mut extractor = ComponentExtractor::new(x, &config).unwrap();

        match extractor.extract() {
            Err(NipalsError::NotConverged {
                component,
                iterations,
                ..
            }) => {
                assert_eq!(component, 0);
                assert_eq!(iterations, 50);
            }
            other => panic!("expected NotConverged, got {:?}", other),
        }
    }

    #[test]
    fn test_eigenvalue_criterion() {
        let config = NipalsConfig {
            criterion: ConvergenceCriterion::EigenvalueDelta,
            ..Default::default()
        };
        let x = array![[3.0, 0.0], [0.0, 1.0], [0.0, 0.0]];
        let mut extractor = ComponentExtractor::new(x, &config).unwrap();

        let first = extractor.extract().unwrap();
        let second = extractor.extract().unwrap();
        assert_relative_eq!(first.eigenvalue, 9.0, epsilon = 1e-9);
        assert_relative_eq!(second.eigenvalue, 1.0, epsilon = 1e-9);
        assert_relative_eq!(first.loadings[0].abs(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(second.loadings[1].abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_seed_strategies() {
        let x = array![[0.0, 1.0, 5.0], [0.0, 2.0, 5.0], [0.0, 9.0, 5.0]];

        let config = NipalsConfig {
            init: InitStrategy::MaxVariance,
            ..Default::default()
        };
        let extractor = ComponentExtractor::new(x.clone(), &config).unwrap();
        assert_eq!(extractor.seed(), array![1.0, 2.0, 9.0]);

        let config = NipalsConfig {
            init: InitStrategy::FirstColumn,
            ..Default::default()
        };
        let extractor = ComponentExtractor::new(x, &config).unwrap();
        assert_eq!(extractor.seed(), array![1.0, 2.0, 9.0]);

        // constant columns only: fall back to the largest sum of squares
        let x = array![[1.0, 5.0], [1.0, 5.0]];
        let config = NipalsConfig::default();
        let extractor = ComponentExtractor::new(x, &config).unwrap();
        assert_eq!(extractor.seed(), array![5.0, 5.0]);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let x = array![
            [4.0, 1.0, 0.5, 2.0],
            [1.0, 3.0, -1.0, 0.0],
            [0.5, -1.0, 2.0, 1.0],
            [2.0, 0.0, 1.0, 5.0],
            [1.0, 1.0, 1.0, 1.0]
        ];
        let serial = NipalsConfig::default();
        let parallel = NipalsConfig {
            parallel: true,
            ..Default::default()
        };

        let mut a = ComponentExtractor::new(x.clone(), &serial).unwrap();
        let mut b = ComponentExtractor::new(x, &parallel).unwrap();
        for _ in 0..4 {
            let ca = a.extract().unwrap();
            let cb = b.extract().unwrap();
            assert_relative_eq!(ca.eigenvalue, cb.eigenvalue, epsilon = 1e-8);
            for (u, v) in ca.loadings.iter().zip(cb.loadings.iter()) {
                assert_relative_eq!(*u, *v, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_cancellation() {
        let token = CancellationToken::new();
        let config = NipalsConfig {
            cancellation: Some(token.clone()),
            ..Default::default()
        };
        let x = array![[1.0, 2.0], [3.0, 5.0], [4.0, 1.0]];
        let mut extractor = ComponentExtractor::new(x, &config).unwrap();

        assert!(extractor.extract().is_ok());
        token.cancel();
        assert_eq!(
            extractor.extract().unwrap_err(),
            NipalsError::Cancelled { component: 1 }
        );
    }
}
