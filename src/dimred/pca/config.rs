//! Configuration for NIPALS decomposition.

use crate::error::{NipalsError, Result};
use crate::utils::CancellationToken;

/// How power iteration decides a component has converged.
///
/// One criterion is applied to every component of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvergenceCriterion {
    /// `‖t_old − t_new‖ < tol · ‖t_new‖`
    #[default]
    ScoreDelta,
    /// `|τ_new − τ_old| < tol · τ_new` with `τ = tᵗt`
    EigenvalueDelta,
}

/// Residual column used to seed the score vector of each component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitStrategy {
    /// Column with the largest variance; ties go to the first such column.
    #[default]
    MaxVariance,
    /// First column that is not identically zero.
    FirstColumn,
}

/// Configuration parameters for NIPALS decomposition.
#[derive(Debug, Clone)]
pub struct NipalsConfig {
    /// Number of components to extract. If None, uses min(n_rows, n_cols).
    pub n_components: Option<usize>,

    /// Subtract column means before decomposition.
    pub center: bool,

    /// Divide columns by their sample standard deviation before decomposition.
    pub scale: bool,

    /// Convergence tolerance, relative to the current iterate.
    pub tolerance: f64,

    /// Maximum power iterations per component. Closely spaced eigenvalues on
    /// unstructured data can need tens of thousands at the default tolerance.
    pub max_iter: usize,

    pub criterion: ConvergenceCriterion,

    pub init: InitStrategy,

    /// Residual sum of squares, relative to the preprocessed input, below which
    /// the remaining components are treated as trivial.
    pub null_tolerance: f64,

    /// Run matrix-vector products and deflation on the rayon thread pool.
    pub parallel: bool,

    /// Checked once per iteration; cancelling aborts the decomposition.
    pub cancellation: Option<CancellationToken>,
}

impl Default for NipalsConfig {
    fn default() -> Self {
        Self {
            n_components: None,
            center: true,
            scale: false,
            tolerance: 1e-10,
            max_iter: 100_000,
            criterion: ConvergenceCriterion::default(),
            init: InitStrategy::default(),
            null_tolerance: f64::EPSILON,
            parallel: false,
            cancellation: None,
        }
    }
}

impl NipalsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.n_components == Some(0) {
            return Err(NipalsError::config("n_components", "must be greater than 0"));
        }

        if self.max_iter == 0 {
            return Err(NipalsError::config("max_iter", "must be greater than 0"));
        }

        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(NipalsError::config("tolerance", "must be positive and finite"));
        }

        if !(self.null_tolerance.is_finite() && self.null_tolerance >= 0.0) {
            return Err(NipalsError::config(
                "null_tolerance",
                "must be non-negative and finite",
            ));
        }

        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
