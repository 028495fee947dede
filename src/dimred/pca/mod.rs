//! # Principal Component Analysis by NIPALS
//!
//! Observations are rows and variables are columns. The input is optionally
//! centered and scaled per column, then decomposed as `X = T·Pᵗ + E` one
//! component at a time by [`ComponentExtractor`].

use anyhow::Context;
use log::debug;
use ndarray::{Array1, Array2, ArrayView2};

use crate::dense::{apply_center, apply_scale, axis_means, axis_std_devs, ensure_finite};
use crate::error::{NipalsError, Result};
use crate::utils::{CancellationToken, Direction};

mod config;
mod nipals;
mod result;

pub use config::{ConvergenceCriterion, InitStrategy, NipalsConfig};
pub use nipals::ComponentExtractor;
pub use result::{Component, DecompositionResult, Labels, PlotKind, ScatterDataset};

pub struct NipalsPCABuilder {
    config: NipalsConfig,
}

impl Default for NipalsPCABuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NipalsPCABuilder {
    pub fn new() -> Self {
        NipalsPCABuilder {
            config: NipalsConfig::default(),
        }
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.config.n_components = Some(n_components);
        self
    }

    pub fn center(mut self, center: bool) -> Self {
        self.config.center = center;
        self
    }

    pub fn scale(mut self, scale: bool) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    pub fn criterion(mut self, criterion: ConvergenceCriterion) -> Self {
        self.config.criterion = criterion;
        self
    }

    pub fn init(mut self, init: InitStrategy) -> Self {
        self.config.init = init;
        self
    }

    pub fn null_tolerance(mut self, null_tolerance: f64) -> Self {
        self.config.null_tolerance = null_tolerance;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.config.cancellation = Some(token);
        self
    }

    pub fn build(self) -> NipalsPCA {
        NipalsPCA::with_config(self.config)
    }
}

pub struct NipalsPCA {
    config: NipalsConfig,
    mean: Option<Array1<f64>>,
    std_dev: Option<Array1<f64>>,
    result: Option<DecompositionResult>,
}

/// Per-column statistics removed from the input before decomposition.
struct Statistics {
    mean: Option<Array1<f64>>,
    std_dev: Option<Array1<f64>>,
}

impl NipalsPCA {
    pub fn builder() -> NipalsPCABuilder {
        NipalsPCABuilder::new()
    }

    pub fn with_config(config: NipalsConfig) -> Self {
        NipalsPCA {
            config,
            mean: None,
            std_dev: None,
            result: None,
        }
    }

    pub fn config(&self) -> &NipalsConfig {
        &self.config
    }

    /// Preprocesses `x` and extracts the configured number of components.
    ///
    /// Leaves the model untouched; use [`NipalsPCA::fit`] to keep the result
    /// and the preprocessing statistics for [`NipalsPCA::transform`].
    pub fn decompose(&self, x: ArrayView2<f64>, labels: Labels) -> Result<DecompositionResult> {
        self.run(x, labels).map(|(result, _)| result)
    }

    fn run(&self, x: ArrayView2<f64>, labels: Labels) -> Result<(DecompositionResult, Statistics)> {
        self.config.validate()?;

        let (n_rows, n_cols) = x.dim();
        if n_rows == 0 || n_cols == 0 {
            return Err(NipalsError::dimensions(format!(
                "cannot decompose a {}x{} matrix",
                n_rows, n_cols
            )));
        }
        let max_components = n_rows.min(n_cols);
        let n_components = self.config.n_components.unwrap_or(max_components);
        if n_components > max_components {
            return Err(NipalsError::dimensions(format!(
                "{} components requested but a {}x{} matrix has at most {}",
                n_components, n_rows, n_cols, max_components
            )));
        }
        labels.validate(n_rows, n_cols)?;
        ensure_finite(&x)?;

        let (matrix, statistics) = self.preprocess(x)?;
        let mut extractor = ComponentExtractor::new(matrix, &self.config)?;
        let total_variance = extractor.total_ss();

        let mut components = Vec::with_capacity(n_components);
        for _ in 0..n_components {
            components.push(extractor.extract()?);
        }
        debug!(
            "Extracted {} components from a {}x{} matrix",
            n_components, n_rows, n_cols
        );

        let result =
            DecompositionResult::new(components, extractor.into_residual(), total_variance, labels);
        Ok((result, statistics))
    }

    fn preprocess(&self, x: ArrayView2<f64>) -> Result<(Array2<f64>, Statistics)> {
        let direction = Direction::COLUMN;
        let mut matrix = x.to_owned();

        let mean = if self.config.center {
            let mean = axis_means(&matrix, &direction)?;
            apply_center(&mut matrix, &mean, &direction)?;
            Some(mean)
        } else {
            None
        };

        let std_dev = if self.config.scale {
            let std_dev = axis_std_devs(&matrix, &direction)?;
            apply_scale(&mut matrix, &std_dev, &direction)?;
            Some(std_dev)
        } else {
            None
        };

        Ok((matrix, Statistics { mean, std_dev }))
    }

    pub fn fit(&mut self, x: ArrayView2<f64>) -> anyhow::Result<()> {
        self.fit_labeled(x, Labels::default())
    }

    pub fn fit_labeled(&mut self, x: ArrayView2<f64>, labels: Labels) -> anyhow::Result<()> {
        let (result, statistics) = self
            .run(x, labels)
            .context("NIPALS decomposition failed")?;

        self.mean = statistics.mean;
        self.std_dev = statistics.std_dev;
        self.result = Some(result);

        Ok(())
    }

    /// Projects observations onto the fitted loadings: `(X − mean) / std · P`.
    pub fn transform(&self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        let result = self
            .result
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("PCA has not been fitted yet"))?;

        let direction = Direction::COLUMN;
        let mut matrix = x.to_owned();
        if let Some(mean) = &self.mean {
            apply_center(&mut matrix, mean, &direction).context("Cannot center new data")?;
        }
        if let Some(std_dev) = &self.std_dev {
            apply_scale(&mut matrix, std_dev, &direction).context("Cannot scale new data")?;
        }
        if matrix.ncols() != result.loadings().nrows() {
            anyhow::bail!(
                "Expected {} columns, got {}",
                result.loadings().nrows(),
                matrix.ncols()
            );
        }

        Ok(matrix.dot(result.loadings()))
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn result(&self) -> Option<&DecompositionResult> {
        self.result.as_ref()
    }

    pub fn components(&self) -> Option<&[Component]> {
        self.result.as_ref().map(DecompositionResult::components)
    }

    pub fn eigenvalues(&self) -> Option<Array1<f64>> {
        self.result.as_ref().map(DecompositionResult::eigenvalues)
    }

    pub fn explained_variance_ratio(&self) -> Option<Array1<f64>> {
        self.result
            .as_ref()
            .map(DecompositionResult::explained_variance_ratio)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn std_dev(&self) -> Option<&Array1<f64>> {
        self.std_dev.as_ref()
    }
}
