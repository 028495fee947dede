//! Result types for NIPALS decomposition.

use std::cmp::Ordering;

use ndarray::{Array1, Array2, Axis};

use crate::error::{NipalsError, Result};

/// One extracted latent dimension.
#[derive(Debug, Clone)]
pub struct Component {
    /// Squared norm of the converged score vector (unnormalized explained variance).
    pub eigenvalue: f64,

    /// Per-observation coordinates (length n_rows).
    pub scores: Array1<f64>,

    /// Per-variable weights (length n_cols), unit norm.
    pub loadings: Array1<f64>,

    /// Position in which the component was extracted.
    pub extraction_index: usize,

    /// Power iterations spent; zero for trivial components.
    pub iterations: usize,
}

impl Component {
    /// Orders components by decreasing eigenvalue.
    pub fn descending(a: &Component, b: &Component) -> Ordering {
        b.eigenvalue.total_cmp(&a.eigenvalue)
    }
}

/// Optional observation and variable names, passed through for display.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    pub rows: Option<Vec<String>>,
    pub columns: Option<Vec<String>>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub(crate) fn validate(&self, n_rows: usize, n_cols: usize) -> Result<()> {
        if let Some(rows) = &self.rows {
            if rows.len() != n_rows {
                return Err(NipalsError::dimensions(format!(
                    "{} row names for {} rows",
                    rows.len(),
                    n_rows
                )));
            }
        }
        if let Some(columns) = &self.columns {
            if columns.len() != n_cols {
                return Err(NipalsError::dimensions(format!(
                    "{} column names for {} columns",
                    columns.len(),
                    n_cols
                )));
            }
        }
        Ok(())
    }
}

/// Which side of the model a scatter dataset is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    /// One point per observation, labelled with row names.
    Scores,
    /// One point per variable, labelled with column names.
    Loadings,
}

/// Two components' coordinates, ready for a scatter plot.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterDataset {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub names: Vec<String>,
    pub x_label: String,
    pub y_label: String,
}

impl ScatterDataset {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn point(&self, item: usize) -> Option<(f64, f64, &str)> {
        Some((*self.x.get(item)?, *self.y.get(item)?, self.names.get(item)?.as_str()))
    }
}

/// Components of a decomposition `X = T·Pᵗ + E`, sorted by decreasing eigenvalue.
#[derive(Debug, Clone)]
pub struct DecompositionResult {
    components: Vec<Component>,
    scores: Array2<f64>,
    loadings: Array2<f64>,
    residual: Array2<f64>,
    total_variance: f64,
    labels: Labels,
}

impl DecompositionResult {
    /// Sorts the extracted components (stable, so ties keep extraction order)
    /// and assembles the score and loading matrices in that order.
    pub(crate) fn new(
        mut components: Vec<Component>,
        residual: Array2<f64>,
        total_variance: f64,
        labels: Labels,
    ) -> Self {
        components.sort_by(Component::descending);

        let (n_rows, n_cols) = residual.dim();
        let mut scores = Array2::zeros((n_rows, components.len()));
        let mut loadings = Array2::zeros((n_cols, components.len()));
        for (k, component) in components.iter().enumerate() {
            scores.column_mut(k).assign(&component.scores);
            loadings.column_mut(k).assign(&component.loadings);
        }

        Self {
            components,
            scores,
            loadings,
            residual,
            total_variance,
            labels,
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Scores matrix T (n_rows × n_components).
    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    /// Loadings matrix P (n_cols × n_components).
    pub fn loadings(&self) -> &Array2<f64> {
        &self.loadings
    }

    /// What is left of the preprocessed input after deflation.
    pub fn residual(&self) -> &Array2<f64> {
        &self.residual
    }

    pub fn eigenvalues(&self) -> Array1<f64> {
        self.components.iter().map(|c| c.eigenvalue).collect()
    }

    /// Total sum of squares of the preprocessed input.
    pub fn total_variance(&self) -> f64 {
        self.total_variance
    }

    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        if self.total_variance > 0.0 {
            self.eigenvalues() / self.total_variance
        } else {
            Array1::zeros(self.components.len())
        }
    }

    /// `T·Pᵗ`, the part of the preprocessed input captured by the components.
    pub fn reconstruct(&self) -> Array2<f64> {
        self.scores.dot(&self.loadings.t())
    }

    pub fn row_names(&self) -> Option<&[String]> {
        self.labels.rows.as_deref()
    }

    pub fn column_names(&self) -> Option<&[String]> {
        self.labels.columns.as_deref()
    }

    /// Coordinates of two components (zero-based, sorted order) for plotting.
    pub fn scatter(
        &self,
        kind: PlotKind,
        x_component: usize,
        y_component: usize,
        x_label: &str,
        y_label: &str,
    ) -> Result<ScatterDataset> {
        for component in [x_component, y_component] {
            if component >= self.components.len() {
                return Err(NipalsError::dimensions(format!(
                    "component {} requested but only {} were extracted",
                    component,
                    self.components.len()
                )));
            }
        }

        let (matrix, names) = match kind {
            PlotKind::Scores => (&self.scores, self.labels.rows.as_ref()),
            PlotKind::Loadings => (&self.loadings, self.labels.columns.as_ref()),
        };
        let names = match names {
            Some(names) => names.clone(),
            None => (1..=matrix.nrows()).map(|i| i.to_string()).collect(),
        };

        Ok(ScatterDataset {
            x: matrix.index_axis(Axis(1), x_component).to_vec(),
            y: matrix.index_axis(Axis(1), y_component).to_vec(),
            names,
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
        })
    }

    /// Scores of the first two components.
    pub fn scores_plot(&self, x_label: &str, y_label: &str) -> Result<ScatterDataset> {
        self.scatter(PlotKind::Scores, 0, 1, x_label, y_label)
    }

    /// Loadings of the first two components.
    pub fn loadings_plot(&self, x_label: &str, y_label: &str) -> Result<ScatterDataset> {
        self.scatter(PlotKind::Loadings, 0, 1, x_label, y_label)
    }
}
