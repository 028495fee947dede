//! # single_nipals
//!
//! Principal Component Analysis of dense matrices with the NIPALS algorithm.
//!
//! ```rust,no_run
//! use ndarray::array;
//! use single_nipals::dimred::pca::{Labels, NipalsPCA};
//!
//! # fn main() -> anyhow::Result<()> {
//! let x = array![[2.0, 0.5, 1.0], [1.0, 3.0, -1.0], [0.0, 1.0, 4.0], [1.5, -2.0, 0.5]];
//!
//! let mut pca = NipalsPCA::builder().scale(true).build();
//! pca.fit_labeled(x.view(), Labels::new().rows(["a", "b", "c", "d"]))?;
//!
//! let result = pca.result().expect("fitted");
//! let _plot = result.scores_plot("PC1", "PC2")?;
//! # Ok(())
//! # }
//! ```

pub mod dense;
pub mod dimred;
mod error;
mod utils;

pub use error::{NipalsError, Result};
pub use utils::{CancellationToken, Center, Direction, DirectionAxes, Scale};
