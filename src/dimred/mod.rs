//! # Dimensionality Reduction
//!
//! This module provides algorithms for reducing the dimensionality of dense
//! observation-by-variable matrices.
//!
//! ## Currently Available
//! - **PCA** ([`pca`]): Principal Component Analysis computed one component at a
//!   time with the NIPALS power iteration
//!
//! ## Algorithm Notes
//! - NIPALS never forms the covariance matrix, so it suits wide matrices and
//!   cases where only the leading components are needed
//! - Components are returned sorted by decreasing eigenvalue

pub mod pca;
