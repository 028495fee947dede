use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{Array2, Axis};
pub use single_utilities::types::Direction;

use crate::error::Result;

/// Maps a [`Direction`] onto ndarray axes.
///
/// `ROW` treats every row as one vector, `COLUMN` every column. With observations
/// in rows and variables in columns, per-variable statistics use `COLUMN`.
pub trait DirectionAxes {
    /// Axis that is reduced when computing one statistic per vector.
    fn reduction_axis(&self) -> Axis;

    /// Axis along which the per-vector statistics are laid out.
    fn vector_axis(&self) -> Axis;

    fn name(&self) -> &'static str;
}

impl DirectionAxes for Direction {
    fn reduction_axis(&self) -> Axis {
        match self {
            Direction::ROW => Axis(1),
            Direction::COLUMN => Axis(0),
        }
    }

    fn vector_axis(&self) -> Axis {
        match self {
            Direction::ROW => Axis(0),
            Direction::COLUMN => Axis(1),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Direction::ROW => "row",
            Direction::COLUMN => "column",
        }
    }
}

pub trait Center {
    /// Subtracts the arithmetic mean of every vector along `direction`.
    fn center(&self, direction: &Direction) -> Result<Array2<f64>>;
}

pub trait Scale {
    /// Divides every vector along `direction` by its sample standard deviation.
    fn scale(&self, direction: &Direction) -> Result<Array2<f64>>;
}

/// Shared flag used to abort a running decomposition from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_axes() {
        assert_eq!(Direction::COLUMN.reduction_axis(), Axis(0));
        assert_eq!(Direction::COLUMN.vector_axis(), Axis(1));
        assert_eq!(Direction::ROW.reduction_axis(), Axis(1));
        assert_eq!(Direction::ROW.vector_axis(), Axis(0));
        assert_eq!(Direction::ROW.name(), "row");
        assert_eq!(Direction::COLUMN.name(), "column");
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        std::thread::spawn(move || clone.cancel()).join().unwrap();

        assert!(token.is_cancelled());
    }
}
