use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};

use crate::error::{NipalsError, Result};
use crate::utils::{Center, Direction, DirectionAxes, Scale};

/// Rejects NaN and infinities, reporting the first offending cell in row-major order.
pub fn ensure_finite<S>(x: &ArrayBase<S, Ix2>) -> Result<()>
where
    S: Data<Elem = f64>,
{
    match x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, column), &value)) => Err(NipalsError::NonFiniteInput { row, column, value }),
        None => Ok(()),
    }
}

/// Arithmetic mean of every vector along `direction`.
pub fn axis_means<S>(x: &ArrayBase<S, Ix2>, direction: &Direction) -> Result<Array1<f64>>
where
    S: Data<Elem = f64>,
{
    x.mean_axis(direction.reduction_axis()).ok_or_else(|| {
        NipalsError::dimensions(format!(
            "cannot compute {} means of a {}x{} matrix",
            direction.name(),
            x.nrows(),
            x.ncols()
        ))
    })
}

/// Bessel-corrected sample standard deviation of every vector along `direction`.
///
/// Fails with [`NipalsError::DegenerateVariance`] for constant vectors, where the
/// deviation is zero or indistinguishable from rounding noise.
pub fn axis_std_devs<S>(x: &ArrayBase<S, Ix2>, direction: &Direction) -> Result<Array1<f64>>
where
    S: Data<Elem = f64>,
{
    let axis = direction.reduction_axis();
    let n = x.len_of(axis);
    if n < 2 {
        return Err(NipalsError::dimensions(format!(
            "a sample standard deviation needs at least two values per {}, got {}",
            direction.name(),
            n
        )));
    }

    let std_devs = x.std_axis(axis, 1.0);
    for (index, (lane, &sd)) in x.lanes(axis).into_iter().zip(std_devs.iter()).enumerate() {
        let max_abs = lane.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        let noise = n as f64 * f64::EPSILON * max_abs;
        if !sd.is_finite() || sd <= noise {
            return Err(NipalsError::DegenerateVariance {
                direction: direction.name(),
                index,
            });
        }
    }

    Ok(std_devs)
}

/// Subtracts precomputed per-vector means in place.
pub fn apply_center(x: &mut Array2<f64>, means: &Array1<f64>, direction: &Direction) -> Result<()> {
    check_stat_len(x, means.len(), direction)?;
    let means = means.view().insert_axis(direction.reduction_axis());
    *x -= &means;
    Ok(())
}

/// Divides by precomputed per-vector standard deviations in place.
pub fn apply_scale(x: &mut Array2<f64>, std_devs: &Array1<f64>, direction: &Direction) -> Result<()> {
    check_stat_len(x, std_devs.len(), direction)?;
    let std_devs = std_devs.view().insert_axis(direction.reduction_axis());
    *x /= &std_devs;
    Ok(())
}

fn check_stat_len(x: &Array2<f64>, len: usize, direction: &Direction) -> Result<()> {
    let expected = x.len_of(direction.vector_axis());
    if len != expected {
        return Err(NipalsError::dimensions(format!(
            "got {} statistics for a matrix with {} {} vectors",
            len,
            expected,
            direction.name()
        )));
    }
    Ok(())
}

impl<S> Center for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn center(&self, direction: &Direction) -> Result<Array2<f64>> {
        ensure_finite(self)?;
        let means = axis_means(self, direction)?;
        let mut centered = self.to_owned();
        apply_center(&mut centered, &means, direction)?;
        Ok(centered)
    }
}

impl<S> Scale for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn scale(&self, direction: &Direction) -> Result<Array2<f64>> {
        ensure_finite(self)?;
        let std_devs = axis_std_devs(self, direction)?;
        let mut scaled = self.to_owned();
        apply_scale(&mut scaled, &std_devs, direction)?;
        Ok(scaled)
    }
}
