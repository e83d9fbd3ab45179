//! Discrete Laplace operator with explicit boundary handling.
//!
//! [`Laplacian`] convolves a field with a precomputed [`Stencil`] and is the
//! path used by the integrator. [`laplace_lookup`] evaluates the standard
//! `2 * ndim + 1` point formula cell by cell and serves as a reference.

use crate::error::ModelError;
use crate::stencil::Stencil;
use growth_common::BoundaryPolicy;
use ndarray::{ArrayD, Dimension};
use rayon::iter::{ParallelBridge, ParallelIterator};
use std::borrow::Cow;

/// Maps a possibly out-of-range index onto the lattice.
#[inline(always)]
pub fn resolve_index(index: isize, extent: usize, boundary: BoundaryPolicy) -> usize {
    match boundary {
        BoundaryPolicy::Wrap => index.rem_euclid(extent as isize) as usize,
        BoundaryPolicy::Clamp => index.clamp(0, extent as isize - 1) as usize,
    }
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

// Non-zero kernel entry, stored as the field offset it reads from.
#[derive(Debug, Clone)]
struct Tap {
    offset: Vec<isize>,
    weight: f64,
}

/// Stencil convolution bound to one boundary policy.
#[derive(Debug, Clone)]
pub struct Laplacian {
    stencil: Stencil,
    boundary: BoundaryPolicy,
    taps: Vec<Tap>,
}

impl Laplacian {
    pub fn new(stencil: Stencil, boundary: BoundaryPolicy) -> Self {
        let origin = (stencil.points() / 2) as isize;
        // Convolution flips the kernel: weight w[k] reads f[x + origin - k].
        let taps = stencil
            .weights()
            .indexed_iter()
            .filter(|(_, &w)| w != 0.0)
            .map(|(k, &weight)| Tap {
                offset: k.slice().iter().map(|&i| origin - i as isize).collect(),
                weight,
            })
            .collect();
        Self { stencil, boundary, taps }
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    /// Returns a new array holding the Laplacian estimate of every cell.
    ///
    /// Cells are evaluated in parallel; each cell sums its taps in a fixed
    /// order, so the result does not depend on the thread count.
    pub fn apply(&self, field: &ArrayD<f64>) -> Result<ArrayD<f64>, ModelError> {
        if field.ndim() != self.stencil.ndim() {
            return Err(ModelError::DimensionMismatch {
                stencil: self.stencil.ndim(),
                field: field.ndim(),
            });
        }

        let shape = field.shape().to_vec();
        let strides = row_major_strides(&shape);
        let data: Cow<'_, [f64]> = match field.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(field.iter().copied().collect()),
        };
        let boundary = self.boundary;

        let mut out = ArrayD::<f64>::zeros(field.raw_dim());
        out.indexed_iter_mut().par_bridge().for_each(|(index, value)| {
            let cell = index.slice();
            *value = self
                .taps
                .iter()
                .map(|tap| {
                    let flat: usize = (0..cell.len())
                        .map(|axis| {
                            let i = cell[axis] as isize + tap.offset[axis];
                            resolve_index(i, shape[axis], boundary) * strides[axis]
                        })
                        .sum();
                    tap.weight * data[flat]
                })
                .sum();
        });
        Ok(out)
    }
}

/// Reference Laplacian by explicit neighbor lookup.
///
/// For every cell and axis the neighbors at `-radius` and `+radius` are read
/// (wrapped or clamped per `boundary`) and combined as
/// `(sum_of_neighbors - 2 * ndim * f[cell]) / radius^2`. Much slower than
/// [`Laplacian::apply`]; intended for cross-checking.
pub fn laplace_lookup(
    field: &ArrayD<f64>,
    radius: usize,
    boundary: BoundaryPolicy,
) -> Result<ArrayD<f64>, ModelError> {
    if radius == 0 {
        return Err(ModelError::InvalidRadius);
    }
    let ndim = field.ndim();
    if !(1..=3).contains(&ndim) {
        return Err(ModelError::UnsupportedDimension(ndim));
    }

    let shape = field.shape().to_vec();
    let r = radius as isize;
    let h2 = (radius * radius) as f64;
    let mut lap = ArrayD::<f64>::zeros(field.raw_dim());
    let mut neighbor = vec![0usize; ndim];

    for (index, value) in lap.indexed_iter_mut() {
        let cell = index.slice();
        let mut sum = 0.0;
        for axis in 0..ndim {
            for step in [-r, r] {
                neighbor.copy_from_slice(cell);
                neighbor[axis] = resolve_index(cell[axis] as isize + step, shape[axis], boundary);
                sum += field[neighbor.as_slice()];
            }
        }
        *value = (sum - 2.0 * ndim as f64 * field[cell]) / h2;
    }
    Ok(lap)
}
