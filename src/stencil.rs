//! Finite-difference Laplacian kernels.
//!
//! Accuracy order -> number of points: 0, 1, 2, 3 -> 3, 5, 7, 9
//! (2nd, 4th, 6th and 8th order accurate central differences).

use crate::error::{ensure_positive, ModelError};
use ndarray::{ArrayD, IxDyn};

/// Points per axis for each supported accuracy order.
pub const ACCURACY_POINTS: [usize; 4] = [3, 5, 7, 9];

const PATTERN_2ND: [f64; 3] = [1.0, -2.0, 1.0];
const PATTERN_4TH: [f64; 5] = [-1.0 / 12.0, 16.0 / 12.0, -30.0 / 12.0, 16.0 / 12.0, -1.0 / 12.0];
const PATTERN_6TH: [f64; 7] = [
    1.0 / 90.0,
    -3.0 / 20.0,
    3.0 / 2.0,
    -49.0 / 18.0,
    3.0 / 2.0,
    -3.0 / 20.0,
    1.0 / 90.0,
];
const PATTERN_8TH: [f64; 9] = [
    -1.0 / 560.0,
    8.0 / 315.0,
    -1.0 / 5.0,
    8.0 / 5.0,
    -205.0 / 72.0,
    8.0 / 5.0,
    -1.0 / 5.0,
    8.0 / 315.0,
    -1.0 / 560.0,
];

/// 1-D second-derivative coefficients (unit spacing) for an accuracy order.
pub fn pattern(order: usize) -> Result<&'static [f64], ModelError> {
    match order {
        0 => Ok(&PATTERN_2ND),
        1 => Ok(&PATTERN_4TH),
        2 => Ok(&PATTERN_6TH),
        3 => Ok(&PATTERN_8TH),
        _ => Err(ModelError::UnsupportedOrder(order)),
    }
}

/// Laplacian weights of shape `(points,)*ndim`, already scaled by `1 / h^2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stencil {
    weights: ArrayD<f64>,
    order: usize,
    spacing: f64,
}

impl Stencil {
    /// Builds the kernel for `ndim` axes at the given accuracy `order` and spacing `h`.
    ///
    /// In more than one dimension the 1-D pattern is added along every axis on
    /// the line where all other indices equal `points / ndim`.
    pub fn build(ndim: usize, order: usize, h: f64) -> Result<Self, ModelError> {
        if !(1..=3).contains(&ndim) {
            return Err(ModelError::UnsupportedDimension(ndim));
        }
        let coefficients = pattern(order)?;
        ensure_positive("h", h)?;

        let points = ACCURACY_POINTS[order];
        let mut weights = ArrayD::<f64>::zeros(IxDyn(&vec![points; ndim]));

        if ndim == 1 {
            for (k, &c) in coefficients.iter().enumerate() {
                weights[[k]] += c;
            }
        } else {
            let line = points / ndim;
            let mut index = vec![line; ndim];
            for axis in 0..ndim {
                for (k, &c) in coefficients.iter().enumerate() {
                    index[axis] = k;
                    weights[IxDyn(&index)] += c;
                }
                index[axis] = line;
            }
        }

        let inv_h2 = 1.0 / (h * h);
        weights.mapv_inplace(|w| w * inv_h2);

        Ok(Self { weights, order, spacing: h })
    }

    pub fn ndim(&self) -> usize {
        self.weights.ndim()
    }

    /// Extent of the kernel along each axis.
    pub fn points(&self) -> usize {
        ACCURACY_POINTS[self.order]
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn weights(&self) -> &ArrayD<f64> {
        &self.weights
    }

    /// Sum of all weights; zero up to rounding for a discrete Laplacian.
    pub fn sum(&self) -> f64 {
        self.weights.sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weights_sum_to_zero_for_every_configuration() {
        for ndim in 1..=3 {
            for order in 0..=3 {
                let stencil = Stencil::build(ndim, order, 0.05).unwrap();
                // Scaled by 1/h^2 = 400, so allow for the amplified rounding.
                assert_abs_diff_eq!(stencil.sum(), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn five_point_stencil_in_two_dimensions() {
        let stencil = Stencil::build(2, 0, 1.0).unwrap();
        let expected = [[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];
        assert_eq!(stencil.points(), 3);
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(stencil.weights()[[i, j]], expected[i][j]);
            }
        }
    }

    #[test]
    fn fourth_order_cross_in_two_dimensions() {
        let stencil = Stencil::build(2, 1, 1.0).unwrap();
        let w = stencil.weights();
        assert_eq!(w.shape(), &[5, 5]);
        assert_abs_diff_eq!(w[[2, 2]], -60.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[[2, 0]], -1.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[[0, 2]], -1.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[[1, 2]], 16.0 / 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[[0, 0]], 0.0);
        assert_abs_diff_eq!(w[[1, 1]], 0.0);
    }

    #[test]
    fn one_dimensional_kernel_is_scaled_pattern() {
        let stencil = Stencil::build(1, 0, 0.5).unwrap();
        let w: Vec<f64> = stencil.weights().iter().copied().collect();
        assert_eq!(w, vec![4.0, -8.0, 4.0]);
    }

    #[test]
    fn three_dimensional_seven_point_stencil() {
        let stencil = Stencil::build(3, 0, 1.0).unwrap();
        let w = stencil.weights();
        assert_abs_diff_eq!(w[[1, 1, 1]], -6.0);
        assert_abs_diff_eq!(w[[0, 1, 1]], 1.0);
        assert_abs_diff_eq!(w[[1, 2, 1]], 1.0);
        assert_abs_diff_eq!(w[[1, 1, 0]], 1.0);
        assert_abs_diff_eq!(w[[0, 0, 1]], 0.0);
        assert_eq!(w.iter().filter(|&&v| v != 0.0).count(), 7);
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(matches!(Stencil::build(4, 0, 1.0), Err(ModelError::UnsupportedDimension(4))));
        assert!(matches!(Stencil::build(0, 0, 1.0), Err(ModelError::UnsupportedDimension(0))));
        assert!(matches!(Stencil::build(2, 4, 1.0), Err(ModelError::UnsupportedOrder(4))));
        assert!(matches!(Stencil::build(2, 0, 0.0), Err(ModelError::NonPositive { name: "h", .. })));
        assert!(matches!(Stencil::build(2, 0, f64::NAN), Err(ModelError::NonPositive { .. })));
    }
}
