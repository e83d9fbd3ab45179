//! Initial tumor and nutrient fields.
//!
//! Every function builds and returns a fresh array; nothing is written into
//! caller-owned storage.

use crate::error::ModelError;
use crate::integrator::Source;
use growth_common::SourceConfig;
use ndarray::{ArrayD, Dimension, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Normal};

pub use growth_common::midpoint;

fn distance(cell: &[usize], center: &[f64]) -> f64 {
    cell.iter()
        .zip(center)
        .map(|(&i, &c)| (i as f64 - c).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn check_center(shape: &[usize], center: &[f64]) -> Result<(), ModelError> {
    if center.len() == shape.len() {
        Ok(())
    } else {
        Err(ModelError::ShapeMismatch {
            name: "center",
            expected: vec![shape.len()],
            actual: vec![center.len()],
        })
    }
}

/// Tumor disk (ball in 3-D): 1 where the distance to `center` is at most
/// `radius`, 0 elsewhere.
///
/// With `jitter`, every cell draws `u ~ U[0, 1)` and uses `radius * sin(u)`
/// instead, which produces a ragged, smaller seed.
pub fn init_tumor<R: Rng>(
    shape: &[usize],
    radius: f64,
    center: &[f64],
    mut jitter: Option<&mut R>,
) -> Result<ArrayD<f64>, ModelError> {
    check_center(shape, center)?;
    Ok(ArrayD::from_shape_fn(IxDyn(shape), |index| {
        let effective = match jitter.as_deref_mut() {
            Some(rng) => radius * rng.random::<f64>().sin(),
            None => radius,
        };
        if distance(index.slice(), center) <= effective {
            1.0
        } else {
            0.0
        }
    }))
}

/// Nutrient field filled with `nutrient_initial`, and the source described by `source`.
pub fn init_chemical_field(
    shape: &[usize],
    nutrient_initial: f64,
    source: &SourceConfig,
    center: &[f64],
) -> Result<(ArrayD<f64>, Source), ModelError> {
    check_center(shape, center)?;
    let nutrient = ArrayD::from_elem(IxDyn(shape), nutrient_initial);
    let source = match *source {
        SourceConfig::Uniform { value } => Source::Uniform(value),
        SourceConfig::Exterior { value, radius } => Source::Field(ArrayD::from_shape_fn(IxDyn(shape), |index| {
            if distance(index.slice(), center) >= radius {
                value
            } else {
                0.0
            }
        })),
    };
    Ok((nutrient, source))
}

/// Returns `field` plus zero-mean Gaussian noise of the given standard deviation.
pub fn add_noise<R: Rng>(field: &ArrayD<f64>, std_dev: f64, rng: &mut R) -> Result<ArrayD<f64>, ModelError> {
    let invalid = || ModelError::NonPositive {
        name: "noise standard deviation",
        value: std_dev,
    };
    if !(std_dev >= 0.0 && std_dev.is_finite()) {
        return Err(invalid());
    }
    if std_dev == 0.0 {
        return Ok(field.clone());
    }
    let normal = Normal::new(0.0, std_dev).map_err(|_| invalid())?;
    Ok(field.mapv(|v| v + normal.sample(&mut *rng)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn disk_covers_cells_within_radius() {
        let phi = init_tumor::<StdRng>(&[11, 11], 2.0, &midpoint(&[10, 10]), None).unwrap();
        // Lattice points within distance 2 of (5, 5): 13 of them.
        assert_eq!(phi.iter().filter(|&&v| v == 1.0).count(), 13);
        assert_eq!(phi[[5, 5]], 1.0);
        assert_eq!(phi[[5, 7]], 1.0);
        assert_eq!(phi[[6, 7]], 0.0);
        assert!(phi.iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn jittered_tumor_is_seeded_and_never_larger() {
        let shape = [20, 20];
        let center = midpoint(&shape);
        let full = init_tumor::<StdRng>(&shape, 6.0, &center, None).unwrap();
        let a = init_tumor(&shape, 6.0, &center, Some(&mut StdRng::seed_from_u64(3))).unwrap();
        let b = init_tumor(&shape, 6.0, &center, Some(&mut StdRng::seed_from_u64(3))).unwrap();
        assert_eq!(a, b);
        assert!(a.sum() <= full.sum());
        for (j, f) in a.iter().zip(full.iter()) {
            assert!(*j <= *f);
        }
    }

    #[test]
    fn rejects_center_of_wrong_dimension() {
        let err = init_tumor::<StdRng>(&[4, 4], 1.0, &[2.0], None).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { name: "center", .. }));
    }

    #[test]
    fn uniform_source_stays_scalar() {
        let (nutrient, source) =
            init_chemical_field(&[3, 4], 0.1, &SourceConfig::Uniform { value: 0.1 }, &[1.5, 2.0]).unwrap();
        assert_eq!(nutrient.shape(), &[3, 4]);
        assert!(nutrient.iter().all(|&v| v == 0.1));
        assert_eq!(source, Source::Uniform(0.1));
    }

    #[test]
    fn exterior_source_is_empty_inside_the_radius() {
        let shape = [9, 9];
        let center = [4.0, 4.0];
        let (_, source) =
            init_chemical_field(&shape, 0.0, &SourceConfig::Exterior { value: 2.0, radius: 3.0 }, &center).unwrap();
        let Source::Field(field) = source else {
            panic!("expected a spatial source");
        };
        assert_eq!(field[[4, 4]], 0.0);
        assert_eq!(field[[4, 6]], 0.0);
        assert_eq!(field[[4, 7]], 2.0);
        assert_eq!(field[[0, 0]], 2.0);
    }

    #[test]
    fn noise_is_reproducible_and_zero_mean() {
        let base = ArrayD::from_elem(IxDyn(&[50, 50]), 1.0);
        let a = add_noise(&base, 0.01, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = add_noise(&base, 0.01, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, base);
        assert!((a.mean().unwrap() - 1.0).abs() < 1e-3);
        assert_eq!(add_noise(&base, 0.0, &mut StdRng::seed_from_u64(0)).unwrap(), base);
        assert!(add_noise(&base, -1.0, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
