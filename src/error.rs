use thiserror::Error;

/// Failures raised by stencil construction, Laplacian evaluation and the integrator.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unsupported stencil order {0}, expected 0..=3")]
    UnsupportedOrder(usize),
    #[error("unsupported dimension {0}, expected 1..=3")]
    UnsupportedDimension(usize),
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("stencil is {stencil}-dimensional but the field is {field}-dimensional")]
    DimensionMismatch { stencil: usize, field: usize },
    #[error("time step must be finite and non-negative, got {0}")]
    InvalidTimeStep(f64),
    #[error("neighbor radius must be at least 1")]
    InvalidRadius,
    #[error("observer failed at step {step}")]
    Observer {
        step: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// Rejects zero, negative and non-finite values.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<(), ModelError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::NonPositive { name, value })
    }
}
