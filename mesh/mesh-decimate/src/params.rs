//! Parameters for mesh decimation.

use std::f64::consts::{FRAC_PI_3, FRAC_PI_6};

use serde::{Deserialize, Serialize};

use crate::error::{DecimateError, DecimateResult};

/// How many faces decimation should aim for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimateTarget {
    /// Absolute face count.
    FaceCount(usize),
    /// Fraction of the current face count, in `(0, 1]`.
    Ratio(f64),
}

impl Default for DecimateTarget {
    fn default() -> Self {
        Self::Ratio(0.5)
    }
}

impl DecimateTarget {
    /// Face count to reach from `current` faces.
    ///
    /// A ratio resolves to `ceil(ratio * current)`.
    ///
    /// # Errors
    ///
    /// - [`DecimateError::InvalidRatio`] for a ratio outside `(0, 1]` or not
    ///   finite.
    /// - [`DecimateError::InvalidTargetCount`] for a face count of zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    // Truncation: the product is at most `current`, which fits in usize
    pub fn resolve(self, current: usize) -> DecimateResult<usize> {
        match self {
            Self::Ratio(r) if !r.is_finite() || r <= 0.0 || r > 1.0 => {
                Err(DecimateError::InvalidRatio(r))
            }
            Self::Ratio(r) => Ok(((current as f64) * r).ceil() as usize),
            Self::FaceCount(0) => Err(DecimateError::InvalidTargetCount(0)),
            Self::FaceCount(n) => Ok(n),
        }
    }

    /// Check the target without a mesh.
    ///
    /// # Errors
    ///
    /// As for [`resolve`](Self::resolve).
    pub fn validate(self) -> DecimateResult<()> {
        self.resolve(0).map(|_| ())
    }
}

/// Parameters for mesh decimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimateParams {
    /// Target face count or ratio. Default: ratio 0.5
    pub target: DecimateTarget,

    /// Never collapse boundary edges, and snap collapses that touch the
    /// boundary onto their boundary endpoint. Default: true
    pub preserve_boundary: bool,

    /// Maximum quadric error allowed for one collapse. If None, no limit.
    pub max_error: Option<f64>,

    /// Cost multiplier for boundary edges when `preserve_boundary` is false.
    /// Default: 10.0
    pub boundary_penalty: f64,

    /// Largest rotation, in radians, any surviving face normal may undergo
    /// in a single collapse. Default: π/3 (60 degrees)
    pub max_normal_flip_angle: f64,

    /// Determinant magnitude below which the quadric system is treated as
    /// singular and the edge midpoint is used. Default: 1e-10
    pub singular_epsilon: f64,

    /// Candidates examined between cancellation checks. Default: 64
    pub cancel_check_interval: usize,
}

impl Default for DecimateParams {
    fn default() -> Self {
        Self {
            target: DecimateTarget::default(),
            preserve_boundary: true,
            max_error: None,
            boundary_penalty: 10.0,
            max_normal_flip_angle: FRAC_PI_3,
            singular_epsilon: 1e-10,
            cancel_check_interval: 64,
        }
    }
}

impl DecimateParams {
    /// Create params targeting a specific face count.
    #[must_use]
    pub fn with_target_faces(count: usize) -> Self {
        Self {
            target: DecimateTarget::FaceCount(count),
            ..Default::default()
        }
    }

    /// Create params targeting a ratio of the current face count.
    ///
    /// The ratio is validated when decimation runs.
    #[must_use]
    pub fn with_target_ratio(ratio: f64) -> Self {
        Self {
            target: DecimateTarget::Ratio(ratio),
            ..Default::default()
        }
    }

    /// Create aggressive decimation params (more simplification).
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            target: DecimateTarget::Ratio(0.25),
            preserve_boundary: false,
            boundary_penalty: 1.0,
            ..Default::default()
        }
    }

    /// Create conservative decimation params (preserve more detail).
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            target: DecimateTarget::Ratio(0.75),
            preserve_boundary: true,
            max_normal_flip_angle: FRAC_PI_6,
            ..Default::default()
        }
    }

    /// Set the target.
    #[must_use]
    pub const fn with_target(mut self, target: DecimateTarget) -> Self {
        self.target = target;
        self
    }

    /// Set preserve boundary option.
    #[must_use]
    pub const fn with_preserve_boundary(mut self, preserve: bool) -> Self {
        self.preserve_boundary = preserve;
        self
    }

    /// Set maximum error threshold.
    #[must_use]
    pub const fn with_max_error(mut self, max_error: f64) -> Self {
        self.max_error = Some(max_error);
        self
    }

    /// Set the normal rotation limit in radians.
    #[must_use]
    pub const fn with_max_normal_flip_angle(mut self, radians: f64) -> Self {
        self.max_normal_flip_angle = radians;
        self
    }

    /// Set the singular-system threshold.
    #[must_use]
    pub const fn with_singular_epsilon(mut self, epsilon: f64) -> Self {
        self.singular_epsilon = epsilon;
        self
    }

    /// Set how often the cancellation flag is polled.
    #[must_use]
    pub const fn with_cancel_check_interval(mut self, interval: usize) -> Self {
        self.cancel_check_interval = interval;
        self
    }
}
