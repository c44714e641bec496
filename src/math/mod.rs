//! Vector math shared by every stage of the pipeline.
//!
//! # Overview
//!
//! - [`Transform`]: a decomposed TRS transform (world or parent space).
//! - [`HostMatrix`]: a 4x4 matrix in the host's row-vector layout.
//! - [`epsilon`]: fixed tolerances and the channel change tests.

pub mod epsilon;
pub mod host_matrix;
pub mod transform;

pub use epsilon::{
    ROTATION_EPSILON, SCALE_CORRECTION_SKIP, SCALE_EPSILON, TRANSLATION_EPSILON, is_rotated,
    is_scaled, is_translated, quat_approx_eq, vec3_approx_eq,
};
pub use host_matrix::HostMatrix;
pub use transform::Transform;
