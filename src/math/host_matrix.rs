use glam::{Mat4, Vec3};

use super::transform::Transform;

/// A 4x4 matrix in the host application's row-vector layout.
///
/// Points are transformed as `p' = p * M`: the first three rows hold the
/// images of the basis vectors and the last row holds the translation.
/// Reading those rows as glam columns gives the equivalent column-vector
/// matrix, so the conversion is a reinterpretation, not a transpose.
/// Reading them as glam rows would yield the inverse rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostMatrix {
    rows: [[f32; 4]; 4],
}

impl Default for HostMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl HostMatrix {
    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    #[must_use]
    pub const fn from_rows(rows: [[f32; 4]; 4]) -> Self {
        Self { rows }
    }

    #[must_use]
    pub const fn rows(&self) -> &[[f32; 4]; 4] {
        &self.rows
    }

    /// Converts from a glam column-vector matrix.
    #[must_use]
    pub fn from_mat4(mat: Mat4) -> Self {
        Self {
            rows: mat.to_cols_array_2d(),
        }
    }

    /// Builds the host matrix of a TRS transform.
    #[must_use]
    pub fn from_transform(transform: &Transform) -> Self {
        Self::from_mat4(transform.to_matrix())
    }

    /// The equivalent glam column-vector matrix.
    #[must_use]
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.rows)
    }

    #[must_use]
    pub fn translation(&self) -> Vec3 {
        let [x, y, z, _] = self.rows[3];
        Vec3::new(x, y, z)
    }

    #[must_use]
    pub fn decompose(&self) -> Transform {
        Transform::from_matrix(self.to_mat4())
    }
}
