use ndarray::{arr1, arr2, Array1, Array2, ArrayView1, ArrayView2};

/// Right-handed 3D rotations for aim-vector corrections.
pub struct MatrixHelper;

impl MatrixHelper {
    /// Multiply two 2D arrays.
    pub fn multiply(lhs: ArrayView2<f64>, rhs: ArrayView2<f64>) -> Array2<f64> {
        lhs.dot(&rhs)
    }

    pub fn apply(matrix: ArrayView2<f64>, vector: ArrayView1<f64>) -> Array1<f64> {
        matrix.dot(&vector)
    }

    /// Rotation about the vertical axis.
    pub fn rotation_z(angle_rad: f64) -> Array2<f64> {
        let (s, c) = angle_rad.sin_cos();
        arr2(&[[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Rotation about the horizontal y axis.
    pub fn rotation_y(angle_rad: f64) -> Array2<f64> {
        let (s, c) = angle_rad.sin_cos();
        arr2(&[[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]])
    }

    /// Unit vector for a bearing (x toward bearing zero) and an elevation.
    pub fn aim_vector(bearing_rad: f64, elevation_rad: f64) -> Array1<f64> {
        let (sin_b, cos_b) = bearing_rad.sin_cos();
        let (sin_e, cos_e) = elevation_rad.sin_cos();
        arr1(&[cos_e * cos_b, cos_e * sin_b, sin_e])
    }
}
