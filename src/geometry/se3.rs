//! # SE(3)
//!
//! Special Euclidean Group 3.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

use super::so3::quat_to_mat3;

/// Special Euclidean Group 3.
/// Rigid transformation parameterized by a rotation and translation in $R^3$.
#[derive(Clone, Debug)]
pub struct SE3 {
    /// (3,3) Orthonormal rotation matrix.
    pub rotation: Array2<f64>,
    /// (3,) Translation vector.
    pub translation: Array1<f64>,
}

impl SE3 {
    /// Construct from a scalar-first quaternion and a translation vector.
    pub fn from_quat_wxyz(quat_wxyz: &ArrayView1<f64>, translation: Array1<f64>) -> SE3 {
        Self {
            rotation: quat_to_mat3(quat_wxyz),
            translation,
        }
    }

    /// The identity transformation.
    pub fn identity() -> SE3 {
        Self {
            rotation: Array2::eye(3),
            translation: Array1::zeros(3),
        }
    }

    /// Get the (4,4) homogeneous transformation matrix associated with the rigid transformation.
    pub fn transform_matrix(&self) -> Array2<f64> {
        let mut transform_matrix = Array2::eye(4);
        transform_matrix
            .slice_mut(s![..3, ..3])
            .assign(&self.rotation);
        transform_matrix
            .slice_mut(s![..3, 3])
            .assign(&self.translation);
        transform_matrix
    }

    /// Transform the point cloud from its reference frame to the SE(3) destination.
    pub fn transform_from(&self, point_cloud: &ArrayView2<f64>) -> Array2<f64> {
        point_cloud.dot(&self.rotation.t()) + &self.translation
    }

    /// Invert the SE(3) transformation.
    pub fn inverse(&self) -> SE3 {
        let rotation = self.rotation.t().as_standard_layout().to_owned();
        let translation = rotation.dot(&(-&self.translation));
        Self {
            rotation,
            translation,
        }
    }

    /// Compose (right multiply) an SE(3) with another SE(3).
    pub fn compose(&self, right_se3: &SE3) -> SE3 {
        let chained_transform_matrix = self.transform_matrix().dot(&right_se3.transform_matrix());
        SE3 {
            rotation: chained_transform_matrix
                .slice(s![..3, ..3])
                .as_standard_layout()
                .to_owned(),
            translation: chained_transform_matrix
                .slice(s![..3, 3])
                .as_standard_layout()
                .to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SE3;
    use crate::geometry::so3::yaw_to_quat;
    use ndarray::{array, Array1};

    #[test]
    fn test_inverse_composes_to_identity() {
        let quat_wxyz = yaw_to_quat(0.7);
        let se3 = SE3::from_quat_wxyz(&quat_wxyz.view(), array![1.0, -2.0, 3.0]);
        let round_trip = se3.compose(&se3.inverse()).transform_matrix();
        let identity = SE3::identity().transform_matrix();
        let max_diff = (&round_trip - &identity)
            .mapv(f64::abs)
            .into_iter()
            .fold(0.0, f64::max);
        assert!(max_diff < 1e-12);
    }

    #[test]
    fn test_transform_from_quarter_turn() {
        let quat_wxyz = yaw_to_quat(std::f64::consts::FRAC_PI_2);
        let se3 = SE3::from_quat_wxyz(&quat_wxyz.view(), array![10.0, 0.0, 0.0]);
        let points = array![[1.0, 0.0, 0.0], [0.0, 2.0, 0.5]];
        let transformed = se3.transform_from(&points.view());
        // (1,0,0) rotates onto (0,1,0), then translates.
        assert!((transformed[[0, 0]] - 10.0).abs() < 1e-12);
        assert!((transformed[[0, 1]] - 1.0).abs() < 1e-12);
        // (0,2,0.5) rotates onto (-2,0,0.5), then translates.
        assert!((transformed[[1, 0]] - 8.0).abs() < 1e-12);
        assert!((transformed[[1, 1]]).abs() < 1e-12);
        assert!((transformed[[1, 2]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_compose_order() {
        // `compose(a, b)` applies `b` first.
        let a = SE3::from_quat_wxyz(
            &yaw_to_quat(std::f64::consts::FRAC_PI_2).view(),
            Array1::zeros(3),
        );
        let b = SE3::from_quat_wxyz(&yaw_to_quat(0.0).view(), array![1.0, 0.0, 0.0]);
        let ab = a.compose(&b);
        let points = array![[0.0, 0.0, 0.0]];
        let transformed = ab.transform_from(&points.view());
        // Translate to (1,0,0), then rotate onto (0,1,0).
        assert!((transformed[[0, 0]]).abs() < 1e-12);
        assert!((transformed[[0, 1]] - 1.0).abs() < 1e-12);
    }
}
