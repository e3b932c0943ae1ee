use crate::record::{CameraRecord, Distortion, PoseConvention, ROTATION_TOL};
use crate::transforms::{self, Mat3};

/// World basis change from the source convention (right-handed, Z up) to the
/// renderer convention (right-handed, Y up). Determinant +1.
pub const WORLD_BASIS: Mat3 = [[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]];

/// Camera basis change from the source camera axes (X right, Y down,
/// Z forward) to the renderer camera axes (X right, Y up, Z backward).
pub const CAMERA_BASIS: Mat3 = [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]];

/// A camera after conversion into the renderer convention.
///
/// The transform is camera-to-world; intrinsics are still sensor-referred and
/// converted later, once the image resolution is known.
#[derive(Debug, Clone)]
pub struct TransformedCamera {
    /// Image identifier, carried through from the record.
    pub id: String,
    /// Camera-to-world rotation in the renderer convention.
    pub rotation: Mat3,
    /// Camera position in the renderer convention.
    pub position: [f64; 3],
    /// Focal length in sensor units.
    pub focal_length: f64,
    /// Principal-point offset from the image center, sensor units.
    pub principal_point: [f64; 2],
    /// Physical sensor size, sensor units.
    pub sensor_size: [f64; 2],
    /// Lens-distortion coefficients.
    pub distortion: Distortion,
}

impl TransformedCamera {
    /// The camera-to-world transform as a 4x4 homogeneous matrix.
    pub fn matrix(&self) -> [[f64; 4]; 4] {
        let (r, t) = (&self.rotation, &self.position);
        [
            [r[0][0], r[0][1], r[0][2], t[0]],
            [r[1][0], r[1][1], r[1][2], t[1]],
            [r[2][0], r[2][1], r[2][2], t[2]],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }
}

/// Apply the fixed basis change to a camera-to-world rotation and position.
///
/// `R_target = B * R_source * F`, `t_target = B * t_source`, where `B` is
/// [`WORLD_BASIS`] and `F` is [`CAMERA_BASIS`].
pub fn apply_basis_change(rotation: &Mat3, position: &[f64; 3]) -> (Mat3, [f64; 3]) {
    let r = transforms::matmul33(&WORLD_BASIS, &transforms::matmul33(rotation, &CAMERA_BASIS));
    let t = transforms::matvec3(&WORLD_BASIS, position);
    (r, t)
}

/// Undo [`apply_basis_change`]. Both basis matrices are orthogonal, so their
/// inverses are their transposes.
pub fn invert_basis_change(rotation: &Mat3, position: &[f64; 3]) -> (Mat3, [f64; 3]) {
    let b_inv = transforms::transpose33(&WORLD_BASIS);
    let f_inv = transforms::transpose33(&CAMERA_BASIS);
    let r = transforms::matmul33(&b_inv, &transforms::matmul33(rotation, &f_inv));
    let t = transforms::matvec3(&b_inv, position);
    (r, t)
}

/// Convert one record from the source convention into the renderer convention.
///
/// World-to-camera records are inverted into camera-to-world form first
/// (`R' = R^T`, `t' = -R^T * t`). The converted rotation is re-checked for
/// orthonormality; numerical drift is corrected rather than propagated.
///
/// This is a pure per-camera operation with no dependency between cameras.
pub fn convert_camera(record: &CameraRecord) -> TransformedCamera {
    let (rotation, position) = match record.pose {
        PoseConvention::CameraToWorld => (record.rotation, record.position),
        PoseConvention::WorldToCamera => {
            let r_inv = transforms::transpose33(&record.rotation);
            let t = transforms::matvec3(&r_inv, &record.position);
            (r_inv, [-t[0], -t[1], -t[2]])
        }
    };

    let (mut rotation, position) = apply_basis_change(&rotation, &position);
    if !transforms::is_orthonormal(&rotation, ROTATION_TOL) {
        log::warn!(
            "camera `{}`: rotation drifted during conversion, re-orthonormalizing",
            record.id
        );
        rotation = transforms::orthonormalize(&rotation);
    }

    TransformedCamera {
        id: record.id.clone(),
        rotation,
        position,
        focal_length: record.focal_length,
        principal_point: record.principal_point,
        sensor_size: record.sensor_size,
        distortion: record.distortion.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::{euler_yxz_to_rotation_matrix, is_orthonormal, MAT3_ID};
    use approx::assert_relative_eq;

    fn record(rotation: Mat3, position: [f64; 3], pose: PoseConvention) -> CameraRecord {
        CameraRecord {
            id: "cam.jpg".to_string(),
            position,
            rotation,
            pose,
            focal_length: 35.0,
            principal_point: [0.0; 2],
            sensor_size: [36.0, 24.0],
            distortion: Distortion::None,
        }
    }

    #[test]
    fn test_basis_change_round_trip() {
        let r = euler_yxz_to_rotation_matrix(0.3, -1.1, 0.7);
        let t = [1.5, -2.5, 4.0];

        let (r2, t2) = apply_basis_change(&r, &t);
        let (r3, t3) = invert_basis_change(&r2, &t2);

        for i in 0..3 {
            assert_relative_eq!(t[i], t3[i], epsilon = 1e-12);
            for j in 0..3 {
                assert_relative_eq!(r[i][j], r3[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_position_permutation() {
        // source Z up maps onto target Y up
        let (_, t) = apply_basis_change(&MAT3_ID, &[0.0, 0.0, 2.0]);
        assert_relative_eq!(t[0], 0.0);
        assert_relative_eq!(t[1], 2.0);
        assert_relative_eq!(t[2], 0.0);
    }

    #[test]
    fn test_conversion_preserves_orthonormality() {
        let r = euler_yxz_to_rotation_matrix(0.2, 0.9, -0.4);
        let cam = convert_camera(&record(r, [1.0, 2.0, 3.0], PoseConvention::CameraToWorld));
        assert!(is_orthonormal(&cam.rotation, 1e-9));
    }

    #[test]
    fn test_world_to_camera_is_inverted_first() {
        let r = euler_yxz_to_rotation_matrix(0.5, 0.1, -0.3);
        let position = [2.0, -1.0, 0.5];

        // store the same pose both ways and expect identical output
        let c2w = convert_camera(&record(r, position, PoseConvention::CameraToWorld));

        let r_w2c = crate::transforms::transpose33(&r);
        let t = crate::transforms::matvec3(&r_w2c, &position);
        let w2c = convert_camera(&record(
            r_w2c,
            [-t[0], -t[1], -t[2]],
            PoseConvention::WorldToCamera,
        ));

        for i in 0..3 {
            assert_relative_eq!(c2w.position[i], w2c.position[i], epsilon = 1e-12);
            for j in 0..3 {
                assert_relative_eq!(c2w.rotation[i][j], w2c.rotation[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_matrix_layout() {
        let cam = convert_camera(&record(MAT3_ID, [1.0, 2.0, 3.0], PoseConvention::CameraToWorld));
        let m = cam.matrix();
        assert_relative_eq!(m[0][3], cam.position[0]);
        assert_relative_eq!(m[1][3], cam.position[1]);
        assert_relative_eq!(m[2][3], cam.position[2]);
        assert_relative_eq!(m[3][3], 1.0);
        assert_relative_eq!(m[3][0], 0.0);
    }
}
