/// A 3x3 row-major rotation matrix.
pub type Mat3 = [[f64; 3]; 3];

/// The 3x3 identity matrix.
pub const MAT3_ID: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Multiply two 3x3 matrices.
pub fn matmul33(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Transpose a 3x3 matrix.
pub fn transpose33(m: &Mat3) -> Mat3 {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

/// Multiply a 3x3 matrix by a 3-vector.
pub fn matvec3(m: &Mat3, v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Dot product of two 3-vectors.
pub fn dot3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product of two 3-vectors.
pub fn cross3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Euclidean norm of a 3-vector.
pub fn norm3(v: &[f64; 3]) -> f64 {
    dot3(v, v).sqrt()
}

/// Determinant of a 3x3 matrix.
pub fn det33(m: &Mat3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Check that a matrix is orthonormal within the given tolerance.
///
/// The check is the Frobenius distance between `m^T * m` and the identity.
pub fn is_orthonormal(m: &Mat3, tol: f64) -> bool {
    let mtm = matmul33(&transpose33(m), m);
    let mut dist2 = 0.0;
    for (i, row) in mtm.iter().enumerate() {
        for (j, val) in row.iter().enumerate() {
            let target = if i == j { 1.0 } else { 0.0 };
            dist2 += (val - target).powi(2);
        }
    }
    dist2.sqrt() <= tol
}

/// Project a matrix onto the nearest rotation matrix.
///
/// Uses the SVD projection `R = U * V^T`, with the sign of the last singular
/// vector flipped when needed so the result has determinant +1.
///
/// # Arguments
///
/// * `m` - A 3x3 matrix close to a rotation.
///
/// # Returns
///
/// The closest orthonormal matrix with positive determinant.
pub fn orthonormalize(m: &Mat3) -> Mat3 {
    let mut a = faer::Mat::<f64>::zeros(3, 3);
    for (i, row) in m.iter().enumerate() {
        for (j, val) in row.iter().enumerate() {
            a.write(i, j, *val);
        }
    }

    let svd = a.svd();
    let (u, v) = (svd.u(), svd.v());

    let mut u_arr = [[0.0; 3]; 3];
    let mut v_arr = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            u_arr[i][j] = u.read(i, j);
            v_arr[i][j] = v.read(i, j);
        }
    }

    let mut r = matmul33(&u_arr, &transpose33(&v_arr));
    if det33(&r) < 0.0 {
        // flip the least-significant singular direction to stay in SO(3)
        for row in u_arr.iter_mut() {
            row[2] = -row[2];
        }
        r = matmul33(&u_arr, &transpose33(&v_arr));
    }
    r
}

/// Compute the rotation matrix about one of the basis axes.
///
/// # Arguments
///
/// * `basis` - The rotation axis (0: x, 1: y, 2: z).
/// * `angle` - The rotation angle in radians.
fn rotation_about_basis(basis: usize, angle: f64) -> Mat3 {
    let (s, c) = angle.sin_cos();
    match basis {
        0 => [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]],
        1 => [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
        2 => [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]],
        _ => unreachable!("basis must be in [0, 2]"),
    }
}

/// Compute the rotation matrix from extrinsic y-x-z Euler angles.
///
/// This is the angle convention of the alignment export: the composition is
/// `Rz(roll) * Rx(heading) * Ry(pitch)`, all angles in radians.
///
/// # Arguments
///
/// * `pitch` - Rotation about the y axis.
/// * `heading` - Rotation about the x axis.
/// * `roll` - Rotation about the z axis.
///
/// # Returns
///
/// The rotation matrix.
pub fn euler_yxz_to_rotation_matrix(pitch: f64, heading: f64, roll: f64) -> Mat3 {
    matmul33(
        &rotation_about_basis(2, roll),
        &matmul33(
            &rotation_about_basis(0, heading),
            &rotation_about_basis(1, pitch),
        ),
    )
}

/// Compute the rotation matrix from a quaternion.
///
/// # Arguments
///
/// * `q` - The quaternion in `[w, x, y, z]` order, not necessarily unit.
///
/// # Returns
///
/// The rotation matrix, or an error for a zero-norm quaternion.
pub fn quaternion_to_rotation_matrix(q: &[f64; 4]) -> Result<Mat3, &'static str> {
    let norm = (q[0].powi(2) + q[1].powi(2) + q[2].powi(2) + q[3].powi(2)).sqrt();
    if norm < 1e-10 {
        return Err("cannot compute rotation matrix from a zero quaternion");
    }
    let (w, x, y, z) = (q[0] / norm, q[1] / norm, q[2] / norm, q[3] / norm);

    Ok([
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        ],
        [
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        ],
        [
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ])
}

/// Compute the rotation matrix from an axis and angle.
///
/// # Arguments
///
/// * `axis` - The axis of rotation, not necessarily unit.
/// * `angle` - The angle of rotation in radians.
///
/// # Returns
///
/// The rotation matrix, or an error for a zero-length axis.
pub fn axis_angle_to_rotation_matrix(axis: &[f64; 3], angle: f64) -> Result<Mat3, &'static str> {
    let magnitude = (axis[0].powi(2) + axis[1].powi(2) + axis[2].powi(2)).sqrt();
    if magnitude < 1e-10 {
        return Err("cannot compute rotation matrix from a zero vector");
    }
    let (x, y, z) = (axis[0] / magnitude, axis[1] / magnitude, axis[2] / magnitude);

    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;

    Ok([
        [c + x * x * t, x * y * t - z * s, x * z * t + y * s],
        [x * y * t + z * s, c + y * y * t, y * z * t - x * s],
        [x * z * t - y * s, y * z * t + x * s, c + z * z * t],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_mat3_eq(a: &Mat3, b: &Mat3, eps: f64) {
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(a[i][j], b[i][j], epsilon = eps);
            }
        }
    }

    #[test]
    fn test_matmul33_identity() {
        let m = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        assert_mat3_eq(&matmul33(&m, &MAT3_ID), &m, 1e-12);
        assert_mat3_eq(&matmul33(&MAT3_ID, &m), &m, 1e-12);
    }

    #[test]
    fn test_rotation_about_basis_quarter_turns() {
        let rx = rotation_about_basis(0, std::f64::consts::FRAC_PI_2);
        let expected = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        assert_mat3_eq(&rx, &expected, 1e-12);
    }

    #[test]
    fn test_euler_yxz_matches_single_axis() {
        let angle = 0.3;
        assert_mat3_eq(
            &euler_yxz_to_rotation_matrix(angle, 0.0, 0.0),
            &rotation_about_basis(1, angle),
            1e-12,
        );
        assert_mat3_eq(
            &euler_yxz_to_rotation_matrix(0.0, angle, 0.0),
            &rotation_about_basis(0, angle),
            1e-12,
        );
        assert_mat3_eq(
            &euler_yxz_to_rotation_matrix(0.0, 0.0, angle),
            &rotation_about_basis(2, angle),
            1e-12,
        );
    }

    #[test]
    fn test_quaternion_identity() -> Result<(), Box<dyn std::error::Error>> {
        let r = quaternion_to_rotation_matrix(&[1.0, 0.0, 0.0, 0.0])?;
        assert_mat3_eq(&r, &MAT3_ID, 1e-12);
        Ok(())
    }

    #[test]
    fn test_quaternion_quarter_turn_z() -> Result<(), Box<dyn std::error::Error>> {
        // 90 degrees about z
        let half = std::f64::consts::FRAC_PI_4;
        let r = quaternion_to_rotation_matrix(&[half.cos(), 0.0, 0.0, half.sin()])?;
        assert_mat3_eq(&r, &rotation_about_basis(2, std::f64::consts::FRAC_PI_2), 1e-12);
        Ok(())
    }

    #[test]
    fn test_quaternion_zero_fails() {
        assert!(quaternion_to_rotation_matrix(&[0.0, 0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_axis_angle_matches_basis() -> Result<(), Box<dyn std::error::Error>> {
        let r = axis_angle_to_rotation_matrix(&[0.0, 1.0, 0.0], 0.7)?;
        assert_mat3_eq(&r, &rotation_about_basis(1, 0.7), 1e-12);
        Ok(())
    }

    #[test]
    fn test_is_orthonormal() {
        assert!(is_orthonormal(&MAT3_ID, 1e-9));
        let r = rotation_about_basis(2, 1.1);
        assert!(is_orthonormal(&r, 1e-9));
        let mut skewed = r;
        skewed[0][0] += 1e-2;
        assert!(!is_orthonormal(&skewed, 1e-6));
    }

    #[test]
    fn test_orthonormalize_recovers_rotation() {
        let r = euler_yxz_to_rotation_matrix(0.4, -0.2, 1.3);
        let mut noisy = r;
        for row in noisy.iter_mut() {
            for val in row.iter_mut() {
                *val += 1e-4;
            }
        }
        let fixed = orthonormalize(&noisy);
        assert!(is_orthonormal(&fixed, 1e-9));
        assert!(det33(&fixed) > 0.0);
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(fixed[i][j], r[i][j], epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_orthonormalize_fixes_reflection() {
        // a reflection has determinant -1 and must be pushed back into SO(3)
        let reflection = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]];
        let fixed = orthonormalize(&reflection);
        assert!(is_orthonormal(&fixed, 1e-9));
        assert!(det33(&fixed) > 0.0);
    }
}
