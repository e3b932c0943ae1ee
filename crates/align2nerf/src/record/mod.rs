use std::{collections::HashSet, path::Path};

use crate::error::ConvertError;
use crate::transforms::{self, Mat3};

mod csv;
mod xml;

pub use csv::parse_csv;
pub use xml::parse_xml;

/// Frobenius tolerance above which an input rotation is re-orthonormalized.
pub const ROTATION_TOL: f64 = 1e-6;

/// Whether a record's rotation and translation describe camera-to-world or
/// world-to-camera mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseConvention {
    /// Rotation and position map camera space into world space.
    CameraToWorld,
    /// Rotation and translation map world space into camera space.
    WorldToCamera,
}

/// Lens-distortion coefficients in the source export's model.
#[derive(Debug, Clone, PartialEq)]
pub enum Distortion {
    /// No distortion terms in the export.
    None,
    /// Brown polynomial model: radial k1..k4 and tangential p1, p2.
    Brown {
        /// Radial coefficients.
        k: [f64; 4],
        /// Tangential coefficients.
        p: [f64; 2],
    },
    /// Fisheye polynomial model: radial k1..k4.
    Fisheye {
        /// Radial coefficients.
        k: [f64; 4],
    },
}

impl Distortion {
    /// Whether every coefficient is exactly zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Distortion::None => true,
            Distortion::Brown { k, p } => {
                k.iter().all(|c| *c == 0.0) && p.iter().all(|c| *c == 0.0)
            }
            Distortion::Fisheye { k } => k.iter().all(|c| *c == 0.0),
        }
    }
}

/// A raw per-camera record parsed from the alignment export.
///
/// The rotation is already unified into a single orthonormal 3x3 matrix
/// regardless of how the export encoded it.
#[derive(Debug, Clone)]
pub struct CameraRecord {
    /// Image identifier, matches an image file basename.
    pub id: String,
    /// Camera position (or translation for world-to-camera records), source units.
    pub position: [f64; 3],
    /// Rotation matrix in the source axis convention.
    pub rotation: Mat3,
    /// Storage convention of the (rotation, position) pair.
    pub pose: PoseConvention,
    /// Focal length in sensor units (millimetres).
    pub focal_length: f64,
    /// Principal-point offset from the image center, sensor units.
    pub principal_point: [f64; 2],
    /// Physical sensor width and height, sensor units.
    pub sensor_size: [f64; 2],
    /// Lens-distortion coefficients.
    pub distortion: Distortion,
}

/// A rotation as it appears in the export, before unification.
#[derive(Debug, Clone)]
pub enum RotationData {
    /// Row-major 3x3 matrix.
    Matrix(Mat3),
    /// Heading, pitch and roll angles in degrees (extrinsic y-x-z order).
    EulerDegrees {
        /// Rotation about the x axis, degrees.
        heading: f64,
        /// Rotation about the y axis, degrees.
        pitch: f64,
        /// Rotation about the z axis, degrees.
        roll: f64,
    },
    /// Quaternion in `[w, x, y, z]` order.
    Quaternion([f64; 4]),
}

impl RotationData {
    /// Unify the representation into an orthonormal rotation matrix.
    ///
    /// Matrices that drift from orthonormality beyond [`ROTATION_TOL`] are
    /// projected back via SVD and logged, never rejected; export rounding is
    /// common enough that failing would be hostile.
    pub fn into_matrix(self, id: &str) -> Result<Mat3, ConvertError> {
        match self {
            RotationData::Matrix(m) => {
                if transforms::is_orthonormal(&m, ROTATION_TOL) {
                    Ok(m)
                } else {
                    log::warn!("camera `{id}`: rotation is not orthonormal, re-orthonormalizing");
                    Ok(transforms::orthonormalize(&m))
                }
            }
            RotationData::EulerDegrees {
                heading,
                pitch,
                roll,
            } => Ok(transforms::euler_yxz_to_rotation_matrix(
                pitch.to_radians(),
                heading.to_radians(),
                roll.to_radians(),
            )),
            RotationData::Quaternion(q) => transforms::quaternion_to_rotation_matrix(&q).map_err(
                |reason| ConvertError::MalformedRecord {
                    id: id.to_string(),
                    field: "quaternion",
                    reason: reason.to_string(),
                },
            ),
        }
    }
}

/// Read the alignment export and return the camera records in file order.
///
/// Dispatches on the file extension: `.csv` for the tabular export, `.xml`
/// for the tree-structured one.
///
/// # Arguments
///
/// * `path` - The path to the alignment-export file.
///
/// # Returns
///
/// The parsed camera records, identifier-unique, in input order.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<CameraRecord>, ConvertError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| ConvertError::UnsupportedFormat(path.to_path_buf()))?;

    let content = std::fs::read_to_string(path)?;
    let records = if ext == "csv" {
        parse_csv(&content)?
    } else if ext == "xml" {
        parse_xml(&content)?
    } else {
        return Err(ConvertError::UnsupportedFormat(path.to_path_buf()));
    };

    check_unique(&records)?;
    Ok(records)
}

/// Fail with [`ConvertError::DuplicateIdentifier`] if two records share an id.
pub fn check_unique(records: &[CameraRecord]) -> Result<(), ConvertError> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(ConvertError::DuplicateIdentifier(record.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::MAT3_ID;

    fn dummy_record(id: &str) -> CameraRecord {
        CameraRecord {
            id: id.to_string(),
            position: [0.0; 3],
            rotation: MAT3_ID,
            pose: PoseConvention::CameraToWorld,
            focal_length: 35.0,
            principal_point: [0.0; 2],
            sensor_size: [36.0, 24.0],
            distortion: Distortion::None,
        }
    }

    #[test]
    fn test_check_unique() {
        let records = vec![dummy_record("a"), dummy_record("b")];
        assert!(check_unique(&records).is_ok());

        let records = vec![dummy_record("a"), dummy_record("a")];
        assert!(matches!(
            check_unique(&records),
            Err(ConvertError::DuplicateIdentifier(id)) if id == "a"
        ));
    }

    #[test]
    fn test_rotation_representations_agree() -> Result<(), ConvertError> {
        // 90 degrees about z in all three representations
        let m = RotationData::Matrix([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]])
            .into_matrix("m")?;
        let e = RotationData::EulerDegrees {
            heading: 0.0,
            pitch: 0.0,
            roll: 90.0,
        }
        .into_matrix("e")?;
        let half = std::f64::consts::FRAC_PI_4;
        let q = RotationData::Quaternion([half.cos(), 0.0, 0.0, half.sin()]).into_matrix("q")?;

        for i in 0..3 {
            for j in 0..3 {
                approx::assert_relative_eq!(m[i][j], e[i][j], epsilon = 1e-12);
                approx::assert_relative_eq!(m[i][j], q[i][j], epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_noisy_matrix_is_corrected() -> Result<(), ConvertError> {
        let mut noisy = MAT3_ID;
        noisy[0][1] = 1e-3;
        let fixed = RotationData::Matrix(noisy).into_matrix("cam")?;
        assert!(transforms::is_orthonormal(&fixed, 1e-9));
        Ok(())
    }

    #[test]
    fn test_distortion_is_zero() {
        assert!(Distortion::None.is_zero());
        assert!(Distortion::Brown {
            k: [0.0; 4],
            p: [0.0; 2]
        }
        .is_zero());
        assert!(!Distortion::Fisheye {
            k: [0.1, 0.0, 0.0, 0.0]
        }
        .is_zero());
    }
}
