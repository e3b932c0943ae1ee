use crate::convert::TransformedCamera;
use crate::transforms::{self, Mat3, MAT3_ID};

/// Which of the scene-global corrections are enabled.
///
/// A disabled correction becomes the identity (scale 1, zero centroid,
/// identity rotation) so the pipeline shape stays the same either way.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Derive the scene scale from the camera spread.
    pub auto_scale: bool,
    /// Recenter the cameras around their centroid.
    pub auto_center: bool,
    /// Rotate the rig so its mean up-axis matches world +Y.
    pub auto_orient: bool,
    /// User scale factor, multiplied onto the derived (or unit) scale.
    pub scene_scale: f64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            auto_scale: true,
            auto_center: true,
            auto_orient: true,
            scene_scale: 1.0,
        }
    }
}

/// The scene-global normalization, computed once from the complete camera set.
#[derive(Debug, Clone)]
pub struct SceneNormalization {
    /// Rig orientation correction, applied about the origin first.
    pub orientation: Mat3,
    /// Centroid of the (orientation-corrected) camera positions.
    pub centroid: [f64; 3],
    /// Uniform scale applied to the recentered positions.
    pub scale: f64,
}

impl SceneNormalization {
    /// The no-op normalization.
    pub fn identity() -> Self {
        Self {
            orientation: MAT3_ID,
            centroid: [0.0; 3],
            scale: 1.0,
        }
    }
}

/// Positions closer than this to the centroid do not define a radius.
const DEGENERATE_RADIUS: f64 = 1e-12;

/// Compute the shared normalization from all camera positions.
///
/// This is deliberately a second pass over the full set: every camera must be
/// loaded before any normalization constant exists, otherwise per-camera
/// drift creeps in.
///
/// - orientation: rotation taking the mean camera up-axis onto world +Y;
/// - centroid: arithmetic mean of the corrected positions;
/// - scale: inverse bounding-sphere radius about the centroid, times the user
///   factor. A single camera (or a degenerate rig) keeps scale at the user
///   factor.
pub fn compute_normalization(
    cameras: &[TransformedCamera],
    opts: &NormalizeOptions,
) -> SceneNormalization {
    let orientation = if opts.auto_orient {
        orientation_correction(cameras)
    } else {
        MAT3_ID
    };

    let positions = cameras
        .iter()
        .map(|cam| transforms::matvec3(&orientation, &cam.position))
        .collect::<Vec<_>>();

    let centroid = if opts.auto_center && !positions.is_empty() {
        let mut sum = [0.0; 3];
        for p in &positions {
            sum[0] += p[0];
            sum[1] += p[1];
            sum[2] += p[2];
        }
        let n = positions.len() as f64;
        [sum[0] / n, sum[1] / n, sum[2] / n]
    } else {
        [0.0; 3]
    };

    let scale = if opts.auto_scale {
        let radius = positions
            .iter()
            .map(|p| {
                transforms::norm3(&[p[0] - centroid[0], p[1] - centroid[1], p[2] - centroid[2]])
            })
            .fold(0.0, f64::max);
        if radius > DEGENERATE_RADIUS {
            opts.scene_scale / radius
        } else {
            opts.scene_scale
        }
    } else {
        opts.scene_scale
    };

    SceneNormalization {
        orientation,
        centroid,
        scale,
    }
}

/// Apply the shared normalization to every camera in place.
///
/// Rotations only pick up the orientation correction; uniform scale and
/// translation leave them untouched.
pub fn apply_normalization(cameras: &mut [TransformedCamera], normalization: &SceneNormalization) {
    for cam in cameras.iter_mut() {
        cam.rotation = transforms::matmul33(&normalization.orientation, &cam.rotation);
        let p = transforms::matvec3(&normalization.orientation, &cam.position);
        cam.position = [
            (p[0] - normalization.centroid[0]) * normalization.scale,
            (p[1] - normalization.centroid[1]) * normalization.scale,
            (p[2] - normalization.centroid[2]) * normalization.scale,
        ];
    }
}

/// Rotation aligning the mean camera up-axis with world +Y.
///
/// The up-axis of one camera is the second column of its camera-to-world
/// rotation. Degenerate means (a rig whose up-vectors cancel out) yield the
/// identity; an anti-parallel mean yields a half turn about X.
fn orientation_correction(cameras: &[TransformedCamera]) -> Mat3 {
    let mut mean_up = [0.0; 3];
    for cam in cameras {
        mean_up[0] += cam.rotation[0][1];
        mean_up[1] += cam.rotation[1][1];
        mean_up[2] += cam.rotation[2][1];
    }

    let norm = transforms::norm3(&mean_up);
    if norm < DEGENERATE_RADIUS {
        return MAT3_ID;
    }
    let up = [mean_up[0] / norm, mean_up[1] / norm, mean_up[2] / norm];

    let target = [0.0, 1.0, 0.0];
    let axis = transforms::cross3(&up, &target);
    let angle = transforms::norm3(&axis).atan2(transforms::dot3(&up, &target));

    match transforms::axis_angle_to_rotation_matrix(&axis, angle) {
        Ok(rotation) => rotation,
        // axis vanishes when up is already (anti)parallel to the target
        Err(_) => {
            if transforms::dot3(&up, &target) > 0.0 {
                MAT3_ID
            } else {
                [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]]
            }
        }
    }
}
