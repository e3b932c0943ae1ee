use crate::convert::TransformedCamera;
use crate::error::ConvertError;
use crate::record::Distortion;

/// What to do when a camera's distortion model cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistortionPolicy {
    /// Abort the whole run.
    #[default]
    Abort,
    /// Drop the camera from the output with a warning.
    DropCamera,
}

/// Pixel-referred intrinsics for one camera, as the output format wants them.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length in pixels, x axis.
    pub fl_x: f64,
    /// Focal length in pixels, y axis.
    pub fl_y: f64,
    /// Principal point in pixels, x axis.
    pub cx: f64,
    /// Principal point in pixels, y axis.
    pub cy: f64,
    /// Horizontal field of view in radians.
    pub camera_angle_x: f64,
    /// Vertical field of view in radians.
    pub camera_angle_y: f64,
    /// Radial distortion coefficients k1..k4.
    pub k: [f64; 4],
    /// Tangential distortion coefficients p1, p2.
    pub p: [f64; 2],
}

/// Convert one camera's sensor-referred intrinsics into pixel units.
///
/// With focal length `f` and sensor width `sw`, the pixel focal length is
/// `fx = f * (w / sw)`; the export carries a single focal length, so square
/// pixels are assumed and `fy = fx`. The principal point is the image center
/// plus the sensor offset scaled the same way, and the field of view follows
/// as `2 * atan(w / (2 * fx))`.
///
/// Every camera converts independently; nothing here assumes a shared focal
/// length across the scene.
///
/// # Arguments
///
/// * `camera` - The converted camera carrying sensor-referred intrinsics.
/// * `width` - Image width in pixels.
/// * `height` - Image height in pixels.
///
/// # Returns
///
/// The pixel-referred intrinsics, or
/// [`ConvertError::UnsupportedDistortionModel`] when the camera carries
/// nonzero coefficients of a model the output format cannot express.
pub fn build_intrinsics(
    camera: &TransformedCamera,
    width: u32,
    height: u32,
) -> Result<CameraIntrinsics, ConvertError> {
    let (w, h) = (width as f64, height as f64);
    let [sw, sh] = camera.sensor_size;

    let fl_x = camera.focal_length * (w / sw);
    let fl_y = fl_x;

    let cx = w / 2.0 + camera.principal_point[0] * (w / sw);
    let cy = h / 2.0 + camera.principal_point[1] * (h / sh);

    let camera_angle_x = 2.0 * (w / (2.0 * fl_x)).atan();
    let camera_angle_y = 2.0 * (h / (2.0 * fl_y)).atan();

    // nonzero coefficients of a model without a target equivalent are an
    // error, never silently dropped
    let (k, p) = match &camera.distortion {
        Distortion::None => ([0.0; 4], [0.0; 2]),
        Distortion::Brown { k, p } => (*k, *p),
        Distortion::Fisheye { k } => {
            if camera.distortion.is_zero() {
                ([0.0; 4], [0.0; 2])
            } else {
                return Err(ConvertError::UnsupportedDistortionModel {
                    id: camera.id.clone(),
                    model: "fisheye".to_string(),
                });
            }
        }
    };
    Ok(CameraIntrinsics {
        fl_x,
        fl_y,
        cx,
        cy,
        camera_angle_x,
        camera_angle_y,
        k,
        p,
    })
}
