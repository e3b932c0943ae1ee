use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::convert::{self, TransformedCamera};
use crate::error::ConvertError;
use crate::intrinsics::{self, DistortionPolicy};
use crate::normalize::{self, NormalizeOptions};
use crate::record::CameraRecord;
use crate::resolution::ResolutionLookup;

/// Configuration for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Spatial acceleration-structure hint for the trainer. Unrelated to the
    /// geometric normalization scale.
    pub aabb_scale: u32,
    /// Scene-global normalization flags and user scale factor.
    pub normalize: NormalizeOptions,
    /// What to do with cameras whose distortion model cannot be represented.
    pub distortion_policy: DistortionPolicy,
    /// Emit frames for identifiers without a matching image, using
    /// `placeholder_resolution`, instead of failing the run.
    pub ignore_missing_images: bool,
    /// Resolution assumed for missing images in debug mode.
    pub placeholder_resolution: (u32, u32),
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            aabb_scale: 16,
            normalize: NormalizeOptions::default(),
            distortion_policy: DistortionPolicy::default(),
            ignore_missing_images: false,
            placeholder_resolution: (1920, 1080),
        }
    }
}

/// One per-camera entry of the scene document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFrame {
    /// Reference to the image file.
    pub file_path: String,
    /// Image width in pixels.
    pub w: u32,
    /// Image height in pixels.
    pub h: u32,
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
    /// Radial distortion coefficient.
    pub k1: f64,
    /// Radial distortion coefficient.
    pub k2: f64,
    /// Radial distortion coefficient.
    pub k3: f64,
    /// Radial distortion coefficient.
    pub k4: f64,
    /// Tangential distortion coefficient.
    pub p1: f64,
    /// Tangential distortion coefficient.
    pub p2: f64,
    /// Camera-to-world transform, row-major 4x4.
    pub transform_matrix: [[f64; 4]; 4],
}

/// The assembled scene document, serialized as the trainer's input JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Spatial acceleration-structure hint for the trainer.
    pub aabb_scale: u32,
    /// Per-camera entries, in input record order.
    pub frames: Vec<SceneFrame>,
}

impl SceneDocument {
    /// Serialize the document as pretty-printed JSON to `path`.
    ///
    /// The file is only created here, after the document fully assembled;
    /// a failed run never leaves a partial output behind.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConvertError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Run the full pipeline: convert, normalize, build intrinsics, assemble.
///
/// Record order is preserved in the output. This is the only stage touching
/// the image lookup; an identifier with no image fails with
/// [`ConvertError::MissingImage`] unless the debug ignore mode is on, in
/// which case the frame is emitted with the placeholder resolution.
///
/// # Arguments
///
/// * `records` - Parsed camera records, identifier-unique.
/// * `lookup` - Image-resolution collaborator.
/// * `config` - Run configuration.
///
/// # Returns
///
/// The assembled document, or the first fatal error.
pub fn convert_scene(
    records: &[CameraRecord],
    lookup: &dyn ResolutionLookup,
    config: &ConvertConfig,
) -> Result<SceneDocument, ConvertError> {
    crate::record::check_unique(records)?;

    let mut cameras = records
        .iter()
        .map(convert::convert_camera)
        .collect::<Vec<_>>();

    // scale and centroid need the complete set; no streaming here
    let normalization = normalize::compute_normalization(&cameras, &config.normalize);
    normalize::apply_normalization(&mut cameras, &normalization);
    log::debug!(
        "normalization: scale={:.6}, centroid=({:.4}, {:.4}, {:.4})",
        normalization.scale,
        normalization.centroid[0],
        normalization.centroid[1],
        normalization.centroid[2]
    );

    let mut frames = Vec::with_capacity(cameras.len());
    for camera in &cameras {
        let frame = assemble_frame(camera, lookup, config)?;
        match frame {
            Some(frame) => frames.push(frame),
            None => log::warn!("camera `{}`: dropped from the output", camera.id),
        }
    }

    Ok(SceneDocument {
        aabb_scale: config.aabb_scale,
        frames,
    })
}

fn assemble_frame(
    camera: &TransformedCamera,
    lookup: &dyn ResolutionLookup,
    config: &ConvertConfig,
) -> Result<Option<SceneFrame>, ConvertError> {
    let (file_path, (w, h)) = match (lookup.file_name(&camera.id), lookup.dimensions(&camera.id)) {
        (Some(name), Some(dims)) => (name, dims),
        _ if config.ignore_missing_images => {
            log::warn!(
                "camera `{}`: no matching image, emitting placeholder resolution",
                camera.id
            );
            (camera.id.clone(), config.placeholder_resolution)
        }
        _ => return Err(ConvertError::MissingImage(camera.id.clone())),
    };

    let intrinsics = match intrinsics::build_intrinsics(camera, w, h) {
        Ok(intrinsics) => intrinsics,
        Err(err @ ConvertError::UnsupportedDistortionModel { .. }) => {
            return match config.distortion_policy {
                DistortionPolicy::Abort => Err(err),
                DistortionPolicy::DropCamera => {
                    log::warn!("{err}");
                    Ok(None)
                }
            };
        }
        Err(err) => return Err(err),
    };

    Ok(Some(SceneFrame {
        file_path,
        w,
        h,
        fl_x: intrinsics.fl_x,
        fl_y: intrinsics.fl_y,
        cx: intrinsics.cx,
        cy: intrinsics.cy,
        camera_angle_x: intrinsics.camera_angle_x,
        camera_angle_y: intrinsics.camera_angle_y,
        k1: intrinsics.k[0],
        k2: intrinsics.k[1],
        k3: intrinsics.k[2],
        k4: intrinsics.k[3],
        p1: intrinsics.p[0],
        p2: intrinsics.p[1],
        transform_matrix: camera.matrix(),
    }))
}
