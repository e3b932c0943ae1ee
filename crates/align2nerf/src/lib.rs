#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the conversion pipeline.
pub mod error;

/// Per-camera coordinate-convention conversion.
pub mod convert;

/// Sensor-referred to pixel-referred intrinsics.
pub mod intrinsics;

/// Scene-global normalization (scale, centering, orientation).
pub mod normalize;

/// Alignment-export parsers and raw record types.
pub mod record;

/// Image-resolution lookup collaborators.
pub mod resolution;

/// Scene document assembly and the output schema.
pub mod scene;

/// Rotation construction and small fixed-size matrix helpers.
pub mod transforms;

pub use error::ConvertError;
pub use scene::{convert_scene, ConvertConfig, SceneDocument};
