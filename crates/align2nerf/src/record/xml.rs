use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{CameraRecord, Distortion, PoseConvention, RotationData};
use crate::error::ConvertError;
use crate::transforms::Mat3;

/// Sensor frame assumed when the export does not state one, millimetres.
const DEFAULT_SENSOR_MM: [f64; 2] = [36.0, 24.0];

/// Which text-bearing element is currently open.
enum TextTarget {
    Rotation,
    Quaternion,
}

#[derive(Default)]
struct CameraBuilder {
    id: String,
    world_to_camera: bool,
    position: Option<[f64; 3]>,
    rotation: Option<RotationData>,
    focal_length: Option<f64>,
    principal_point: [f64; 2],
    sensor_size: Option<[f64; 2]>,
    distortion: Option<Distortion>,
}

/// Parse the tree-structured (XML) alignment export.
///
/// Each `<camera id="...">` element carries a `<position x y z>` child, one
/// rotation child (`<rotation>` with nine row-major floats, `<quaternion>`
/// with `w x y z`, or `<euler heading pitch roll>` in degrees), an
/// `<intrinsics f sw sh px py>` child and an optional
/// `<distortion model="brown|fisheye" ...>` child. A `pose="w2c"` attribute
/// marks records stored world-to-camera.
///
/// # Arguments
///
/// * `content` - The full text of the export.
///
/// # Returns
///
/// The camera records in document order.
pub fn parse_xml(content: &str) -> Result<Vec<CameraRecord>, ConvertError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<CameraBuilder> = None;
    let mut text_target: Option<TextTarget> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"camera" => current = Some(begin_camera(&e)?),
                // text-bearing children; everything else is attribute-based
                b"rotation" => text_target = Some(TextTarget::Rotation),
                b"quaternion" => text_target = Some(TextTarget::Quaternion),
                _ => fill_child(&e, current.as_mut())?,
            },
            Event::Empty(e) => fill_child(&e, current.as_mut())?,
            Event::Text(t) => {
                if let (Some(target), Some(builder)) = (text_target.as_ref(), current.as_mut()) {
                    let text = String::from_utf8_lossy(&t).into_owned();
                    builder.rotation = Some(parse_rotation_text(target, &text, &builder.id)?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"camera" => {
                    if let Some(builder) = current.take() {
                        records.push(builder.build()?);
                    }
                }
                b"rotation" | b"quaternion" => text_target = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

fn fill_child(e: &BytesStart, current: Option<&mut CameraBuilder>) -> Result<(), ConvertError> {
    let Some(builder) = current else {
        return Ok(());
    };

    match e.name().as_ref() {
        b"position" => {
            builder.position = Some([
                attr_num(e, &builder.id, "x")?,
                attr_num(e, &builder.id, "y")?,
                attr_num(e, &builder.id, "z")?,
            ]);
        }
        b"euler" => {
            builder.rotation = Some(RotationData::EulerDegrees {
                heading: attr_num(e, &builder.id, "heading")?,
                pitch: attr_num(e, &builder.id, "pitch")?,
                roll: attr_num(e, &builder.id, "roll")?,
            });
        }
        b"intrinsics" => {
            builder.focal_length = Some(attr_num(e, &builder.id, "f")?);
            builder.sensor_size = Some([
                attr_num_or(e, &builder.id, "sw", DEFAULT_SENSOR_MM[0])?,
                attr_num_or(e, &builder.id, "sh", DEFAULT_SENSOR_MM[1])?,
            ]);
            builder.principal_point = [
                attr_num_or(e, &builder.id, "px", 0.0)?,
                attr_num_or(e, &builder.id, "py", 0.0)?,
            ];
        }
        b"distortion" => {
            builder.distortion = Some(parse_distortion(e, &builder.id)?);
        }
        _ => {}
    }
    Ok(())
}

impl CameraBuilder {
    fn build(self) -> Result<CameraRecord, ConvertError> {
        let missing = |field: &'static str| ConvertError::MalformedRecord {
            id: self.id.clone(),
            field,
            reason: "field is missing".to_string(),
        };

        let position = self.position.ok_or_else(|| missing("position"))?;
        let rotation = self
            .rotation
            .clone()
            .ok_or_else(|| missing("rotation"))?
            .into_matrix(&self.id)?;
        let focal_length = self.focal_length.ok_or_else(|| missing("f"))?;

        Ok(CameraRecord {
            id: self.id,
            position,
            rotation,
            pose: if self.world_to_camera {
                PoseConvention::WorldToCamera
            } else {
                PoseConvention::CameraToWorld
            },
            focal_length,
            principal_point: self.principal_point,
            sensor_size: self.sensor_size.unwrap_or(DEFAULT_SENSOR_MM),
            distortion: self.distortion.unwrap_or(Distortion::None),
        })
    }
}

fn begin_camera(e: &BytesStart) -> Result<CameraBuilder, ConvertError> {
    let id = attr_text(e, "id")?.ok_or_else(|| ConvertError::MalformedRecord {
        id: "<camera>".to_string(),
        field: "id",
        reason: "field is missing".to_string(),
    })?;
    if id.is_empty() {
        return Err(ConvertError::MalformedRecord {
            id: "<camera>".to_string(),
            field: "id",
            reason: "empty identifier".to_string(),
        });
    }

    let world_to_camera = matches!(attr_text(e, "pose")?.as_deref(), Some("w2c"));
    Ok(CameraBuilder {
        id,
        world_to_camera,
        ..Default::default()
    })
}

fn parse_distortion(e: &BytesStart, id: &str) -> Result<Distortion, ConvertError> {
    let model = attr_text(e, "model")?.unwrap_or_else(|| "brown".to_string());
    let k = [
        attr_num_or(e, id, "k1", 0.0)?,
        attr_num_or(e, id, "k2", 0.0)?,
        attr_num_or(e, id, "k3", 0.0)?,
        attr_num_or(e, id, "k4", 0.0)?,
    ];
    match model.as_str() {
        "brown" => Ok(Distortion::Brown {
            k,
            p: [attr_num_or(e, id, "p1", 0.0)?, attr_num_or(e, id, "p2", 0.0)?],
        }),
        "fisheye" => Ok(Distortion::Fisheye { k }),
        other => Err(ConvertError::MalformedRecord {
            id: id.to_string(),
            field: "distortion",
            reason: format!("unknown model `{other}`"),
        }),
    }
}

fn parse_rotation_text(
    target: &TextTarget,
    text: &str,
    id: &str,
) -> Result<RotationData, ConvertError> {
    let (field, expected) = match target {
        TextTarget::Rotation => ("rotation", 9),
        TextTarget::Quaternion => ("quaternion", 4),
    };

    let values = text
        .split_whitespace()
        .map(|s| {
            s.parse::<f64>().map_err(|e| ConvertError::MalformedRecord {
                id: id.to_string(),
                field,
                reason: format!("`{s}`: {e}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if values.len() != expected {
        return Err(ConvertError::MalformedRecord {
            id: id.to_string(),
            field,
            reason: format!("expected {expected} values, got {}", values.len()),
        });
    }

    Ok(match target {
        TextTarget::Rotation => {
            let mut m: Mat3 = [[0.0; 3]; 3];
            for (i, row) in m.iter_mut().enumerate() {
                row.copy_from_slice(&values[i * 3..i * 3 + 3]);
            }
            RotationData::Matrix(m)
        }
        TextTarget::Quaternion => {
            RotationData::Quaternion([values[0], values[1], values[2], values[3]])
        }
    })
}

fn attr_text(e: &BytesStart, name: &str) -> Result<Option<String>, ConvertError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(String::from_utf8_lossy(&attr.value).into_owned()));
        }
    }
    Ok(None)
}

fn attr_num(e: &BytesStart, id: &str, name: &'static str) -> Result<f64, ConvertError> {
    match attr_text(e, name)? {
        Some(raw) => raw.parse::<f64>().map_err(|err| ConvertError::MalformedRecord {
            id: id.to_string(),
            field: name,
            reason: format!("`{raw}`: {err}"),
        }),
        None => Err(ConvertError::MalformedRecord {
            id: id.to_string(),
            field: name,
            reason: "field is missing".to_string(),
        }),
    }
}

fn attr_num_or(
    e: &BytesStart,
    id: &str,
    name: &'static str,
    default: f64,
) -> Result<f64, ConvertError> {
    match attr_text(e, name)? {
        Some(raw) => raw.parse::<f64>().map_err(|err| ConvertError::MalformedRecord {
            id: id.to_string(),
            field: name,
            reason: format!("`{raw}`: {err}"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EXPORT: &str = r#"<?xml version="1.0"?>
<scene>
  <camera id="IMG_0001.jpg">
    <position x="1.0" y="2.0" z="3.0"/>
    <rotation>1 0 0 0 1 0 0 0 1</rotation>
    <intrinsics f="35.0" sw="36.0" sh="24.0" px="0.1" py="-0.1"/>
    <distortion model="brown" k1="0.01" k2="0.001"/>
  </camera>
  <camera id="IMG_0002.jpg" pose="w2c">
    <position x="0.0" y="0.0" z="-4.0"/>
    <quaternion>1 0 0 0</quaternion>
    <intrinsics f="50.0"/>
  </camera>
</scene>
"#;

    #[test]
    fn test_parse_two_cameras() -> Result<(), ConvertError> {
        let records = parse_xml(EXPORT)?;
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.id, "IMG_0001.jpg");
        assert_eq!(first.pose, PoseConvention::CameraToWorld);
        assert_relative_eq!(first.position[1], 2.0);
        assert_relative_eq!(first.rotation[0][0], 1.0);
        assert_relative_eq!(first.principal_point[0], 0.1);
        match &first.distortion {
            Distortion::Brown { k, .. } => assert_relative_eq!(k[0], 0.01),
            other => panic!("unexpected distortion {other:?}"),
        }

        let second = &records[1];
        assert_eq!(second.pose, PoseConvention::WorldToCamera);
        assert_relative_eq!(second.focal_length, 50.0);
        assert_relative_eq!(second.sensor_size[0], 36.0);
        assert!(second.distortion.is_zero());
        Ok(())
    }

    #[test]
    fn test_euler_rotation_element() -> Result<(), ConvertError> {
        let export = r#"<scene><camera id="a.jpg">
            <position x="0" y="0" z="0"/>
            <euler heading="90" pitch="0" roll="0"/>
            <intrinsics f="35"/>
        </camera></scene>"#;
        let records = parse_xml(export)?;
        assert_relative_eq!(records[0].rotation[2][1], 1.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_missing_rotation_fails() {
        let export = r#"<scene><camera id="a.jpg">
            <position x="0" y="0" z="0"/>
            <intrinsics f="35"/>
        </camera></scene>"#;
        assert!(matches!(
            parse_xml(export),
            Err(ConvertError::MalformedRecord {
                field: "rotation",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_focal_fails() {
        let export = r#"<scene><camera id="a.jpg">
            <position x="0" y="0" z="0"/>
            <rotation>1 0 0 0 1 0 0 0 1</rotation>
        </camera></scene>"#;
        assert!(matches!(
            parse_xml(export),
            Err(ConvertError::MalformedRecord { field: "f", .. })
        ));
    }

    #[test]
    fn test_bad_matrix_length_fails() {
        let export = r#"<scene><camera id="a.jpg">
            <position x="0" y="0" z="0"/>
            <rotation>1 0 0 0 1 0</rotation>
            <intrinsics f="35"/>
        </camera></scene>"#;
        assert!(matches!(
            parse_xml(export),
            Err(ConvertError::MalformedRecord {
                field: "rotation",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_distortion_model_fails() {
        let export = r#"<scene><camera id="a.jpg">
            <position x="0" y="0" z="0"/>
            <rotation>1 0 0 0 1 0 0 0 1</rotation>
            <intrinsics f="35"/>
            <distortion model="division" k1="0.5"/>
        </camera></scene>"#;
        assert!(matches!(
            parse_xml(export),
            Err(ConvertError::MalformedRecord {
                field: "distortion",
                ..
            })
        ));
    }
}
