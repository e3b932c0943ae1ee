use std::collections::HashMap;

use super::{CameraRecord, Distortion, PoseConvention, RotationData};
use crate::error::ConvertError;

/// Columns that every row of the tabular export must carry.
const REQUIRED_COLUMNS: [&str; 8] = ["#name", "x", "y", "alt", "heading", "pitch", "roll", "f"];

/// Width and height of the 35mm-equivalent sensor frame the export is
/// referred to, in millimetres.
const SENSOR_FRAME_MM: [f64; 2] = [36.0, 24.0];

/// Parse the tabular (CSV) alignment export.
///
/// Expected header:
/// `#name,x,y,alt,heading,pitch,roll,f,px,py,k1,k2,k3,k4,t1,t2` — angles in
/// degrees, focal length and principal point in 35mm-equivalent millimetres.
/// The distortion columns are optional and default to zero.
///
/// # Arguments
///
/// * `content` - The full text of the export.
///
/// # Returns
///
/// The camera records in row order.
pub fn parse_csv(content: &str) -> Result<Vec<CameraRecord>, ConvertError> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or_else(|| ConvertError::MalformedRecord {
        id: "<header>".to_string(),
        field: "#name",
        reason: "empty file".to_string(),
    })?;

    let columns: HashMap<&str, usize> = header
        .split(',')
        .map(|name| name.trim())
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(required) {
            return Err(ConvertError::MalformedRecord {
                id: "<header>".to_string(),
                field: "#name",
                reason: format!("missing required column `{required}`"),
            });
        }
    }

    lines.map(|line| parse_row(line, &columns)).collect()
}

fn parse_row(line: &str, columns: &HashMap<&str, usize>) -> Result<CameraRecord, ConvertError> {
    let parts = line.split(',').map(|p| p.trim()).collect::<Vec<_>>();

    let id = field(&parts, columns, "<row>", "#name")?.to_string();
    if id.is_empty() {
        return Err(ConvertError::MalformedRecord {
            id: "<row>".to_string(),
            field: "#name",
            reason: "empty identifier".to_string(),
        });
    }

    let num = |name: &'static str| -> Result<f64, ConvertError> {
        let raw = field(&parts, columns, &id, name)?;
        raw.parse::<f64>()
            .map_err(|e| ConvertError::MalformedRecord {
                id: id.clone(),
                field: name,
                reason: format!("`{raw}`: {e}"),
            })
    };
    // absent optional columns read as zero
    let opt = |name: &'static str| -> Result<f64, ConvertError> {
        if columns.contains_key(name) {
            num(name)
        } else {
            Ok(0.0)
        }
    };

    let position = [num("x")?, num("y")?, num("alt")?];
    let rotation = RotationData::EulerDegrees {
        heading: num("heading")?,
        pitch: num("pitch")?,
        roll: num("roll")?,
    }
    .into_matrix(&id)?;
    let focal_length = num("f")?;
    let principal_point = [opt("px")?, opt("py")?];
    let distortion = Distortion::Brown {
        k: [opt("k1")?, opt("k2")?, opt("k3")?, opt("k4")?],
        p: [opt("t1")?, opt("t2")?],
    };

    Ok(CameraRecord {
        id,
        position,
        rotation,
        pose: PoseConvention::CameraToWorld,
        focal_length,
        principal_point,
        sensor_size: SENSOR_FRAME_MM,
        distortion,
    })
}

fn field<'a>(
    parts: &[&'a str],
    columns: &HashMap<&str, usize>,
    id: &str,
    name: &'static str,
) -> Result<&'a str, ConvertError> {
    columns
        .get(name)
        .and_then(|i| parts.get(*i).copied())
        .ok_or_else(|| ConvertError::MalformedRecord {
            id: id.to_string(),
            field: name,
            reason: "field is missing".to_string(),
        })
}
