/// An error type for the conversion pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    /// A required record field is absent or not numeric.
    #[error("Malformed record `{id}`: field `{field}` {reason}")]
    MalformedRecord {
        /// Camera identifier, or the 1-based line/element index when the
        /// identifier itself could not be read.
        id: String,
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Two records share the same identifier.
    #[error("Duplicate camera identifier `{0}`")]
    DuplicateIdentifier(String),

    /// The source lens-distortion model has no equivalent in the output format.
    #[error("Camera `{id}`: distortion model `{model}` has no target equivalent")]
    UnsupportedDistortionModel {
        /// Camera identifier.
        id: String,
        /// Name of the source model.
        model: String,
    },

    /// A camera identifier resolves to no image file.
    #[error("No image found for camera `{0}`")]
    MissingImage(String),

    /// The input file extension is neither csv nor xml.
    #[error("Unrecognized alignment-export format: {0}")]
    UnsupportedFormat(std::path::PathBuf),

    /// Error reading or writing a file.
    #[error("Failed to manipulate the file. {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing the XML export.
    #[error("Failed to parse the xml export. {0}")]
    Xml(#[from] quick_xml::Error),

    /// Error serializing the output document.
    #[error("Failed to serialize the scene document. {0}")]
    Json(#[from] serde_json::Error),
}
