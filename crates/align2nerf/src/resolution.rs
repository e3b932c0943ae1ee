use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::error::ConvertError;

/// Resolves a camera identifier to its image file and pixel resolution.
///
/// The geometric pipeline only ever talks to this trait; how the answers are
/// produced (directory scan, prefetched map, test stub) is up to the caller.
pub trait ResolutionLookup {
    /// Pixel `(width, height)` of the image matching the identifier.
    fn dimensions(&self, id: &str) -> Option<(u32, u32)>;

    /// The file reference to embed in the output document.
    fn file_name(&self, id: &str) -> Option<String>;
}

/// A folder of images, matched by file name or stem against one extension.
///
/// Dimensions are read from the image header on demand; no pixel data is
/// decoded.
pub struct ImageFolder {
    folder: PathBuf,
    files: HashMap<String, String>,
}

impl ImageFolder {
    /// Scan `folder` for `*.{extension}` files (case-insensitive).
    ///
    /// # Arguments
    ///
    /// * `folder` - The image directory.
    /// * `extension` - The image extension without the dot, e.g. `jpg`.
    pub fn new(folder: impl AsRef<Path>, extension: &str) -> Result<Self, ConvertError> {
        let folder = folder.as_ref().to_path_buf();
        let extension = extension.to_ascii_lowercase();

        let mut files = HashMap::new();
        for entry in std::fs::read_dir(&folder)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .is_some_and(|e| e.to_ascii_lowercase().to_string_lossy() == extension);
            if !matches {
                continue;
            }
            if let (Some(name), Some(stem)) = (path.file_name(), path.file_stem()) {
                let name = name.to_string_lossy().into_owned();
                // identifiers may carry the extension or just the stem
                files.insert(stem.to_string_lossy().into_owned(), name.clone());
                files.insert(name.clone(), name);
            }
        }

        Ok(Self { folder, files })
    }

    /// Number of distinct image files found in the folder.
    pub fn len(&self) -> usize {
        self.files.values().collect::<std::collections::HashSet<_>>().len()
    }

    /// Whether the scan found no matching image files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The full path of the image matching the identifier.
    pub fn path(&self, id: &str) -> Option<PathBuf> {
        self.files.get(id).map(|name| self.folder.join(name))
    }
}

impl ResolutionLookup for ImageFolder {
    fn dimensions(&self, id: &str) -> Option<(u32, u32)> {
        image::image_dimensions(self.path(id)?).ok()
    }

    fn file_name(&self, id: &str) -> Option<String> {
        self.files
            .get(id)
            .map(|name| self.folder.join(name).to_string_lossy().into_owned())
    }
}

/// A pre-resolved identifier map.
///
/// Used by the command-line tool after its parallel prefetch pass, and by
/// tests that want full control over what exists.
#[derive(Debug, Default, Clone)]
pub struct FixedResolutions {
    entries: HashMap<String, (String, (u32, u32))>,
}

impl FixedResolutions {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identifier with its file reference and pixel resolution.
    pub fn insert(&mut self, id: impl Into<String>, file_name: impl Into<String>, dims: (u32, u32)) {
        self.entries.insert(id.into(), (file_name.into(), dims));
    }
}

impl ResolutionLookup for FixedResolutions {
    fn dimensions(&self, id: &str) -> Option<(u32, u32)> {
        self.entries.get(id).map(|(_, dims)| *dims)
    }

    fn file_name(&self, id: &str) -> Option<String> {
        self.entries.get(id).map(|(name, _)| name.clone())
    }
}
