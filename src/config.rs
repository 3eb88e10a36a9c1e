/**
 * Configuration for renaming runs and library classification
 */

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::{RenameError, Result};
use crate::naming::{FilenameGenerator, Timeshift, DEFAULT_TEMPLATE};

/// Options for date based renaming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameOptions {
    pub lowercase_extension: bool,
    pub timeshift: Timeshift,
    pub template: String,
    /// Log every rename at info level instead of debug
    pub verbose: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            lowercase_extension: true,
            timeshift: Timeshift::zero(),
            template: DEFAULT_TEMPLATE.to_string(),
            verbose: true,
        }
    }
}

impl RenameOptions {
    pub fn with_timeshift(mut self, timeshift: Timeshift) -> Self {
        self.timeshift = timeshift;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_lowercase_extension(mut self, lowercase: bool) -> Self {
        self.lowercase_extension = lowercase;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn filename_generator(&self) -> FilenameGenerator {
        FilenameGenerator::new(self.template.clone(), self.timeshift, self.lowercase_extension)
    }
}

/// Which lowercase extensions count as images and which as videos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaClasses {
    #[serde(deserialize_with = "lowercase_set")]
    pub images: BTreeSet<String>,
    #[serde(deserialize_with = "lowercase_set")]
    pub videos: BTreeSet<String>,
}

fn lowercase_set<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let extensions = Vec::<String>::deserialize(deserializer)?;
    Ok(extensions.iter().map(|e| e.to_lowercase()).collect())
}

impl Default for MediaClasses {
    fn default() -> Self {
        let set = |exts: &[&str]| exts.iter().map(|e| e.to_string()).collect();
        Self {
            images: set(&["jpg", "jpeg", "png", "tif", "tiff", "heic", "hif", "cr2", "dng"]),
            videos: set(&["mp4", "mov", "avi", "3gp", "m4v", "mkv"]),
        }
    }
}

impl MediaClasses {
    pub fn new<I, V, S>(images: I, videos: V) -> Self
    where
        I: IntoIterator<Item = S>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            images: images.into_iter().map(|e| e.as_ref().to_lowercase()).collect(),
            videos: videos.into_iter().map(|e| e.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn is_image(&self, extension: &str) -> bool {
        self.images.contains(&extension.to_lowercase())
    }

    pub fn is_video(&self, extension: &str) -> bool {
        self.videos.contains(&extension.to_lowercase())
    }

    pub fn is_media(&self, extension: &str) -> bool {
        self.is_image(extension) || self.is_video(extension)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub classes: MediaClasses,
    /// Entries whose name starts with this prefix are never library items
    pub hidden_prefix: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            classes: MediaClasses::default(),
            hidden_prefix: ".".to_string(),
        }
    }
}

impl LibraryConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| RenameError::validation(path, e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| RenameError::validation(path, format!("invalid config: {}", e)))
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        !self.hidden_prefix.is_empty() && name.starts_with(&self.hidden_prefix)
    }
}
