/**
 * A single photo or video file that can be renamed in place
 */

use chrono::{Duration, NaiveDateTime};
use log::{debug, info, warn};
use std::cell::OnceCell;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RenameOptions;
use crate::error::{RenameError, Result};
use crate::exif::{self, FallbackReader, Metadata, MetadataExtractor};
use crate::file_ops;
use crate::naming::{self, Timeshift};

pub struct MediaItem {
    path: PathBuf,
    extractor: Arc<dyn MetadataExtractor>,
    metadata: OnceCell<Metadata>,
}

impl fmt::Debug for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaItem").field("path", &self.path).finish()
    }
}

impl MediaItem {
    /// Open `path` using exiftool with a kamadak-exif fallback for metadata
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_extractor(path, Arc::new(FallbackReader::default()))
    }

    pub fn with_extractor(path: impl AsRef<Path>, extractor: Arc<dyn MetadataExtractor>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(RenameError::validation(path, "file does not exist"));
        }

        Ok(Self {
            path: file_ops::absolute(path)?,
            extractor,
            metadata: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Suffix after the final `.`, as written on disk
    pub fn raw_extension(&self) -> String {
        let name = self.name();
        naming::split_extension(&name).1.unwrap_or_default().to_string()
    }

    /// Lowercased suffix after the final `.`
    pub fn file_extension(&self) -> String {
        self.raw_extension().to_lowercase()
    }

    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// Metadata tags, extracted on first access and kept until the next rename
    pub fn metadata(&self) -> Result<&Metadata> {
        if let Some(metadata) = self.metadata.get() {
            return Ok(metadata);
        }
        let metadata = self.extractor.extract(&self.path)?;
        Ok(self.metadata.get_or_init(|| metadata))
    }

    pub fn timestamp(&self) -> Result<NaiveDateTime> {
        exif::best_timestamp(self.metadata()?).ok_or_else(|| RenameError::MetadataMissing {
            path: self.path.clone(),
        })
    }

    pub fn camera_make(&self) -> String {
        match self.metadata() {
            Ok(metadata) => exif::camera_make(metadata),
            Err(e) => {
                warn!("{}", e);
                exif::UNKNOWN.to_string()
            }
        }
    }

    pub fn camera_model(&self) -> String {
        match self.metadata() {
            Ok(metadata) => exif::camera_model(metadata),
            Err(e) => {
                warn!("{}", e);
                exif::UNKNOWN.to_string()
            }
        }
    }

    /// Shift that aligns this item's clock with `other`'s, plus `delta`
    pub fn timeshift_to(&self, other: &MediaItem, delta: Duration) -> Result<Timeshift> {
        Ok(Timeshift::between(self.timestamp()?, other.timestamp()?, delta))
    }

    /// Rename within the current directory.
    ///
    /// Taken names get a `-N` counter on the stem, so no existing file is
    /// ever replaced. Renaming to the current name does nothing.
    pub fn rename(&mut self, new_name: &str, verbose: bool) -> Result<()> {
        if new_name.is_empty() || Path::new(new_name).file_name() != Some(OsStr::new(new_name)) {
            return Err(RenameError::validation(new_name, "not a plain file name"));
        }

        if new_name == self.name() {
            debug!("{} already has the requested name", self.path.display());
            return Ok(());
        }

        let directory = self.directory().to_path_buf();
        let resolved = naming::resolve_file_name(new_name, |n| file_ops::entry_exists(&directory.join(n)));
        let target = directory.join(&resolved);

        if verbose {
            info!("renaming {} to {}", self.path.display(), target.display());
        } else {
            debug!("renaming {} to {}", self.path.display(), target.display());
        }

        file_ops::move_entry(&self.path, &target)?;

        self.path = target;
        self.metadata = OnceCell::new();
        Ok(())
    }

    /// Rename to the formatted capture timestamp of this item
    pub fn rename_by_date(&mut self, options: &RenameOptions) -> Result<()> {
        let timestamp = self.timestamp()?;
        let new_name = options
            .filename_generator()
            .generate_filename(timestamp, &self.raw_extension())?;
        self.rename(&new_name, options.verbose)
    }
}
