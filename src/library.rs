/**
 * A directory of photos and videos renamed as a unit
 */

use log::{debug, info};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{LibraryConfig, RenameOptions};
use crate::error::{RenameError, Result};
use crate::exif::{FallbackReader, MetadataExtractor};
use crate::file_ops;
use crate::media::MediaItem;
use crate::naming;
use crate::opener::Opener;

/// Items are listed fresh from the directory on every access, so a rename
/// of the directory or of its contents never leaves stale views behind.
pub struct MediaLibrary {
    directory: PathBuf,
    config: LibraryConfig,
    extractor: Arc<dyn MetadataExtractor>,
}

impl fmt::Debug for MediaLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaLibrary")
            .field("directory", &self.directory)
            .field("config", &self.config)
            .finish()
    }
}

impl MediaLibrary {
    pub fn new(directory: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(directory, LibraryConfig::default(), Arc::new(FallbackReader::default()))
    }

    pub fn with_config(
        directory: impl AsRef<Path>,
        config: LibraryConfig,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(RenameError::validation(directory, "directory does not exist"));
        }

        Ok(Self {
            directory: file_ops::absolute(directory)?,
            config,
            extractor,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn name(&self) -> String {
        self.directory
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Media files in the directory, sorted by name
    pub fn items(&self) -> Result<Vec<MediaItem>> {
        let mut items = Vec::new();
        for path in file_ops::list_files(&self.directory)? {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if self.config.is_hidden(&name) {
                continue;
            }

            let extension = naming::split_extension(&name).1.unwrap_or_default();
            if !self.config.classes.is_media(extension) {
                debug!("Skipping non-media file: {}", path.display());
                continue;
            }

            items.push(MediaItem::with_extractor(&path, self.extractor.clone())?);
        }
        Ok(items)
    }

    pub fn images(&self) -> Result<Vec<MediaItem>> {
        Ok(self
            .items()?
            .into_iter()
            .filter(|m| self.config.classes.is_image(&m.file_extension()))
            .collect())
    }

    pub fn videos(&self) -> Result<Vec<MediaItem>> {
        Ok(self
            .items()?
            .into_iter()
            .filter(|m| self.config.classes.is_video(&m.file_extension()))
            .collect())
    }

    pub fn item_names(&self) -> Result<Vec<String>> {
        Ok(self.items()?.iter().map(MediaItem::name).collect())
    }

    pub fn image_names(&self) -> Result<Vec<String>> {
        Ok(self.images()?.iter().map(MediaItem::name).collect())
    }

    pub fn video_names(&self) -> Result<Vec<String>> {
        Ok(self.videos()?.iter().map(MediaItem::name).collect())
    }

    /// Rename the directory among its siblings.
    ///
    /// Taken names get a ` (N)` counter. Renaming to the current name does nothing.
    pub fn rename(&mut self, new_name: &str, verbose: bool) -> Result<()> {
        if new_name.is_empty() || Path::new(new_name).file_name() != Some(OsStr::new(new_name)) {
            return Err(RenameError::validation(new_name, "not a plain directory name"));
        }

        if new_name == self.name() {
            debug!("{} already has the requested name", self.directory.display());
            return Ok(());
        }

        let parent = self
            .directory
            .parent()
            .ok_or_else(|| RenameError::validation(&self.directory, "directory has no parent"))?
            .to_path_buf();
        let resolved = naming::resolve_dir_name(new_name, |n| file_ops::entry_exists(&parent.join(n)));
        let target = parent.join(&resolved);

        if verbose {
            info!("renaming {} to {}", self.directory.display(), target.display());
        } else {
            debug!("renaming {} to {}", self.directory.display(), target.display());
        }

        file_ops::move_entry(&self.directory, &target)?;
        self.directory = target;
        Ok(())
    }

    /// Rename every item to its capture timestamp, stopping at the first failure
    pub fn rename_contents_by_date(&self, options: &RenameOptions) -> Result<()> {
        self.rename_contents_by_date_with(options, |_| {})
    }

    /// Same as `rename_contents_by_date`, calling `on_renamed` after each item
    pub fn rename_contents_by_date_with<F>(&self, options: &RenameOptions, mut on_renamed: F) -> Result<()>
    where
        F: FnMut(&MediaItem),
    {
        let items = self.items()?;
        info!("Renaming {} items in {}", items.len(), self.directory.display());

        for mut item in items {
            item.rename_by_date(options)?;
            on_renamed(&item);
        }
        Ok(())
    }

    fn paths(items: Vec<MediaItem>) -> Vec<PathBuf> {
        items.iter().map(|m| m.path().to_path_buf()).collect()
    }

    pub fn open(&self, opener: &dyn Opener) -> Result<()> {
        opener.open(&Self::paths(self.items()?))
    }

    pub fn open_images(&self, opener: &dyn Opener) -> Result<()> {
        opener.open(&Self::paths(self.images()?))
    }

    pub fn open_videos(&self, opener: &dyn Opener) -> Result<()> {
        opener.open(&Self::paths(self.videos()?))
    }
}
