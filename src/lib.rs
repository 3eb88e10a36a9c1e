pub mod config;
pub mod error;
pub mod exif;
pub mod file_ops;
pub mod library;
pub mod media;
pub mod naming;
pub mod opener;

pub use config::{LibraryConfig, MediaClasses, RenameOptions};
pub use error::{FilesystemFailure, RenameError, Result};
pub use library::MediaLibrary;
pub use media::MediaItem;
pub use naming::{FilenameGenerator, Timeshift};
