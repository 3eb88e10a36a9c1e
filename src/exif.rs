/**
 * EXIF metadata module
 *
 * Extraction order:
 * 1. exiftool (external process, widest format coverage including videos)
 * 2. kamadak-exif (pure Rust, JPEG/TIFF/HEIF/PNG containers)
 */

use chrono::{DateTime, NaiveDateTime};
use exif::{In, Reader as ExifReader, Tag, Value};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::Command;

use crate::error::{RenameError, Result};

/// Tag name -> value, keys are group-qualified (`EXIF:DateTimeOriginal`)
pub type Metadata = BTreeMap<String, String>;

pub const CAMERA_MAKE_TAG: &str = "EXIF:Make";
pub const CAMERA_MODEL_TAG: &str = "EXIF:Model";
pub const UNKNOWN: &str = "UNKNOWN";

/// Textual layout a timestamp tag is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    /// Local time without offset, trailing subseconds or zone are ignored
    Naive(&'static str),
    /// Time carrying a UTC offset, read back as the local wall clock
    Zoned(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct TimestampTag {
    pub key: &'static str,
    pub layout: TimestampLayout,
}

const EXIF_LAYOUT: TimestampLayout = TimestampLayout::Naive("%Y:%m:%d %H:%M:%S");

/// Timestamp tags in priority order; the first one that parses wins.
pub const TIMESTAMP_TAGS: &[TimestampTag] = &[
    TimestampTag { key: "EXIF:DateTimeOriginal", layout: EXIF_LAYOUT },
    TimestampTag { key: "EXIF:CreateDate", layout: EXIF_LAYOUT },
    TimestampTag { key: "QuickTime:CreateDate", layout: EXIF_LAYOUT },
    TimestampTag { key: "QuickTime:MediaCreateDate", layout: EXIF_LAYOUT },
    TimestampTag { key: "EXIF:ModifyDate", layout: EXIF_LAYOUT },
    TimestampTag {
        key: "File:FileModifyDate",
        layout: TimestampLayout::Zoned("%Y:%m:%d %H:%M:%S%:z"),
    },
];

impl TimestampTag {
    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        match self.layout {
            TimestampLayout::Naive(layout) => {
                // "YYYY:MM:DD HH:MM:SS" is 19 bytes; drop ".fff" or "+hh:mm" tails
                let head = value.get(..19).unwrap_or(value);
                NaiveDateTime::parse_from_str(head, layout).ok()
            }
            TimestampLayout::Zoned(layout) => DateTime::parse_from_str(value, layout)
                .ok()
                .map(|dt| dt.naive_local()),
        }
    }
}

/// Capture timestamp from the highest priority tag that holds a valid value
pub fn best_timestamp(metadata: &Metadata) -> Option<NaiveDateTime> {
    TIMESTAMP_TAGS.iter().find_map(|tag| {
        let value = metadata.get(tag.key)?;
        let parsed = tag.parse(value);
        if parsed.is_none() {
            debug!("Ignoring unparsable {} value '{}'", tag.key, value);
        }
        parsed
    })
}

pub fn camera_make(metadata: &Metadata) -> String {
    metadata.get(CAMERA_MAKE_TAG).cloned().unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn camera_model(metadata: &Metadata) -> String {
    metadata.get(CAMERA_MODEL_TAG).cloned().unwrap_or_else(|| UNKNOWN.to_string())
}

/// Source of raw metadata tags for a file.
///
/// Shared as `Arc<dyn MetadataExtractor>`, so implementations must be
/// thread safe.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Metadata>;
}

fn unavailable(path: &Path, reason: impl Into<String>) -> RenameError {
    RenameError::MetadataUnavailable {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Reads tags by running `exiftool -j -G`
#[derive(Debug, Clone)]
pub struct ExifToolReader {
    program: String,
}

impl Default for ExifToolReader {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl ExifToolReader {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-ver")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Parse exiftool's JSON array output, stringifying non-string values
    pub fn parse_json(path: &Path, stdout: &[u8]) -> Result<Metadata> {
        let parsed: Vec<BTreeMap<String, serde_json::Value>> = serde_json::from_slice(stdout)
            .map_err(|e| unavailable(path, format!("invalid exiftool output: {}", e)))?;

        let tags = parsed
            .into_iter()
            .next()
            .ok_or_else(|| unavailable(path, "exiftool returned no records"))?;

        Ok(tags
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect())
    }
}

impl MetadataExtractor for ExifToolReader {
    fn extract(&self, path: &Path) -> Result<Metadata> {
        debug!("Running {} on: {}", self.program, path.display());

        let output = Command::new(&self.program)
            .arg("-j")
            .arg("-G")
            .arg(path)
            .output()
            .map_err(|e| unavailable(path, format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(unavailable(path, String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        Self::parse_json(path, &output.stdout)
    }
}

/// Pure Rust reader built on kamadak-exif, primary IFD only
#[derive(Debug, Clone, Default)]
pub struct KamadakReader;

impl KamadakReader {
    pub fn new() -> Self {
        Self
    }

    /// Map kamadak tag names onto the names exiftool reports
    fn tag_key(tag: Tag) -> String {
        let name = if tag == Tag::DateTime {
            "ModifyDate".to_string()
        } else if tag == Tag::DateTimeDigitized {
            "CreateDate".to_string()
        } else {
            tag.to_string()
        };
        format!("EXIF:{}", name)
    }
}

impl MetadataExtractor for KamadakReader {
    fn extract(&self, path: &Path) -> Result<Metadata> {
        let file = File::open(path).map_err(|e| unavailable(path, format!("failed to open file: {}", e)))?;
        let mut bufreader = BufReader::new(&file);

        let exif = ExifReader::new()
            .read_from_container(&mut bufreader)
            .map_err(|e| unavailable(path, format!("kamadak-exif: {}", e)))?;

        let mut metadata = Metadata::new();
        for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
            let value = match field.value {
                Value::Ascii(ref parts) if !parts.is_empty() => {
                    String::from_utf8_lossy(&parts[0]).trim_end_matches('\0').to_string()
                }
                _ => field.display_value().with_unit(&exif).to_string(),
            };
            metadata.insert(Self::tag_key(field.tag), value);
        }

        Ok(metadata)
    }
}

/// Tries exiftool first and falls back to kamadak-exif
#[derive(Debug, Clone, Default)]
pub struct FallbackReader {
    exiftool: ExifToolReader,
    kamadak: KamadakReader,
}

impl FallbackReader {
    pub fn new(exiftool: ExifToolReader) -> Self {
        Self {
            exiftool,
            kamadak: KamadakReader::new(),
        }
    }
}

impl MetadataExtractor for FallbackReader {
    fn extract(&self, path: &Path) -> Result<Metadata> {
        match self.exiftool.extract(path) {
            Ok(metadata) => {
                debug!("exiftool succeeded for: {}", path.display());
                return Ok(metadata);
            }
            Err(e) => {
                debug!("exiftool failed for {}: {}", path.display(), e);
            }
        }

        warn!("Falling back to kamadak-exif for: {}", path.display());
        self.kamadak.extract(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn metadata(pairs: &[(&str, &str)]) -> Metadata {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .unwrap()
    }

    #[test]
    fn test_original_capture_tag_wins() {
        let meta = metadata(&[
            ("File:FileModifyDate", "2020:01:01 10:00:00+01:00"),
            ("EXIF:ModifyDate", "2019:01:01 10:00:00"),
            ("EXIF:DateTimeOriginal", "2016:10:31 21:04:57"),
        ]);
        assert_eq!(best_timestamp(&meta), Some(ts(2016, 10, 31, 21, 4, 57)));
    }

    #[test]
    fn test_falls_through_unparsable_and_zero_values() {
        let meta = metadata(&[
            ("EXIF:DateTimeOriginal", "0000:00:00 00:00:00"),
            ("EXIF:CreateDate", "garbage"),
            ("QuickTime:CreateDate", "2017:09:14 01:54:30"),
        ]);
        assert_eq!(best_timestamp(&meta), Some(ts(2017, 9, 14, 1, 54, 30)));
    }

    #[test]
    fn test_subseconds_and_zones() {
        let meta = metadata(&[("EXIF:DateTimeOriginal", "2017:07:16 11:23:57.680")]);
        assert_eq!(best_timestamp(&meta), Some(ts(2017, 7, 16, 11, 23, 57)));

        let meta = metadata(&[("File:FileModifyDate", "2017:07:16 11:23:57-06:00")]);
        assert_eq!(best_timestamp(&meta), Some(ts(2017, 7, 16, 11, 23, 57)));
    }

    #[test]
    fn test_no_timestamp() {
        let meta = metadata(&[("EXIF:Make", "Canon")]);
        assert_eq!(best_timestamp(&meta), None);
    }

    #[test]
    fn test_camera_tags_default_to_unknown() {
        let meta = metadata(&[("EXIF:Make", "Canon")]);
        assert_eq!(camera_make(&meta), "Canon");
        assert_eq!(camera_model(&meta), UNKNOWN);
    }

    #[test]
    fn test_parse_exiftool_json() {
        let stdout = br#"[{
            "SourceFile": "banff/rundle.png",
            "EXIF:DateTimeOriginal": "2016:10:31 21:04:57",
            "EXIF:ISO": 100,
            "Composite:Flash": null
        }]"#;
        let meta = ExifToolReader::parse_json(Path::new("banff/rundle.png"), stdout).unwrap();
        assert_eq!(meta["EXIF:DateTimeOriginal"], "2016:10:31 21:04:57");
        assert_eq!(meta["EXIF:ISO"], "100");
        assert_eq!(meta["Composite:Flash"], "null");
    }

    #[test]
    fn test_parse_exiftool_empty_output() {
        let err = ExifToolReader::parse_json(Path::new("x.jpg"), b"[]").unwrap_err();
        assert!(matches!(err, RenameError::MetadataUnavailable { .. }));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let reader = ExifToolReader::new("definitely-not-an-exiftool-binary");
        assert!(!reader.is_available());
        let err = reader.extract(Path::new("x.jpg")).unwrap_err();
        assert!(matches!(err, RenameError::MetadataUnavailable { .. }));
    }

    #[test]
    fn test_kamadak_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();

        let err = KamadakReader::new().extract(&path).unwrap_err();
        assert!(matches!(err, RenameError::MetadataUnavailable { .. }));
    }
}
