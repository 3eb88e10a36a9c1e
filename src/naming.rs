/**
 * File naming module: timestamp templates, timeshifts and collision suffixes
 */

use chrono::format::{Item, StrftimeItems};
use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::sync::OnceLock;

use crate::error::{RenameError, Result};

/// Default template, mimics the names Dropbox gives camera uploads
pub const DEFAULT_TEMPLATE: &str = "%Y-%m-%d %H.%M.%S";

/// Signed offset added to a capture timestamp before it is formatted.
///
/// Used to correct a camera whose clock was set wrong. All fields may be
/// negative and are simply summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeshift {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Timeshift {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn seconds(seconds: i64) -> Self {
        Self { seconds, ..Self::default() }
    }

    pub fn minutes(minutes: i64) -> Self {
        Self { minutes, ..Self::default() }
    }

    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    /// Total shift, or `None` when it does not fit in a chrono duration
    pub fn as_duration(&self) -> Option<Duration> {
        let total = self
            .days
            .checked_mul(86_400)?
            .checked_add(self.hours.checked_mul(3_600)?)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)?;
        Duration::try_seconds(total)
    }

    /// Split a duration into days/hours/minutes/seconds, all carrying the same sign
    pub fn from_duration(duration: Duration) -> Self {
        let total = duration.num_seconds();
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }

    /// Shift that moves `reference` onto `target`, plus an extra `delta`.
    ///
    /// Take one shot of the same moment from two cameras and pass their
    /// timestamps here to get the correction for the first camera's library.
    pub fn between(reference: NaiveDateTime, target: NaiveDateTime, delta: Duration) -> Self {
        Self::from_duration(target - reference + delta)
    }

    pub fn apply(&self, timestamp: NaiveDateTime) -> Result<NaiveDateTime> {
        self.as_duration()
            .and_then(|shift| timestamp.checked_add_signed(shift))
            .ok_or_else(|| RenameError::TimestampOutOfRange {
                timestamp: timestamp.to_string(),
                timeshift: self.to_string(),
            })
    }
}

impl fmt::Display for Timeshift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d {}h {}m {}s", self.days, self.hours, self.minutes, self.seconds)
    }
}

/// Builds candidate filenames from capture timestamps
#[derive(Debug, Clone)]
pub struct FilenameGenerator {
    template: String,
    timeshift: Timeshift,
    lowercase_extension: bool,
}

impl Default for FilenameGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE, Timeshift::zero(), true)
    }
}

impl FilenameGenerator {
    pub fn new(template: impl Into<String>, timeshift: Timeshift, lowercase_extension: bool) -> Self {
        Self {
            template: template.into(),
            timeshift,
            lowercase_extension,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Generate `strftime(timestamp + timeshift, template) + "." + extension`
    ///
    /// An empty extension produces no trailing separator.
    pub fn generate_filename(&self, timestamp: NaiveDateTime, extension: &str) -> Result<String> {
        if StrftimeItems::new(&self.template).any(|item| matches!(item, Item::Error)) {
            return Err(RenameError::InvalidTemplate {
                template: self.template.clone(),
            });
        }

        let shifted = self.timeshift.apply(timestamp)?;

        let mut filename = String::new();
        write!(filename, "{}", shifted.format(&self.template)).map_err(|_| RenameError::InvalidTemplate {
            template: self.template.clone(),
        })?;

        if !extension.is_empty() {
            filename.push('.');
            if self.lowercase_extension {
                filename.push_str(&extension.to_lowercase());
            } else {
                filename.push_str(extension);
            }
        }

        Ok(filename)
    }
}

fn file_counter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*)-(\d+)$").expect("file counter pattern"))
}

fn dir_counter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*) \((\d+)\)$").expect("directory counter pattern"))
}

/// Split `name` at its final `.`; a leading dot does not start an extension
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}

fn bump(base: &str, captured: Option<(&str, &str)>, render: impl Fn(&str, u64) -> String) -> String {
    if let Some((prefix, digits)) = captured {
        if let Some(next) = digits.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
            return render(prefix, next);
        }
    }
    render(base, 1)
}

/// Next file name in the `stem-N.ext` sequence
pub fn next_file_name(name: &str) -> String {
    let (stem, extension) = split_extension(name);
    let captured = file_counter()
        .captures(stem)
        .and_then(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())));
    let stem = bump(stem, captured, |prefix, n| format!("{}-{}", prefix, n));

    match extension {
        Some(extension) => format!("{}.{}", stem, extension),
        None => stem,
    }
}

/// Next directory name in the `name (N)` sequence
pub fn next_dir_name(name: &str) -> String {
    let captured = dir_counter()
        .captures(name)
        .and_then(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())));
    bump(name, captured, |prefix, n| format!("{} ({})", prefix, n))
}

fn resolve_with<F>(candidate: &str, mut exists: F, next: fn(&str) -> String) -> String
where
    F: FnMut(&str) -> bool,
{
    let mut name = candidate.to_string();
    while exists(&name) {
        name = next(&name);
    }
    name
}

/// Disambiguate a file name until `exists` reports it free
pub fn resolve_file_name<F>(candidate: &str, exists: F) -> String
where
    F: FnMut(&str) -> bool,
{
    resolve_with(candidate, exists, next_file_name)
}

/// Disambiguate a directory name until `exists` reports it free
pub fn resolve_dir_name<F>(candidate: &str, exists: F) -> String
where
    F: FnMut(&str) -> bool,
{
    resolve_with(candidate, exists, next_dir_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .unwrap()
    }

    #[test]
    fn test_default_template() {
        let generator = FilenameGenerator::default();
        let name = generator.generate_filename(ts(2016, 10, 31, 21, 4, 57), "PNG").unwrap();
        assert_eq!(name, "2016-10-31 21.04.57.png");
    }

    #[test]
    fn test_keeps_extension_case_when_asked() {
        let generator = FilenameGenerator::new(DEFAULT_TEMPLATE, Timeshift::zero(), false);
        let name = generator.generate_filename(ts(2017, 7, 16, 11, 23, 57), "JPG").unwrap();
        assert_eq!(name, "2017-07-16 11.23.57.JPG");
    }

    #[test]
    fn test_timeshift_applied_before_formatting() {
        let generator = FilenameGenerator::new(DEFAULT_TEMPLATE, Timeshift::seconds(1), true);
        let name = generator.generate_filename(ts(2016, 12, 31, 23, 59, 59), "jpg").unwrap();
        assert_eq!(name, "2017-01-01 00.00.00.jpg");

        let back = Timeshift { days: -1, hours: 2, ..Timeshift::default() };
        let generator = FilenameGenerator::new("%Y%m%d_%H%M%S", back, true);
        let name = generator.generate_filename(ts(2017, 7, 16, 11, 23, 57), "mp4").unwrap();
        assert_eq!(name, "20170715_132357.mp4");
    }

    #[test]
    fn test_huge_timeshift_is_out_of_range() {
        let timestamp = ts(2017, 1, 1, 0, 0, 0);
        for shift in [
            Timeshift { days: 200_000_000_000, ..Timeshift::default() },
            Timeshift { days: 9_000_000_000_000_000_000, ..Timeshift::default() },
            Timeshift { seconds: i64::MAX, minutes: 1, ..Timeshift::default() },
            Timeshift { days: -100_000_000, ..Timeshift::default() },
        ] {
            let generator = FilenameGenerator::new("%Y", shift, true);
            let err = generator.generate_filename(timestamp, "jpg").unwrap_err();
            assert!(matches!(err, RenameError::TimestampOutOfRange { .. }));
            assert!(!shift.is_zero());
        }

        let shift: Timeshift = serde_json::from_str(r#"{"days": 9000000000000000000}"#).unwrap();
        assert_eq!(shift.as_duration(), None);
        assert!(shift.apply(timestamp).is_err());
    }

    #[test]
    fn test_invalid_template_is_an_error() {
        let generator = FilenameGenerator::new("%Y-%Q", Timeshift::zero(), true);
        let err = generator.generate_filename(ts(2017, 1, 1, 0, 0, 0), "jpg").unwrap_err();
        assert!(matches!(err, RenameError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_empty_extension_has_no_separator() {
        let generator = FilenameGenerator::new("%Y", Timeshift::zero(), true);
        assert_eq!(generator.generate_filename(ts(2017, 1, 1, 0, 0, 0), "").unwrap(), "2017");
    }

    #[test]
    fn test_formatted_name_parses_back() {
        let generator = FilenameGenerator::default();
        for original in [ts(2016, 10, 31, 21, 4, 57), ts(1999, 1, 2, 3, 4, 5), ts(2024, 2, 29, 0, 0, 0)] {
            let name = generator.generate_filename(original, "jpg").unwrap();
            let (stem, extension) = split_extension(&name);
            assert_eq!(extension, Some("jpg"));
            let parsed = NaiveDateTime::parse_from_str(stem, DEFAULT_TEMPLATE).unwrap();
            assert_eq!(parsed, original);
        }
    }

    #[test]
    fn test_timeshift_between() {
        let a = ts(2017, 9, 14, 1, 34, 21);
        let b = ts(2017, 9, 15, 3, 35, 20);
        let shift = Timeshift::between(a, b, Duration::zero());
        assert_eq!(shift, Timeshift { days: 1, hours: 2, minutes: 0, seconds: 59 });
        assert_eq!(shift.apply(a).unwrap(), b);

        let shift = Timeshift::between(b, a, Duration::seconds(-1));
        assert_eq!(shift.apply(b).unwrap(), a - Duration::seconds(1));
        assert!(shift.days <= 0 && shift.hours <= 0 && shift.seconds <= 0);
    }

    #[test]
    fn test_free_name_is_returned_unchanged() {
        let mut calls = 0;
        let name = resolve_file_name("a.jpg", |_| {
            calls += 1;
            false
        });
        assert_eq!(name, "a.jpg");
        assert_eq!(calls, 1);
        assert_eq!(resolve_dir_name("windmill", |_| false), "windmill");
    }

    #[test]
    fn test_file_counter_increments_past_taken_names() {
        let mut taken: HashSet<String> = (1..=9).map(|i| format!("a-{}.jpg", i)).collect();
        taken.insert("a.jpg".to_string());

        let name = resolve_file_name("a.jpg", |n| taken.contains(n));
        assert_eq!(name, "a-10.jpg");
    }

    #[test]
    fn test_file_counter_grammar() {
        assert_eq!(next_file_name("a.jpg"), "a-1.jpg");
        assert_eq!(next_file_name("a-1.jpg"), "a-2.jpg");
        assert_eq!(next_file_name("2016-10-31 21.04.57.png"), "2016-10-31 21.04.57-1.png");
        assert_eq!(next_file_name("archive.tar.gz"), "archive.tar-1.gz");
        assert_eq!(next_file_name("README"), "README-1");
        assert_eq!(next_file_name("trip-"), "trip--1");
        assert_eq!(next_file_name(".hidden"), ".hidden-1");
        assert_eq!(next_file_name("x-99999999999999999999999.jpg"), "x-99999999999999999999999-1.jpg");
    }

    #[test]
    fn test_dir_counter_grammar() {
        let taken: HashSet<&str> = ["windmill", "windmill (1)"].into_iter().collect();
        assert_eq!(resolve_dir_name("windmill", |n| taken.contains(n)), "windmill (2)");

        assert_eq!(next_dir_name("banff"), "banff (1)");
        assert_eq!(next_dir_name("banff (7)"), "banff (8)");
        assert_eq!(next_dir_name("banff(7)"), "banff(7) (1)");
        assert_eq!(next_dir_name("trip-2"), "trip-2 (1)");
    }
}
