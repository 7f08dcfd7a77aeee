//! Snapshot filename convention.
//!
//! Regular snapshots are named `backup-<stamp>.snapshot` and pre-restore
//! safety copies `backup-before-restore-<stamp>.snapshot`, where `<stamp>`
//! is an ISO-8601 UTC timestamp with `:` and `.` replaced by `-`:
//!
//! ```text
//! backup-2026-03-14T09-26-53-589793Z.snapshot
//! ```
//!
//! The parser here is pure so reconciliation can fall back to the file's
//! modification time when a name carries no usable timestamp.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const REGULAR_PREFIX: &str = "backup-";
pub const SAFETY_PREFIX: &str = "backup-before-restore-";
pub const EXTENSION: &str = ".snapshot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotKind {
    Regular,
    PreRestoreSafety,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Regular => "regular",
            SnapshotKind::PreRestoreSafety => "pre-restore-safety",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(SnapshotKind::Regular),
            "pre-restore-safety" => Some(SnapshotKind::PreRestoreSafety),
            _ => None,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            SnapshotKind::Regular => REGULAR_PREFIX,
            SnapshotKind::PreRestoreSafety => SAFETY_PREFIX,
        }
    }
}

/// Filesystem-safe timestamp with microsecond precision.
pub fn format_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%6fZ").to_string()
}

pub fn snapshot_filename(kind: SnapshotKind, at: DateTime<Utc>) -> String {
    format!("{}{}{}", kind.prefix(), format_stamp(at), EXTENSION)
}

/// Returns the kind when `filename` follows the naming convention,
/// regardless of whether its stamp parses.
pub fn classify(filename: &str) -> Option<SnapshotKind> {
    let stem = filename.strip_suffix(EXTENSION)?;
    if stem.starts_with(SAFETY_PREFIX) {
        (stem.len() > SAFETY_PREFIX.len()).then_some(SnapshotKind::PreRestoreSafety)
    } else if stem.len() > REGULAR_PREFIX.len() && stem.starts_with(REGULAR_PREFIX) {
        Some(SnapshotKind::Regular)
    } else {
        None
    }
}

/// Extract the creation time embedded in a snapshot filename.
///
/// Accepts 1 to 9 fractional digits so millisecond-precision names
/// (`...T10-20-30-123Z`) parse as well as the current microsecond form.
/// Returns `None` when the name is not a snapshot name or the stamp is
/// malformed; callers then fall back to the file's modification time.
pub fn parse_created_at(filename: &str) -> Option<DateTime<Utc>> {
    let stem = filename.strip_suffix(EXTENSION)?;
    let stamp = stem
        .strip_prefix(SAFETY_PREFIX)
        .or_else(|| stem.strip_prefix(REGULAR_PREFIX))?;
    parse_stamp(stamp)
}

fn parse_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    let (date_part, time_part) = stamp.split_once('T')?;
    let time_part = time_part.strip_suffix('Z')?;

    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;

    let mut fields = time_part.split('-');
    let hour: u32 = parse_digits(fields.next()?, 2)?;
    let minute: u32 = parse_digits(fields.next()?, 2)?;
    let second: u32 = parse_digits(fields.next()?, 2)?;
    let nanos = match fields.next() {
        Some(frac) => parse_fraction(frac)?,
        None => 0,
    };
    if fields.next().is_some() {
        return None;
    }

    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    Some(date.and_time(time).and_utc())
}

fn parse_digits(s: &str, width: usize) -> Option<u32> {
    if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_fraction(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 9 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = s.parse().ok()?;
    Some(value * 10u32.pow(9 - s.len() as u32))
}
