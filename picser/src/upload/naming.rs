//! Repository path generation for uploaded images.
//!
//! Paths take the form `<folder>/<timestamp>-<suffix>.<extension>`. Uniqueness is practical,
//! not guaranteed: two uploads landing in the same millisecond with the same 9-character
//! suffix would collide, and nothing here checks the repository for an existing file.

use chrono::{DateTime, Utc};
use rand::prelude::RngExt;
use rand::rng;

/// Extension used when the original file name has none.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Length of the random base-36 suffix.
pub const SUFFIX_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate the repository-relative path for a new upload, using the current time.
pub fn generate_path(original_name: &str, folder: &str) -> String {
    generate_path_at(original_name, folder, Utc::now())
}

/// Generate a path for an upload happening at `now`.
pub fn generate_path_at(original_name: &str, folder: &str, now: DateTime<Utc>) -> String {
    build_path(folder, &timestamp(now), &random_suffix(), extension(original_name))
}

/// Join the path components. A folder that sanitizes to nothing is omitted entirely.
pub fn build_path(folder: &str, timestamp: &str, suffix: &str, extension: &str) -> String {
    let folder = sanitize_folder(folder);
    if folder.is_empty() {
        format!("{timestamp}-{suffix}.{extension}")
    } else {
        format!("{folder}/{timestamp}-{suffix}.{extension}")
    }
}

/// Normalize a folder path: empty, `.` and `..` segments are dropped, so the result never
/// starts or ends with `/` and never leaves the repository root.
pub fn sanitize_folder(folder: &str) -> String {
    folder
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}

/// ISO-8601 UTC timestamp with `:` and `.` replaced so it is safe inside a file name.
///
/// `2026-10-17T08:30:05.123Z` becomes `2026-10-17T08-30-05-123Z`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-")
}

/// Extension of the original file name, or [`DEFAULT_EXTENSION`] when it has none.
pub fn extension(original_name: &str) -> &str {
    match original_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => ext,
        _ => DEFAULT_EXTENSION,
    }
}

/// Short lowercase alphanumeric suffix. Not cryptographically random.
pub fn random_suffix() -> String {
    let mut rng = rng();
    (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}
