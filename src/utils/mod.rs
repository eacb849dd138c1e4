use anyhow::Result;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref FORBIDDEN_FILENAME_CHARS: Regex = Regex::new(r#"[\\/:*?"<>|]+"#).unwrap();
    static ref BARE_FOLDER_ID: Regex = Regex::new(r"^[0-9a-fA-F-]{36}$").unwrap();
    static ref FOLDER_ID_IN_URL: Regex =
        Regex::new(r#"(?i)folderID=(?:%22|")?([0-9a-f-]{36})"#).unwrap();
}

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Replace characters Windows and macOS reject in file names with `_`
pub fn sanitize_filename(filename: &str) -> String {
    FORBIDDEN_FILENAME_CHARS
        .replace_all(filename, "_")
        .trim()
        .to_string()
}

/// First `max_chars` characters of `s`
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// UTC timestamp to second precision with no `:` or `T`, e.g. `2024-05-01-10-15-30`
pub fn filesystem_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Pull a folder GUID out of either a bare GUID or a folder page URL.
///
/// Folder pages carry the identifier in the fragment: `...#folderID=%22<GUID>%22`.
pub fn extract_folder_id(input: &str) -> Option<String> {
    let input = input.trim();

    if BARE_FOLDER_ID.is_match(input) {
        return Some(input.to_string());
    }

    FOLDER_ID_IN_URL
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}
