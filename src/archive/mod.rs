use anyhow::Context;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::api::Session;
use crate::cli::Mode;
use crate::utils::{filesystem_timestamp, sanitize_filename, truncate_chars};
use crate::Result;

/// Extension given to every archive entry
pub const ENTRY_EXTENSION: &str = "txt";

/// Folder component used when the folder has no usable name
pub const FALLBACK_FOLDER_NAME: &str = "folder";

/// One text file inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Unique name without extension
    pub name: String,

    /// Session this entry came from
    pub session_id: String,

    pub text: String,
}

impl ArchiveEntry {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, ENTRY_EXTENSION)
    }
}

/// Collects archive entries in insertion order and writes them out as a zip
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<ArchiveEntry>,
    used_names: HashSet<String>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session's text under a name no other entry uses
    pub fn add(&mut self, session: &Session, text: String) -> &ArchiveEntry {
        let name = self.unique_name(session);
        self.used_names.insert(name.to_lowercase());

        self.entries.push(ArchiveEntry {
            name,
            session_id: session.id.clone(),
            text,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deflate all entries into a zip archive held in memory
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.entries.is_empty() {
            anyhow::bail!("Refusing to build an archive with no entries");
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            writer
                .start_file(entry.file_name(), options)
                .with_context(|| format!("Failed to add {} to archive", entry.file_name()))?;
            writer.write_all(entry.text.as_bytes())?;
        }

        let cursor = writer.finish().context("Failed to finalize archive")?;
        Ok(cursor.into_inner())
    }

    /// Entry names are compared case-insensitively so archives extract cleanly everywhere
    fn unique_name(&self, session: &Session) -> String {
        let base = entry_base_name(session);
        if !self.is_taken(&base) {
            return base;
        }

        let with_id = format!("{}-{}", base, sanitize_filename(&session.id));
        if !self.is_taken(&with_id) {
            return with_id;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", with_id, n);
            if !self.is_taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn is_taken(&self, name: &str) -> bool {
        self.used_names.contains(&name.to_lowercase())
    }
}

/// Sanitized session name, or `session-<id>` when nothing usable is left
pub fn entry_base_name(session: &Session) -> String {
    let sanitized = sanitize_filename(&session.name);
    if sanitized.is_empty() {
        format!("session-{}", sanitize_filename(&session.id))
    } else {
        sanitized
    }
}

/// `<prefix>-<mode>-<folder>-<timestamp>.zip`, with the folder name sanitized and cut to `max_folder_len`
pub fn archive_file_name(
    prefix: &str,
    mode: Mode,
    folder_name: &str,
    max_folder_len: usize,
    at: DateTime<Utc>,
) -> String {
    let folder = match sanitize_filename(folder_name) {
        name if name.is_empty() => FALLBACK_FOLDER_NAME.to_string(),
        name => truncate_chars(&name, max_folder_len),
    };

    format!("{}-{}-{}-{}.zip", prefix, mode, folder, filesystem_timestamp(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Read;

    fn session(id: &str, name: &str) -> Session {
        Session {
            id: id.to_string(),
            name: name.to_string(),
            caption_url: None,
        }
    }

    #[test]
    fn test_entry_names_are_sanitized() {
        let mut builder = ArchiveBuilder::new();
        let entry = builder.add(&session("s1", "My/Session:Name?"), String::new());

        assert_eq!(entry.file_name(), "My_Session_Name_.txt");
    }

    #[test]
    fn test_empty_name_falls_back_to_id() {
        let mut builder = ArchiveBuilder::new();
        let entry = builder.add(&session("abc", "  ?? "), String::new());

        assert_eq!(entry.name, "_");

        let entry = builder.add(&session("def", "   "), String::new());
        assert_eq!(entry.name, "session-def");
    }

    #[test]
    fn test_colliding_names_are_disambiguated() {
        let mut builder = ArchiveBuilder::new();
        builder.add(&session("a", "Lecture: 1"), String::new());
        builder.add(&session("b", "Lecture/ 1"), String::new());
        builder.add(&session("b", "lecture_ 1"), String::new());

        let names: Vec<_> = builder.entries().iter().map(ArchiveEntry::file_name).collect();
        assert_eq!(names, ["Lecture_ 1.txt", "Lecture_ 1-b.txt", "lecture_ 1-b-2.txt"]);
    }

    #[test]
    fn test_finish_writes_entries_in_order() {
        let mut builder = ArchiveBuilder::new();
        builder.add(&session("1", "First"), "one".to_string());
        builder.add(&session("2", "Second"), "two".to_string());

        let bytes = builder.finish().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(archive.len(), 2);
        let mut contents = String::new();
        let mut first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "First.txt");
        first.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "one");
        drop(first);
        assert_eq!(archive.by_index(1).unwrap().name(), "Second.txt");
    }

    #[test]
    fn test_finish_rejects_empty_archive() {
        assert!(ArchiveBuilder::new().finish().is_err());
    }

    #[test]
    fn test_archive_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 30).unwrap();

        assert_eq!(
            archive_file_name("panopto", Mode::Transcripts, "Week 1 Overview", 30, at),
            "panopto-transcripts-Week 1 Overview-2024-05-01-10-15-30.zip"
        );
        assert_eq!(
            archive_file_name("panopto", Mode::Captions, "A very long folder name: term two lectures", 30, at),
            "panopto-captions-A very long folder name_ term -2024-05-01-10-15-30.zip"
        );
        assert_eq!(
            archive_file_name("panopto", Mode::Captions, "", 30, at),
            "panopto-captions-folder-2024-05-01-10-15-30.zip"
        );
    }
}
