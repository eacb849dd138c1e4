//! Panopto Caption Archiver - A Rust CLI tool for bulk caption downloads
//!
//! This library enumerates every session in a Panopto folder, downloads each session's
//! caption file, optionally turns SRT/VTT captions into a clean transcript, and bundles
//! everything into a single zip archive.

pub mod api;
pub mod archive;
pub mod captions;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod sessions;
pub mod utils;

pub use api::{Folder, PanoptoApi, PanoptoClient, Session, SessionPage};
pub use archive::{ArchiveBuilder, ArchiveEntry};
pub use captions::{normalize::normalize, CaptionDocument, CaptionFetcher};
pub use cli::{Cli, Commands, Mode};
pub use config::Config;
pub use pipeline::{AbortReason, ArchiveSink, DirectorySink, Pipeline, RunOutcome, RunResult};
pub use sessions::{FolderListing, SessionEnumerator};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the archiver's network layer
#[derive(thiserror::Error, Debug)]
pub enum ArchiverError {
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl ArchiverError {
    /// Whether a retry has any chance of succeeding
    pub fn is_transient(&self) -> bool {
        match self {
            ArchiverError::HttpStatus { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            ArchiverError::Timeout(_) => true,
        }
    }
}
