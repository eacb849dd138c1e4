use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod client;
pub mod types;

pub use client::{PanoptoClient, RetryPolicy};

use crate::Result;

/// A named container of sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Folder GUID, when the listing reports it
    pub id: Option<String>,

    /// Display name as shown in Panopto
    pub name: String,
}

/// One recorded session, resolved from whichever field names the backend used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Delivery identifier
    pub id: String,

    /// Display name (may be empty)
    pub name: String,

    /// Where the caption file can be downloaded, if the session has captions
    pub caption_url: Option<String>,
}

/// One page of the folder's session listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPage {
    /// Sessions on this page, in backend order
    pub sessions: Vec<Session>,

    /// Number of entries the backend returned, including ones without an identifier
    pub item_count: usize,

    /// Folder metadata embedded in the page's first session
    pub folder: Option<Folder>,
}

/// Network collaborators the archiver consumes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PanoptoApi: Send + Sync {
    /// List one page (zero-based) of the sessions in a folder
    async fn list_sessions_page(&self, folder_id: &str, page: usize) -> Result<SessionPage>;

    /// Download a caption document as text
    async fn fetch_caption(&self, url: &str) -> Result<String>;
}
