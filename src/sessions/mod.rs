use anyhow::Context;

use crate::api::{Folder, PanoptoApi, Session, SessionPage};
use crate::Result;

/// Everything the listing endpoint reported for one folder
#[derive(Debug, Clone, Default)]
pub struct FolderListing {
    /// Folder metadata from the first page, if it carried any
    pub folder: Option<Folder>,

    /// All sessions, in page order
    pub sessions: Vec<Session>,

    /// Number of page requests issued
    pub pages_fetched: usize,
}

/// Pagination state for the sessions listing.
///
/// The API exposes neither a total nor a cursor, so a page shorter than the page size is
/// the only end-of-listing signal.
#[derive(Debug)]
pub struct Paginator {
    page_size: usize,
    next_page: usize,
    has_more: bool,
    listing: FolderListing,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            next_page: 0,
            has_more: true,
            listing: FolderListing::default(),
        }
    }

    /// Zero-based index of the page to request next, or `None` once the listing is exhausted
    pub fn next_page(&self) -> Option<usize> {
        self.has_more.then_some(self.next_page)
    }

    /// Record a successfully fetched page
    pub fn accept(&mut self, page: SessionPage) {
        if self.next_page == 0 {
            self.listing.folder = page.folder;
        }

        self.has_more = page.item_count == self.page_size;
        self.listing.sessions.extend(page.sessions);
        self.listing.pages_fetched += 1;
        self.next_page += 1;
    }

    pub fn finish(self) -> FolderListing {
        self.listing
    }
}

/// Lists every session in a folder, one page at a time
pub struct SessionEnumerator<'a, A: PanoptoApi + ?Sized> {
    api: &'a A,
    page_size: usize,
}

impl<'a, A: PanoptoApi + ?Sized> SessionEnumerator<'a, A> {
    pub fn new(api: &'a A, page_size: usize) -> Self {
        Self { api, page_size }
    }

    /// Fetch all pages. Any failed page fails the whole listing.
    pub async fn list_all(&self, folder_id: &str) -> Result<FolderListing> {
        let mut paginator = Paginator::new(self.page_size);

        while let Some(page_number) = paginator.next_page() {
            let page = self
                .api
                .list_sessions_page(folder_id, page_number)
                .await
                .with_context(|| format!("Failed to list sessions in folder {}", folder_id))?;

            tracing::info!(
                "Sessions page {}: {} item(s)",
                page_number,
                page.item_count
            );
            paginator.accept(page);
        }

        let listing = paginator.finish();
        tracing::info!(
            "Found {} session(s) in folder {} across {} page(s)",
            listing.sessions.len(),
            folder_id,
            listing.pages_fetched
        );

        Ok(listing)
    }
}
