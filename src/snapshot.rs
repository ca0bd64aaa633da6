//! Catalog snapshot paginator.
//!
//! Drains a paged catalog source into one in-memory collection for bulk
//! matching. Pages are requested one at a time starting at offset 0; an empty
//! or short page ends the fetch.

use tracing::{debug, info};

use crate::cancel::{CancellationToken, Completion};
use crate::models::CatalogEntry;

/// Default number of entries requested per page
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Paged access to a full catalog.
pub trait PageSource {
    type Error;

    /// Fetch up to `limit` entries starting at `offset`.
    /// Fewer than `limit` entries (or none) means there is nothing after this page.
    fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<CatalogEntry>, Self::Error>;
}

#[derive(Debug, Clone, Copy)]
pub struct SnapshotPaginator {
    page_size: usize,
}

impl Default for SnapshotPaginator {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SnapshotPaginator {
    /// Page sizes below 1 are raised to 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch every page from `source`.
    ///
    /// `on_progress` receives the running entry count after each non-empty page.
    /// Cancellation is checked before every page request; a cancelled fetch
    /// discards what it accumulated. The first source error is returned as-is.
    pub fn fetch_all<S, F>(
        &self,
        source: &S,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<Completion<Vec<CatalogEntry>>, S::Error>
    where
        S: PageSource + ?Sized,
        F: FnMut(usize),
    {
        let mut all: Vec<CatalogEntry> = Vec::new();
        let mut offset = 0;

        loop {
            if cancel.is_cancelled() {
                info!(fetched = all.len(), "catalog fetch cancelled");
                return Ok(Completion::Cancelled);
            }

            let page = source.fetch_page(offset, self.page_size)?;
            debug!(offset, returned = page.len(), "fetched catalog page");
            if page.is_empty() {
                break;
            }

            let page_len = page.len();
            all.extend(page);
            on_progress(all.len());

            if page_len < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        info!(entries = all.len(), "catalog snapshot complete");
        Ok(Completion::Finished(all))
    }
}
