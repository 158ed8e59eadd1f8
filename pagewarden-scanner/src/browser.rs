//! The browser capability the crawler drives.
//!
//! A [`BrowserContext`] hands out isolated pages that share one browsing
//! session (cookies, storage). Everything the crawler, the authenticator and
//! the item discoverer do to a site goes through [`PageDriver`]. Each
//! operation is an `.await` point; the crawler only ever holds one page open
//! at a time.

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Client-side key/value storage of one origin.
pub type StorageSnapshot = BTreeMap<String, String>;

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

/// The `index`-th element matching `selector` at the time of the query.
/// Handles go stale once the page changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    pub selector: String,
    pub index: usize,
}

impl ElementRef {
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait BrowserContext {
    type Page: PageDriver;

    async fn new_page(&self) -> Result<Self::Page>;
}

#[allow(async_fn_in_trait)]
pub trait PageDriver {
    async fn goto(&mut self, url: &str, wait: WaitPolicy, timeout: Duration) -> Result<()>;

    /// URL after redirects and client-side route changes.
    fn current_url(&self) -> String;

    async fn title(&self) -> Result<String>;

    /// Serialized DOM.
    async fn content(&self) -> Result<String>;

    /// Absolute `href` of every anchor on the page, in document order.
    async fn link_hrefs(&self) -> Result<Vec<String>>;

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>>;

    async fn is_visible(&self, element: &ElementRef) -> Result<bool>;

    /// Click and wait up to `timeout` for any navigation it starts to settle.
    async fn click(&mut self, element: &ElementRef, timeout: Duration) -> Result<()>;

    async fn fill(&mut self, selector: &str, value: &str) -> Result<()>;

    async fn press_key(&mut self, key: &str) -> Result<()>;

    async fn wait_for_url(&mut self, target: &str, timeout: Duration) -> Result<()>;

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    async fn read_storage(&self) -> Result<StorageSnapshot>;

    async fn write_storage(&mut self, entries: &StorageSnapshot) -> Result<()>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Run a browser operation under a hard deadline, whether or not the driver
/// honours the timeout it was handed.
pub async fn bounded<T>(
    operation: &str,
    limit: Duration,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, work)
        .await
        .map_err(|_| ScanError::timeout(operation, limit))?
}
