use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle of a discovered page.
///
/// ```text
/// Pending -> Crawling -> Tested
///                     -> Error
/// Pending -> Skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Pending,
    Crawling,
    Tested,
    Skipped,
    Error,
}

impl PageStatus {
    pub fn can_transition(self, to: PageStatus) -> bool {
        matches!(
            (self, to),
            (PageStatus::Pending, PageStatus::Crawling)
                | (PageStatus::Pending, PageStatus::Skipped)
                | (PageStatus::Crawling, PageStatus::Tested)
                | (PageStatus::Crawling, PageStatus::Error)
        )
    }
}

/// How a page first came to be known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    Start,
    Route,
    Link,
    Interaction,
}

impl PageSource {
    /// Pages the user asked for explicitly.
    pub fn is_seed(self) -> bool {
        matches!(self, PageSource::Start | PageSource::Route)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    pub title: Option<String>,
    pub depth: usize,
    pub parent_url: Option<String>,
    pub status: PageStatus,
    pub source: PageSource,
    pub discovered_at: DateTime<Utc>,
    pub links_found: Vec<String>,
    pub error_message: Option<String>,
}

impl CrawledPage {
    pub fn new(url: String, depth: usize, parent_url: Option<String>, source: PageSource) -> Self {
        Self {
            url,
            title: None,
            depth,
            parent_url,
            status: PageStatus::Pending,
            source,
            discovered_at: Utc::now(),
            links_found: Vec::new(),
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub crawling: usize,
    pub tested: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl StatusCounts {
    pub fn tally<'a>(pages: impl IntoIterator<Item = &'a CrawledPage>) -> Self {
        let mut counts = Self::default();
        for page in pages {
            match page.status {
                PageStatus::Pending => counts.pending += 1,
                PageStatus::Crawling => counts.crawling += 1,
                PageStatus::Tested => counts.tested += 1,
                PageStatus::Skipped => counts.skipped += 1,
                PageStatus::Error => counts.errored += 1,
            }
        }
        counts
    }

    pub fn discovered(&self) -> usize {
        self.pending + self.crawling + self.tested + self.skipped + self.errored
    }
}

/// Every page seen during a run, keyed by normalized URL, in discovery order.
#[derive(Debug, Default, Clone)]
pub struct PageRegistry {
    pages: HashMap<String, CrawledPage>,
    order: Vec<String>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the URL is already known; the existing record wins.
    pub fn register(
        &mut self,
        url: &str,
        depth: usize,
        parent_url: Option<&str>,
        source: PageSource,
    ) -> bool {
        if self.pages.contains_key(url) {
            return false;
        }
        let page = CrawledPage::new(
            url.to_string(),
            depth,
            parent_url.map(str::to_string),
            source,
        );
        self.pages.insert(url.to_string(), page);
        self.order.push(url.to_string());
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.pages.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&CrawledPage> {
        self.pages.get(url)
    }

    pub fn status(&self, url: &str) -> Option<PageStatus> {
        self.pages.get(url).map(|p| p.status)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The only place a page's status changes.
    pub fn transition(&mut self, url: &str, to: PageStatus) -> Result<&mut CrawledPage> {
        let page = self
            .pages
            .get_mut(url)
            .ok_or_else(|| ScanError::UnknownPage(url.to_string()))?;

        if !page.status.can_transition(to) {
            return Err(ScanError::InvalidTransition {
                url: url.to_string(),
                from: page.status,
                to,
            });
        }
        page.status = to;
        Ok(page)
    }

    pub fn mark_crawling(&mut self, url: &str) -> Result<()> {
        self.transition(url, PageStatus::Crawling).map(|_| ())
    }

    pub fn mark_tested(&mut self, url: &str, title: Option<String>, links: Vec<String>) -> Result<()> {
        let page = self.transition(url, PageStatus::Tested)?;
        page.title = title;
        page.links_found = links;
        Ok(())
    }

    pub fn mark_error(&mut self, url: &str, message: String) -> Result<()> {
        let page = self.transition(url, PageStatus::Error)?;
        page.error_message = Some(message);
        Ok(())
    }

    pub fn mark_skipped(&mut self, url: &str) -> Result<()> {
        self.transition(url, PageStatus::Skipped).map(|_| ())
    }

    pub fn pages(&self) -> impl Iterator<Item = &CrawledPage> {
        self.order.iter().filter_map(|url| self.pages.get(url))
    }

    pub fn urls_with_status(&self, status: PageStatus) -> Vec<String> {
        self.pages()
            .filter(|p| p.status == status)
            .map(|p| p.url.clone())
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::tally(self.pages.values())
    }

    pub fn into_pages(mut self) -> Vec<CrawledPage> {
        self.order
            .iter()
            .filter_map(|url| self.pages.remove(url))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PageStatus; 5] = [
        PageStatus::Pending,
        PageStatus::Crawling,
        PageStatus::Tested,
        PageStatus::Skipped,
        PageStatus::Error,
    ];

    #[test]
    fn test_transition_table() {
        let allowed: Vec<(PageStatus, PageStatus)> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (PageStatus::Pending, PageStatus::Crawling),
                (PageStatus::Pending, PageStatus::Skipped),
                (PageStatus::Crawling, PageStatus::Tested),
                (PageStatus::Crawling, PageStatus::Error),
            ]
        );
    }

    #[test]
    fn test_nothing_reenters_pending() {
        for from in ALL {
            assert!(!from.can_transition(PageStatus::Pending));
        }
    }

    #[test]
    fn test_register_is_unique() {
        let mut registry = PageRegistry::new();
        assert!(registry.register("https://example.com", 0, None, PageSource::Start));
        assert!(!registry.register(
            "https://example.com",
            3,
            Some("https://example.com/x"),
            PageSource::Link
        ));

        assert_eq!(registry.len(), 1);
        let page = registry.get("https://example.com").unwrap();
        assert_eq!(page.depth, 0);
        assert_eq!(page.source, PageSource::Start);
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let mut registry = PageRegistry::new();
        registry.register("https://example.com", 0, None, PageSource::Start);

        registry.mark_crawling("https://example.com").unwrap();
        registry
            .mark_tested(
                "https://example.com",
                Some("Home".to_string()),
                vec!["https://example.com/a".to_string()],
            )
            .unwrap();

        let page = registry.get("https://example.com").unwrap();
        assert_eq!(page.status, PageStatus::Tested);
        assert_eq!(page.title.as_deref(), Some("Home"));
        assert_eq!(page.links_found.len(), 1);
    }

    #[test]
    fn test_illegal_transition_is_rejected() {
        let mut registry = PageRegistry::new();
        registry.register("https://example.com", 0, None, PageSource::Start);

        let err = registry
            .mark_tested("https://example.com", None, Vec::new())
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidTransition { .. }));
        assert_eq!(
            registry.status("https://example.com"),
            Some(PageStatus::Pending)
        );

        registry.mark_skipped("https://example.com").unwrap();
        assert!(registry.mark_crawling("https://example.com").is_err());
    }

    #[test]
    fn test_unknown_page() {
        let mut registry = PageRegistry::new();
        assert!(matches!(
            registry.mark_crawling("https://nowhere.test"),
            Err(ScanError::UnknownPage(_))
        ));
    }

    #[test]
    fn test_counts_and_order() {
        let mut registry = PageRegistry::new();
        registry.register("https://example.com", 0, None, PageSource::Start);
        registry.register("https://example.com/b", 1, Some("https://example.com"), PageSource::Link);
        registry.register("https://example.com/a", 1, Some("https://example.com"), PageSource::Link);

        registry.mark_crawling("https://example.com").unwrap();
        registry.mark_tested("https://example.com", None, Vec::new()).unwrap();
        registry.mark_crawling("https://example.com/b").unwrap();
        registry
            .mark_error("https://example.com/b", "timeout".to_string())
            .unwrap();

        let counts = registry.counts();
        assert_eq!(counts.tested, 1);
        assert_eq!(counts.errored, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.discovered(), registry.len());

        let urls: Vec<&str> = registry.pages().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.com", "https://example.com/b", "https://example.com/a"]
        );
        assert_eq!(
            registry.get("https://example.com/b").unwrap().error_message.as_deref(),
            Some("timeout")
        );
    }
}
