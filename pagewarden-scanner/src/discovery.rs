//! Finds views of a single-page app that are reachable only by clicking.
//!
//! A seed page is scanned for elements that look like list items, cards or
//! sidebar entries. One element of each kind is clicked: a route change
//! yields a detail page, a dialog that opens yields a modal view addressed
//! as `<seed>#modal-<type>`.

use crate::auth::AuthSession;
use crate::browser::{BrowserContext, ElementRef, PageDriver, WaitPolicy, bounded};
use crate::config::Timeouts;
use crate::error::Result;
use crate::filter::{UrlFilter, normalize_absolute};
use crate::registry::PageRegistry;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// A selector for candidate items and the item type it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPattern {
    pub selector: &'static str,
    pub item_type: &'static str,
}

const fn pattern(selector: &'static str, item_type: &'static str) -> ItemPattern {
    ItemPattern {
        selector,
        item_type,
    }
}

/// Tried in order; earlier patterns are more specific.
pub const ITEM_PATTERNS: &[ItemPattern] = &[
    pattern(r#"[data-testid*="item"]"#, "testid-item"),
    pattern(r#"[data-testid*="card"]"#, "testid-card"),
    pattern(r#"[data-testid*="note"]"#, "testid-note"),
    pattern(r#"[data-testid*="board"]"#, "testid-board"),
    pattern(r#"[data-testid*="event"]"#, "testid-event"),
    pattern(r#"[data-testid*="task"]"#, "testid-task"),
    pattern(r#"[data-testid*="list-item"]"#, "testid-list-item"),
    pattern(r#"[data-testid*="row"]"#, "testid-row"),
    pattern(r#"[role="listitem"]"#, "role-listitem"),
    pattern(r#"[role="row"]"#, "role-row"),
    pattern(r#"[role="option"]"#, "role-option"),
    pattern(".card", "card"),
    pattern(".list-item", "list-item"),
    pattern(".item", "item"),
    pattern(".note-item", "note-item"),
    pattern(".board-item", "board-item"),
    pattern(".event-item", "event-item"),
    pattern(".task-item", "task-item"),
    pattern(".MuiCard-root", "mui-card"),
    pattern(".MuiListItem-root", "mui-list-item"),
    pattern(".MuiTableRow-root", "mui-table-row"),
    pattern(r#"li[class*="item"]"#, "li-item"),
    pattern(r#"div[class*="card"]"#, "div-card"),
    pattern(r#"tr[class*="row"]"#, "tr-row"),
    pattern(r#"aside div[style*="cursor: pointer"]"#, "aside-clickable"),
    pattern(r#"nav div[style*="cursor: pointer"]"#, "nav-clickable"),
    pattern(
        r#"[class*="sidebar"] div[style*="cursor: pointer"]"#,
        "sidebar-clickable",
    ),
    pattern(r#"aside [role="button"]"#, "aside-role-button"),
    pattern("aside button", "aside-button"),
    pattern(
        r#"[role="complementary"] div[style*="cursor"]"#,
        "complementary-clickable",
    ),
];

pub const MODAL_SELECTORS: &[&str] = &[
    r#"[role="dialog"]"#,
    r#"[role="modal"]"#,
    ".MuiDialog-root",
    ".MuiModal-root",
    ".modal",
    r#"[class*="modal"]"#,
    r#"[class*="dialog"]"#,
];

const MAIN_LANDMARK: &str = r#"main, [role="main"], .main-content"#;
const CANDIDATES_PER_PATTERN: usize = 3;
const LOGIN_PROBE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Page,
    Modal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredItem {
    pub url: String,
    pub item_type: String,
    pub kind: ItemKind,
    pub title: Option<String>,
}

/// Whether the loaded page is a login screen rather than the app.
pub fn looks_like_login(current_url: &str, content: &str) -> bool {
    if current_url.to_lowercase().contains("login") {
        return true;
    }
    let head: String = content.chars().take(LOGIN_PROBE_CHARS).collect();
    head.to_lowercase().contains("sign in")
}

pub struct ItemDiscoverer<'a, C: BrowserContext> {
    context: &'a C,
    filter: &'a UrlFilter,
    timeouts: Timeouts,
    auth: Option<&'a AuthSession>,
}

impl<'a, C: BrowserContext> ItemDiscoverer<'a, C> {
    pub fn new(
        context: &'a C,
        filter: &'a UrlFilter,
        timeouts: Timeouts,
        auth: Option<&'a AuthSession>,
    ) -> Self {
        Self {
            context,
            filter,
            timeouts,
            auth,
        }
    }

    /// Discover at most `limit` items reachable from `seed` whose URLs are not
    /// already in `known`. Failures are logged and end discovery on this seed
    /// with whatever was found so far.
    pub async fn discover(
        &self,
        seed: &str,
        known: &PageRegistry,
        limit: usize,
    ) -> Vec<DiscoveredItem> {
        let mut found = Vec::new();
        if limit == 0 {
            return found;
        }

        let mut page = match self.context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!("Item discovery could not open a page for {}: {}", seed, e);
                return found;
            }
        };

        if let Err(e) = self
            .discover_on(&mut page, seed, known, limit, &mut found)
            .await
        {
            warn!("Item discovery error on {}: {}", seed, e);
        }

        if let Err(e) = page.close().await {
            debug!("Closing discovery page failed: {}", e);
        }
        found
    }

    async fn discover_on(
        &self,
        page: &mut C::Page,
        seed: &str,
        known: &PageRegistry,
        limit: usize,
        found: &mut Vec<DiscoveredItem>,
    ) -> Result<()> {
        self.open_seed(page, seed).await?;

        if page
            .wait_for_selector(MAIN_LANDMARK, self.timeouts.interaction())
            .await
            .is_err()
        {
            debug!("No main landmark on {}, scanning anyway", seed);
        }
        tokio::time::sleep(self.timeouts.settle()).await;

        let content = page.content().await?;
        if looks_like_login(&page.current_url(), &content) {
            info!("{} shows a login screen, skipping item discovery", seed);
            return Ok(());
        }

        let mut discovered_types: HashSet<&str> = HashSet::new();

        for pattern in ITEM_PATTERNS {
            if found.len() >= limit {
                break;
            }
            if discovered_types.contains(pattern.item_type) {
                continue;
            }

            let candidates = match page.query_all(pattern.selector).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    debug!("Pattern {} unusable: {}", pattern.selector, e);
                    continue;
                }
            };

            for candidate in candidates.iter().take(CANDIDATES_PER_PATTERN) {
                match self
                    .try_candidate(page, seed, pattern, candidate, known, found)
                    .await
                {
                    Ok(Some(item)) => {
                        info!("Discovered {:?} item: {}", item.kind, item.url);
                        found.push(item);
                        discovered_types.insert(pattern.item_type);
                        break;
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        debug!("Candidate {:?} failed: {}", candidate, e);
                        self.recover(page, seed).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn open_seed(&self, page: &mut C::Page, seed: &str) -> Result<()> {
        let navigation = self.timeouts.navigation();
        match self.auth {
            Some(session) => {
                bounded(
                    "seed navigation",
                    navigation * 2,
                    session.apply(page, seed, &self.timeouts),
                )
                .await
            }
            None => {
                bounded(
                    "seed navigation",
                    navigation,
                    page.goto(seed, WaitPolicy::NetworkIdle, navigation),
                )
                .await
            }
        }
    }

    /// Click one candidate. `Ok(None)` means nothing new came of it and the
    /// page is back on the seed.
    async fn try_candidate(
        &self,
        page: &mut C::Page,
        seed: &str,
        pattern: &ItemPattern,
        candidate: &ElementRef,
        known: &PageRegistry,
        found: &[DiscoveredItem],
    ) -> Result<Option<DiscoveredItem>> {
        if !page.is_visible(candidate).await? {
            return Ok(None);
        }

        let before = page.current_url();
        let interaction = self.timeouts.interaction();
        bounded("item click", interaction, page.click(candidate, interaction)).await?;
        let after = page.current_url();

        let is_new = |url: &str| !known.contains(url) && !found.iter().any(|i| i.url == url);

        if after != before {
            let destination = normalize_absolute(&after)
                .filter(|url| self.filter.should_crawl(url) && is_new(url));
            let title = page.title().await.ok();
            self.return_to_seed(page, seed).await?;

            return Ok(destination.map(|url| DiscoveredItem {
                url,
                item_type: pattern.item_type.to_string(),
                kind: ItemKind::Page,
                title,
            }));
        }

        for modal_selector in MODAL_SELECTORS {
            let Some(modal) = page.query_all(modal_selector).await?.into_iter().next() else {
                continue;
            };
            if !page.is_visible(&modal).await? {
                continue;
            }

            let url = format!("{}#modal-{}", seed, pattern.item_type);
            let title = page.title().await.ok();
            page.press_key("Escape").await?;
            tokio::time::sleep(self.timeouts.settle() / 4).await;

            return Ok(is_new(&url).then(|| DiscoveredItem {
                url,
                item_type: pattern.item_type.to_string(),
                kind: ItemKind::Modal,
                title,
            }));
        }

        Ok(None)
    }

    async fn return_to_seed(&self, page: &mut C::Page, seed: &str) -> Result<()> {
        let navigation = self.timeouts.navigation();
        bounded(
            "return to seed",
            navigation,
            page.goto(seed, WaitPolicy::NetworkIdle, navigation),
        )
        .await?;
        tokio::time::sleep(self.timeouts.settle() / 2).await;
        Ok(())
    }

    /// Best effort to get back to the seed after a failed click.
    async fn recover(&self, page: &mut C::Page, seed: &str) {
        if page.current_url() == seed {
            return;
        }
        if let Err(e) = self.return_to_seed(page, seed).await {
            debug!("Could not return to {}: {}", seed, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::fake::{Action, FakeBrowser, FakeElement, FakePage};
    use crate::registry::PageSource;

    const SEED: &str = "https://app.test/notes";
    const CARD: &str = r#"[data-testid*="card"]"#;

    fn filter() -> UrlFilter {
        UrlFilter::from_config(&CrawlConfig::new("https://app.test")).unwrap()
    }

    fn registry_with_seed() -> PageRegistry {
        let mut registry = PageRegistry::new();
        registry.register(SEED, 0, None, PageSource::Start);
        registry
    }

    async fn discover(browser: &FakeBrowser, limit: usize) -> Vec<DiscoveredItem> {
        let filter = filter();
        let registry = registry_with_seed();
        ItemDiscoverer::new(browser, &filter, Timeouts::immediate(), None)
            .discover(SEED, &registry, limit)
            .await
    }

    fn navigates(selector: &str, to: &str) -> FakeElement {
        FakeElement::new(selector, Action::Navigate(to.to_string()))
    }

    #[tokio::test]
    async fn test_cards_with_same_destination_yield_one_item() {
        let browser = FakeBrowser::new()
            .page(
                SEED,
                FakePage::new("Notes")
                    .element(navigates(CARD, "https://app.test/notes/1"))
                    .element(navigates(CARD, "https://app.test/notes/1")),
            )
            .page("https://app.test/notes/1", FakePage::new("Note one"));

        let items = discover(&browser, 10).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://app.test/notes/1");
        assert_eq!(items[0].item_type, "testid-card");
        assert_eq!(items[0].kind, ItemKind::Page);
        assert_eq!(items[0].title.as_deref(), Some("Note one"));
        // one click on the first card, then back to the seed
        let clicks = browser
            .visits()
            .iter()
            .filter(|v| v.as_str() == "https://app.test/notes/1")
            .count();
        assert_eq!(clicks, 1);
    }

    #[tokio::test]
    async fn test_known_destination_moves_on_to_next_candidate() {
        let browser = FakeBrowser::new()
            .page(
                SEED,
                FakePage::new("Notes")
                    .element(navigates(CARD, "https://app.test/notes/"))
                    .element(navigates(CARD, "https://app.test/notes/2")),
            )
            .page("https://app.test/notes/", FakePage::new("Notes"))
            .page("https://app.test/notes/2", FakePage::new("Note two"));

        let items = discover(&browser, 10).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://app.test/notes/2");
    }

    #[tokio::test]
    async fn test_modal_is_recorded_under_pseudo_url() {
        let browser = FakeBrowser::new().page(
            SEED,
            FakePage::new("Notes")
                .element(FakeElement::new(".card", Action::OpenModal))
                .element(FakeElement::new(".card", Action::OpenModal)),
        );

        let items = discover(&browser, 10).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://app.test/notes#modal-card");
        assert_eq!(items[0].kind, ItemKind::Modal);
    }

    #[tokio::test]
    async fn test_hidden_and_failing_candidates_are_skipped() {
        let browser = FakeBrowser::new()
            .page(
                SEED,
                FakePage::new("Notes")
                    .element(navigates(".item", "https://app.test/hidden").hidden())
                    .element(FakeElement::new(".item", Action::Fail))
                    .element(navigates(".item", "https://app.test/notes/3")),
            )
            .page("https://app.test/notes/3", FakePage::new("Note three"));

        let items = discover(&browser, 10).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://app.test/notes/3");
        assert!(!browser.visits().iter().any(|v| v.ends_with("/hidden")));
    }

    #[tokio::test]
    async fn test_limit_caps_items() {
        let browser = FakeBrowser::new()
            .page(
                SEED,
                FakePage::new("Notes")
                    .element(navigates(CARD, "https://app.test/notes/1"))
                    .element(navigates(".card", "https://app.test/notes/2")),
            )
            .page("https://app.test/notes/1", FakePage::new("One"))
            .page("https://app.test/notes/2", FakePage::new("Two"));

        assert_eq!(discover(&browser, 1).await.len(), 1);
        assert!(discover(&browser, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_login_screen_aborts_discovery() {
        let browser = FakeBrowser::new().page(
            SEED,
            FakePage::new("Welcome")
                .html("<html><body><h1>Please sign in</h1></body></html>")
                .element(navigates(CARD, "https://app.test/notes/1")),
        );

        assert!(discover(&browser, 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_session_is_replayed_before_scanning() {
        let browser = FakeBrowser::new()
            .page("https://app.test", FakePage::new("Home"))
            .page(SEED, FakePage::new("Notes"));
        let session = AuthSession {
            storage: [("token".to_string(), "t".to_string())].into(),
            captured_at: chrono::Utc::now(),
        };
        let filter = filter();
        let registry = registry_with_seed();

        ItemDiscoverer::new(&browser, &filter, Timeouts::immediate(), Some(&session))
            .discover(SEED, &registry, 5)
            .await;

        assert_eq!(browser.visits()[..2], ["https://app.test", SEED]);
        assert_eq!(browser.storage().get("token").map(String::as_str), Some("t"));
    }

    #[test]
    fn test_looks_like_login() {
        assert!(looks_like_login("https://app.test/Login?next=/", ""));
        assert!(looks_like_login("https://app.test/", "<h1>Sign In</h1>"));
        let late = format!("{}sign in", "x".repeat(600));
        assert!(!looks_like_login("https://app.test/", &late));
    }
}
