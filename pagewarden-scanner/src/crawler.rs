use crate::auth::{AuthSession, authenticate};
use crate::browser::{BrowserContext, PageDriver, WaitPolicy, bounded};
use crate::config::CrawlConfig;
use crate::discovery::ItemDiscoverer;
use crate::error::{Result, ScanError};
use crate::filter::{UrlFilter, normalize, normalize_absolute, route_url};
use crate::registry::{PageRegistry, PageSource, PageStatus};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `(message, current, total)` at crawl milestones.
pub type ProgressCallback = Arc<dyn Fn(String, usize, usize) + Send + Sync>;

/// Depth at which pages found by clicking are recorded.
pub const INTERACTION_DEPTH: usize = 2;

/// Everything a crawl produced besides the test results.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub registry: PageRegistry,
    pub auth: Option<AuthSession>,
    /// Pages that took a slot of the `max_pages` budget.
    pub visited: usize,
}

/// Breadth-first discovery of a site. The crawler is the only writer of the
/// page registry and handles one page at a time.
pub struct Crawler<'a, C: BrowserContext> {
    context: &'a C,
    config: &'a CrawlConfig,
    filter: UrlFilter,
    start_url: String,
    progress_callback: Option<ProgressCallback>,
}

impl<'a, C: BrowserContext> Crawler<'a, C> {
    /// Fails only on setup problems: an unusable start URL or an invalid
    /// include/exclude pattern.
    pub fn new(context: &'a C, config: &'a CrawlConfig) -> Result<Self> {
        let start_url = normalize_absolute(&config.start_url)
            .ok_or_else(|| ScanError::InvalidUrl(config.start_url.clone()))?;
        let filter = UrlFilter::from_config(config)?;

        Ok(Self {
            context,
            config,
            filter,
            start_url,
            progress_callback: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn report_progress(&self, message: String, current: usize, total: usize) {
        if let Some(ref callback) = self.progress_callback {
            callback(message, current, total);
        }
    }

    /// Seeds are always visited; everything else only within `max_depth`.
    fn within_depth(&self, depth: usize, source: PageSource) -> bool {
        source.is_seed() || depth <= self.config.max_depth
    }

    pub async fn crawl(&self) -> Result<CrawlOutcome> {
        info!("Starting crawl of {}", self.start_url);
        self.report_progress("Starting crawl...".to_string(), 0, 0);

        let auth = match &self.config.auth_config {
            Some(auth_config) => {
                let session = authenticate(
                    self.context,
                    auth_config,
                    &self.config.start_url,
                    &self.config.timeouts,
                )
                .await;
                if session.is_some() {
                    self.report_progress("Authentication successful".to_string(), 0, 0);
                }
                session
            }
            None => None,
        };

        let mut registry = PageRegistry::new();
        let mut queue = self.seed(&mut registry);
        let mut visited = 0;
        let delay = self.config.request_delay();

        while visited < self.config.max_pages
            && let Some(url) = queue.pop_front()
        {
            let Some(page) = registry.get(&url) else {
                continue;
            };
            if page.status != PageStatus::Pending {
                continue;
            }
            let depth = page.depth;

            if !self.within_depth(depth, page.source) {
                debug!("Skipping {} at depth {}", url, depth);
                registry.mark_skipped(&url)?;
                continue;
            }

            visited += 1;
            self.report_progress(format!("Crawling: {}", url), visited, registry.len());
            registry.mark_crawling(&url)?;

            match self.visit(&url).await {
                Ok((title, links)) => {
                    let mut queued = 0;
                    for link in links.iter().filter(|l| self.filter.should_crawl(l)) {
                        if registry.register(link, depth + 1, Some(&url), PageSource::Link) {
                            queue.push_back(link.clone());
                            queued += 1;
                        }
                    }
                    debug!("{}: {} links, {} new", url, links.len(), queued);
                    registry.mark_tested(&url, Some(title), links)?;
                }
                Err(e) => {
                    warn!("Crawl error for {}: {}", url, e);
                    registry.mark_error(&url, e.to_string())?;
                }
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        // Clicked-through pages sit at a fixed depth and share the link budget.
        if self.config.discover_items
            && self.within_depth(INTERACTION_DEPTH, PageSource::Interaction)
            && visited < self.config.max_pages
        {
            visited += self
                .discover_items(&mut registry, auth.as_ref(), visited)
                .await?;
        }

        let discovered = registry.len();
        info!(
            "Crawl complete. Discovered {} pages, visited {}",
            discovered, visited
        );
        self.report_progress(
            format!("Crawl complete: {} pages discovered", discovered),
            discovered,
            discovered,
        );

        Ok(CrawlOutcome {
            registry,
            auth,
            visited,
        })
    }

    /// Register the start URL and the extra routes, in that order.
    fn seed(&self, registry: &mut PageRegistry) -> VecDeque<String> {
        let mut queue = VecDeque::new();
        registry.register(&self.start_url, 0, None, PageSource::Start);
        queue.push_back(self.start_url.clone());

        for route in &self.config.additional_routes {
            match route_url(&self.config.start_url, route) {
                Some(url) => {
                    if registry.register(&url, 1, Some(&self.start_url), PageSource::Route) {
                        queue.push_back(url);
                    }
                }
                None => warn!("Ignoring unusable route {:?}", route),
            }
        }
        queue
    }

    /// Load one page in a fresh tab. Returns its title and the normalized,
    /// de-duplicated links it contains.
    async fn visit(&self, url: &str) -> Result<(String, Vec<String>)> {
        let mut page = self.context.new_page().await?;
        let loaded = self.load(&mut page, url).await;
        if let Err(e) = page.close().await {
            debug!("Closing page for {} failed: {}", url, e);
        }
        let (title, hrefs) = loaded?;

        let mut seen = HashSet::new();
        let links = hrefs
            .iter()
            .filter_map(|href| normalize(href, url))
            .filter(|link| seen.insert(link.clone()))
            .collect();
        Ok((title, links))
    }

    async fn load(&self, page: &mut C::Page, url: &str) -> Result<(String, Vec<String>)> {
        let navigation = self.config.timeouts.navigation();
        bounded(
            "navigation",
            navigation,
            page.goto(url, WaitPolicy::NetworkIdle, navigation),
        )
        .await?;
        Ok((page.title().await?, page.link_hrefs().await?))
    }

    /// Click through every crawled page looking for interaction-only views.
    /// Returns how many budget slots the new pages used.
    async fn discover_items(
        &self,
        registry: &mut PageRegistry,
        auth: Option<&AuthSession>,
        visited: usize,
    ) -> Result<usize> {
        self.report_progress(
            "Discovering clickable items in SPA...".to_string(),
            visited,
            self.config.max_pages,
        );

        let discoverer =
            ItemDiscoverer::new(self.context, &self.filter, self.config.timeouts, auth);
        let mut used = 0;

        for seed in registry.urls_with_status(PageStatus::Tested) {
            let remaining = self.config.max_pages.saturating_sub(visited + used);
            if remaining == 0 {
                break;
            }

            let items = discoverer.discover(&seed, registry, remaining).await;
            for item in items {
                if visited + used >= self.config.max_pages {
                    break;
                }
                let registered = registry.register(
                    &item.url,
                    INTERACTION_DEPTH,
                    Some(&seed),
                    PageSource::Interaction,
                );
                if !registered {
                    continue;
                }
                registry.mark_crawling(&item.url)?;
                registry.mark_tested(&item.url, item.title, Vec::new())?;
                used += 1;
                self.report_progress(
                    format!("Discovered item page: {}", item.url),
                    visited + used,
                    registry.len(),
                );
            }
        }

        Ok(used)
    }
}
