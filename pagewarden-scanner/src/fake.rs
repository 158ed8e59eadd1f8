//! Scripted in-memory browser for tests that need client-side behaviour
//! (clicks that route without anchors, modals, failing pages).

use crate::browser::{BrowserContext, ElementRef, PageDriver, StorageSnapshot, WaitPolicy};
use crate::error::{Result, ScanError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MODAL_SELECTOR: &str = r#"[role="dialog"]"#;

#[derive(Debug, Clone)]
pub(crate) enum Action {
    Navigate(String),
    OpenModal,
    Nothing,
    Fail,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeElement {
    selector: String,
    visible: bool,
    action: Action,
}

impl FakeElement {
    pub(crate) fn new(selector: &str, action: Action) -> Self {
        Self {
            selector: selector.to_string(),
            visible: true,
            action,
        }
    }

    pub(crate) fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakePage {
    title: String,
    html: Option<String>,
    links: Vec<String>,
    elements: Vec<FakeElement>,
    broken: bool,
}

impl FakePage {
    pub(crate) fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn link(mut self, href: &str) -> Self {
        self.links.push(href.to_string());
        self
    }

    pub(crate) fn element(mut self, element: FakeElement) -> Self {
        self.elements.push(element);
        self
    }

    pub(crate) fn html(mut self, html: &str) -> Self {
        self.html = Some(html.to_string());
        self
    }

    /// Every navigation to this page fails.
    pub(crate) fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    fn markup(&self) -> String {
        self.html.clone().unwrap_or_else(|| {
            format!(
                r#"<html><head><title>{}</title><meta name="viewport" content="width=device-width"></head><body><main><h1>{}</h1></main></body></html>"#,
                self.title, self.title
            )
        })
    }
}

#[derive(Default)]
struct Shared {
    pages: HashMap<String, FakePage>,
    storage: Mutex<StorageSnapshot>,
    visits: Mutex<Vec<String>>,
    filled: Mutex<Vec<(String, String)>>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeBrowser {
    shared: Arc<Shared>,
}

impl FakeBrowser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, page: FakePage) -> Self {
        Arc::get_mut(&mut self.shared)
            .expect("pages are registered before the browser is shared")
            .pages
            .insert(url.to_string(), page);
        self
    }

    /// Every URL passed to `goto`, in order.
    pub(crate) fn visits(&self) -> Vec<String> {
        self.shared.visits.lock().unwrap().clone()
    }

    /// `(selector, value)` pairs typed into any tab.
    pub(crate) fn filled(&self) -> Vec<(String, String)> {
        self.shared.filled.lock().unwrap().clone()
    }

    pub(crate) fn storage(&self) -> StorageSnapshot {
        self.shared.storage.lock().unwrap().clone()
    }

    pub(crate) fn set_storage(&self, key: &str, value: &str) {
        self.shared
            .storage
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

impl BrowserContext for FakeBrowser {
    type Page = FakeTab;

    async fn new_page(&self) -> Result<FakeTab> {
        Ok(FakeTab {
            shared: self.shared.clone(),
            url: None,
            modal_open: false,
        })
    }
}

pub(crate) struct FakeTab {
    shared: Arc<Shared>,
    url: Option<String>,
    modal_open: bool,
}

impl FakeTab {
    fn current(&self) -> Result<&FakePage> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| ScanError::Navigation("no page loaded".to_string()))?;
        let key = url.split('#').next().unwrap_or(url);
        self.shared
            .pages
            .get(key)
            .ok_or_else(|| ScanError::Navigation(format!("404 {}", url)))
    }

    fn element(&self, element: &ElementRef) -> Result<&FakeElement> {
        self.current()?
            .elements
            .iter()
            .filter(|e| e.selector == element.selector)
            .nth(element.index)
            .ok_or_else(|| ScanError::ElementNotFound(element.selector.clone()))
    }
}

impl PageDriver for FakeTab {
    async fn goto(&mut self, url: &str, _wait: WaitPolicy, timeout: Duration) -> Result<()> {
        self.shared.visits.lock().unwrap().push(url.to_string());
        let key = url.split('#').next().unwrap_or(url);
        match self.shared.pages.get(key) {
            Some(page) if page.broken => Err(ScanError::timeout("navigation", timeout)),
            Some(_) => {
                self.url = Some(url.to_string());
                self.modal_open = false;
                Ok(())
            }
            None => Err(ScanError::Navigation(format!("404 {}", url))),
        }
    }

    fn current_url(&self) -> String {
        self.url.clone().unwrap_or_else(|| "about:blank".to_string())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.current()?.title.clone())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.current()?.markup())
    }

    async fn link_hrefs(&self) -> Result<Vec<String>> {
        Ok(self.current()?.links.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        if selector == MODAL_SELECTOR {
            let count = usize::from(self.modal_open);
            return Ok((0..count).map(|i| ElementRef::new(selector, i)).collect());
        }
        let count = self
            .current()?
            .elements
            .iter()
            .filter(|e| e.selector == selector)
            .count();
        Ok((0..count).map(|i| ElementRef::new(selector, i)).collect())
    }

    async fn is_visible(&self, element: &ElementRef) -> Result<bool> {
        if element.selector == MODAL_SELECTOR {
            return Ok(self.modal_open);
        }
        Ok(self.element(element)?.visible)
    }

    async fn click(&mut self, element: &ElementRef, timeout: Duration) -> Result<()> {
        match self.element(element)?.action.clone() {
            Action::Navigate(url) => self.goto(&url, WaitPolicy::NetworkIdle, timeout).await,
            Action::OpenModal => {
                self.modal_open = true;
                Ok(())
            }
            Action::Nothing => Ok(()),
            Action::Fail => Err(ScanError::Other("element detached".to_string())),
        }
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
        if self.query_all(selector).await?.is_empty() {
            return Err(ScanError::ElementNotFound(selector.to_string()));
        }
        self.shared
            .filled
            .lock()
            .unwrap()
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn press_key(&mut self, key: &str) -> Result<()> {
        if key == "Escape" {
            self.modal_open = false;
        }
        Ok(())
    }

    async fn wait_for_url(&mut self, target: &str, timeout: Duration) -> Result<()> {
        if self.current_url().contains(target) {
            Ok(())
        } else {
            Err(ScanError::timeout(format!("waiting for URL {}", target), timeout))
        }
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        if self.query_all(selector).await?.is_empty() {
            Err(ScanError::timeout(format!("waiting for {}", selector), timeout))
        } else {
            Ok(())
        }
    }

    async fn read_storage(&self) -> Result<StorageSnapshot> {
        Ok(self.shared.storage.lock().unwrap().clone())
    }

    async fn write_storage(&mut self, entries: &StorageSnapshot) -> Result<()> {
        self.shared
            .storage
            .lock()
            .unwrap()
            .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, b"png")?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}
