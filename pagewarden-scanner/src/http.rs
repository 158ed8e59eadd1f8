//! A browser that speaks plain HTTP.
//!
//! Pages are fetched with reqwest and queried with scraper. No script runs,
//! so only server-rendered markup is visible. Clicking follows anchors (on
//! the element, an ancestor, or the first descendant) and submits forms from
//! submit buttons; anything else is inert. Cookies persist across all pages
//! of one [`HttpBrowser`], and client storage is kept per origin in memory.

use crate::browser::{BrowserContext, ElementRef, PageDriver, StorageSnapshot, WaitPolicy};
use crate::error::{Result, ScanError};
use crate::filter::normalize_absolute;
use reqwest::{Client, RequestBuilder};
use scraper::{ElementRef as DomElement, Html, Selector};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;
use tracing::debug;
use url::Url;

static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static FORM_FIELDS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("input[name], select[name], textarea[name]").expect("valid field selector")
});
static OPTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option").expect("valid option selector"));

const USER_AGENT: &str = concat!("Pagewarden/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpBrowser {
    client: Client,
    storage: Arc<Mutex<HashMap<String, StorageSnapshot>>>,
}

impl HttpBrowser {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client. Enable its cookie store to keep sessions.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            storage: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl BrowserContext for HttpBrowser {
    type Page = HttpPage;

    async fn new_page(&self) -> Result<HttpPage> {
        Ok(HttpPage {
            client: self.client.clone(),
            storage: self.storage.clone(),
            url: None,
            html: String::new(),
            filled: HashMap::new(),
        })
    }
}

pub struct HttpPage {
    client: Client,
    storage: Arc<Mutex<HashMap<String, StorageSnapshot>>>,
    url: Option<Url>,
    html: String,
    /// Values typed into form fields, keyed by field name.
    filled: HashMap<String, String>,
}

enum ClickAction {
    Follow(Url),
    Submit(FormSubmission),
    Inert,
}

struct FormSubmission {
    action: Url,
    post: bool,
    fields: Vec<(String, String)>,
}

impl HttpPage {
    fn loaded_url(&self) -> Result<&Url> {
        self.url
            .as_ref()
            .ok_or_else(|| ScanError::Navigation("no page loaded".to_string()))
    }

    async fn load(&mut self, request: RequestBuilder, timeout: Duration) -> Result<()> {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                ScanError::timeout("navigation", timeout)
            } else {
                ScanError::HttpError(e)
            }
        })?;

        let final_url = response.url().clone();
        debug!("Loaded {} ({})", final_url, response.status());
        let body = response.text().await?;

        self.url = Some(final_url);
        self.html = body;
        self.filled.clear();
        Ok(())
    }

    fn origin_key(&self) -> Result<String> {
        Ok(self.loaded_url()?.origin().ascii_serialization())
    }

    fn click_action(&self, element: &ElementRef) -> Result<ClickAction> {
        let base = self.loaded_url()?.clone();
        let document = Html::parse_document(&self.html);
        let target = nth_match(&document, &element.selector, element.index)?;

        let anchor = std::iter::once(target)
            .chain(target.ancestors().filter_map(DomElement::wrap))
            .find(|el| el.value().name() == "a" && el.value().attr("href").is_some())
            .or_else(|| target.select(&ANCHORS).next());

        if let Some(anchor) = anchor
            && let Some(href) = anchor.value().attr("href")
        {
            let href = href.trim();
            if href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
                return Ok(ClickAction::Inert);
            }
            return base
                .join(href)
                .map(ClickAction::Follow)
                .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", href, e)));
        }

        if is_submit_control(&target)
            && let Some(form) = target
                .ancestors()
                .filter_map(DomElement::wrap)
                .find(|el| el.value().name() == "form")
        {
            let mut fields = collect_form_fields(&form, &self.filled);
            if let Some(name) = target.value().attr("name") {
                let value = target.value().attr("value").unwrap_or_default();
                fields.push((name.to_string(), value.to_string()));
            }

            let action = match form.value().attr("action") {
                Some(action) if !action.trim().is_empty() => base
                    .join(action.trim())
                    .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", action, e)))?,
                _ => base.clone(),
            };
            let post = form
                .value()
                .attr("method")
                .is_some_and(|m| m.eq_ignore_ascii_case("post"));

            return Ok(ClickAction::Submit(FormSubmission {
                action,
                post,
                fields,
            }));
        }

        Ok(ClickAction::Inert)
    }
}

impl PageDriver for HttpPage {
    async fn goto(&mut self, url: &str, _wait: WaitPolicy, timeout: Duration) -> Result<()> {
        let target =
            Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
        let request = self.client.get(target);
        self.load(request, timeout).await
    }

    fn current_url(&self) -> String {
        self.url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "about:blank".to_string())
    }

    async fn title(&self) -> Result<String> {
        let document = Html::parse_document(&self.html);
        Ok(document
            .select(&TITLE)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .unwrap_or_default())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn link_hrefs(&self) -> Result<Vec<String>> {
        let base = self.loaded_url()?;
        let document = Html::parse_document(&self.html);
        Ok(document
            .select(&ANCHORS)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| base.join(href.trim()).ok())
            .map(|u| u.to_string())
            .collect())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        let parsed = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let count = document.select(&parsed).count();
        Ok((0..count).map(|i| ElementRef::new(selector, i)).collect())
    }

    async fn is_visible(&self, element: &ElementRef) -> Result<bool> {
        let document = Html::parse_document(&self.html);
        let target = nth_match(&document, &element.selector, element.index)?;
        Ok(std::iter::once(target)
            .chain(target.ancestors().filter_map(DomElement::wrap))
            .all(|el| !is_hidden(&el)))
    }

    async fn click(&mut self, element: &ElementRef, timeout: Duration) -> Result<()> {
        match self.click_action(element)? {
            ClickAction::Follow(url) => {
                let request = self.client.get(url);
                self.load(request, timeout).await
            }
            ClickAction::Submit(submission) => {
                let request = if submission.post {
                    self.client.post(submission.action).form(&submission.fields)
                } else {
                    let mut action = submission.action;
                    action
                        .query_pairs_mut()
                        .clear()
                        .extend_pairs(submission.fields.iter());
                    self.client.get(action)
                };
                self.load(request, timeout).await
            }
            ClickAction::Inert => Ok(()),
        }
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<()> {
        let key = {
            let document = Html::parse_document(&self.html);
            let field = nth_match(&document, selector, 0)?;
            field
                .value()
                .attr("name")
                .or_else(|| field.value().attr("id"))
                .map(str::to_string)
                .ok_or_else(|| {
                    ScanError::Other(format!("field {} has neither name nor id", selector))
                })?
        };
        self.filled.insert(key, value.to_string());
        Ok(())
    }

    async fn press_key(&mut self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn wait_for_url(&mut self, target: &str, timeout: Duration) -> Result<()> {
        let current = self.current_url();
        let matches = current == target
            || current.contains(target)
            || normalize_absolute(&current).is_some_and(|c| Some(c) == normalize_absolute(target));
        if matches {
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
        let origin = self.origin_key()?;
        let storage = self
            .storage
            .lock()
            .map_err(|_| ScanError::Other("storage lock poisoned".to_string()))?;
        Ok(storage.get(&origin).cloned().unwrap_or_default())
    }

    async fn write_storage(&mut self, entries: &StorageSnapshot) -> Result<()> {
        let origin = self.origin_key()?;
        let mut storage = self
            .storage
            .lock()
            .map_err(|_| ScanError::Other("storage lock poisoned".to_string()))?;
        storage
            .entry(origin)
            .or_default()
            .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn screenshot(&self, _path: &Path) -> Result<()> {
        Err(ScanError::Unsupported(
            "screenshots need a rendering browser".to_string(),
        ))
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScanError::InvalidSelector(format!("{}: {:?}", selector, e)))
}

fn nth_match<'a>(document: &'a Html, selector: &str, index: usize) -> Result<DomElement<'a>> {
    let parsed = parse_selector(selector)?;
    document
        .select(&parsed)
        .nth(index)
        .ok_or_else(|| ScanError::ElementNotFound(format!("{} (#{})", selector, index)))
}

fn is_hidden(element: &DomElement) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    if value.name() == "input"
        && value
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

fn is_submit_control(element: &DomElement) -> bool {
    let value = element.value();
    let kind = value.attr("type").map(str::to_ascii_lowercase);
    match value.name() {
        "button" => kind.as_deref().is_none_or(|t| t == "submit"),
        "input" => matches!(kind.as_deref(), Some("submit") | Some("image")),
        _ => false,
    }
}

fn collect_form_fields(form: &DomElement, filled: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut fields = Vec::new();

    for field in form.select(&FORM_FIELDS) {
        let value = field.value();
        let Some(name) = value.attr("name") else {
            continue;
        };
        let kind = value
            .attr("type")
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "text".to_string());

        if value.name() == "input"
            && matches!(kind.as_str(), "submit" | "button" | "image" | "reset" | "file")
        {
            continue;
        }
        if matches!(kind.as_str(), "checkbox" | "radio") && value.attr("checked").is_none() {
            continue;
        }

        let content = if let Some(typed) = filled.get(name) {
            typed.clone()
        } else {
            match value.name() {
                "textarea" => field.text().collect(),
                "select" => field
                    .select(&OPTIONS)
                    .find(|o| o.value().attr("selected").is_some())
                    .or_else(|| field.select(&OPTIONS).next())
                    .and_then(|o| o.value().attr("value"))
                    .unwrap_or_default()
                    .to_string(),
                _ if matches!(kind.as_str(), "checkbox" | "radio") => {
                    value.attr("value").unwrap_or("on").to_string()
                }
                _ => value.attr("value").unwrap_or_default().to_string(),
            }
        };
        fields.push((name.to_string(), content));
    }

    fields
}
