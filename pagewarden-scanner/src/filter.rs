use crate::config::CrawlConfig;
use crate::error::{Result, ScanError};
use regex::Regex;
use url::Url;

/// Resolve `href` against `base` and reduce it to `scheme://host[:port]/path`
/// with no trailing slash. Returns `None` for hrefs that can never be pages.
pub fn normalize(href: &str, base: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
    {
        return None;
    }

    let resolved = match Url::parse(base) {
        Ok(base_url) => base_url.join(href).ok()?,
        Err(_) => Url::parse(href).ok()?,
    };

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.host_str()?;

    let origin = resolved.origin().ascii_serialization();
    let path = resolved.path().trim_end_matches('/');

    Some(format!("{}{}", origin, path))
}

/// Normalize an already absolute URL.
pub fn normalize_absolute(url: &str) -> Option<String> {
    normalize(url, url)
}

/// Shells such as Git Bash rewrite `/notes` into `C:/Program Files/Git/notes`
/// before the program sees it. Recover the last path segment in that case.
/// Only meant for routes typed on a command line: a real route containing
/// both `:` and `/` gets truncated too.
pub fn sanitize_cli_route(route: &str) -> String {
    let route = route.trim();
    let route = if route.contains(':') && route.contains('/') {
        route.rsplit('/').next().unwrap_or(route)
    } else {
        route
    };

    if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{}", route)
    }
}

/// Join an extra route onto the start URL.
pub fn route_url(start_url: &str, route: &str) -> Option<String> {
    let route = route.trim();
    let route = if route.starts_with('/') {
        route.to_string()
    } else {
        format!("/{}", route)
    };
    normalize_absolute(&format!("{}{}", start_url.trim_end_matches('/'), route))
}

/// Host and port key used for the same-domain check.
fn site_key(url: &Url) -> Option<(String, Option<u16>)> {
    Some((url.host_str()?.to_string(), url.port_or_known_default()))
}

/// Decides whether a normalized URL is eligible for crawling.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    site: Option<(String, Option<u16>)>,
    same_domain_only: bool,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl UrlFilter {
    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        let start = Url::parse(&config.start_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", config.start_url, e)))?;

        Ok(Self {
            site: site_key(&start),
            same_domain_only: config.same_domain_only,
            include: compile_patterns(&config.include_patterns)?,
            exclude: compile_patterns(&config.exclude_patterns)?,
        })
    }

    pub fn should_crawl(&self, url: &str) -> bool {
        if self.same_domain_only {
            let same_site = Url::parse(url)
                .ok()
                .and_then(|parsed| site_key(&parsed))
                .is_some_and(|key| Some(key) == self.site);
            if !same_site {
                return false;
            }
        }

        if self.exclude.iter().any(|pattern| pattern.is_match(url)) {
            return false;
        }

        if !self.include.is_empty() {
            return self.include.iter().any(|pattern| pattern.is_match(url));
        }

        true
    }
}

/// Patterns match from the start of the URL, so each one is anchored.
fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!("^(?:{})", pattern)).map_err(|source| ScanError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}
