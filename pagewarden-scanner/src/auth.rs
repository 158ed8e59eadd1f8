//! Form login performed once per run.
//!
//! Cookies set during login live in the browser context and reach every page
//! on their own. Token-based SPAs keep their session in client storage
//! instead, which is per page, so the storage is captured here and replayed
//! with [`AuthSession::apply`] where a page needs it.

use crate::browser::{BrowserContext, PageDriver, StorageSnapshot, WaitPolicy, bounded};
use crate::config::{AuthConfig, Timeouts};
use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use url::Url;

/// Client storage captured right after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub storage: StorageSnapshot,
    pub captured_at: DateTime<Utc>,
}

impl AuthSession {
    /// Open `target` on `page` with the captured storage in place.
    pub async fn apply<P: PageDriver>(
        &self,
        page: &mut P,
        target: &str,
        timeouts: &Timeouts,
    ) -> Result<()> {
        let origin = Url::parse(target)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", target, e)))?
            .origin()
            .ascii_serialization();

        page.goto(&origin, WaitPolicy::DomContentLoaded, timeouts.navigation())
            .await?;
        page.write_storage(&self.storage).await?;
        page.goto(target, WaitPolicy::NetworkIdle, timeouts.navigation())
            .await
    }
}

/// Log in through the configured form. Never fails the run: any problem is
/// logged and the crawl continues unauthenticated.
pub async fn authenticate<C: BrowserContext>(
    context: &C,
    auth: &AuthConfig,
    start_url: &str,
    timeouts: &Timeouts,
) -> Option<AuthSession> {
    if !auth.has_credentials() {
        info!("No credentials configured, crawling unauthenticated");
        return None;
    }

    let mut page = match context.new_page().await {
        Ok(page) => page,
        Err(e) => {
            warn!("Authentication failed: could not open a page: {}", e);
            return None;
        }
    };

    let outcome = log_in(&mut page, auth, start_url, timeouts).await;

    if let Err(e) = page.close().await {
        debug!("Closing login page failed: {}", e);
    }

    match outcome {
        Ok(session) => {
            info!(
                "Authentication successful ({} storage entries captured)",
                session.storage.len()
            );
            Some(session)
        }
        Err(e) => {
            warn!("Authentication failed: {}", e);
            None
        }
    }
}

async fn log_in<P: PageDriver>(
    page: &mut P,
    auth: &AuthConfig,
    start_url: &str,
    timeouts: &Timeouts,
) -> Result<AuthSession> {
    let login_url = auth.login_url.as_deref().unwrap_or(start_url);
    debug!("Logging in at {}", login_url);

    bounded(
        "login page",
        timeouts.navigation(),
        page.goto(login_url, WaitPolicy::NetworkIdle, timeouts.navigation()),
    )
    .await?;

    page.fill(&auth.username_selector, &auth.username).await?;
    page.fill(&auth.password_selector, &auth.password).await?;

    let submit = page
        .query_all(&auth.submit_selector)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ScanError::ElementNotFound(auth.submit_selector.clone()))?;
    bounded(
        "login submit",
        timeouts.navigation(),
        page.click(&submit, timeouts.navigation()),
    )
    .await?;

    let wait = timeouts.interaction() * 2;
    if let Some(target) = &auth.wait_for_url {
        page.wait_for_url(target, wait).await?;
    } else if let Some(selector) = &auth.wait_for_selector {
        page.wait_for_selector(selector, wait).await?;
    } else {
        tokio::time::sleep(timeouts.settle()).await;
    }

    Ok(AuthSession {
        storage: page.read_storage().await?,
        captured_at: Utc::now(),
    })
}
