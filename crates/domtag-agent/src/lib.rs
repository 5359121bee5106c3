//! Browser automation primitives for LLM web agents, built around the
//! `mmid` tagging protocol.
//!
//! A [`Session`] owns one browser and one page. Each call to
//! [`Session::snapshot`] reduces the live DOM to a compact tree, stamping
//! actionable elements with an `mmid` attribute, and actions address
//! elements by those identifiers. Identifiers are only valid against the
//! snapshot that produced them; after any page mutation the planner takes
//! a fresh snapshot. A per-session counter seeds every tagging pass, so
//! identifiers from different passes never collide numerically.
//!
//! ```no_run
//! use domtag_agent::{Session, StaticCredentials};
//!
//! # async fn run() -> domtag_agent::Result<()> {
//! let mut session = Session::new(Box::new(StaticCredentials::new("user", "pass")));
//! session.start(true).await?;
//! session.navigate("https://example.com", 5_000).await?;
//! let snapshot = session.snapshot().await?;
//! println!("{} actionable elements", snapshot.root.tagged_count());
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::{debug, info, warn};

pub mod actions;
pub mod allocator;
pub mod credentials;
pub mod dom;
pub mod envelope;
pub mod error;
pub mod mcp;

pub use allocator::MmidCounter;
pub use credentials::{
    CredentialSource, EnvCredentials, StaticCredentials, PASSWORD_PLACEHOLDER,
    USERNAME_PLACEHOLDER,
};
pub use dom::{DomNode, NodeAttrs};
pub use envelope::{ActionEnvelope, NavigateEnvelope, SnapshotEnvelope, UrlEnvelope};
pub use error::{Error, Result};

// Engine types callers need for configuration.
pub use eoka::{Browser, Page, StealthConfig};

/// Default navigation timeout when the caller does not pass one.
pub const DEFAULT_NAVIGATE_TIMEOUT_MS: u64 = 5_000;

/// How long a snapshot waits for the page URL to hold steady before
/// reducing, guarding against tagging a document mid-navigation.
const SNAPSHOT_SETTLE_TIMEOUT_MS: u64 = 3_000;

/// One reduced view of the page, plus the counter value after tagging.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub root: DomNode,
    pub url: String,
    pub mmid_counter: u64,
}

/// A browser session: at most one engine and one page, used sequentially.
///
/// All state lives here. Dropping the session without calling
/// [`Session::shutdown`] leaves teardown to the engine's own drop handling.
pub struct Session {
    browser: Option<Browser>,
    page: Option<Page>,
    counter: MmidCounter,
    credentials: Box<dyn CredentialSource>,
}

impl Session {
    pub fn new(credentials: Box<dyn CredentialSource>) -> Self {
        Self {
            browser: None,
            page: None,
            counter: MmidCounter::new(),
            credentials,
        }
    }

    /// A session that reads credentials from `DOMTAG_USERNAME` and
    /// `DOMTAG_PASSWORD`.
    pub fn from_env() -> Self {
        Self::new(Box::new(EnvCredentials))
    }

    pub fn is_started(&self) -> bool {
        self.browser.is_some()
    }

    /// The live page handle, for embedders that need direct engine access.
    pub fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or(Error::NotStarted)
    }

    /// Launch the browser and open a blank page. Starting an already
    /// started session is an error; close it first.
    pub async fn start(&mut self, headless: bool) -> Result<()> {
        if self.browser.is_some() {
            return Err(Error::AlreadyStarted);
        }
        debug!("launching browser (headless: {})", headless);
        let config = StealthConfig {
            headless,
            ..Default::default()
        };
        let browser = Browser::launch_with_config(config).await?;
        let page = browser.new_blank_page().await?;
        self.browser = Some(browser);
        self.page = Some(page);
        self.counter = MmidCounter::new();
        info!("browser session started");
        Ok(())
    }

    /// Navigate and wait for the page to settle. Returns the URL the
    /// browser landed on. On timeout the load keeps going in the
    /// background; the session stays usable.
    pub async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<String> {
        let page = self.page()?;
        debug!("navigating to {} (timeout {}ms)", url, timeout_ms);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), page.goto(url)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                warn!("navigation to {} exceeded {}ms", url, timeout_ms);
                return Err(Error::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms,
                });
            }
        }
        self.wait_for_stable().await;
        Ok(self.page()?.url().await?)
    }

    pub async fn current_url(&self) -> Result<String> {
        Ok(self.page()?.url().await?)
    }

    /// Reduce the current page to a tagged tree. The counter only advances
    /// when the whole pass succeeds, so a failed snapshot leaves the
    /// session exactly where it was.
    pub async fn snapshot(&mut self) -> Result<Snapshot> {
        let (url, root, next) = {
            let page = self.page()?;
            let url = page.url().await?;
            // re-check the URL after a settle window: a page that is still
            // redirecting would get tagged and immediately invalidated
            page.wait_for_url_contains(&url, SNAPSHOT_SETTLE_TIMEOUT_MS)
                .await?;
            let (root, next) = dom::reduce(page, self.counter.seed()).await?;
            (url, root, next)
        };
        self.counter.advance_to(next)?;
        debug!(
            "snapshot of {}: {} tagged elements, counter now {}",
            url,
            root.tagged_count(),
            next
        );
        Ok(Snapshot {
            root,
            url,
            mmid_counter: next,
        })
    }

    /// Click the element tagged `mmid`, optionally pausing first.
    pub async fn click(&mut self, mmid: &str, wait_before_ms: u64) -> Result<()> {
        actions::click(self.page()?, mmid, wait_before_ms).await
    }

    /// Type into the element tagged `mmid`. Exact credential placeholders
    /// (`!USERNAME!`, `!PASSWORD!`) resolve to configured values.
    pub async fn type_text(&mut self, mmid: &str, content: &str) -> Result<()> {
        actions::fill(self.page()?, mmid, content, self.credentials.as_ref()).await
    }

    /// Fill one element and click another as a single compound step. The
    /// text is taken literally, with no placeholder substitution.
    pub async fn enter_text_and_click(
        &mut self,
        text_mmid: &str,
        text: &str,
        click_mmid: &str,
        wait_before_click_ms: u64,
    ) -> Result<()> {
        actions::fill_then_click(self.page()?, text_mmid, text, click_mmid, wait_before_click_ms)
            .await
    }

    /// Press Enter in the currently focused element.
    pub async fn press_enter(&mut self) -> Result<()> {
        actions::press_enter(self.page()?).await
    }

    /// Close the browser. Safe to call when never started or already
    /// closed; the page handle is released even if engine close fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.page.take();
        if let Some(browser) = self.browser.take() {
            info!("closing browser");
            browser.close().await?;
        }
        Ok(())
    }

    /// Best effort settle: bounded network-idle wait plus a short pause for
    /// render. Never fails; busy pages simply proceed after the bound.
    async fn wait_for_stable(&self) {
        if let Ok(page) = self.page() {
            let _ = page.wait_for_network_idle(200, 2_000).await;
            page.wait(50).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unstarted() -> Session {
        Session::new(Box::new(StaticCredentials::empty()))
    }

    #[test]
    fn new_session_is_not_started() {
        let session = unstarted();
        assert!(!session.is_started());
    }

    #[tokio::test]
    async fn actions_before_start_report_not_started() {
        let mut session = unstarted();
        assert!(matches!(session.current_url().await, Err(Error::NotStarted)));
        assert!(matches!(session.snapshot().await, Err(Error::NotStarted)));
        assert!(matches!(session.click("1", 0).await, Err(Error::NotStarted)));
        assert!(matches!(
            session.type_text("1", "hi").await,
            Err(Error::NotStarted)
        ));
        assert!(matches!(session.press_enter().await, Err(Error::NotStarted)));
    }

    #[tokio::test]
    async fn navigate_before_start_reports_not_started() {
        let mut session = unstarted();
        let err = session.navigate("https://example.com", 1_000).await;
        assert!(matches!(err, Err(Error::NotStarted)));
    }

    #[tokio::test]
    async fn shutdown_without_start_is_ok() {
        let mut session = unstarted();
        session.shutdown().await.unwrap();
        session.shutdown().await.unwrap();
        assert!(!session.is_started());
    }
}
