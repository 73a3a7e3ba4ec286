//! Headless browser seam. Scrapers only talk to these traits; `chromium` is the
//! production implementation.

pub mod chromium;
#[cfg(test)]
pub mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScrapeError;

pub use chromium::ChromiumDriver;

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub timeout: Duration,
}

/// Launches one isolated browser session per call.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open(&self, opts: &LaunchOptions) -> Result<Box<dyn BrowserSession>, ScrapeError>;
}

#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and wait for the load to settle.
    async fn goto(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Resolves once `selector` matches at least one element. Never gives up on
    /// its own; callers bound it with a timeout.
    async fn wait_for(&mut self, selector: &str) -> Result<(), ScrapeError>;

    async fn query_all(&mut self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, ScrapeError>;

    async fn close(&mut self) -> Result<(), ScrapeError>;

    /// Synchronous teardown for paths that cannot await. Must be idempotent.
    fn abort(&mut self);
}

#[async_trait]
pub trait PageElement: Send + Sync {
    /// Inner text of the first descendant matching `selector`, if any.
    async fn child_text(&self, selector: &str) -> Result<Option<String>, ScrapeError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScrapeError>;
}

/// Owns an open session until `release`. Dropping an unreleased guard (panic,
/// cancellation, close timeout) aborts the session instead.
pub struct SessionGuard {
    session: Box<dyn BrowserSession>,
    released: bool,
}

impl SessionGuard {
    pub async fn open(driver: &dyn BrowserDriver, opts: &LaunchOptions) -> Result<Self, ScrapeError> {
        let session = driver.open(opts).await?;
        tracing::info!(headless = opts.headless, "browser launched");
        Ok(Self {
            session,
            released: false,
        })
    }

    pub fn session(&mut self) -> &mut dyn BrowserSession {
        self.session.as_mut()
    }

    pub async fn release(mut self) -> Result<(), ScrapeError> {
        let res = self.session.close().await;
        self.released = true;
        tracing::info!("browser closed");
        res
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("browser session dropped without close; aborting");
            self.session.abort();
        }
    }
}
