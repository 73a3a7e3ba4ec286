use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use super::{BrowserDriver, BrowserSession, LaunchOptions, PageElement};
use crate::error::ScrapeError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn cdp(e: CdpError) -> ScrapeError {
    ScrapeError::Browser(e.to_string())
}

fn closed() -> ScrapeError {
    ScrapeError::Browser("session already closed".to_string())
}

/// Fresh user-data directory, so concurrent Chromium processes never share a profile lock.
fn profile_dir() -> Result<TempDir, ScrapeError> {
    tempfile::Builder::new()
        .prefix("betpoll-chromium-")
        .tempdir()
        .map_err(|e| ScrapeError::Browser(format!("cannot create profile directory: {e}")))
}

/// Launches a dedicated Chromium process per session over the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct ChromiumDriver;

impl ChromiumDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn open(&self, opts: &LaunchOptions) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        let (width, height) = opts.viewport;
        let profile = profile_dir()?;
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .window_size(width, height)
            .request_timeout(opts.timeout)
            .arg(format!("--user-agent={}", opts.user_agent));
        if !opts.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ScrapeError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp)?;

        // The CDP connection only makes progress while the handler is polled.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::debug!(profile = %profile.path().display(), "chromium profile");
        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            events,
            page: None,
            profile: Some(profile),
        }))
    }
}

struct ChromiumSession {
    browser: Option<Browser>,
    events: JoinHandle<()>,
    page: Option<Page>,
    // Removed once the browser is gone.
    profile: Option<TempDir>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, ScrapeError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("no page loaded".to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> Result<(), ScrapeError> {
        let browser = self.browser.as_ref().ok_or_else(closed)?;
        let page = browser.new_page(url).await.map_err(cdp)?;
        page.wait_for_navigation().await.map_err(cdp)?;
        self.page = Some(page);
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str) -> Result<(), ScrapeError> {
        let page = self.page()?;
        loop {
            match page.find_elements(selector).await {
                Ok(found) if !found.is_empty() => return Ok(()),
                Ok(_) => {}
                // The DOM is still being rebuilt by the SPA; keep polling.
                Err(e) => tracing::debug!(selector, error = %e, "selector probe failed"),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn query_all(&mut self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, ScrapeError> {
        let elements = self.page()?.find_elements(selector).await.map_err(cdp)?;
        Ok(elements
            .into_iter()
            .map(|e| Box::new(ChromiumElement(e)) as Box<dyn PageElement>)
            .collect())
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        self.page = None;
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        let res = browser.close().await.map(|_| ()).map_err(cdp);
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "waiting for browser process failed");
        }
        self.events.abort();
        self.profile = None;
        res
    }

    fn abort(&mut self) {
        self.page = None;
        // Dropping the browser kills its child process.
        self.browser = None;
        self.events.abort();
        self.profile = None;
    }
}

struct ChromiumElement(Element);

#[async_trait]
impl PageElement for ChromiumElement {
    async fn child_text(&self, selector: &str) -> Result<Option<String>, ScrapeError> {
        let children = self.0.find_elements(selector).await.map_err(cdp)?;
        match children.first() {
            Some(child) => child.inner_text().await.map_err(cdp),
            None => Ok(None),
        }
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScrapeError> {
        self.0.attribute(name).await.map_err(cdp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_session_gets_its_own_profile() {
        let a = profile_dir().unwrap();
        let b = profile_dir().unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        assert!(b.path().is_dir());

        let path = a.path().to_path_buf();
        drop(a);
        assert!(!path.exists());
    }
}
