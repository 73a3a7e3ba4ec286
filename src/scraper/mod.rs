pub mod extract;
pub mod profiles;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use crate::browser::{BrowserDriver, BrowserSession, LaunchOptions, PageElement, SessionGuard};
use crate::error::{MalformedElement, ScrapeError};
use crate::types::{OddsResult, RawQuote};

use self::extract::split_labelled;
use self::profiles::{FieldLocator, SiteProfile};

/// Where a scrape is in its session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStage {
    Uninitialized,
    SessionOpen,
    PageLoaded,
    ContentReady,
    Extracted,
    SessionClosed,
}

impl fmt::Display for ScrapeStage {
    // Phrased as the step pending from this stage, for timeout messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScrapeStage::Uninitialized => "opening browser session",
            ScrapeStage::SessionOpen => "loading page",
            ScrapeStage::PageLoaded => "waiting for market content",
            ScrapeStage::ContentReady => "reading outcomes",
            ScrapeStage::Extracted => "closing browser session",
            ScrapeStage::SessionClosed => "done",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub results: Vec<OddsResult>,
    /// Candidate elements dropped as malformed.
    pub skipped: usize,
}

/// One bookmaker's odds source.
#[async_trait]
pub trait Scraper: Send + Sync {
    fn name(&self) -> &str;

    /// Runs one full session. Returns at least one result or fails.
    async fn scrape(&self) -> Result<Extraction, ScrapeError>;
}

/// Generic page scraper driven entirely by a `SiteProfile`.
pub struct BookmakerScraper {
    profile: SiteProfile,
    driver: Arc<dyn BrowserDriver>,
    launch: LaunchOptions,
}

impl BookmakerScraper {
    pub fn new(profile: SiteProfile, driver: Arc<dyn BrowserDriver>, launch: LaunchOptions) -> Self {
        Self {
            profile,
            driver,
            launch,
        }
    }

    async fn bounded<F: Future>(&self, stage: ScrapeStage, fut: F) -> Result<F::Output, ScrapeError> {
        tokio::time::timeout(self.launch.timeout, fut)
            .await
            .map_err(|_| ScrapeError::NavigationTimeout {
                stage,
                timeout_ms: self.launch.timeout.as_millis() as u64,
            })
    }

    async fn drive(&self, session: &mut dyn BrowserSession) -> Result<Extraction, ScrapeError> {
        tracing::info!(url = %self.profile.url, "navigating");
        self.bounded(ScrapeStage::SessionOpen, session.goto(&self.profile.url))
            .await??;

        tracing::debug!(stage = ?ScrapeStage::PageLoaded, container = %self.profile.container, "waiting for content");
        if let Err(e) = self
            .bounded(ScrapeStage::PageLoaded, session.wait_for(&self.profile.container))
            .await
            .and_then(|r| r)
        {
            tracing::error!(error = %e, "market container never appeared");
            return Err(e);
        }

        let elements = self
            .bounded(ScrapeStage::ContentReady, session.query_all(&self.profile.outcome))
            .await??;
        tracing::info!(count = elements.len(), "found outcome elements");

        let mut results = Vec::with_capacity(elements.len());
        let mut skipped = 0;
        for element in &elements {
            let parsed = self
                .bounded(ScrapeStage::ContentReady, self.read_quote(element.as_ref()))
                .await?
                .and_then(|q| q.to_result().map(|r| (q, r)));
            match parsed {
                Ok((quote, result)) => {
                    tracing::debug!(
                        bookmaker = %quote.bookmaker,
                        label = %quote.outcome_label,
                        outcome = %result.outcome,
                        odds = %result.odds,
                        "parsed"
                    );
                    results.push(result);
                }
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(error = %e, "skipping outcome element");
                }
            }
        }

        if results.is_empty() {
            return Err(ScrapeError::EmptyExtraction {
                candidates: elements.len(),
            });
        }
        tracing::info!(stage = ?ScrapeStage::Extracted, results = results.len(), skipped, "scraped");
        Ok(Extraction { results, skipped })
    }

    async fn read_quote(&self, element: &dyn PageElement) -> Result<RawQuote, MalformedElement> {
        let unreadable = |e: ScrapeError| MalformedElement::Unreadable(e.to_string());
        let (label, price_text) = match &self.profile.fields {
            FieldLocator::Selectors { name, price } => {
                let label = element
                    .child_text(name)
                    .await
                    .map_err(unreadable)?
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(MalformedElement::MissingField("name"))?;
                let price_text = element
                    .child_text(price)
                    .await
                    .map_err(unreadable)?
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(MalformedElement::MissingField("price"))?;
                (label.trim().to_string(), price_text)
            }
            FieldLocator::LabelledAttribute { attribute, separator } => {
                let value = element
                    .attribute(attribute)
                    .await
                    .map_err(unreadable)?
                    .ok_or(MalformedElement::MissingField("label attribute"))?;
                let (label, price) = split_labelled(&value, separator)?;
                (label.to_string(), price.to_string())
            }
        };
        Ok(RawQuote {
            bookmaker: self.profile.name.clone(),
            outcome_label: label,
            price_text,
        })
    }
}

#[async_trait]
impl Scraper for BookmakerScraper {
    fn name(&self) -> &str {
        &self.profile.name
    }

    async fn scrape(&self) -> Result<Extraction, ScrapeError> {
        let span = tracing::info_span!("scrape", bookmaker = %self.profile.name);
        async {
            let mut guard = self
                .bounded(
                    ScrapeStage::Uninitialized,
                    SessionGuard::open(self.driver.as_ref(), &self.launch),
                )
                .await??;

            let outcome = self.drive(guard.session()).await;

            // Released on every path; a hung close is abandoned and the guard aborts it.
            match tokio::time::timeout(self.launch.timeout, guard.release()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "browser did not close cleanly"),
                Err(_) => tracing::warn!("timed out closing browser"),
            }
            tracing::debug!(stage = ?ScrapeStage::SessionClosed, ok = outcome.is_ok(), "session finished");
            outcome
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeDriver, FakeElement, FakePage, Hang};
    use crate::outcome::OutcomeCode;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn launch(timeout_ms: u64) -> LaunchOptions {
        LaunchOptions {
            headless: true,
            user_agent: "test-agent".to_string(),
            viewport: (1920, 1080),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    fn list_profile() -> SiteProfile {
        SiteProfile {
            name: "TestBook".to_string(),
            url: "https://example.test/politics".to_string(),
            container: "ul.market".to_string(),
            outcome: "li.outcome".to_string(),
            fields: FieldLocator::Selectors {
                name: ".name".to_string(),
                price: ".price".to_string(),
            },
        }
    }

    fn row(name: &str, price: &str) -> FakeElement {
        FakeElement::new().text(".name", name).text(".price", price)
    }

    fn scraper(page: FakePage, profile: SiteProfile, timeout_ms: u64) -> (BookmakerScraper, Arc<crate::browser::fake::Counters>) {
        let driver = FakeDriver::new(page);
        let counters = Arc::clone(&driver.counters);
        (BookmakerScraper::new(profile, Arc::new(driver), launch(timeout_ms)), counters)
    }

    #[tokio::test]
    async fn extracts_valid_rows_and_skips_malformed_ones() {
        let page = FakePage::with_elements(vec![
            row("Labor", "$1.85"),
            row("Coalition", "2.10"),
            row("Greens", "51.00"),
            FakeElement::new().text(".name", "One Nation"),
            row("Independent", "SUS"),
            row("Teal", "1.00"),
            FakeElement::new().text(".price", "3.00"),
        ]);
        let (s, counters) = scraper(page, list_profile(), 1_000);

        let out = s.scrape().await.unwrap();
        assert_eq!(
            out.results,
            vec![
                OddsResult { outcome: OutcomeCode::Labor, odds: dec!(1.85) },
                OddsResult { outcome: OutcomeCode::Coalition, odds: dec!(2.10) },
                OddsResult { outcome: OutcomeCode::Other, odds: dec!(51) },
            ]
        );
        assert_eq!(out.skipped, 4);
        assert_eq!(counters.opens(), 1);
        assert_eq!(counters.closes(), 1);
        assert_eq!(counters.aborts(), 0);
    }

    #[tokio::test]
    async fn reads_labelled_attributes() {
        let profile = SiteProfile {
            fields: FieldLocator::LabelledAttribute {
                attribute: "data-value".to_string(),
                separator: " - ".to_string(),
            },
            ..list_profile()
        };
        let page = FakePage::with_elements(vec![
            FakeElement::new().attr("data-value", "Next Federal Government - Labor - 1.3"),
            FakeElement::new().attr("data-value", "Next Federal Government - Coalition - 3.4"),
            FakeElement::new().attr("data-value", "garbage"),
            FakeElement::new(),
        ]);
        let (s, _) = scraper(page, profile, 1_000);

        let out = s.scrape().await.unwrap();
        assert_eq!(out.results.len(), 2);
        assert_eq!(out.results[1].outcome, OutcomeCode::Coalition);
        assert_eq!(out.results[1].odds, dec!(3.4));
        assert_eq!(out.skipped, 2);
    }

    #[tokio::test]
    async fn zero_valid_rows_is_an_empty_extraction() {
        let page = FakePage::with_elements(vec![row("Labor", "N/A"), row("Coalition", "0.5")]);
        let (s, counters) = scraper(page, list_profile(), 1_000);

        assert_eq!(s.scrape().await, Err(ScrapeError::EmptyExtraction { candidates: 2 }));
        assert_eq!(counters.closes(), 1);
    }

    #[tokio::test]
    async fn missing_container_times_out_and_releases_session() {
        let page = FakePage::default();
        let (s, counters) = scraper(page, list_profile(), 50);

        assert_eq!(
            s.scrape().await,
            Err(ScrapeError::NavigationTimeout {
                stage: ScrapeStage::PageLoaded,
                timeout_ms: 50
            })
        );
        assert_eq!(counters.opens(), 1);
        assert_eq!(counters.closes(), 1);
    }

    #[tokio::test]
    async fn hung_navigation_times_out() {
        let page = FakePage {
            hang: Some(Hang::Goto),
            ..FakePage::with_elements(vec![row("Labor", "1.5")])
        };
        let (s, counters) = scraper(page, list_profile(), 50);

        let err = s.scrape().await.unwrap_err();
        assert_eq!(
            err,
            ScrapeError::NavigationTimeout {
                stage: ScrapeStage::SessionOpen,
                timeout_ms: 50
            }
        );
        assert_eq!(err.to_string(), "timed out after 50ms while loading page");
        assert_eq!(counters.closes(), 1);
    }

    #[tokio::test]
    async fn hung_launch_never_opens_a_session() {
        let page = FakePage {
            hang: Some(Hang::Open),
            ..FakePage::default()
        };
        let (s, counters) = scraper(page, list_profile(), 50);

        assert!(matches!(
            s.scrape().await,
            Err(ScrapeError::NavigationTimeout { stage: ScrapeStage::Uninitialized, .. })
        ));
        assert_eq!(counters.opens(), 0);
        assert_eq!(counters.closes(), 0);
    }

    #[tokio::test]
    async fn failure_mid_extraction_still_closes_once() {
        let page = FakePage {
            fail_query: true,
            ..FakePage::with_elements(vec![row("Labor", "1.5")])
        };
        let (s, counters) = scraper(page, list_profile(), 1_000);

        assert!(matches!(s.scrape().await, Err(ScrapeError::Browser(_))));
        assert_eq!(counters.opens(), 1);
        assert_eq!(counters.closes(), 1);
        assert_eq!(counters.aborts(), 0);
    }

    #[tokio::test]
    async fn cancelled_scrape_aborts_its_session() {
        let page = FakePage {
            hang: Some(Hang::Query),
            ..FakePage::with_elements(vec![row("Labor", "1.5")])
        };
        let (s, counters) = scraper(page, list_profile(), 10_000);

        let res = tokio::time::timeout(Duration::from_millis(50), s.scrape()).await;
        assert!(res.is_err());
        assert_eq!(counters.opens(), 1);
        assert_eq!(counters.closes(), 1);
        assert_eq!(counters.aborts(), 1);
    }
}
