//! Scripted in-memory browser for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::{BrowserDriver, BrowserSession, LaunchOptions, PageElement};
use crate::error::ScrapeError;

#[derive(Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub aborts: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Graceful closes plus aborts.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

/// Suspension point at which the fake never resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hang {
    Open,
    Goto,
    Query,
}

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    texts: HashMap<String, String>,
    attrs: HashMap<String, String>,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, selector: &str, value: &str) -> Self {
        self.texts.insert(selector.to_string(), value.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl PageElement for FakeElement {
    async fn child_text(&self, selector: &str) -> Result<Option<String>, ScrapeError> {
        Ok(self.texts.get(selector).cloned())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScrapeError> {
        Ok(self.attrs.get(name).cloned())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub container_present: bool,
    pub elements: Vec<FakeElement>,
    pub hang: Option<Hang>,
    pub fail_query: bool,
    pub panic_on_query: bool,
}

impl FakePage {
    pub fn with_elements(elements: Vec<FakeElement>) -> Self {
        Self {
            container_present: true,
            elements,
            ..Self::default()
        }
    }
}

pub struct FakeDriver {
    page: FakePage,
    pub counters: Arc<Counters>,
}

impl FakeDriver {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            counters: Arc::new(Counters::default()),
        }
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn open(&self, _opts: &LaunchOptions) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        if self.page.hang == Some(Hang::Open) {
            futures::future::pending::<()>().await;
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            page: self.page.clone(),
            counters: Arc::clone(&self.counters),
            closed: false,
        }))
    }
}

struct FakeSession {
    page: FakePage,
    counters: Arc<Counters>,
    closed: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&mut self, _url: &str) -> Result<(), ScrapeError> {
        if self.page.hang == Some(Hang::Goto) {
            futures::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn wait_for(&mut self, _selector: &str) -> Result<(), ScrapeError> {
        if !self.page.container_present {
            futures::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn query_all(&mut self, _selector: &str) -> Result<Vec<Box<dyn PageElement>>, ScrapeError> {
        if self.page.hang == Some(Hang::Query) {
            futures::future::pending::<()>().await;
        }
        if self.page.panic_on_query {
            panic!("renderer crashed");
        }
        if self.page.fail_query {
            return Err(ScrapeError::Browser("target closed".to_string()));
        }
        Ok(self
            .page
            .elements
            .iter()
            .cloned()
            .map(|e| Box::new(e) as Box<dyn PageElement>)
            .collect())
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        if !self.closed {
            self.closed = true;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn abort(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            self.counters.aborts.fetch_add(1, Ordering::SeqCst);
        }
    }
}
