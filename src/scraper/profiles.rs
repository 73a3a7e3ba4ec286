//! Per-bookmaker page locations and element locators.

use std::sync::Arc;

use super::{BookmakerScraper, Scraper};
use crate::browser::{BrowserDriver, LaunchOptions};

/// How name and price are read from one outcome element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLocator {
    /// Separate descendant elements for the label and the price.
    Selectors { name: String, price: String },
    /// One attribute holding `"<market><sep><name><sep><price>"`.
    LabelledAttribute { attribute: String, separator: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub name: String,
    pub url: String,
    /// Waited on before extraction starts.
    pub container: String,
    pub outcome: String,
    pub fields: FieldLocator,
}

impl SiteProfile {
    fn with_selectors(name: &str, url: &str, container: &str, outcome: &str, name_sel: &str, price_sel: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            container: container.to_string(),
            outcome: outcome.to_string(),
            fields: FieldLocator::Selectors {
                name: name_sel.to_string(),
                price: price_sel.to_string(),
            },
        }
    }
}

pub fn betr() -> SiteProfile {
    // Material-UI list
    SiteProfile::with_selectors(
        "Betr",
        "https://www.betr.com.au/sports/Politics/142/Australian-Elections/Next-Federal-Election-49th-Parliament/Next-Sworn-In-Federal-Government/1713975/All-Markets",
        "ul.MuiList-root.MuiList-dense",
        "li.MuiListItem-root.MuiListItem-dense",
        ".MuiListItemText-primary p",
        "button.MuiButton-root .MuiButton-label > div > div",
    )
}

pub fn pointsbet() -> SiteProfile {
    let buttons = r#"button[data-label^="oddsButton"]"#;
    SiteProfile {
        name: "PointsBet".to_string(),
        url: "https://pointsbet.com.au/sports/politics/Australian-Federal-Politics/2306240".to_string(),
        container: buttons.to_string(),
        outcome: buttons.to_string(),
        fields: FieldLocator::LabelledAttribute {
            attribute: "data-value".to_string(),
            separator: " - ".to_string(),
        },
    }
}

pub fn ladbrokes() -> SiteProfile {
    SiteProfile::with_selectors(
        "Ladbrokes",
        "https://www.ladbrokes.com.au/sports/politics/australia/australian-federal-politics",
        ".event-card",
        ".selection-button",
        ".selection-name",
        ".odds-value",
    )
}

pub fn all_profiles() -> Vec<SiteProfile> {
    vec![betr(), pointsbet(), ladbrokes()]
}

/// Every registered bookmaker, each with its own session per run.
pub fn registry(driver: Arc<dyn BrowserDriver>, launch: &LaunchOptions) -> Vec<Arc<dyn Scraper>> {
    all_profiles()
        .into_iter()
        .map(|p| Arc::new(BookmakerScraper::new(p, Arc::clone(&driver), launch.clone())) as Arc<dyn Scraper>)
        .collect()
}
