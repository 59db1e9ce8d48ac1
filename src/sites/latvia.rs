//! Pasažieru vilciens (pv.lv).

use crate::browser::{BrowserPage, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::zip_columns;
use crate::pipeline::steps::{self, xpath_literal};
use crate::pipeline::{PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use crate::scraper::cleaner::clean_text;
use async_trait::async_trait;

const RESULTS: &str = r#"//div[contains(@class,"row")]"#;
const DEPARTURES: &str = r#"//div/div[contains(@class,"col-3 col-time")]"#;
const ARRIVALS: &str = r#"//div/div[contains(@class,"col-4 col-time")]"#;
const PRICES: &str = r#"//div/div[contains(@class,"col-6 col-ticket-price")]"#;

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "latvia",
        name: "Pasažieru vilciens",
        country: "LV",
        mode: TransportMode::Rail,
        url: "https://www.pv.lv/en/",
        locale: Some("lv"),
        date_format: Some("%d.%m.%Y"),
        currency: "EUR",
        convert_to: None,
        timeouts: Timeouts::from_millis(90_000, 50_000, 10_000, 50_000),
        calendar_max_pages: 0,
    }
}

pub struct Latvia {
    profile: SiteProfile,
}

impl Latvia {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    fn station(input: &str, name: &str) -> (Locator, Locator) {
        (
            Locator::css(input),
            Locator::xpath(format!("//ul/li[contains(text(),{})]", xpath_literal(name))),
        )
    }
}

/// Column texts minus the header cell every column starts with.
async fn column(page: &dyn BrowserPage, xpath: &str) -> PhaseResult<Vec<String>> {
    Ok(page
        .texts(&Locator::xpath(xpath))
        .await?
        .into_iter()
        .skip(1)
        .collect())
}

/// The fare cell lists every ticket class; the full fare is the last amount.
fn trailing_fare(cell: &str) -> String {
    let cell = clean_text(cell);
    cell.split_whitespace()
        .rev()
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_digit()))
        .find(|amount| !amount.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl SitePipeline for Latvia {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        let (input, pick) = Self::station("#from-station", &q.origin);
        steps::type_and_pick(page, &input, &q.origin, &pick, &self.profile.timeouts, "origin").await
    }

    async fn fill_destination(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        let (input, pick) = Self::station("#to-station", &q.destination);
        steps::type_and_pick(page, &input, &q.destination, &pick, &self.profile.timeouts, "destination")
            .await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::clear_and_type(page, "#switch-date-f", &q.date, true, &self.profile.timeouts).await
    }

    /// Enter in the date field runs the search.
    async fn submit(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let departures = column(page, DEPARTURES).await?;
        let arrivals = column(page, ARRIVALS).await?;
        let prices = column(page, PRICES)
            .await?
            .iter()
            .map(|p| trailing_fare(p))
            .collect();
        zip_columns(departures, arrivals, prices)
    }
}
