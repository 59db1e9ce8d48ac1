//! Busbud international coach search (busbud.com).
//!
//! Busbud A/B-tests two result layouts: a card list with per-card times, and
//! a flat page where times and prices are separate lists.

use crate::browser::{BrowserPage, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::{interleaved_with_prices, times_with_fares};
use crate::pipeline::steps::{self, xpath_literal};
use crate::pipeline::{PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;
use tracing::debug;

const CONSENT: &str = "#booking_com_checkbox";
const FROM: &str = "#origin-c1ty-input";
const TO: &str = "#destination-c1ty-input";
const DATE: &str = "#outbound-date-input";

const LIST: &str = ".departure-list";
const LIST_READY: &str = r#"//*[@class="departure-list--flipper"]"#;
const LIST_ROW: &str = r#"//div[@data-portal-key="portal"]"#;

const CARD: &str = r#"//*[@data-cy="departure-card"]"#;
const CARD_PRICES: &str = r#"//*[@data-cy="displayed-price"]"#;
const CARD_TIMES: &str = r#"//span[contains(text(),":")]"#;

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "busbud",
        name: "Busbud",
        country: "INT",
        mode: TransportMode::Bus,
        url: "https://www.busbud.com/en-gb",
        locale: None,
        date_format: Some("%Y-%m-%d"),
        currency: "EUR",
        convert_to: None,
        timeouts: Timeouts::from_millis(20_000, 10_000, 10_000, 15_000),
        calendar_max_pages: 0,
    }
}

pub struct Busbud {
    profile: SiteProfile,
}

impl Busbud {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    fn city(name: &str) -> Locator {
        Locator::xpath(format!("//span[contains(text(), {})]", xpath_literal(name)))
    }
}

#[async_trait]
impl SitePipeline for Busbud {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn dismiss_consent(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        let checkbox = Locator::css(CONSENT);
        steps::require(page, &checkbox, &self.profile.timeouts).await?;
        Ok(page.click(&checkbox).await?)
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::type_and_pick(
            page,
            &Locator::css(FROM),
            &q.origin,
            &Self::city(&q.origin),
            &self.profile.timeouts,
            "origin",
        )
        .await
    }

    async fn fill_destination(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::type_and_pick(
            page,
            &Locator::css(TO),
            &q.destination,
            &Self::city(&q.destination),
            &self.profile.timeouts,
            "destination",
        )
        .await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::clear_and_type(page, DATE, &q.date, true, &self.profile.timeouts).await
    }

    /// Enter in the date field starts the search.
    async fn submit(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        let t = &self.profile.timeouts;
        if page.wait_for(&Locator::css(LIST), t.results).await.is_ok() {
            debug!("card-list layout");
            return steps::wait_results(page, &Locator::xpath(LIST_READY), t).await;
        }
        debug!("flat layout");
        steps::wait_results(page, &Locator::xpath(CARD), t).await
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        if page.exists(&Locator::css(LIST)).await? {
            let row = Locator::xpath(LIST_ROW);
            let times = page.rows(&row, &Locator::css(".text-std.text-right")).await?;
            let fares = page
                .row_fields(&row, &[Locator::css("div.departure-card--price")])
                .await?;
            return times_with_fares(times, fares);
        }
        let times = page.texts(&Locator::xpath(CARD_TIMES)).await?;
        let prices = page.texts(&Locator::xpath(CARD_PRICES)).await?;
        interleaved_with_prices(times, prices)
    }
}
