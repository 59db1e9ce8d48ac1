//! CheckMyBus coach comparison (checkmybus.de).

use crate::browser::{BrowserPage, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::zip_columns;
use crate::pipeline::{steps, PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;
use tracing::warn;

const CONSENT: &str = "#gdpr-c-acpt";
const FROM: &str = "[id=origincityname]";
const FROM_HINT: &str = r#"//*[@id="searchform"]/fieldset/div/div/div"#;
const TO: &str = "[id=destinationcityname]";
const TO_HINT: &str = r#"//*[@id="searchform"]/fieldset/div[2]/div/div"#;
const DATE: &str = "#Date";
const RESULTS: &str = r#"//*[@id="searchResults"]"#;
// Prices stream in after the result list itself.
const PRICES_LOADED: &str = r#"//div/div/span[contains(@class,"pricePrefix")]"#;
const DEPARTURES: &str = r#"//div[contains(@class,"time departure")]"#;
const ARRIVALS: &str = r#"//div[contains(@class,"time arrival")]"#;
const PRICES: &str = r#"//div/span[contains(text(),"€")]"#;

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "checkmybus",
        name: "CheckMyBus",
        country: "INT",
        mode: TransportMode::Bus,
        url: "https://www.checkmybus.de/",
        locale: None,
        date_format: Some("%d.%m.%Y"),
        currency: "EUR",
        convert_to: None,
        timeouts: Timeouts::from_millis(90_000, 10_000, 10_000, 50_000),
        calendar_max_pages: 0,
    }
}

pub struct CheckMyBus {
    profile: SiteProfile,
}

impl CheckMyBus {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl SitePipeline for CheckMyBus {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn dismiss_consent(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::require(page, &Locator::css(CONSENT), &self.profile.timeouts).await?;
        Ok(page.js_click(CONSENT).await?)
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::type_and_pick(
            page,
            &Locator::css(FROM),
            &q.origin,
            &Locator::xpath(FROM_HINT),
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
            &Locator::xpath(TO_HINT),
            &self.profile.timeouts,
            "destination",
        )
        .await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::clear_and_type(page, DATE, &q.date, false, &self.profile.timeouts).await
    }

    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(page.js_click("#execSearch").await?)
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        let t = &self.profile.timeouts;
        steps::wait_results(page, &Locator::xpath(RESULTS), t).await?;
        if page.wait_for(&Locator::xpath(PRICES_LOADED), t.results).await.is_err() {
            warn!("prices did not finish loading");
        }
        Ok(())
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let departures = page.texts(&Locator::xpath(DEPARTURES)).await?;
        let arrivals = page.texts(&Locator::xpath(ARRIVALS)).await?;
        let prices = page.texts(&Locator::xpath(PRICES)).await?;
        zip_columns(departures, arrivals, prices)
    }
}
