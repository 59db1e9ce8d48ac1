//! Iarnród Éireann journey planner (irishrail.ie).

use crate::browser::{BrowserPage, Key, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::interleaved_with_prices;
use crate::pipeline::{steps, PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;
use tracing::warn;

const COOKIE_DIALOG: &str = r#"//*[@id="CybotCookiebotDialogBody"]"#;
const COOKIE_ACCEPT: &str = "#CybotCookiebotDialogBodyButtonAccept";
const SUGGESTION: &str = "//*[@id='suggestion']";
const DATE: &str = "#HFS_date_REQ0";
const SUBMIT: &str = "#HafasQueryForm > div.f02__cta > button";
const RESULTS: &str = r#"//div[contains(@class,"lyr_itemResults")]"#;
const PLAN_TIMES: &str = r#"//div/div[contains(@class,"lyr_timeRow lyr_plantime")]"#;
const FARES: &str = r#"//div/div/span[contains(@class,"lyr_bigValue")]"#;

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "ireland",
        name: "Irish Rail",
        country: "IE",
        mode: TransportMode::Rail,
        url: "https://www.irishrail.ie/",
        locale: None,
        date_format: Some("%d/%m/%Y"),
        currency: "EUR",
        convert_to: None,
        timeouts: Timeouts::from_millis(90_000, 50_000, 7_000, 50_000),
        calendar_max_pages: 0,
    }
}

pub struct Ireland {
    profile: SiteProfile,
}

impl Ireland {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    /// HAFAS station box: Enter takes the best match, so the suggestion
    /// list is only waited on to give it time to load.
    async fn station(&self, page: &dyn BrowserPage, css: &str, name: &str) -> PhaseResult<()> {
        let input = Locator::css(css);
        steps::require(page, &input, &self.profile.timeouts).await?;
        page.js_click(css).await?;
        page.type_text(&input, name).await?;
        if page
            .wait_for(&Locator::xpath(SUGGESTION), self.profile.timeouts.suggestion)
            .await
            .is_err()
        {
            warn!("no suggestion list for {:?}", name);
        }
        Ok(page.press_key(&input, Key::Enter).await?)
    }
}

#[async_trait]
impl SitePipeline for Ireland {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn dismiss_consent(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::require(page, &Locator::xpath(COOKIE_DIALOG), &self.profile.timeouts).await?;
        Ok(page.js_click(COOKIE_ACCEPT).await?)
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        self.station(page, "#HFS_from", &q.origin).await
    }

    async fn fill_destination(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        self.station(page, "#HFS_to", &q.destination).await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        page.remove_attribute(DATE, "aria-haspopup").await?;
        steps::clear_and_type(page, DATE, &q.date, false, &self.profile.timeouts).await
    }

    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(page.js_click(SUBMIT).await?)
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let times = page.texts(&Locator::xpath(PLAN_TIMES)).await?;
        let fares = page.texts(&Locator::xpath(FARES)).await?;
        interleaved_with_prices(times, fares)
    }
}
