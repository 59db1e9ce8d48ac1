//! Kenya Railways Madaraka Express e-ticketing (metickets.krc.co.ke).

use crate::browser::{BrowserPage, Key, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::interleaved_with_prices;
use crate::pipeline::{steps, PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;
use tracing::warn;

const TRAIN_TYPE: &str = "#train_type";
const FROM: &str = "[name=terminal_id]";
const TO: &str = "#destination_references";
const DATE: &str = "#dateInput";
const DEPARTURE_SLOT: &str = "#depature_time";
const RESULTS: &str = r#"//div[@class="tab-content"]"#;
const TIMES: &str = r#"//div/small/span[contains(@class,"span")]"#;
const FARES: &str = r#"//div[2]/div[1]/dl/dd[contains(text(),"KSH")]"#;

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "kenya",
        name: "Kenya Railways",
        country: "KE",
        mode: TransportMode::Rail,
        url: "https://metickets.krc.co.ke/",
        locale: None,
        date_format: Some("%m/%d/%Y"),
        currency: "KES",
        convert_to: None,
        timeouts: Timeouts::from_millis(50_000, 10_000, 50_000, 10_000),
        calendar_max_pages: 0,
    }
}

pub struct Kenya {
    profile: SiteProfile,
}

impl Kenya {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl SitePipeline for Kenya {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        // Terminals are only listed once a service type is chosen.
        if let Err(e) = page.select_value(TRAIN_TYPE, "inter_county").await {
            warn!("train type: {}", e);
        }
        steps::type_and_confirm(
            page,
            &Locator::css(FROM),
            &q.origin,
            &[Key::Enter],
            &self.profile.timeouts,
            "origin",
        )
        .await
    }

    async fn fill_destination(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::type_and_confirm(
            page,
            &Locator::css(TO),
            &q.destination,
            &[Key::Enter],
            &self.profile.timeouts,
            "destination",
        )
        .await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        let input = Locator::css(DATE);
        steps::require(page, &input, &self.profile.timeouts).await?;
        page.js_click(DATE).await?;
        page.type_text(&input, &q.date).await?;
        Ok(page.press_key(&input, Key::Enter).await?)
    }

    /// Picking the first departure slot loads the availability tabs.
    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        let slot = Locator::css(DEPARTURE_SLOT);
        steps::require(page, &slot, &self.profile.timeouts).await?;
        page.js_click(DEPARTURE_SLOT).await?;
        page.press_key(&slot, Key::ArrowDown).await?;
        Ok(page.press_key(&slot, Key::Enter).await?)
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let times = page.texts(&Locator::xpath(TIMES)).await?;
        let fares = page.texts(&Locator::xpath(FARES)).await?;
        interleaved_with_prices(times, fares)
    }
}
