//! Direct Ferries route search (directferries.de).
//!
//! Routes are picked from one combined "origin - destination" box and the
//! date from a month calendar that has to be paged forward.

use crate::browser::{BrowserPage, Key, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::{interleaved_with_prices, stride};
use crate::pipeline::{steps, PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;
use tracing::warn;

const CONSENT: &str = r#"//*[@id="Home"]/div[6]/div/a"#;
const JOURNEY_TYPES: &str = r#"//*[@id="deal_finder1"]/div/section/label"#;
const ONE_WAY: &str = "#deal_finder1 > div.deal_finder_wrap > section.journey_type > label:nth-child(2)";
const ROUTE: &str = "#route_outbound";
const TIMING: &str = r#"//div/section[contains(@class,"journey_timing timing_outbound hide_until_times")]"#;
const TIMING_OPEN: &str =
    "#deal_finder1 > div.deal_finder_wrap > section.journey_timing.timing_outbound.hide_until_times";
const NEXT_MONTH: &str = r#"//div[@aria-label="Next Month"]"#;
const CONTINUE: &str = "#deal_finder1 > div.deal_finder_wrap > button";
const PASSENGERS_DONE: &str = "#deal_finder1 > div.deal_finder_wrap > aside > footer > button";
const RESULTS: &str = r#"//div[@class="ab-2062-flex"]"#;
const SAILINGS: &str = r#"//div/div[contains(@class,"ab-2062-col-1")]"#;
const PRICES: &str = "//div/div/b";

/// The wizard: route, date, passengers, then search.
const SUBMIT_SEQUENCE: [&str; 4] = [CONTINUE, CONTINUE, PASSENGERS_DONE, CONTINUE];

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "directferries",
        name: "Direct Ferries",
        country: "INT",
        mode: TransportMode::Ferry,
        url: "https://www.directferries.de/",
        locale: None,
        date_format: Some("%Y-%-m-%-d"),
        currency: "EUR",
        convert_to: None,
        timeouts: Timeouts::from_millis(90_000, 10_000, 10_000, 10_000),
        calendar_max_pages: 12,
    }
}

fn calendar_day(date: &str) -> Locator {
    Locator::xpath(format!(r#"//div[@data-full="{}"]"#, date))
}

/// Each sailing renders three cells: departure, a duration badge, arrival.
fn sailing_times(cells: Vec<String>) -> Vec<String> {
    cells
        .into_iter()
        .enumerate()
        .filter(|(i, _)| i % 3 != 1)
        .map(|(_, c)| c)
        .collect()
}

pub struct DirectFerries {
    profile: SiteProfile,
}

impl DirectFerries {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl SitePipeline for DirectFerries {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn dismiss_consent(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        let accept = Locator::xpath(CONSENT);
        steps::require(page, &accept, &self.profile.timeouts).await?;
        Ok(page.click(&accept).await?)
    }

    /// Fills the combined route box, so it covers the destination as well.
    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        let t = &self.profile.timeouts;
        if page.wait_for(&Locator::xpath(JOURNEY_TYPES), t.element).await.is_err() {
            warn!("journey type selector did not render");
        }
        if let Err(e) = page.js_click(ONE_WAY).await {
            warn!("one-way toggle: {}", e);
        }
        if let Err(e) = page.js_click(ROUTE).await {
            warn!("route box: {}", e);
        }
        let route = format!("{} - {}", q.origin, q.destination);
        steps::type_and_confirm(
            page,
            &Locator::css(ROUTE),
            &route,
            &[Key::ArrowUp, Key::Enter],
            t,
            "route",
        )
        .await
    }

    async fn fill_destination(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        if page.wait_for(&Locator::xpath(TIMING), self.profile.timeouts.element).await.is_err() {
            warn!("outbound timing section did not render");
        }
        page.js_click(TIMING_OPEN).await?;
        steps::page_calendar(
            page,
            &calendar_day(&q.date),
            &Locator::xpath(NEXT_MONTH),
            self.profile.calendar_max_pages,
            self.profile.timeouts.element.min(steps::CALENDAR_WAIT),
            &q.date,
        )
        .await
    }

    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        for button in SUBMIT_SEQUENCE {
            if let Err(e) = page.js_click(button).await {
                warn!("{}: {}", button, e);
            }
        }
        Ok(())
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let times = sailing_times(page.texts(&Locator::xpath(SAILINGS)).await?);
        // The first seven <b> are the search summary; then one fare every four.
        let prices = stride(&page.texts(&Locator::xpath(PRICES)).await?, 7, 4);
        interleaved_with_prices(times, prices)
    }
}
