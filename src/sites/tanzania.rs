//! Dar Lux coach booking (darlux.co.tz).

use crate::browser::{BrowserPage, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::{cells_to_tickets, Column, RowShape};
use crate::pipeline::steps::{self, xpath_literal};
use crate::pipeline::{PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;
use tracing::warn;

const FROM: &str = r#"//input[@id="from_stn"]"#;
const TO: &str = r#"//input[@id="to_stn"]"#;
const DATE: &str = r#"//input[@id="journey_date"]"#;
const RESULTS: &str = r#"//table[@id="example"]"#;
const PAGE_SIZE: &str = r#"select[name="example_length"]"#;
const ROW: &str = r#"//*[@id="search_result"]/tr"#;

const SHAPE: RowShape = RowShape {
    departure: Column::At(4),
    arrival: Some(Column::At(5)),
    price: Column::At(7),
};

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "tanzania",
        name: "Dar Lux",
        country: "TZ",
        mode: TransportMode::Bus,
        url: "https://www.darlux.co.tz/home.aspx",
        locale: None,
        date_format: Some("%Y-%m-%d"),
        currency: "TZS",
        convert_to: None,
        timeouts: Timeouts::from_millis(90_000, 10_000, 10_000, 50_000),
        calendar_max_pages: 0,
    }
}

pub struct Tanzania {
    profile: SiteProfile,
}

impl Tanzania {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    fn station(name: &str) -> Locator {
        Locator::xpath(format!(
            "//li[contains(text(), {})]",
            xpath_literal(&name.to_uppercase())
        ))
    }
}

#[async_trait]
impl SitePipeline for Tanzania {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::type_and_pick(
            page,
            &Locator::xpath(FROM),
            &q.origin,
            &Self::station(&q.origin),
            &self.profile.timeouts,
            "origin",
        )
        .await
    }

    async fn fill_destination(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::type_and_pick(
            page,
            &Locator::xpath(TO),
            &q.destination,
            &Self::station(&q.destination),
            &self.profile.timeouts,
            "destination",
        )
        .await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::clear_and_type_at(page, &Locator::xpath(DATE), &q.date, &self.profile.timeouts).await
    }

    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(page.js_click("button.btn-primary").await?)
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await?;
        // The table pages at 10 rows unless told otherwise.
        if let Err(e) = page.select_value(PAGE_SIZE, "100").await {
            warn!("page size: {}", e);
        }
        Ok(())
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let rows = page.rows(&Locator::xpath(ROW), &Locator::css("td")).await?;
        cells_to_tickets(&rows, &SHAPE)
    }
}
