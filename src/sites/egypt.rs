//! Egyptian intercity bus timetables published on ask-aladdin.com.
//!
//! The page is a static accordion with one panel per route; there is no
//! search form and no date. Opening the right panel is the whole query.

use crate::browser::{BrowserPage, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::{stride, zip_departures};
use crate::pipeline::steps::{self, xpath_literal};
use crate::pipeline::{
    PhaseError, PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

const ACCORDION: &str = r#"//div/div/div/h4/a[contains(@class,"accordion-toggle collapsed")]"#;
const OPEN_CELLS: &str = r#"//div/div[@aria-expanded="true"]/div/div/div/table/tbody/tr/td"#;
const TITLE_WAIT: Duration = Duration::from_secs(1);

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "egypt",
        name: "Ask Aladdin bus timetables",
        country: "EG",
        mode: TransportMode::Bus,
        url: "https://ask-aladdin.com/egypt-transport-system/bus-timetables/",
        locale: None,
        date_format: None,
        currency: "EGP",
        convert_to: None,
        timeouts: Timeouts::from_millis(200_000, 50_000, 1_000, 10_000),
        calendar_max_pages: 0,
    }
}

/// Panel titles are written by hand and follow no single pattern.
fn title_variants(origin: &str, destination: &str) -> [String; 4] {
    [
        format!("{} to {}", origin, destination),
        format!("From {} to {}", origin, destination),
        format!("{} to the {}", origin, destination),
        format!("{}/{}", origin, destination),
    ]
}

fn panel(title: &str) -> Locator {
    Locator::xpath(format!("//div/h4/a[contains(text(),{})]", xpath_literal(title)))
}

pub struct Egypt {
    profile: SiteProfile,
}

impl Egypt {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl SitePipeline for Egypt {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// Opens the route's panel; origin and destination are one title.
    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        if let Err(e) = steps::require(page, &Locator::xpath(ACCORDION), &self.profile.timeouts).await {
            warn!("{}", e);
        }
        for title in title_variants(&q.origin, &q.destination) {
            let link = panel(&title);
            if page.wait_for(&link, TITLE_WAIT).await.is_ok() {
                debug!("opening panel {:?}", title);
                return Ok(page.click(&link).await?);
            }
        }
        Err(PhaseError::NoMatchingSuggestion {
            field: "route",
            value: format!("{} / {}", q.origin, q.destination),
        })
    }

    async fn fill_destination(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
    }

    async fn fill_date(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
    }

    async fn submit(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(OPEN_CELLS), &self.profile.timeouts).await
    }

    /// Cells read row-major after a three-cell header: Company | Departure | Fare.
    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let cells = page.texts(&Locator::xpath(OPEN_CELLS)).await?;
        zip_departures(stride(&cells, 4, 3), stride(&cells, 5, 3))
    }
}
