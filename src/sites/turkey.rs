//! Metro Turizm coach tickets (metroturizm.com.tr).

use crate::browser::{BrowserPage, Key, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::interleaved_with_prices;
use crate::pipeline::{steps, PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;

// Bootstrap-select pickers: a button opens the list, an input filters it.
const FROM_BUTTON: &str = r#"//div/button[@title="İSTANBUL ANADOLU"]"#;
const FROM_SEARCH: &str = r#"//div/input[@class="form-control"]"#;
const TO_BUTTON: &str = r#"//div/button[@data-id="selectLandingTerminal"]"#;
const TO_SEARCH: &str = r#"//div/input[@aria-label="Search"]"#;
const DATE: &str = "#inpSearchJourneyBusBoardingDate";
const RESULTS: &str = r#"//div[contains(@class,"journey-item")]"#;
const HOURS: &str = r#"//div/span[contains(@class,"journey-item-hour ng-binding")]"#;
const PRICES: &str = r#"//div/span[contains(@class,"price ng-binding")]"#;

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "turkey",
        name: "Metro Turizm",
        country: "TR",
        mode: TransportMode::Bus,
        url: "https://www.metroturizm.com.tr/en/",
        locale: None,
        date_format: Some("%d.%m.%Y"),
        currency: "TRY",
        convert_to: None,
        timeouts: Timeouts::from_millis(99_000, 50_000, 50_000, 90_000),
        calendar_max_pages: 0,
    }
}

pub struct Turkey {
    profile: SiteProfile,
}

impl Turkey {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    async fn pick_terminal(
        &self,
        page: &dyn BrowserPage,
        button: &str,
        search: &str,
        name: &str,
        field: &'static str,
    ) -> PhaseResult<()> {
        let button = Locator::xpath(button);
        steps::require(page, &button, &self.profile.timeouts).await?;
        page.click(&button).await?;
        steps::type_and_confirm(
            page,
            &Locator::xpath(search),
            name,
            &[Key::Enter],
            &self.profile.timeouts,
            field,
        )
        .await
    }
}

#[async_trait]
impl SitePipeline for Turkey {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        self.pick_terminal(page, FROM_BUTTON, FROM_SEARCH, &q.origin, "origin").await
    }

    async fn fill_destination(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        self.pick_terminal(page, TO_BUTTON, TO_SEARCH, &q.destination, "destination").await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::clear_and_type(page, DATE, &q.date, true, &self.profile.timeouts).await
    }

    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(page.js_click("#btnIndexSearchJourneys").await?)
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let hours = page.texts(&Locator::xpath(HOURS)).await?;
        let prices = page.texts(&Locator::xpath(PRICES)).await?;
        interleaved_with_prices(hours, prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;
    use crate::models::{sample_query, Query, Status};
    use crate::pipeline::testing::pipeline;
    use crate::pipeline::{Phase, PhaseError};
    use chrono::NaiveDate;

    fn query() -> Query {
        Query {
            origin: "Istanbul".into(),
            destination: "Ankara".into(),
            date: NaiveDate::from_ymd_opt(2021, 10, 12).unwrap(),
            ..sample_query()
        }
    }

    fn journeys(hours: &[&str], prices: &[&str]) -> FakePage {
        FakePage::new()
            .with_xpath(FROM_BUTTON)
            .with_xpath(FROM_SEARCH)
            .with_xpath(TO_BUTTON)
            .with_xpath(TO_SEARCH)
            .with_css(DATE)
            .with_css("#btnIndexSearchJourneys")
            .with_xpath(RESULTS)
            .with_texts(Locator::xpath(HOURS), hours)
            .with_texts(Locator::xpath(PRICES), prices)
    }

    #[tokio::test]
    async fn test_interleaved_hours() {
        let page = journeys(
            &["\n    08:30    ", "14:15", "23:00", "05:45"],
            &["180,00 TL", "210,00 TL"],
        );
        let env = pipeline().run(&Turkey::new(profile()), &page, &query()).await;
        assert_eq!(env.status, Status::Ok);
        assert_eq!(env.data.len(), 2);
        assert_eq!(env.data[0].departure_time, "08:30");
        assert_eq!(env.data[1].arrival_time.as_deref(), Some("05:45"));
        assert_eq!(env.data[1].price, 210.0);
        assert_eq!(page.keys(), vec![Key::Enter, Key::Enter, Key::Enter]);
        assert_eq!(page.typed_into(&Locator::xpath(TO_SEARCH)), vec!["Ankara"]);
    }

    #[tokio::test]
    async fn test_odd_hour_count_fails_closed() {
        let page = journeys(&["08:30", "14:15", "23:00"], &["180 TL"]);
        let report = pipeline()
            .run_with_report(&Turkey::new(profile()), &page, &query())
            .await;
        assert_eq!(report.envelope.status, Status::NoData);
        assert!(matches!(report.failure, Some((Phase::Extraction, PhaseError::ShapeMismatch(_)))));
    }
}
