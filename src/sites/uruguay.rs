//! COPSA intercity buses (copsa.com.uy).

use crate::browser::{BrowserPage, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::pair_rows;
use crate::pipeline::{steps, PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;

const FROM: &str = "#ter_from_list";
const TO: &str = "#ter_to_list";
// The two jQuery-UI menus are appended to <body>; the origin's opens second.
const FROM_HINT: &str = "/html/body/ul[2]/li[1]/a";
const TO_HINT: &str = "/html/body/ul[1]/li/a";
const RESULTS: &str = r#"//ul[@class="booking-list"]"#;
const ROW: &str = r#"//div[@class="booking-item"]"#;

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "uruguay",
        name: "COPSA",
        country: "UY",
        mode: TransportMode::Bus,
        url: "https://www.copsa.com.uy/es/",
        locale: Some("en"),
        date_format: Some("%d/%m/%Y"),
        currency: "UYU",
        convert_to: None,
        timeouts: Timeouts::from_millis(90_000, 10_000, 10_000, 50_000),
        calendar_max_pages: 0,
    }
}

pub struct Uruguay {
    profile: SiteProfile,
}

impl Uruguay {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl SitePipeline for Uruguay {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn dismiss_consent(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        let close = Locator::css("button.close");
        steps::require(page, &close, &self.profile.timeouts).await?;
        Ok(page.click(&close).await?)
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
        steps::clear_and_type(page, "#go_date", &q.date, false, &self.profile.timeouts).await
    }

    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(page.js_click(".btn-primary").await?)
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let rows = page
            .row_fields(
                &Locator::xpath(ROW),
                &[
                    Locator::css("div.booking-item-departure > h5:nth-child(2)"),
                    Locator::css("div.booking-item-arrival > h5:nth-child(2)"),
                    Locator::css(".results_buy_button a"),
                ],
            )
            .await?;
        pair_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;
    use crate::models::{sample_query, Query, Status};
    use crate::pipeline::testing::{glossary_pipeline, pipeline};
    use chrono::NaiveDate;

    fn query() -> Query {
        Query {
            origin: "Montevideo".into(),
            destination: "Piriapolis".into(),
            date: NaiveDate::from_ymd_opt(2021, 9, 4).unwrap(),
            ..sample_query()
        }
    }

    fn booking_page() -> FakePage {
        FakePage::new()
            .with_css(FROM)
            .with_css(TO)
            .with_xpath(FROM_HINT)
            .with_xpath(TO_HINT)
            .with_css("#go_date")
            .with_css(".btn-primary")
            .with_xpath(RESULTS)
            .with_fields(
                Locator::xpath(ROW),
                vec![vec![Some("09:30"), Some("11:05"), Some("$ 318")]],
            )
    }

    #[tokio::test]
    async fn test_booking_items_without_banner() {
        let page = booking_page();
        let env = pipeline().run(&Uruguay::new(profile()), &page, &query()).await;
        assert_eq!(env.status, Status::Ok);
        assert_eq!(env.data[0].departure_time, "09:30");
        assert_eq!(env.data[0].price, 318.0);
        assert_eq!(env.data[0].currency, "UYU");
        assert_eq!(page.typed_into(&Locator::css("#go_date")), vec!["04/09/2021"]);
    }

    #[tokio::test]
    async fn test_cookie_banner_is_closed() {
        let page = booking_page().with_css("button.close");
        let env = pipeline().run(&Uruguay::new(profile()), &page, &query()).await;
        assert!(env.is_ok());
        assert_eq!(page.clicks().first(), Some(&Locator::css("button.close")));
    }

    #[tokio::test]
    async fn test_places_are_typed_in_english() {
        let page = booking_page();
        let glossary = glossary_pipeline(&[("en:Piriapolis", "Piriápolis")]);
        let env = glossary.run(&Uruguay::new(profile()), &page, &query()).await;
        assert!(env.is_ok());
        assert_eq!(page.typed_into(&Locator::css(TO)), vec!["Piriápolis"]);
        assert_eq!(page.typed_into(&Locator::css(FROM)), vec!["Montevideo"]);
    }
}
