//! Kazakhstan Temir Zholy ticket office (bilet.railways.kz).

use crate::browser::{BrowserPage, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::pair_rows;
use crate::pipeline::steps::{self, xpath_literal};
use crate::pipeline::{PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;
use tracing::warn;

const FROM: &str = ".route-search-form-departure-station input.search";
const TO: &str = ".route-search-form-arrival-station > input.search";
const DATE: &str = "#route_search_form_forwardDepartureDate";
const SUBMIT: &str = r#"[name="route_search_form"] > button"#;
const RESULTS: &str = r#"//div[@class="ui existing segment"]"#;
const TRAINS: &str = r#"//div[@id="forward-direction-trains"]"#;
const ROW: &str = r#"//tr[contains(@class, "item")]"#;

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "kazakhstan",
        name: "Kazakhstan Temir Zholy",
        country: "KZ",
        mode: TransportMode::Rail,
        url: "https://bilet.railways.kz/",
        locale: Some("ru"),
        date_format: Some("%d-%m-%Y"),
        currency: "KZT",
        convert_to: None,
        timeouts: Timeouts::from_millis(90_000, 10_000, 10_000, 50_000),
        calendar_max_pages: 0,
    }
}

pub struct Kazakhstan {
    profile: SiteProfile,
}

impl Kazakhstan {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    /// Station hints carry the name upper-cased in `data-text`.
    fn hint(name: &str) -> Locator {
        Locator::xpath(format!(
            "//div[@data-text={}]",
            xpath_literal(&name.to_uppercase())
        ))
    }
}

#[async_trait]
impl SitePipeline for Kazakhstan {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::type_and_pick(
            page,
            &Locator::css(FROM),
            &q.origin,
            &Self::hint(&q.origin),
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
            &Self::hint(&q.destination),
            &self.profile.timeouts,
            "destination",
        )
        .await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::clear_and_type(page, DATE, &q.date, false, &self.profile.timeouts).await
    }

    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(page.js_click(SUBMIT).await?)
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await?;
        // The outbound list renders a moment after the segment.
        if let Err(e) = steps::require(page, &Locator::xpath(TRAINS), &self.profile.timeouts).await {
            warn!("{}", e);
        }
        Ok(())
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let rows = page
            .row_fields(
                &Locator::xpath(ROW),
                &[
                    Locator::css("h2.departure-time"),
                    Locator::css("h2.arrival-time"),
                    Locator::css("h4.ui.apple.header"),
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
    use crate::pipeline::testing::glossary_pipeline;
    use chrono::NaiveDate;

    fn query() -> Query {
        Query {
            origin: "Almaty".into(),
            destination: "Astana".into(),
            date: NaiveDate::from_ymd_opt(2021, 5, 20).unwrap(),
            ..sample_query()
        }
    }

    const RU: &[(&str, &str)] = &[("ru:Almaty", "Алматы"), ("ru:Astana", "Нур-Султан")];

    #[tokio::test]
    async fn test_train_rows() {
        let page = FakePage::new()
            .with_css(FROM)
            .with_css(TO)
            .with_xpath(r#"//div[@data-text="АЛМАТЫ"]"#)
            .with_xpath(r#"//div[@data-text="НУР-СУЛТАН"]"#)
            .with_css(DATE)
            .with_css(SUBMIT)
            .with_xpath(RESULTS)
            .with_fields(
                Locator::xpath(ROW),
                vec![
                    vec![Some("21:03 20.05"), Some("08:52 21.05"), Some("от 9\u{a0}840 ₸")],
                    vec![Some("23:40 20.05"), Some("14:10 21.05"), Some("от 12\u{a0}380 ₸")],
                ],
            );

        let env = glossary_pipeline(RU).run(&Kazakhstan::new(profile()), &page, &query()).await;
        assert_eq!(env.status, Status::Ok);
        assert_eq!(env.data[0].departure_time, "21:03");
        assert_eq!(env.data[0].arrival_time.as_deref(), Some("08:52"));
        assert_eq!(env.data[1].price, 12380.0);
        assert_eq!(env.data[1].currency, "KZT");
        assert_eq!(page.typed_into(&Locator::css(DATE)), vec!["20-05-2021"]);
    }

    #[tokio::test]
    async fn test_hint_must_match_uppercased_name() {
        let page = FakePage::new()
            .with_css(FROM)
            .with_xpath(r#"//div[@data-text="Алматы"]"#);
        let env = glossary_pipeline(RU).run(&Kazakhstan::new(profile()), &page, &query()).await;
        assert_eq!(env.status, Status::NoData);
    }
}
