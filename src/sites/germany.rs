//! Deutsche Bahn journey planner (bahn.de).

use crate::browser::{BrowserPage, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::times_with_fares;
use crate::pipeline::steps::{self, xpath_literal};
use crate::pipeline::{PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;
use tracing::debug;

const DATE_INPUT: &str = r#"//*[@id="js-tab-auskunft"]/div/form/fieldset[1]/div[2]/div[1]/input"#;
const FROM: &str = "[id=js-auskunft-autocomplete-from]";
const TO: &str = "[id=js-auskunft-autocomplete-to]";
const SUBMIT: &str = r#"input[value="Suchen"]"#;
const RESULTS: &str = r#"//*[@id="resultsOverview"]"#;
const LATER: &str = r#"//*[@class="buttonGreyBg later"]"#;
const CONNECTION: &str = r#"//*[@class="boxShadow  scheduledCon "]"#;
const LATER_PAGES: usize = 3;

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "germany",
        name: "Deutsche Bahn",
        country: "DE",
        mode: TransportMode::Rail,
        url: "https://www.bahn.de/",
        locale: Some("de"),
        date_format: Some("%d-%m-%Y"),
        currency: "EUR",
        convert_to: None,
        timeouts: Timeouts::from_millis(90_000, 10_000, 10_000, 20_000),
        calendar_max_pages: 0,
    }
}

pub struct Germany {
    profile: SiteProfile,
}

impl Germany {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }

    fn suggestion(name: &str) -> Locator {
        Locator::xpath(format!("//span[contains(text(), {})]", xpath_literal(name)))
    }
}

#[async_trait]
impl SitePipeline for Germany {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::type_and_pick(
            page,
            &Locator::css(FROM),
            &q.origin,
            &Self::suggestion(&q.origin),
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
            &Self::suggestion(&q.destination),
            &self.profile.timeouts,
            "destination",
        )
        .await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::clear_and_type_at(page, &Locator::xpath(DATE_INPUT), &q.date, &self.profile.timeouts).await
    }

    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        let button = Locator::css(SUBMIT);
        steps::require(page, &button, &self.profile.timeouts).await?;
        Ok(page.click(&button).await?)
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await?;
        let pages = steps::click_while_present(page, &Locator::xpath(LATER), LATER_PAGES).await;
        debug!("loaded {} later pages", pages);
        Ok(())
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let row = Locator::xpath(CONNECTION);
        let times = page.rows(&row, &Locator::css("td.time")).await?;
        let fares = page
            .row_fields(&row, &[Locator::css("span.fareOutput")])
            .await?;
        times_with_fares(times, fares)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;
    use crate::models::{sample_query, Query, Status};
    use crate::pipeline::testing::glossary_pipeline;
    use crate::pipeline::{Phase, PhaseError};
    use chrono::NaiveDate;

    fn query() -> Query {
        Query {
            origin: "Munich".into(),
            destination: "Cologne".into(),
            date: NaiveDate::from_ymd_opt(2021, 4, 2).unwrap(),
            ..sample_query()
        }
    }

    const DE: &[(&str, &str)] = &[("de:Munich", "München"), ("de:Cologne", "Köln")];

    fn planner() -> FakePage {
        FakePage::new()
            .with_css(FROM)
            .with_css(TO)
            .with(Germany::suggestion("München"))
            .with(Germany::suggestion("Köln"))
            .with_xpath(DATE_INPUT)
            .with_css(SUBMIT)
            .with_xpath(RESULTS)
            .with_rows(
                Locator::xpath(CONNECTION),
                vec![vec!["06:52", "11:27"], vec!["07:55", "12:31"]],
            )
            .with_fields(
                Locator::xpath(CONNECTION),
                vec![vec![Some("ab 59,90\u{a0}€")], vec![Some("ab 39,90\u{a0}€")]],
            )
    }

    #[tokio::test]
    async fn test_connections() {
        let page = planner();
        let env = glossary_pipeline(DE).run(&Germany::new(profile()), &page, &query()).await;
        assert_eq!(env.status, Status::Ok);
        assert_eq!(env.data.len(), 2);
        assert_eq!(env.data[1].departure_time, "07:55");
        assert_eq!(env.data[1].arrival_time.as_deref(), Some("12:31"));
        assert_eq!(env.data[0].price, 59.9);
        assert_eq!(page.typed_into(&Locator::xpath(DATE_INPUT)), vec!["02-04-2021"]);
        assert_eq!(page.typed_into(&Locator::css(FROM)), vec!["München"]);
    }

    #[tokio::test]
    async fn test_later_button_is_bounded() {
        let page = planner().with_xpath(LATER);
        let env = glossary_pipeline(DE).run(&Germany::new(profile()), &page, &query()).await;
        assert!(env.is_ok());
        let later = page
            .clicks()
            .into_iter()
            .filter(|l| *l == Locator::xpath(LATER))
            .count();
        assert_eq!(later, LATER_PAGES);
    }

    #[tokio::test]
    async fn test_connection_without_fare_fails_closed() {
        let page = planner().with_fields(
            Locator::xpath(CONNECTION),
            vec![vec![Some("59,90 €")], vec![None]],
        );
        let report = glossary_pipeline(DE)
            .run_with_report(&Germany::new(profile()), &page, &query())
            .await;
        assert_eq!(report.envelope.status, Status::NoData);
        assert!(matches!(report.failure, Some((Phase::Extraction, PhaseError::ShapeMismatch(_)))));
    }
}
