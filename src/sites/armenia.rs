//! South Caucasus Railway timetable (railway.am).

use crate::browser::{BrowserPage, Locator};
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::assemble::{cells_to_tickets, Column, RowShape};
use crate::pipeline::{steps, PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use async_trait::async_trait;
use tracing::warn;

const RESULTS: &str = r#"//div[@class="table-responsive"]"#;

// No | Train | Days | Departure | ... | Arrival | Duration | Price
const SHAPE: RowShape = RowShape {
    departure: Column::At(3),
    arrival: Some(Column::FromEnd(2)),
    price: Column::FromEnd(0),
};

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "armenia",
        name: "South Caucasus Railway",
        country: "AM",
        mode: TransportMode::Rail,
        url: "https://www.railway.am/ru/table",
        locale: Some("ru"),
        date_format: Some("%d.%m.%Y"),
        currency: "AMD",
        convert_to: Some("EUR"),
        timeouts: Timeouts::from_millis(90_000, 10_000, 10_000, 20_000),
        calendar_max_pages: 0,
    }
}

pub struct Armenia {
    profile: SiteProfile,
}

impl Armenia {
    pub fn new(profile: SiteProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl SitePipeline for Armenia {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        // Country and route list gate the station selects.
        for (css, value) in [("#country", "1"), ("#route_names", "1")] {
            if let Err(e) = page.select_value(css, value).await {
                warn!("{}: {}", css, e);
            }
        }
        steps::select_option_text(page, "#From", &q.origin, "origin", &self.profile.timeouts).await
    }

    async fn fill_destination(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::select_option_text(page, "#To", &q.destination, "destination", &self.profile.timeouts)
            .await
    }

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()> {
        steps::clear_and_type(page, "#datepicker_from", &q.date, false, &self.profile.timeouts).await
    }

    async fn submit(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(page.js_click("#search").await?)
    }

    async fn await_results(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        steps::wait_results(page, &Locator::xpath(RESULTS), &self.profile.timeouts).await
    }

    async fn extract(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let rows = page
            .rows(&Locator::css(".table tbody"), &Locator::css("td"))
            .await?;
        cells_to_tickets(&rows, &SHAPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;
    use crate::models::{sample_query, Status};
    use crate::pipeline::testing::glossary_pipeline;
    use crate::pipeline::{Phase, PhaseError};

    const RU: &[(&str, &str)] = &[("ru:Gyumri", "Гюмри"), ("ru:Yerevan", "Ереван")];

    fn stations() -> [(&'static str, &'static str); 3] {
        [("11", "Гюмри"), ("12", "Ереван"), ("13", "Ванадзор")]
    }

    fn timetable() -> FakePage {
        FakePage::new()
            .with_options("#country", &[("1", "Армения")])
            .with_options("#route_names", &[("1", "Пригородные")])
            .with_options("#From", &stations())
            .with_options("#To", &stations())
            .with_css("#datepicker_from")
            .with_css("#search")
            .with_xpath(RESULTS)
            .with_rows(
                Locator::css(".table tbody"),
                vec![
                    vec!["6", "Гюмри - Ереван", "ежедн.", "08:00:00", "—", "11:30:00", "3:30", "1200 драм"],
                    vec!["8", "Гюмри - Ереван", "ежедн.", "14:00:00", "—", "17:30:00", "3:30", "1\u{a0}350 драм"],
                ],
            )
    }

    fn unconverted() -> Armenia {
        let mut p = profile();
        p.convert_to = None;
        Armenia::new(p)
    }

    #[tokio::test]
    async fn test_gyumri_to_yerevan() {
        let q = sample_query();
        let page = timetable();
        let env = glossary_pipeline(RU).run(&unconverted(), &page, &q).await;

        assert_eq!(env.status, Status::Ok);
        let got: Vec<_> = env
            .data
            .iter()
            .map(|t| (t.departure_time.as_str(), t.arrival_time.as_deref(), t.price))
            .collect();
        assert_eq!(
            got,
            vec![("08:00", Some("11:30"), 1200.0), ("14:00", Some("17:30"), 1350.0)]
        );
        assert!(env.data.iter().all(|t| t.date == q.date && t.currency == "AMD"));
        assert_eq!(env.hash_id, q.hash_id);
        assert_eq!(env.order, q.order);
        assert_eq!(page.typed_into(&Locator::css("#datepicker_from")), vec!["15.03.2021"]);
        assert!(page.selected().contains(&("#To".to_string(), "12".to_string())));
    }

    #[tokio::test]
    async fn test_prices_reported_in_euro() {
        let env = glossary_pipeline(RU)
            .run(&Armenia::new(profile()), &timetable(), &sample_query())
            .await;
        assert_eq!(env.data[0].price, 3.0);
        assert_eq!(env.data[0].currency, "EUR");
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let mut q = sample_query();
        q.destination = "Atlantis".into();
        let report = glossary_pipeline(RU)
            .run_with_report(&unconverted(), &timetable(), &q)
            .await;
        assert_eq!(report.envelope.status, Status::NoData);
        assert!(report.envelope.data.is_empty());
        assert!(matches!(
            report.failure,
            Some((Phase::Destination, PhaseError::NoMatchingSuggestion { .. }))
        ));
    }

    #[tokio::test]
    async fn test_placeholder_row_means_no_data() {
        let page = timetable().with_rows(Locator::css(".table tbody"), vec![vec!["Поездов нет"]]);
        let env = glossary_pipeline(RU)
            .run(&unconverted(), &page, &sample_query())
            .await;
        assert_eq!(env.status, Status::NoData);
    }
}
