//! Bishkek bus station route list (avtobeket.kg).
//!
//! The station publishes a static table of every route rather than a search
//! form, so this pipeline never drives the browser: it fetches the page over
//! HTTP, keeps it in the table cache, and filters rows by route name.

use crate::browser::BrowserPage;
use crate::localize::CollaboratorError;
use crate::models::{LocalizedQuery, RawTicket};
use crate::pipeline::{PhaseError, PhaseResult, SitePipeline, SiteProfile, Timeouts, TransportMode};
use crate::scraper::parsers::{parse_route_table, route_matches};
use crate::scraper::HttpClient;
use crate::storage::TableCache;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CACHE_KEY: &str = "avtobeket:routes";

pub fn profile() -> SiteProfile {
    SiteProfile {
        key: "kyrgyzstan",
        name: "Avtobeket Bishkek",
        country: "KG",
        mode: TransportMode::Bus,
        url: "https://avtobeket.kg/routes/",
        locale: Some("ru"),
        date_format: None,
        currency: "KGS",
        convert_to: None,
        timeouts: Timeouts::from_millis(30_000, 0, 0, 0),
        calendar_max_pages: 0,
    }
}

pub struct Kyrgyzstan {
    profile: SiteProfile,
    http: Arc<HttpClient>,
    cache: Arc<dyn TableCache>,
    max_age: Duration,
}

impl Kyrgyzstan {
    pub fn new(
        profile: SiteProfile,
        http: Arc<HttpClient>,
        cache: Arc<dyn TableCache>,
        max_age: Duration,
    ) -> Self {
        Self {
            profile,
            http,
            cache,
            max_age,
        }
    }

    async fn routes_page(&self) -> PhaseResult<String> {
        match self.cache.get(CACHE_KEY, self.max_age) {
            Ok(Some(body)) => {
                debug!("route table served from cache");
                return Ok(body);
            }
            Ok(None) => {}
            Err(e) => warn!("cache read failed, fetching: {}", e),
        }

        let body = self
            .http
            .get_text(self.profile.url)
            .await
            .map_err(CollaboratorError::from)?;
        if let Err(e) = self.cache.put(CACHE_KEY, &body) {
            warn!("cache write failed: {}", e);
        }
        Ok(body)
    }
}

/// Matching rows of the route table. A matching row without a departure time
/// or fare is a shape error, not a skip.
fn tickets_for(html: &str, q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
    parse_route_table(html)
        .into_iter()
        .filter(|r| route_matches(&r.route, &q.origin, &q.destination))
        .map(|r| match (r.departure, r.price) {
            (Some(departure), Some(price)) => Ok(RawTicket {
                departure,
                arrival: r.arrival,
                price,
            }),
            _ => Err(PhaseError::ShapeMismatch(format!(
                "route {:?} has no departure or fare",
                r.route
            ))),
        })
        .collect()
}

#[async_trait]
impl SitePipeline for Kyrgyzstan {
    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    async fn navigate(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
    }

    async fn fill_origin(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
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

    async fn await_results(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
    }

    async fn extract(&self, _page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>> {
        let html = self.routes_page().await?;
        tickets_for(&html, q)
    }
}
