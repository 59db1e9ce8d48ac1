//! Per-site extraction pipeline.
//!
//! ## Phases
//!
//! `Pipeline::run()` drives one `SitePipeline` against one borrowed page:
//!   1. localize place names and date for the site
//!   2. navigate (fatal only under `NavigationPolicy::Strict`)
//!   3. dismiss consent banners (never fatal)
//!   4. fill origin, then destination (fatal)
//!   5. fill date (fatal only when a calendar cannot reach the date)
//!   6. submit (never fatal), then wait for results (fatal)
//!   7. extract raw rows (fatal when empty or misshapen)
//!   8. clean, convert and assemble tickets (fatal on any unparseable row)
//!
//! Any fatal failure yields a `NoData` envelope with no tickets; there is no
//! partial result.

pub mod assemble;
pub mod steps;

use crate::browser::{BrowserError, BrowserPage};
use crate::config::{NavigationPolicy, SiteOverrides};
use crate::localize::{self, CollaboratorError, CurrencyConverter, Translator};
use crate::models::{LocalizedQuery, Query, RawTicket, ResultEnvelope, Ticket};
use crate::scraper::cleaner::clean_row;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("selector not found: {what}")]
    SelectorNotFound { what: String },
    #[error("no {field} suggestion matching {value:?}")]
    NoMatchingSuggestion { field: &'static str, value: String },
    #[error("date {date} not reachable within {pages} calendar pages")]
    CalendarExhausted { date: String, pages: u32 },
    #[error("results did not appear: {0}")]
    ResultsTimeout(String),
    #[error("search returned no rows")]
    EmptyRowSet,
    #[error("row shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("could not parse {field} from {text:?}")]
    Unparseable { field: &'static str, text: String },
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

pub type PhaseResult<T> = Result<T, PhaseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Navigation,
    Consent,
    Origin,
    Destination,
    Date,
    Submit,
    Results,
    Extraction,
    Assembly,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Navigation => "navigation",
            Phase::Consent => "consent",
            Phase::Origin => "origin",
            Phase::Destination => "destination",
            Phase::Date => "date",
            Phase::Submit => "submit",
            Phase::Results => "results",
            Phase::Extraction => "extraction",
            Phase::Assembly => "assembly",
        };
        f.write_str(s)
    }
}

impl PhaseError {
    /// Whether this error ends the run when raised in `phase`.
    pub fn is_fatal_in(&self, phase: Phase, policy: NavigationPolicy) -> bool {
        match phase {
            Phase::Navigation => policy == NavigationPolicy::Strict,
            Phase::Consent | Phase::Submit => false,
            Phase::Date => matches!(self, PhaseError::CalendarExhausted { .. }),
            Phase::Origin
            | Phase::Destination
            | Phase::Results
            | Phase::Extraction
            | Phase::Assembly => true,
        }
    }
}

// ── Site description ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Rail,
    Bus,
    Ferry,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            TransportMode::Rail => "rail",
            TransportMode::Bus => "bus",
            TransportMode::Ferry => "ferry",
        })
    }
}

/// Wait budgets for one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub navigation: Duration,
    pub element: Duration,
    pub suggestion: Duration,
    pub results: Duration,
}

impl Timeouts {
    pub const fn from_millis(navigation: u64, element: u64, suggestion: u64, results: u64) -> Self {
        Self {
            navigation: Duration::from_millis(navigation),
            element: Duration::from_millis(element),
            suggestion: Duration::from_millis(suggestion),
            results: Duration::from_millis(results),
        }
    }
}

/// Everything about a site that is configuration rather than behaviour.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub key: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    pub mode: TransportMode,
    pub url: &'static str,
    /// Language the site's station inputs expect; `None` keeps English names.
    pub locale: Option<&'static str>,
    /// strftime pattern for the date widget; `None` when the site takes no date.
    pub date_format: Option<&'static str>,
    /// ISO code of the prices the site shows.
    pub currency: &'static str,
    /// Always report prices in this currency, whatever the runner's target.
    pub convert_to: Option<&'static str>,
    pub timeouts: Timeouts,
    pub calendar_max_pages: u32,
}

impl SiteProfile {
    pub fn apply(&mut self, o: &SiteOverrides) {
        let ms = Duration::from_millis;
        if let Some(v) = o.navigation_ms {
            self.timeouts.navigation = ms(v);
        }
        if let Some(v) = o.element_ms {
            self.timeouts.element = ms(v);
        }
        if let Some(v) = o.suggestion_ms {
            self.timeouts.suggestion = ms(v);
        }
        if let Some(v) = o.results_ms {
            self.timeouts.results = ms(v);
        }
        if let Some(v) = o.calendar_max_pages {
            self.calendar_max_pages = v;
        }
    }
}

// ── The per-site contract ─────────────────────────────────────────────────────

/// One booking site's interaction flow. Each phase may fail independently;
/// `Pipeline` decides which failures end the run.
#[async_trait]
pub trait SitePipeline: Send + Sync {
    fn profile(&self) -> &SiteProfile;

    async fn navigate(&self, page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        let p = self.profile();
        page.goto(p.url, p.timeouts.navigation)
            .await
            .map_err(|e| PhaseError::Navigation(e.to_string()))
    }

    async fn dismiss_consent(&self, _page: &dyn BrowserPage, _q: &LocalizedQuery) -> PhaseResult<()> {
        Ok(())
    }

    async fn fill_origin(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()>;

    async fn fill_destination(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()>;

    async fn fill_date(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()>;

    async fn submit(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()>;

    async fn await_results(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<()>;

    async fn extract(&self, page: &dyn BrowserPage, q: &LocalizedQuery) -> PhaseResult<Vec<RawTicket>>;
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Collaborators shared by every run.
#[derive(Clone)]
pub struct Services {
    pub translator: Arc<dyn Translator>,
    pub converter: Arc<dyn CurrencyConverter>,
    /// Convert every price into this currency; `None` keeps site currencies.
    pub target_currency: Option<String>,
    pub navigation_policy: NavigationPolicy,
}

/// The envelope plus, on failure, which phase ended the run and why.
#[derive(Debug)]
pub struct RunReport {
    pub envelope: ResultEnvelope,
    pub failure: Option<(Phase, PhaseError)>,
}

#[derive(Clone)]
pub struct Pipeline {
    services: Services,
}

impl Pipeline {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub async fn run(
        &self,
        site: &dyn SitePipeline,
        page: &dyn BrowserPage,
        query: &Query,
    ) -> ResultEnvelope {
        self.run_with_report(site, page, query).await.envelope
    }

    pub async fn run_with_report(
        &self,
        site: &dyn SitePipeline,
        page: &dyn BrowserPage,
        query: &Query,
    ) -> RunReport {
        let profile = site.profile();
        let span = info_span!(
            "pipeline",
            site = profile.key,
            hash_id = query.hash_id.as_deref().unwrap_or("-"),
            order = query.order.unwrap_or(-1),
        );

        async move {
            let q = localize::localize(
                query,
                profile.locale,
                profile.date_format,
                self.services.translator.as_ref(),
            )
            .await;
            debug!(origin = %q.origin, destination = %q.destination, date = %q.date, "localized");

            match self.drive(site, page, &q).await {
                Ok(tickets) => {
                    info!("{} → {}: {} tickets", q.origin, q.destination, tickets.len());
                    RunReport {
                        envelope: ResultEnvelope::success(query, tickets),
                        failure: None,
                    }
                }
                Err((phase, e)) => {
                    warn!(phase = %phase, "no data: {}", e);
                    RunReport {
                        envelope: ResultEnvelope::no_data(query),
                        failure: Some((phase, e)),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        site: &dyn SitePipeline,
        page: &dyn BrowserPage,
        q: &LocalizedQuery,
    ) -> Result<Vec<Ticket>, (Phase, PhaseError)> {
        self.step(Phase::Navigation, site.navigate(page, q).await)?;
        self.step(Phase::Consent, site.dismiss_consent(page, q).await)?;
        self.step(Phase::Origin, site.fill_origin(page, q).await)?;
        self.step(Phase::Destination, site.fill_destination(page, q).await)?;
        self.step(Phase::Date, site.fill_date(page, q).await)?;
        self.step(Phase::Submit, site.submit(page, q).await)?;
        self.step(Phase::Results, site.await_results(page, q).await)?;

        let raw = site
            .extract(page, q)
            .await
            .map_err(|e| (Phase::Extraction, e))?;
        if raw.is_empty() {
            return Err((Phase::Extraction, PhaseError::EmptyRowSet));
        }

        self.assemble(site.profile(), q, raw)
            .await
            .map_err(|e| (Phase::Assembly, e))
    }

    fn step(&self, phase: Phase, result: PhaseResult<()>) -> Result<(), (Phase, PhaseError)> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal_in(phase, self.services.navigation_policy) => Err((phase, e)),
            Err(e) => {
                warn!(phase = %phase, "{} (continuing)", e);
                Ok(())
            }
        }
    }

    async fn assemble(
        &self,
        profile: &SiteProfile,
        q: &LocalizedQuery,
        raw: Vec<RawTicket>,
    ) -> PhaseResult<Vec<Ticket>> {
        let target = profile
            .convert_to
            .or(self.services.target_currency.as_deref())
            .filter(|t| !t.is_empty())
            .unwrap_or(profile.currency);

        let mut tickets = Vec::with_capacity(raw.len());
        for r in &raw {
            let row = clean_row(r).map_err(|field| PhaseError::Unparseable {
                field,
                text: match field {
                    "departure_time" => r.departure.clone(),
                    "arrival_time" => r.arrival.clone().unwrap_or_default(),
                    _ => r.price.clone(),
                },
            })?;
            let price = self
                .services
                .converter
                .convert(row.price, profile.currency, target)
                .await?;
            tickets.push(Ticket {
                date: q.query.date,
                departure_time: row.departure,
                arrival_time: row.arrival,
                price,
                currency: target.to_uppercase(),
            });
        }
        Ok(tickets)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::localize::{FixedRateConverter, GlossaryTranslator, IdentityTranslator};
    use std::collections::HashMap;

    pub fn services(policy: NavigationPolicy) -> Services {
        let rates: HashMap<String, f64> = [("AMD".to_string(), 400.0), ("TRY".to_string(), 35.0)]
            .into_iter()
            .collect();
        Services {
            translator: Arc::new(IdentityTranslator),
            converter: Arc::new(FixedRateConverter::new(&rates)),
            target_currency: None,
            navigation_policy: policy,
        }
    }

    pub fn pipeline() -> Pipeline {
        Pipeline::new(services(NavigationPolicy::Tolerate))
    }

    /// Runner whose translator knows only `entries` (`"<lang>:<name>" → name`).
    pub fn glossary_pipeline(entries: &[(&str, &str)]) -> Pipeline {
        let glossary: HashMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut svc = services(NavigationPolicy::Tolerate);
        svc.translator = Arc::new(GlossaryTranslator::new(&glossary, Arc::new(IdentityTranslator)));
        Pipeline::new(svc)
    }
}
