//! Per-site adapters and the registry that maps a site key to its pipeline.

pub mod armenia;
pub mod busbud;
pub mod checkmybus;
pub mod directferries;
pub mod egypt;
pub mod germany;
pub mod ireland;
pub mod kazakhstan;
pub mod kenya;
pub mod kyrgyzstan;
pub mod latvia;
pub mod tanzania;
pub mod turkey;
pub mod uruguay;

use crate::config::AppConfig;
use crate::pipeline::{SitePipeline, SiteProfile};
use crate::scraper::http_client::HttpClient;
use crate::storage::TableCache;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Default)]
pub struct SiteRegistry {
    sites: BTreeMap<&'static str, Arc<dyn SitePipeline>>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in site, with `[sites.<key>]` overrides applied and
    /// disabled sites left out.
    pub fn with_defaults(
        config: &AppConfig,
        http: Arc<HttpClient>,
        cache: Arc<dyn TableCache>,
    ) -> Self {
        let tuned = |mut p: SiteProfile| {
            if let Some(o) = config.site(p.key) {
                p.apply(o);
            }
            p
        };
        let max_age = Duration::from_secs(config.cache.max_age_secs);

        let all: Vec<Arc<dyn SitePipeline>> = vec![
            Arc::new(armenia::Armenia::new(tuned(armenia::profile()))),
            Arc::new(germany::Germany::new(tuned(germany::profile()))),
            Arc::new(latvia::Latvia::new(tuned(latvia::profile()))),
            Arc::new(kazakhstan::Kazakhstan::new(tuned(kazakhstan::profile()))),
            Arc::new(kyrgyzstan::Kyrgyzstan::new(
                tuned(kyrgyzstan::profile()),
                http,
                cache,
                max_age,
            )),
            Arc::new(tanzania::Tanzania::new(tuned(tanzania::profile()))),
            Arc::new(uruguay::Uruguay::new(tuned(uruguay::profile()))),
            Arc::new(turkey::Turkey::new(tuned(turkey::profile()))),
            Arc::new(ireland::Ireland::new(tuned(ireland::profile()))),
            Arc::new(kenya::Kenya::new(tuned(kenya::profile()))),
            Arc::new(egypt::Egypt::new(tuned(egypt::profile()))),
            Arc::new(busbud::Busbud::new(tuned(busbud::profile()))),
            Arc::new(checkmybus::CheckMyBus::new(tuned(checkmybus::profile()))),
            Arc::new(directferries::DirectFerries::new(tuned(directferries::profile()))),
        ];

        let mut registry = Self::new();
        for site in all {
            let key = site.profile().key;
            if config.site_enabled(key) {
                registry.register(site);
            } else {
                info!(site = key, "disabled by configuration");
            }
        }
        registry
    }

    /// Add or replace a site under its profile key.
    pub fn register(&mut self, site: Arc<dyn SitePipeline>) {
        let key = site.profile().key;
        if self.sites.insert(key, site).is_some() {
            debug!(site = key, "replaced registered site");
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn SitePipeline>> {
        self.sites.get(key).cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sites.keys().copied()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &SiteProfile> + '_ {
        self.sites.values().map(|s| s.profile())
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
