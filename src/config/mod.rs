use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub localization: LocalizationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Per-site overrides keyed by registry key (`armenia`, `busbud`, ...).
    #[serde(default)]
    pub sites: HashMap<String, SiteOverrides>,
}

/// WebDriver session settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    #[serde(default)]
    pub args: Vec<String>,
}

/// Plain HTTP client settings (translation, rates, static route tables)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorKind {
    Google,
    Identity,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CurrencySource {
    Fixed,
    Ecb,
}

/// Translation and currency conversion
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalizationConfig {
    #[serde(default = "default_translator")]
    pub translator: TranslatorKind,

    /// Fixed translations tried before the translator, keyed by
    /// `"<target locale>:<english name>"`, e.g. `"ru:Yerevan" = "Ереван"`.
    #[serde(default)]
    pub glossary: HashMap<String, String>,

    #[serde(default = "default_currency_source")]
    pub currency_source: CurrencySource,

    /// Currency every price is converted into. Empty keeps site currencies.
    #[serde(default = "default_target_currency")]
    pub target_currency: String,

    /// Units of each currency per 1 EUR, used by the fixed converter.
    #[serde(default = "default_rates")]
    pub rates: HashMap<String, f64>,
}

/// Route-table cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NavigationPolicy {
    /// Log a failed page load and keep going; slow sites often finish loading anyway.
    #[default]
    Tolerate,
    /// Treat a failed page load as fatal for the run.
    Strict,
}

/// Batch runner configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub navigation_policy: NavigationPolicy,
}

/// Optional per-site knobs. Anything left unset keeps the site's built-in budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteOverrides {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub navigation_ms: Option<u64>,
    pub element_ms: Option<u64>,
    pub suggestion_ms: Option<u64>,
    pub results_ms: Option<u64>,
    pub calendar_max_pages: Option<u32>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    1600
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    500
}
fn default_jitter_ms() -> u64 {
    250
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}
fn default_translator() -> TranslatorKind {
    TranslatorKind::Google
}
fn default_currency_source() -> CurrencySource {
    CurrencySource::Fixed
}
fn default_target_currency() -> String {
    String::new()
}
fn default_rates() -> HashMap<String, f64> {
    [
        ("EUR", 1.0),
        ("USD", 1.08),
        ("AMD", 430.0),
        ("RUB", 98.0),
        ("KZT", 490.0),
        ("KGS", 96.0),
        ("TZS", 2750.0),
        ("UYU", 42.0),
        ("TRY", 35.0),
        ("KES", 140.0),
        ("EGP", 52.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/cache.duckdb")
}
fn default_max_age_secs() -> u64 {
    24 * 60 * 60
}
fn default_true() -> bool {
    true
}
fn default_concurrency() -> usize {
    3
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            args: Vec::new(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            translator: default_translator(),
            glossary: HashMap::new(),
            currency_source: default_currency_source(),
            target_currency: default_target_currency(),
            rates: default_rates(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl Default for SiteOverrides {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            navigation_ms: None,
            element_ms: None,
            suggestion_ms: None,
            results_ms: None,
            calendar_max_pages: None,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            navigation_policy: NavigationPolicy::default(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("TRANSIT").separator("__"))
            .build()
            .context("Failed to assemble configuration sources")?;

        cfg.try_deserialize().context("Invalid configuration")
    }

    pub fn site(&self, key: &str) -> Option<&SiteOverrides> {
        self.sites.get(key)
    }

    pub fn site_enabled(&self, key: &str) -> bool {
        self.site(key).map(|s| s.enabled).unwrap_or(true)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            http: HttpConfig::default(),
            localization: LocalizationConfig::default(),
            cache: CacheConfig::default(),
            runner: RunnerConfig::default(),
            sites: HashMap::new(),
        }
    }
}
