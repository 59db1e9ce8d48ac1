//! Black-box collaborators used before and after the browser work:
//! place-name translation and currency conversion.

pub mod currency;
pub mod translator;

use crate::models::{LocalizedQuery, Query};
use crate::scraper::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

pub use self::currency::{CurrencyConverter, EcbRateConverter, FixedRateConverter};
pub use self::translator::GoogleTranslator;

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Unexpected response: {0}")]
    Parse(String),
    #[error("No rate for currency {0}")]
    UnknownCurrency(String),
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// `source = None` lets the service detect the language.
    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<String, CollaboratorError>;
}

/// Leaves text untouched. For sites whose inputs accept English names.
pub struct IdentityTranslator;

#[async_trait]
impl Translator for IdentityTranslator {
    async fn translate(
        &self,
        text: &str,
        _source: Option<&str>,
        _target: &str,
    ) -> Result<String, CollaboratorError> {
        Ok(text.to_string())
    }
}

/// Fixed translations checked first; everything else goes to `inner`.
pub struct GlossaryTranslator {
    entries: HashMap<String, String>,
    inner: Arc<dyn Translator>,
}

impl GlossaryTranslator {
    /// Keys are `"<target>:<text>"`, matched case-insensitively.
    pub fn new(entries: &HashMap<String, String>, inner: Arc<dyn Translator>) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
                .collect(),
            inner,
        }
    }
}

#[async_trait]
impl Translator for GlossaryTranslator {
    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<String, CollaboratorError> {
        let key = format!("{}:{}", target, text.trim()).to_lowercase();
        match self.entries.get(&key) {
            Some(hit) => Ok(hit.clone()),
            None => self.inner.translate(text, source, target).await,
        }
    }
}

/// Translate both place names into `locale` and format the date with `date_format`.
///
/// A failed translation keeps the original name; the site's suggestion list
/// then decides whether it is acceptable.
pub async fn localize(
    query: &Query,
    locale: Option<&str>,
    date_format: Option<&str>,
    translator: &dyn Translator,
) -> LocalizedQuery {
    let origin = query.origin.trim();
    let destination = query.destination.trim();

    let (origin, destination) = match locale {
        Some(target) => (
            translate_or_keep(translator, origin, target).await,
            translate_or_keep(translator, destination, target).await,
        ),
        None => (origin.to_string(), destination.to_string()),
    };

    let date = date_format
        .map(|fmt| query.date.format(fmt).to_string())
        .unwrap_or_default();

    LocalizedQuery {
        query: query.clone(),
        origin,
        destination,
        date,
    }
}

async fn translate_or_keep(translator: &dyn Translator, text: &str, target: &str) -> String {
    match translator.translate(text, Some("en"), target).await {
        Ok(t) if !t.trim().is_empty() => t.trim().to_string(),
        Ok(_) => text.to_string(),
        Err(e) => {
            warn!("Translation of {:?} to {} failed, keeping original: {}", text, target, e);
            text.to_string()
        }
    }
}
