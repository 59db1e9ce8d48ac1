use super::CollaboratorError;
use crate::scraper::parsers::parse_ecb_rates;
use crate::scraper::HttpClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

const ECB_DAILY: &str = "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-daily.xml";

#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64, CollaboratorError>;
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Convert through EUR using a table of units-per-EUR.
fn cross_convert(
    per_eur: &HashMap<String, f64>,
    amount: f64,
    from: &str,
    to: &str,
) -> Result<f64, CollaboratorError> {
    let from = from.trim().to_uppercase();
    let to = to.trim().to_uppercase();
    if from == to {
        return Ok(amount);
    }
    let rate = |code: &String| {
        per_eur
            .get(code)
            .copied()
            .filter(|r| *r > 0.0)
            .ok_or_else(|| CollaboratorError::UnknownCurrency(code.clone()))
    };
    Ok(round2(amount / rate(&from)? * rate(&to)?))
}

/// Static rates from configuration.
pub struct FixedRateConverter {
    per_eur: HashMap<String, f64>,
}

impl FixedRateConverter {
    pub fn new(rates: &HashMap<String, f64>) -> Self {
        let mut per_eur: HashMap<String, f64> = rates
            .iter()
            .map(|(k, v)| (k.trim().to_uppercase(), *v))
            .collect();
        per_eur.entry("EUR".to_string()).or_insert(1.0);
        Self { per_eur }
    }
}

#[async_trait]
impl CurrencyConverter for FixedRateConverter {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64, CollaboratorError> {
        cross_convert(&self.per_eur, amount, from, to)
    }
}

/// ECB daily reference rates, fetched once per process on first use.
pub struct EcbRateConverter {
    http: Arc<HttpClient>,
    rates: OnceCell<HashMap<String, f64>>,
}

impl EcbRateConverter {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            rates: OnceCell::new(),
        }
    }

    async fn rates(&self) -> Result<&HashMap<String, f64>, CollaboratorError> {
        self.rates
            .get_or_try_init(|| async {
                let xml = self.http.get_text(ECB_DAILY).await?;
                let rates = parse_ecb_rates(&xml);
                if rates.is_empty() {
                    return Err(CollaboratorError::Parse("ECB feed had no rates".into()));
                }
                info!("Loaded {} ECB reference rates", rates.len());
                Ok(rates)
            })
            .await
    }
}

#[async_trait]
impl CurrencyConverter for EcbRateConverter {
    async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64, CollaboratorError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }
        cross_convert(self.rates().await?, amount, from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> FixedRateConverter {
        let rates: HashMap<String, f64> = [("amd".to_string(), 400.0), ("USD".to_string(), 1.25)]
            .into_iter()
            .collect();
        FixedRateConverter::new(&rates)
    }

    #[tokio::test]
    async fn test_fixed_conversion_via_eur() {
        let c = fixed();
        assert_eq!(c.convert(1200.0, "AMD", "EUR").await.unwrap(), 3.0);
        assert_eq!(c.convert(10.0, "EUR", "usd").await.unwrap(), 12.5);
        assert_eq!(c.convert(1000.0, "AMD", "USD").await.unwrap(), 3.13);
    }

    #[tokio::test]
    async fn test_same_currency_is_identity() {
        assert_eq!(fixed().convert(99.99, "XYZ", "xyz").await.unwrap(), 99.99);
    }

    #[tokio::test]
    async fn test_unknown_currency_errors() {
        let err = fixed().convert(1.0, "KES", "EUR").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::UnknownCurrency(c) if c == "KES"));
    }
}
