use super::{CollaboratorError, Translator};
use crate::scraper::HttpClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Google's public translate endpoint (the one the web widget uses).
pub struct GoogleTranslator {
    http: Arc<HttpClient>,
}

impl GoogleTranslator {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    fn request_url(text: &str, source: Option<&str>, target: &str) -> Result<Url, CollaboratorError> {
        Url::parse_with_params(
            ENDPOINT,
            &[
                ("client", "gtx"),
                ("sl", source.unwrap_or("auto")),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ],
        )
        .map_err(|e| CollaboratorError::Parse(e.to_string()))
    }
}

/// Response is `[[["<translated>", "<source>", ...], ...], ...]`; the translation
/// is every segment's first element, concatenated.
fn parse_response(body: &str) -> Result<String, CollaboratorError> {
    let v: serde_json::Value =
        serde_json::from_str(body).map_err(|e| CollaboratorError::Parse(e.to_string()))?;
    let segments = v
        .get(0)
        .and_then(|s| s.as_array())
        .ok_or_else(|| CollaboratorError::Parse("no segments".into()))?;
    let text: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() {
        return Err(CollaboratorError::Parse("empty translation".into()));
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<String, CollaboratorError> {
        let url = Self::request_url(text, source, target)?;
        let body = self.http.get_text(url.as_str()).await?;
        let out = parse_response(&body)?;
        debug!("translated {:?} → {:?} ({})", text, out, target);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let body = r#"[[["Ереван","Yerevan",null,null,10]],null,"en",null,null,null,null,[]]"#;
        assert_eq!(parse_response(body).unwrap(), "Ереван");

        let multi = r#"[[["Санкт-","Saint ",null],["Петербург","Petersburg",null]],null,"en"]"#;
        assert_eq!(parse_response(multi).unwrap(), "Санкт-Петербург");
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(parse_response("<html>").is_err());
        assert!(parse_response("[null]").is_err());
        assert!(parse_response(r#"[[["",""]]]"#).is_err());
    }

    #[test]
    fn test_request_url_encodes_text() {
        let url = GoogleTranslator::request_url("Nizhny Novgorod", Some("en"), "ru").unwrap();
        let s = url.as_str();
        assert!(s.starts_with(ENDPOINT));
        assert!(s.contains("tl=ru"));
        assert!(s.contains("q=Nizhny+Novgorod"));
    }
}
