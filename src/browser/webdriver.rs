use super::{BrowserError, BrowserPage, BrowserResult, Key, Locator};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thirtyfour::prelude::*;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A single WebDriver session (chromedriver, geckodriver, selenium grid).
pub struct WebDriverPage {
    driver: WebDriver,
}

impl WebDriverPage {
    pub async fn connect(config: &BrowserConfig) -> BrowserResult<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.set_headless().map_err(driver_err)?;
        }
        caps.add_chrome_arg(&format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        ))
        .map_err(driver_err)?;
        for arg in &config.args {
            caps.add_chrome_arg(arg).map_err(driver_err)?;
        }

        debug!("Opening WebDriver session at {}", config.webdriver_url);
        let driver = WebDriver::new(&config.webdriver_url, caps)
            .await
            .map_err(|e| BrowserError::Driver(format!("{}: {}", config.webdriver_url, e)))?;
        Ok(Self { driver })
    }

    pub async fn quit(self) -> BrowserResult<()> {
        self.driver.quit().await.map_err(driver_err)
    }

    async fn first(&self, locator: &Locator) -> BrowserResult<WebElement> {
        self.driver
            .find(to_by(locator))
            .await
            .map_err(|_| BrowserError::NotFound(locator.to_string()))
    }

    async fn run_script(&self, script: &str, args: Vec<serde_json::Value>) -> BrowserResult<serde_json::Value> {
        let ret = self
            .driver
            .execute(script, args)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        ret.convert::<serde_json::Value>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

fn to_by(locator: &Locator) -> By {
    match locator {
        Locator::Css(s) => By::Css(s),
        Locator::XPath(s) => By::XPath(s),
    }
}

fn driver_err(e: WebDriverError) -> BrowserError {
    BrowserError::Driver(e.to_string())
}

async fn content_of(el: &WebElement) -> BrowserResult<String> {
    match el.prop("textContent").await.map_err(driver_err)? {
        Some(text) => Ok(text),
        None => el.text().await.map_err(driver_err),
    }
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        match tokio::time::timeout(timeout, self.driver.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation(format!("{}: {}", url, e))),
            Err(_) => Err(BrowserError::Navigation(format!(
                "{}: no load within {:?}",
                url, timeout
            ))),
        }
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> BrowserResult<()> {
        self.driver
            .query(to_by(locator))
            .wait(timeout, POLL_INTERVAL)
            .and_displayed()
            .first()
            .await
            .map(|_| ())
            .map_err(|_| BrowserError::Timeout(locator.to_string()))
    }

    async fn exists(&self, locator: &Locator) -> BrowserResult<bool> {
        let found = self.driver.find_all(to_by(locator)).await.map_err(driver_err)?;
        Ok(!found.is_empty())
    }

    async fn click(&self, locator: &Locator) -> BrowserResult<()> {
        self.first(locator).await?.click().await.map_err(driver_err)
    }

    async fn js_click(&self, css: &str) -> BrowserResult<()> {
        let clicked = self
            .run_script(
                "const el = document.querySelector(arguments[0]); if (!el) { return false; } el.click(); return true;",
                vec![json!(css)],
            )
            .await?;
        if clicked.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(BrowserError::NotFound(format!("css={}", css)))
        }
    }

    async fn clear(&self, locator: &Locator) -> BrowserResult<()> {
        self.first(locator).await?.clear().await.map_err(driver_err)
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> BrowserResult<()> {
        self.first(locator)
            .await?
            .send_keys(text)
            .await
            .map_err(driver_err)
    }

    async fn press_key(&self, locator: &Locator, key: Key) -> BrowserResult<()> {
        self.first(locator)
            .await?
            .send_keys(key.code_point().to_string())
            .await
            .map_err(driver_err)
    }

    async fn remove_attribute(&self, css: &str, attribute: &str) -> BrowserResult<()> {
        self.run_script(
            "const el = document.querySelector(arguments[0]); if (el) { el.removeAttribute(arguments[1]); }",
            vec![json!(css), json!(attribute)],
        )
        .await
        .map(|_| ())
    }

    async fn select_value(&self, css: &str, value: &str) -> BrowserResult<()> {
        let ok = self
            .run_script(
                r#"const sel = document.querySelector(arguments[0]);
                   if (!sel) { return false; }
                   sel.value = arguments[1];
                   sel.dispatchEvent(new Event('change', { bubbles: true }));
                   return sel.value === arguments[1];"#,
                vec![json!(css), json!(value)],
            )
            .await?;
        if ok.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(BrowserError::NotFound(format!("css={} option={}", css, value)))
        }
    }

    async fn select_text(&self, css: &str, text: &str) -> BrowserResult<bool> {
        let ok = self
            .run_script(
                r#"const sel = document.querySelector(arguments[0]);
                   if (!sel) { return false; }
                   for (let i = 0; i < sel.options.length; i++) {
                       if (sel.options[i].textContent.includes(arguments[1])) {
                           sel.selectedIndex = i;
                           sel.dispatchEvent(new Event('change', { bubbles: true }));
                           return true;
                       }
                   }
                   return false;"#,
                vec![json!(css), json!(text)],
            )
            .await?;
        Ok(ok.as_bool().unwrap_or(false))
    }

    async fn texts(&self, locator: &Locator) -> BrowserResult<Vec<String>> {
        let elements = self.driver.find_all(to_by(locator)).await.map_err(driver_err)?;
        let mut out = Vec::with_capacity(elements.len());
        for el in &elements {
            out.push(content_of(el).await?);
        }
        Ok(out)
    }

    async fn rows(&self, row: &Locator, cell: &Locator) -> BrowserResult<Vec<Vec<String>>> {
        let rows = self.driver.find_all(to_by(row)).await.map_err(driver_err)?;
        let mut out = Vec::with_capacity(rows.len());
        for r in &rows {
            let cells = r.find_all(to_by(cell)).await.map_err(driver_err)?;
            let mut texts = Vec::with_capacity(cells.len());
            for c in &cells {
                texts.push(content_of(c).await?);
            }
            out.push(texts);
        }
        Ok(out)
    }

    async fn row_fields(
        &self,
        row: &Locator,
        fields: &[Locator],
    ) -> BrowserResult<Vec<Vec<Option<String>>>> {
        let rows = self.driver.find_all(to_by(row)).await.map_err(driver_err)?;
        let mut out = Vec::with_capacity(rows.len());
        for r in &rows {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let found = r.find_all(to_by(field)).await.map_err(driver_err)?;
                match found.first() {
                    Some(el) => values.push(Some(content_of(el).await?)),
                    None => values.push(None),
                }
            }
            out.push(values);
        }
        Ok(out)
    }
}
