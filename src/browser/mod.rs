//! Headless-browser page abstraction.
//!
//! Pipelines only ever see `&dyn BrowserPage`; they borrow a page the caller
//! created and never open or close one themselves.

pub mod webdriver;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use self::webdriver::WebDriverPage;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Timeout waiting for {0}")]
    Timeout(String),
    #[error("Element not found: {0}")]
    NotFound(String),
    #[error("Script error: {0}")]
    Script(String),
    #[error("Driver error: {0}")]
    Driver(String),
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// How to find an element. Most sites mix CSS and XPath freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(s: impl Into<String>) -> Self {
        Locator::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Locator::XPath(s.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    ArrowUp,
    ArrowDown,
}

impl Key {
    /// WebDriver key code point.
    pub fn code_point(self) -> char {
        match self {
            Key::Backspace => '\u{E003}',
            Key::Enter => '\u{E007}',
            Key::ArrowUp => '\u{E013}',
            Key::ArrowDown => '\u{E015}',
        }
    }
}

#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// Wait until `locator` matches a displayed element.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> BrowserResult<()>;

    async fn exists(&self, locator: &Locator) -> BrowserResult<bool>;

    async fn click(&self, locator: &Locator) -> BrowserResult<()>;

    /// `document.querySelector(css).click()`, for elements covered by overlays.
    async fn js_click(&self, css: &str) -> BrowserResult<()>;

    async fn clear(&self, locator: &Locator) -> BrowserResult<()>;

    async fn type_text(&self, locator: &Locator, text: &str) -> BrowserResult<()>;

    async fn press_key(&self, locator: &Locator, key: Key) -> BrowserResult<()>;

    async fn remove_attribute(&self, css: &str, attribute: &str) -> BrowserResult<()>;

    async fn select_value(&self, css: &str, value: &str) -> BrowserResult<()>;

    /// Select the first `<option>` whose text contains `text`. `false` when none does.
    async fn select_text(&self, css: &str, text: &str) -> BrowserResult<bool>;

    /// Text content of every match, in document order.
    async fn texts(&self, locator: &Locator) -> BrowserResult<Vec<String>>;

    /// Cell texts of every row, grouped by row.
    async fn rows(&self, row: &Locator, cell: &Locator) -> BrowserResult<Vec<Vec<String>>>;

    /// For every row, the text of the first match of each field locator inside it.
    async fn row_fields(
        &self,
        row: &Locator,
        fields: &[Locator],
    ) -> BrowserResult<Vec<Vec<Option<String>>>>;
}
