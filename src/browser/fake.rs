//! Scripted in-memory page for pipeline tests.
//!
//! Every locator a test expects to be found must be registered up front;
//! anything unregistered behaves like a selector that never appears.

use super::{BrowserError, BrowserPage, BrowserResult, Key, Locator};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct State {
    present: HashSet<Locator>,
    texts: HashMap<Locator, Vec<String>>,
    rows: HashMap<Locator, Vec<Vec<String>>>,
    fields: HashMap<Locator, Vec<Vec<Option<String>>>>,
    options: HashMap<String, Vec<(String, String)>>,
    reveals: HashMap<Locator, (usize, Locator)>,
    late: HashSet<Locator>,
    fail_goto: bool,
    visited: Vec<String>,
    typed: Vec<(Locator, String)>,
    clicks: Vec<Locator>,
    keys: Vec<Key>,
    selected: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FakePage {
    state: Mutex<State>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with(self, locator: Locator) -> Self {
        self.with_state(|s| {
            s.present.insert(locator);
        })
    }

    pub fn with_css(self, css: &str) -> Self {
        self.with(Locator::css(css))
    }

    pub fn with_xpath(self, xpath: &str) -> Self {
        self.with(Locator::xpath(xpath))
    }

    pub fn with_texts(self, locator: Locator, texts: &[&str]) -> Self {
        self.with_state(|s| {
            s.present.insert(locator.clone());
            s.texts
                .insert(locator, texts.iter().map(|t| t.to_string()).collect());
        })
    }

    pub fn with_rows(self, row: Locator, rows: Vec<Vec<&str>>) -> Self {
        self.with_state(|s| {
            s.present.insert(row.clone());
            s.rows.insert(
                row,
                rows.into_iter()
                    .map(|r| r.into_iter().map(String::from).collect())
                    .collect(),
            );
        })
    }

    pub fn with_fields(self, row: Locator, rows: Vec<Vec<Option<&str>>>) -> Self {
        self.with_state(|s| {
            s.present.insert(row.clone());
            s.fields.insert(
                row,
                rows.into_iter()
                    .map(|r| r.into_iter().map(|f| f.map(String::from)).collect())
                    .collect(),
            );
        })
    }

    pub fn with_options(self, css: &str, options: &[(&str, &str)]) -> Self {
        self.with_state(|s| {
            s.present.insert(Locator::css(css));
            s.options.insert(
                css.to_string(),
                options
                    .iter()
                    .map(|(v, t)| (v.to_string(), t.to_string()))
                    .collect(),
            );
        })
    }

    /// `revealed` becomes present once `trigger` has been clicked `clicks` times.
    pub fn reveal_after_clicks(self, trigger: Locator, clicks: usize, revealed: Locator) -> Self {
        self.with_state(|s| {
            s.present.insert(trigger.clone());
            s.reveals.insert(trigger, (clicks, revealed));
        })
    }

    /// `locator` renders slowly: `exists` and `click` miss it until a
    /// `wait_for` has waited it out.
    pub fn render_late(self, locator: Locator) -> Self {
        self.with_state(|s| {
            s.late.insert(locator);
        })
    }

    pub fn failing_goto(self) -> Self {
        self.with_state(|s| s.fail_goto = true)
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn typed(&self) -> Vec<(Locator, String)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn typed_into(&self, locator: &Locator) -> Vec<String> {
        self.typed()
            .into_iter()
            .filter(|(l, _)| l == locator)
            .map(|(_, t)| t)
            .collect()
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn keys(&self) -> Vec<Key> {
        self.state.lock().unwrap().keys.clone()
    }

    pub fn selected(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().selected.clone()
    }

    fn visible(&self, locator: &Locator) -> bool {
        let s = self.state.lock().unwrap();
        s.present.contains(locator) && !s.late.contains(locator)
    }

    fn require(&self, locator: &Locator) -> BrowserResult<()> {
        if self.visible(locator) {
            Ok(())
        } else {
            Err(BrowserError::NotFound(locator.to_string()))
        }
    }

    fn record_click(&self, locator: &Locator) {
        let mut s = self.state.lock().unwrap();
        s.clicks.push(locator.clone());
        let revealed = match s.reveals.get_mut(locator) {
            Some((remaining, target)) => {
                *remaining = remaining.saturating_sub(1);
                (*remaining == 0).then(|| target.clone())
            }
            None => None,
        };
        if let Some(target) = revealed {
            s.present.insert(target);
        }
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> BrowserResult<()> {
        let mut s = self.state.lock().unwrap();
        s.visited.push(url.to_string());
        if s.fail_goto {
            Err(BrowserError::Navigation(url.to_string()))
        } else {
            Ok(())
        }
    }

    async fn wait_for(&self, locator: &Locator, _timeout: Duration) -> BrowserResult<()> {
        {
            let mut s = self.state.lock().unwrap();
            if s.present.contains(locator) {
                s.late.remove(locator);
            }
        }
        self.require(locator)
            .map_err(|_| BrowserError::Timeout(locator.to_string()))
    }

    async fn exists(&self, locator: &Locator) -> BrowserResult<bool> {
        Ok(self.visible(locator))
    }

    async fn click(&self, locator: &Locator) -> BrowserResult<()> {
        self.require(locator)?;
        self.record_click(locator);
        Ok(())
    }

    async fn js_click(&self, css: &str) -> BrowserResult<()> {
        let locator = Locator::css(css);
        self.require(&locator)?;
        self.record_click(&locator);
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> BrowserResult<()> {
        self.require(locator)
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> BrowserResult<()> {
        self.require(locator)?;
        self.state
            .lock()
            .unwrap()
            .typed
            .push((locator.clone(), text.to_string()));
        Ok(())
    }

    async fn press_key(&self, locator: &Locator, key: Key) -> BrowserResult<()> {
        self.require(locator)?;
        self.state.lock().unwrap().keys.push(key);
        Ok(())
    }

    async fn remove_attribute(&self, _css: &str, _attribute: &str) -> BrowserResult<()> {
        Ok(())
    }

    async fn select_value(&self, css: &str, value: &str) -> BrowserResult<()> {
        let mut s = self.state.lock().unwrap();
        let found = s
            .options
            .get(css)
            .map(|opts| opts.iter().any(|(v, _)| v == value))
            .unwrap_or(false);
        if !found {
            return Err(BrowserError::NotFound(format!("css={} option={}", css, value)));
        }
        s.selected.push((css.to_string(), value.to_string()));
        Ok(())
    }

    async fn select_text(&self, css: &str, text: &str) -> BrowserResult<bool> {
        let mut s = self.state.lock().unwrap();
        let value = s
            .options
            .get(css)
            .and_then(|opts| opts.iter().find(|(_, t)| t.contains(text)))
            .map(|(v, _)| v.clone());
        match value {
            Some(v) => {
                s.selected.push((css.to_string(), v));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn texts(&self, locator: &Locator) -> BrowserResult<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .texts
            .get(locator)
            .cloned()
            .unwrap_or_default())
    }

    async fn rows(&self, row: &Locator, _cell: &Locator) -> BrowserResult<Vec<Vec<String>>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .rows
            .get(row)
            .cloned()
            .unwrap_or_default())
    }

    async fn row_fields(
        &self,
        row: &Locator,
        _fields: &[Locator],
    ) -> BrowserResult<Vec<Vec<Option<String>>>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .fields
            .get(row)
            .cloned()
            .unwrap_or_default())
    }
}
