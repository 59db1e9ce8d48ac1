//! Interaction building blocks shared by the site pipelines.

use super::{PhaseError, PhaseResult, Timeouts};
use crate::browser::{BrowserPage, Key, Locator};
use std::time::Duration;
use tracing::{debug, warn};

/// Quote `s` as an XPath string literal, whatever quotes it contains.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('"') {
        format!("\"{}\"", s)
    } else if !s.contains('\'') {
        format!("'{}'", s)
    } else {
        let parts: Vec<String> = s.split('"').map(|p| format!("\"{}\"", p)).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// Wait for `locator`, mapping a timeout to `SelectorNotFound`.
pub async fn require(page: &dyn BrowserPage, locator: &Locator, t: &Timeouts) -> PhaseResult<()> {
    page.wait_for(locator, t.element)
        .await
        .map_err(|_| PhaseError::SelectorNotFound {
            what: locator.to_string(),
        })
}

/// Type into an autocomplete input and click the suggestion that appears.
///
/// A missing input is only logged: some sites render it late, and a
/// suggestion that never shows up is the failure that counts.
pub async fn type_and_pick(
    page: &dyn BrowserPage,
    input: &Locator,
    text: &str,
    suggestion: &Locator,
    t: &Timeouts,
    field: &'static str,
) -> PhaseResult<()> {
    if let Err(e) = require(page, input, t).await {
        warn!("{} input: {}", field, e);
    }
    if let Err(e) = page.click(input).await {
        debug!("focusing {} input failed: {}", field, e);
    }
    if let Err(e) = page.clear(input).await {
        debug!("clearing {} input failed: {}", field, e);
    }
    if let Err(e) = page.type_text(input, text).await {
        debug!("typing {} failed: {}", field, e);
    }

    let no_match = || PhaseError::NoMatchingSuggestion {
        field,
        value: text.to_string(),
    };
    page.wait_for(suggestion, t.suggestion)
        .await
        .map_err(|_| no_match())?;
    page.click(suggestion).await.map_err(|_| no_match())
}

/// Type into an input and confirm the highlighted entry with `keys`.
/// Used by dropdowns that filter as you type but render no clickable list.
pub async fn type_and_confirm(
    page: &dyn BrowserPage,
    input: &Locator,
    text: &str,
    keys: &[Key],
    t: &Timeouts,
    field: &'static str,
) -> PhaseResult<()> {
    page.wait_for(input, t.suggestion)
        .await
        .map_err(|_| PhaseError::NoMatchingSuggestion {
            field,
            value: text.to_string(),
        })?;
    page.type_text(input, text).await?;
    for key in keys {
        page.press_key(input, *key).await?;
    }
    Ok(())
}

/// Overwrite a (possibly read-only) text input, optionally pressing Enter.
pub async fn clear_and_type(
    page: &dyn BrowserPage,
    css: &str,
    text: &str,
    press_enter: bool,
    t: &Timeouts,
) -> PhaseResult<()> {
    let input = Locator::css(css);
    require(page, &input, t).await?;
    page.remove_attribute(css, "readonly").await?;
    page.clear(&input).await?;
    page.type_text(&input, text).await?;
    if press_enter {
        page.press_key(&input, Key::Enter).await?;
    }
    Ok(())
}

/// Same as `clear_and_type` for inputs only reachable by XPath.
pub async fn clear_and_type_at(
    page: &dyn BrowserPage,
    input: &Locator,
    text: &str,
    t: &Timeouts,
) -> PhaseResult<()> {
    require(page, input, t).await?;
    page.clear(input).await?;
    page.type_text(input, text).await?;
    Ok(())
}

/// Pick the `<option>` of a `<select>` whose label contains `text`.
pub async fn select_option_text(
    page: &dyn BrowserPage,
    css: &str,
    text: &str,
    field: &'static str,
    t: &Timeouts,
) -> PhaseResult<()> {
    require(page, &Locator::css(css), t).await?;
    if page.select_text(css, text).await? {
        Ok(())
    } else {
        Err(PhaseError::NoMatchingSuggestion {
            field,
            value: text.to_string(),
        })
    }
}

/// Wait for the results container.
pub async fn wait_results(page: &dyn BrowserPage, container: &Locator, t: &Timeouts) -> PhaseResult<()> {
    page.wait_for(container, t.results)
        .await
        .map_err(|e| PhaseError::ResultsTimeout(e.to_string()))
}

/// Longest wait for a calendar day after each month turn.
pub const CALENDAR_WAIT: Duration = Duration::from_secs(1);

/// Advance a month-paged calendar until `day` is on screen, then click it.
/// Each page gets up to `wait` to render the day before the next turn.
pub async fn page_calendar(
    page: &dyn BrowserPage,
    day: &Locator,
    next: &Locator,
    max_pages: u32,
    wait: Duration,
    date: &str,
) -> PhaseResult<()> {
    let exhausted = |pages: u32| PhaseError::CalendarExhausted {
        date: date.to_string(),
        pages,
    };
    for turned in 0..=max_pages {
        if page.wait_for(day, wait).await.is_ok() {
            debug!("calendar day found after {} pages", turned);
            return page.click(day).await.map_err(|e| {
                warn!("calendar day {} shown but not clickable: {}", date, e);
                exhausted(turned)
            });
        }
        if turned == max_pages || page.click(next).await.is_err() {
            break;
        }
    }
    Err(exhausted(max_pages))
}

/// Click a "load more" control until it disappears or `max_clicks` is hit.
pub async fn click_while_present(page: &dyn BrowserPage, button: &Locator, max_clicks: usize) -> usize {
    let mut clicks = 0;
    while clicks < max_clicks {
        match page.exists(button).await {
            Ok(true) => {}
            _ => break,
        }
        if page.click(button).await.is_err() {
            break;
        }
        clicks += 1;
    }
    clicks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;

    const T: Timeouts = Timeouts::from_millis(5, 5, 5, 5);

    #[test]
    fn test_xpath_literal() {
        assert_eq!(xpath_literal("Ереван"), r#""Ереван""#);
        assert_eq!(xpath_literal(r#"say "hi""#), r#"'say "hi"'"#);
        assert_eq!(
            xpath_literal(r#"it's "x""#),
            r#"concat("it's ", '"', "x", '"', "")"#
        );
    }

    #[tokio::test]
    async fn test_type_and_pick() {
        let input = Locator::css("#from");
        let hit = Locator::xpath("//li[1]");
        let page = FakePage::new().with(input.clone()).with(hit.clone());

        type_and_pick(&page, &input, "Riga", &hit, &T, "origin").await.unwrap();
        assert_eq!(page.typed_into(&input), vec!["Riga"]);
        assert_eq!(page.clicks().last(), Some(&hit));
    }

    #[tokio::test]
    async fn test_type_and_pick_without_suggestion() {
        let input = Locator::css("#from");
        let page = FakePage::new().with(input.clone());
        let err = type_and_pick(&page, &input, "Atlantis", &Locator::xpath("//li"), &T, "origin")
            .await
            .unwrap_err();
        assert!(matches!(err, PhaseError::NoMatchingSuggestion { field: "origin", ref value } if value == "Atlantis"));
    }

    #[tokio::test]
    async fn test_clear_and_type_with_enter() {
        let page = FakePage::new().with_css("#date");
        clear_and_type(&page, "#date", "15.03.2021", true, &T).await.unwrap();
        assert_eq!(page.keys(), vec![Key::Enter]);

        let err = clear_and_type(&FakePage::new(), "#date", "x", false, &T).await.unwrap_err();
        assert!(matches!(err, PhaseError::SelectorNotFound { .. }));
    }

    #[tokio::test]
    async fn test_select_option_text() {
        let page = FakePage::new().with_options("#From", &[("11", "Гюмри"), ("12", "Ереван")]);
        select_option_text(&page, "#From", "Ереван", "origin", &T).await.unwrap();
        assert_eq!(page.selected(), vec![("#From".to_string(), "12".to_string())]);

        let err = select_option_text(&page, "#From", "Ванадзор", "origin", &T).await.unwrap_err();
        assert!(matches!(err, PhaseError::NoMatchingSuggestion { .. }));
    }

    #[tokio::test]
    async fn test_page_calendar_finds_day_after_paging() {
        let next = Locator::xpath("//next");
        let day = Locator::xpath("//div[@data-full=\"2021-5-3\"]");
        let page = FakePage::new().reveal_after_clicks(next.clone(), 2, day.clone());

        page_calendar(&page, &day, &next, 12, T.element, "2021-5-3").await.unwrap();
        let clicks = page.clicks();
        assert_eq!(clicks.iter().filter(|l| **l == next).count(), 2);
        assert_eq!(clicks.last(), Some(&day));
    }

    #[tokio::test]
    async fn test_page_calendar_gives_up() {
        let next = Locator::xpath("//next");
        let day = Locator::xpath("//day");
        let page = FakePage::new().reveal_after_clicks(next.clone(), 5, day.clone());

        let err = page_calendar(&page, &day, &next, 3, T.element, "2030-1-1").await.unwrap_err();
        assert!(matches!(err, PhaseError::CalendarExhausted { pages: 3, .. }));
        assert_eq!(page.clicks().len(), 3);
    }

    #[tokio::test]
    async fn test_page_calendar_waits_for_slow_month() {
        let next = Locator::xpath("//next");
        let day = Locator::xpath("//div[@data-full=\"2021-6-1\"]");
        let page = FakePage::new()
            .reveal_after_clicks(next.clone(), 1, day.clone())
            .render_late(day.clone());

        page_calendar(&page, &day, &next, 12, CALENDAR_WAIT, "2021-6-1").await.unwrap();
        assert_eq!(page.clicks(), vec![next, day]);
    }

    #[tokio::test]
    async fn test_type_and_pick_without_input_still_tries_suggestion() {
        let input = Locator::css("#from");
        let hit = Locator::xpath("//li[1]");
        let page = FakePage::new().with(hit.clone());

        type_and_pick(&page, &input, "Riga", &hit, &T, "origin").await.unwrap();
        assert_eq!(page.clicks(), vec![hit]);
    }

    #[tokio::test]
    async fn test_click_while_present_is_bounded() {
        let more = Locator::css(".later");
        let page = FakePage::new().with(more.clone());
        assert_eq!(click_while_present(&page, &more, 4).await, 4);
        assert_eq!(click_while_present(&FakePage::new(), &more, 4).await, 0);
    }
}
