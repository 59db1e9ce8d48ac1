use chrono::{NaiveDateTime, Utc};
use std::time::{Duration, Instant};
use tracing::info;

/// Wall-clock timer for CLI commands; logs the elapsed time when dropped.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!(task = %label, "started");
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(task = %self.label, took = ?self.start.elapsed(), "finished");
    }
}

/// Format an integer with thousands separators.
pub fn fmt_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// How long ago a UTC timestamp was, coarsely: `3d 4h`, `2h 5m`, `40s`.
pub fn fmt_age(at: NaiveDateTime) -> String {
    fmt_age_at(at, Utc::now().naive_utc())
}

fn fmt_age_at(at: NaiveDateTime, now: NaiveDateTime) -> String {
    let secs = (now - at).num_seconds().max(0);
    let (d, h, m) = (secs / 86_400, secs % 86_400 / 3_600, secs % 3_600 / 60);
    match (d, h, m) {
        (0, 0, 0) => format!("{}s", secs),
        (0, 0, m) => format!("{}m", m),
        (0, h, m) => format!("{}h {}m", h, m),
        (d, h, _) => format!("{}d {}h", d, h),
    }
}
