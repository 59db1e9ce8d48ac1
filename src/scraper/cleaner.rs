
use crate::models::RawTicket;
use chrono::NaiveTime;

// ── Text ──────────────────────────────────────────────────────────────────────

/// Trim, turn non-breaking spaces into spaces and collapse whitespace runs.
pub fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        let ch = if ch == '\u{a0}' || ch == '\u{202f}' { ' ' } else { ch };
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

// ── Times ─────────────────────────────────────────────────────────────────────

/// First clock time in the text, as `HH:MM`. A dot separator only counts
/// when the text has no colon time, so "03.07 08:15" reads as 08:15.
/// "08:00:00" → "08:00" | "14.35 Hrs" → "14:35" | " 7:05\n" → "07:05"
pub fn parse_time(s: &str) -> Option<String> {
    let chars: Vec<char> = clean_text(s).chars().collect();
    first_time(&chars, ':').or_else(|| first_time(&chars, '.'))
}

fn first_time(chars: &[char], sep: char) -> Option<String> {
    for i in 0..chars.len() {
        if !chars[i].is_ascii_digit() || (i > 0 && chars[i - 1].is_ascii_digit()) {
            continue;
        }
        let mut j = i;
        while j < chars.len() && chars[j].is_ascii_digit() && j - i < 2 {
            j += 1;
        }
        if j >= chars.len() || chars[j] != sep {
            continue;
        }
        let minutes: String = chars[j + 1..].iter().take(2).collect();
        if minutes.len() != 2 || !minutes.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let hours: String = chars[i..j].iter().collect();
        let (Ok(h), Ok(m)) = (hours.parse::<u32>(), minutes.parse::<u32>()) else {
            continue;
        };
        if let Some(t) = NaiveTime::from_hms_opt(h, m, 0) {
            return Some(t.format("%H:%M").to_string());
        }
    }
    None
}

// ── Prices ────────────────────────────────────────────────────────────────────

/// Parse a price, whatever the locale's separators and currency decorations.
/// "1 200,50 драм" → 1200.5 | "1,200.50" → 1200.5 | "450TL" → 450 | "KSH 1,000" → 1000
pub fn parse_price(s: &str) -> Option<f64> {
    let s = clean_text(s);
    if s.is_empty() || s == "N/A" || s == "-" || s == "—" {
        return None;
    }

    let start = s.find(|c: char| c.is_ascii_digit())?;
    let token: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | ' ' | '\''))
        .collect();
    let token = token.trim_end_matches(|c: char| !c.is_ascii_digit());
    let token: String = token.chars().filter(|c| *c != ' ' && *c != '\'').collect();

    let normalized = match (token.rfind(','), token.rfind('.')) {
        // Both present: whichever comes last is the decimal mark.
        (Some(c), Some(d)) if c > d => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (Some(c), None) => {
            if token.matches(',').count() == 1 && (1..=2).contains(&(token.len() - c - 1)) {
                token.replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (None, Some(d)) => {
            if token.matches('.').count() == 1 && token.len() - d - 1 != 3 {
                token
            } else {
                token.replace('.', "")
            }
        }
        (None, None) => token,
    };

    normalized.parse().ok()
}

// ── Rows ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub departure: String,
    pub arrival: Option<String>,
    pub price: f64,
}

/// Clean one scraped row. On failure, names the field that would not parse.
pub fn clean_row(raw: &RawTicket) -> Result<CleanRow, &'static str> {
    let departure = parse_time(&raw.departure).ok_or("departure_time")?;
    let arrival = match &raw.arrival {
        Some(text) => Some(parse_time(text).ok_or("arrival_time")?),
        None => None,
    };
    let price = parse_price(&raw.price).ok_or("price")?;
    Ok(CleanRow {
        departure,
        arrival,
        price,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
