use ::scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::warn;

// ── Static route tables ───────────────────────────────────────────────────────

/// One row of a published route/timetable page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteRow {
    pub route: String,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub price: Option<String>,
}

fn sel(s: &str) -> Option<Selector> {
    match Selector::parse(s) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!("bad selector {:?}: {:?}", s, e);
            None
        }
    }
}

fn cell_text(el: ElementRef<'_>) -> String {
    super::cleaner::clean_text(&el.text().collect::<String>())
}

struct Columns {
    route: usize,
    departure: Option<usize>,
    arrival: Option<usize>,
    price: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &[String]) -> Option<Self> {
        let find = |keys: &[&str]| {
            headers
                .iter()
                .position(|h| keys.iter().any(|k| h.contains(k)))
        };
        let route = find(&["маршрут", "route", "направлен"])?;
        Some(Self {
            route,
            departure: find(&["отправ", "depart", "время", "time"]),
            arrival: find(&["прибыт", "arriv"]),
            price: find(&["стоим", "цена", "price", "сом", "fare"]),
        })
    }

    /// Layout of the bus station's routes table when it has no usable header:
    /// No | Route | Departure | Price
    fn positional() -> Self {
        Self {
            route: 1,
            departure: Some(2),
            arrival: None,
            price: Some(3),
        }
    }
}

/// Parse every route row out of a routes page.
///
/// Tables are tried in document order; the first one with a recognisable
/// "route" header wins. Failing that, the second table on the page is read
/// positionally, which is where the bus station puts its timetable.
pub fn parse_route_table(html: &str) -> Vec<RouteRow> {
    let doc = Html::parse_document(html);
    let (Some(table_sel), Some(th_sel), Some(tr_sel), Some(td_sel)) =
        (sel("table"), sel("th"), sel("tr"), sel("td"))
    else {
        return vec![];
    };

    let tables: Vec<ElementRef<'_>> = doc.select(&table_sel).collect();

    let chosen = tables.iter().find_map(|table| {
        let headers: Vec<String> = table
            .select(&th_sel)
            .map(|th| cell_text(th).to_lowercase())
            .collect();
        Columns::from_headers(&headers).map(|cols| (*table, cols))
    });

    let (table, cols) = match chosen {
        Some(found) => found,
        None => match tables.get(1).or_else(|| tables.first()) {
            Some(t) => (*t, Columns::positional()),
            None => return vec![],
        },
    };

    let mut rows = Vec::new();
    for tr in table.select(&tr_sel) {
        let cells: Vec<String> = tr.select(&td_sel).map(cell_text).collect();
        if cells.is_empty() || cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let Some(route) = cells.get(cols.route).filter(|r| !r.is_empty()) else {
            continue;
        };
        let pick = |idx: Option<usize>| {
            idx.and_then(|i| cells.get(i))
                .filter(|s| !s.is_empty())
                .cloned()
        };
        rows.push(RouteRow {
            route: route.clone(),
            departure: pick(cols.departure),
            arrival: pick(cols.arrival),
            price: pick(cols.price),
        });
    }
    rows
}

/// Route names on the station's site join both ends with a dash of some kind.
/// City names may carry their own hyphen, so every dash is tried as the join.
pub fn route_matches(route: &str, origin: &str, destination: &str) -> bool {
    let norm = |s: &str| s.trim().to_lowercase();
    let route = norm(route);
    let (origin, destination) = (norm(origin), norm(destination));
    route
        .match_indices(|c: char| matches!(c, '–' | '—' | '-'))
        .any(|(at, dash)| {
            route[..at].trim() == origin && route[at + dash.len()..].trim() == destination
        })
}

// ── ECB reference rates ───────────────────────────────────────────────────────

/// Units per 1 EUR from the ECB daily reference feed. EUR itself is included.
pub fn parse_ecb_rates(xml: &str) -> HashMap<String, f64> {
    let doc = Html::parse_document(xml);
    let mut rates = HashMap::new();
    let Some(cube) = sel("cube[currency][rate]") else {
        return rates;
    };
    for el in doc.select(&cube) {
        let v = el.value();
        let (Some(code), Some(rate)) = (v.attr("currency"), v.attr("rate")) else {
            continue;
        };
        match rate.trim().parse::<f64>() {
            Ok(r) if r > 0.0 => {
                rates.insert(code.trim().to_uppercase(), r);
            }
            _ => warn!("ECB feed: bad rate {:?} for {}", rate, code),
        }
    }
    if !rates.is_empty() {
        rates.insert("EUR".to_string(), 1.0);
    }
    rates
}
