use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Query ─────────────────────────────────────────────────────────────────────

/// One unit of work: a single origin → destination search for one date.
///
/// The id fields and the batch fields (`order`, `hash_id`, `total_size`) are
/// opaque here; they only exist so the aggregator can put splits back together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub country_id: Option<i64>,
    pub origin: String,
    pub origin_id: Option<i64>,
    pub destination: String,
    pub destination_id: Option<i64>,
    pub date: NaiveDate,
    pub order: Option<i64>,
    pub hash_id: Option<String>,
    pub total_size: Option<i64>,
}

/// A query with its place names translated and its date formatted for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedQuery {
    pub query: Query,
    pub origin: String,
    pub destination: String,
    /// Date in the site's widget format. Empty when the site takes no date.
    pub date: String,
}

#[cfg(test)]
impl LocalizedQuery {
    /// Untranslated query with the date in ISO format.
    pub fn passthrough(query: &Query) -> Self {
        Self {
            origin: query.origin.trim().to_string(),
            destination: query.destination.trim().to_string(),
            date: query.date.format("%Y-%m-%d").to_string(),
            query: query.clone(),
        }
    }
}

// ── Tickets ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub date: NaiveDate,
    pub departure_time: String,
    /// `None` for timetable-only sites that publish departures only.
    pub arrival_time: Option<String>,
    pub price: f64,
    pub currency: String,
}

/// Text scraped from one result row, before any cleanup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTicket {
    pub departure: String,
    pub arrival: Option<String>,
    pub price: String,
}

impl RawTicket {
    pub fn new(departure: impl Into<String>, arrival: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            departure: departure.into(),
            arrival: Some(arrival.into()),
            price: price.into(),
        }
    }
}

// ── Envelope ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Status {
    Ok,
    NoData,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NoData => 400,
        }
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        s.code()
    }
}

impl TryFrom<u16> for Status {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(Status::Ok),
            400 => Ok(Status::NoData),
            other => Err(format!("unknown status code {}", other)),
        }
    }
}

/// What one pipeline run hands back to the aggregator. All or nothing:
/// either every scraped row, or no rows at all with `NoData`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultEnvelope {
    pub status: Status,
    pub data: Vec<Ticket>,
    pub country_id: Option<i64>,
    pub origin_id: Option<i64>,
    pub destination_id: Option<i64>,
    pub total_size: Option<i64>,
    pub order: Option<i64>,
    pub hash_id: Option<String>,
}

impl ResultEnvelope {
    /// Envelope carrying `tickets`. An empty list still yields `NoData`.
    pub fn success(query: &Query, tickets: Vec<Ticket>) -> Self {
        if tickets.is_empty() {
            return Self::no_data(query);
        }
        Self::echo(query, Status::Ok, tickets)
    }

    pub fn no_data(query: &Query) -> Self {
        Self::echo(query, Status::NoData, Vec::new())
    }

    fn echo(query: &Query, status: Status, data: Vec<Ticket>) -> Self {
        Self {
            status,
            data,
            country_id: query.country_id,
            origin_id: query.origin_id,
            destination_id: query.destination_id,
            total_size: query.total_size,
            order: query.order,
            hash_id: query.hash_id.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

#[cfg(test)]
pub(crate) fn sample_query() -> Query {
    Query {
        country_id: Some(7),
        origin: "Gyumri".into(),
        origin_id: Some(3),
        destination: "Yerevan".into(),
        destination_id: Some(5),
        date: NaiveDate::from_ymd_opt(2021, 3, 15).expect("valid date"),
        order: Some(0),
        hash_id: Some("abc".into()),
        total_size: Some(1),
    }
}
