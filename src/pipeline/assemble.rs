//! Turning scraped text into `RawTicket`s.
//!
//! Sites expose results in one of three shapes: a row per departure with the
//! fields inside it, parallel columns, or one flat list of alternating
//! departure/arrival times. Every helper here fails closed when the shape is
//! inconsistent; a row is never silently dropped or padded.

use super::{PhaseError, PhaseResult};
use crate::models::RawTicket;

/// A cell position, counted from the start or from the end of the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    At(usize),
    FromEnd(usize),
}

impl Column {
    fn pick(self, cells: &[String]) -> Option<&String> {
        match self {
            Column::At(i) => cells.get(i),
            Column::FromEnd(i) => cells.len().checked_sub(i + 1).and_then(|j| cells.get(j)),
        }
    }
}

/// Where the three fields sit in a row of cells.
#[derive(Debug, Clone, Copy)]
pub struct RowShape {
    pub departure: Column,
    pub arrival: Option<Column>,
    pub price: Column,
}

/// Build tickets from table rows, reading each field at its `shape` position.
pub fn cells_to_tickets(rows: &[Vec<String>], shape: &RowShape) -> PhaseResult<Vec<RawTicket>> {
    rows.iter()
        .enumerate()
        .map(|(i, cells)| {
            let get = |col: Column, name: &str| {
                col.pick(cells).cloned().ok_or_else(|| {
                    PhaseError::ShapeMismatch(format!(
                        "row {} has {} cells, no {} at {:?}",
                        i,
                        cells.len(),
                        name,
                        col
                    ))
                })
            };
            Ok(RawTicket {
                departure: get(shape.departure, "departure")?,
                arrival: shape.arrival.map(|c| get(c, "arrival")).transpose()?,
                price: get(shape.price, "price")?,
            })
        })
        .collect()
}

/// Build tickets from per-row `[departure, arrival, price]` field lookups.
/// A row missing any of the three is a shape error.
pub fn pair_rows(rows: Vec<Vec<Option<String>>>) -> PhaseResult<Vec<RawTicket>> {
    rows.into_iter()
        .enumerate()
        .map(|(i, fields)| match <[Option<String>; 3]>::try_from(fields) {
            Ok([Some(departure), Some(arrival), Some(price)]) => Ok(RawTicket {
                departure,
                arrival: Some(arrival),
                price,
            }),
            Ok(_) => Err(PhaseError::ShapeMismatch(format!("row {} is missing a field", i))),
            Err(v) => Err(PhaseError::ShapeMismatch(format!(
                "row {} has {} fields, expected 3",
                i,
                v.len()
            ))),
        })
        .collect()
}

/// Rows whose departure and arrival are the first two of one cell list, and
/// whose fare comes from a separate lookup in the same row container.
pub fn times_with_fares(
    times: Vec<Vec<String>>,
    fares: Vec<Vec<Option<String>>>,
) -> PhaseResult<Vec<RawTicket>> {
    if times.len() != fares.len() {
        return Err(PhaseError::ShapeMismatch(format!(
            "{} rows with times, {} with fares",
            times.len(),
            fares.len()
        )));
    }
    let rows = times
        .into_iter()
        .zip(fares)
        .map(|(t, f)| {
            let mut t = t.into_iter();
            vec![t.next(), t.next(), f.into_iter().next().flatten()]
        })
        .collect();
    pair_rows(rows)
}

/// Zip parallel departure/arrival/price columns. All three must be equally long.
pub fn zip_columns(
    departures: Vec<String>,
    arrivals: Vec<String>,
    prices: Vec<String>,
) -> PhaseResult<Vec<RawTicket>> {
    if departures.len() != arrivals.len() || departures.len() != prices.len() {
        return Err(PhaseError::ShapeMismatch(format!(
            "{} departures, {} arrivals, {} prices",
            departures.len(),
            arrivals.len(),
            prices.len()
        )));
    }
    Ok(departures
        .into_iter()
        .zip(arrivals)
        .zip(prices)
        .map(|((d, a), p)| RawTicket::new(d, a, p))
        .collect())
}

/// Zip departures with prices for sites that publish no arrival time.
pub fn zip_departures(departures: Vec<String>, prices: Vec<String>) -> PhaseResult<Vec<RawTicket>> {
    if departures.len() != prices.len() {
        return Err(PhaseError::ShapeMismatch(format!(
            "{} departures, {} prices",
            departures.len(),
            prices.len()
        )));
    }
    Ok(departures
        .into_iter()
        .zip(prices)
        .map(|(departure, price)| RawTicket {
            departure,
            arrival: None,
            price,
        })
        .collect())
}

/// Split `[dep0, arr0, dep1, arr1, ...]` into departures and arrivals.
pub fn split_interleaved(times: Vec<String>) -> PhaseResult<(Vec<String>, Vec<String>)> {
    if times.len() % 2 != 0 {
        return Err(PhaseError::ShapeMismatch(format!(
            "{} interleaved times is odd",
            times.len()
        )));
    }
    let mut departures = Vec::with_capacity(times.len() / 2);
    let mut arrivals = Vec::with_capacity(times.len() / 2);
    for (i, t) in times.into_iter().enumerate() {
        if i % 2 == 0 {
            departures.push(t);
        } else {
            arrivals.push(t);
        }
    }
    Ok((departures, arrivals))
}

/// Interleaved times plus one price per pair.
pub fn interleaved_with_prices(times: Vec<String>, prices: Vec<String>) -> PhaseResult<Vec<RawTicket>> {
    let (departures, arrivals) = split_interleaved(times)?;
    zip_columns(departures, arrivals, prices)
}

/// Every `step`-th value starting at `start`.
pub fn stride(values: &[String], start: usize, step: usize) -> Vec<String> {
    values.iter().skip(start).step_by(step.max(1)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_cells_to_tickets_from_end() {
        let rows = vec![
            s(&["1", "Гюмри-Ереван", "ежедн.", "08:00:00", "11:30:00", "3ч 30м", "1200 драм"]),
            s(&["2", "Гюмри-Ереван", "ежедн.", "14:00:00", "17:30:00", "3ч 30м", "1350 драм"]),
        ];
        let shape = RowShape {
            departure: Column::At(3),
            arrival: Some(Column::FromEnd(2)),
            price: Column::FromEnd(0),
        };
        let out = cells_to_tickets(&rows, &shape).unwrap();
        assert_eq!(out[0], RawTicket::new("08:00:00", "11:30:00", "1200 драм"));
        assert_eq!(out[1].price, "1350 драм");
    }

    #[test]
    fn test_cells_to_tickets_short_row_fails() {
        let rows = vec![s(&["1", "a", "b", "08:00", "x", "y", "9"]), s(&["No trains"])];
        let shape = RowShape {
            departure: Column::At(3),
            arrival: None,
            price: Column::FromEnd(0),
        };
        assert!(matches!(
            cells_to_tickets(&rows, &shape),
            Err(PhaseError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_pair_rows() {
        let ok = vec![vec![Some("07:10".into()), Some("09:55".into()), Some("29,90 €".into())]];
        assert_eq!(pair_rows(ok).unwrap()[0].arrival.as_deref(), Some("09:55"));

        let missing = vec![vec![Some("07:10".into()), None, Some("29,90 €".into())]];
        assert!(pair_rows(missing).is_err());

        let short = vec![vec![Some("07:10".into())]];
        assert!(pair_rows(short).is_err());
    }

    #[test]
    fn test_times_with_fares() {
        let times = vec![s(&["06:52", "11:27", "4:35"]), s(&["07:55"])];
        let fares = vec![vec![Some("59,90 €".to_string())], vec![Some("39,90 €".to_string())]];
        let err = times_with_fares(times.clone(), fares.clone()).unwrap_err();
        assert!(matches!(err, PhaseError::ShapeMismatch(_)));

        let out = times_with_fares(times[..1].to_vec(), fares[..1].to_vec()).unwrap();
        assert_eq!(out, vec![RawTicket::new("06:52", "11:27", "59,90 €")]);

        assert!(times_with_fares(times, fares[..1].to_vec()).is_err());
    }

    #[test]
    fn test_interleaved_pairs_with_prices() {
        let times = s(&["06:00", "09:10", "12:00", "15:05"]);
        let out = interleaved_with_prices(times, s(&["450", "480"])).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], RawTicket::new("12:00", "15:05", "480"));
    }

    #[test]
    fn test_odd_interleaved_fails_closed() {
        let err = split_interleaved(s(&["06:00", "09:10", "12:00"])).unwrap_err();
        assert!(matches!(err, PhaseError::ShapeMismatch(_)));

        let err = interleaved_with_prices(s(&["06:00", "09:10"]), s(&["1", "2"])).unwrap_err();
        assert!(matches!(err, PhaseError::ShapeMismatch(_)));
    }

    #[test]
    fn test_stride() {
        let cells = s(&["h0", "h1", "h2", "h3", "07:00", "60", "x", "11:00", "70", "y"]);
        assert_eq!(stride(&cells, 4, 3), s(&["07:00", "11:00"]));
        assert_eq!(stride(&cells, 5, 3), s(&["60", "70"]));
        assert!(stride(&cells, 20, 3).is_empty());
    }

    #[test]
    fn test_zip_departures() {
        let out = zip_departures(s(&["07:00"]), s(&["60 EGP"])).unwrap();
        assert_eq!(out[0].arrival, None);
        assert!(zip_departures(s(&["07:00"]), vec![]).is_err());
    }
}
