//! CSV loader for batch query files.
//!
//! One row per query, headed by the `Query` field names:
//! `country_id,origin,origin_id,destination,destination_id,date,order,hash_id,total_size`.
//! Only `origin`, `destination` and `date` are required; bookkeeping columns
//! may be missing or left empty.

use crate::models::Query;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    debug!("Loading queries from {:?}", path);
    let file = std::fs::File::open(path).with_context(|| format!("Cannot open {:?}", path))?;
    let queries = read_queries(file).with_context(|| format!("Bad query file {:?}", path))?;
    info!("{}: {} queries loaded", path.display(), queries.len());
    Ok(queries)
}

/// Parse queries from any CSV source. A malformed row fails the whole file.
pub fn read_queries<R: Read>(source: R) -> Result<Vec<Query>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    reader
        .deserialize::<Query>()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("Row {}", i + 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_full_rows() {
        let csv = "\
country_id,origin,origin_id,destination,destination_id,date,order,hash_id,total_size
7,Gyumri,3,Yerevan,5,2021-03-15,0,abc,2
1,Kiel,,Oslo,,2021-07-03,1,abc,2
";
        let qs = read_queries(csv.as_bytes()).unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].origin, "Gyumri");
        assert_eq!(qs[0].destination_id, Some(5));
        assert_eq!(qs[0].date, NaiveDate::from_ymd_opt(2021, 3, 15).unwrap());
        assert_eq!(qs[0].hash_id.as_deref(), Some("abc"));
        assert_eq!(qs[1].origin_id, None);
        assert_eq!(qs[1].order, Some(1));
    }

    #[test]
    fn test_minimal_columns() {
        let csv = "origin,destination,date\n Nairobi , Mombasa ,2021-12-24\n";
        let qs = read_queries(csv.as_bytes()).unwrap();
        assert_eq!(qs[0].origin, "Nairobi");
        assert_eq!(qs[0].total_size, None);
        assert_eq!(qs[0].hash_id, None);
    }

    #[test]
    fn test_bad_date_names_the_row() {
        let csv = "origin,destination,date\nA,B,2021-01-01\nC,D,01/02/2021\n";
        let err = read_queries(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("Row 2"));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_queries(Path::new("/nonexistent/queries.csv")).is_err());
    }
}
