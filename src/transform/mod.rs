//! The refine transformation.
//!
//! Converts raw exchange records into refined records: filters to `Close`
//! rows, orders each ticker's series by trade date, pairs every row with its
//! successor to compute the next-value lookahead and the percentage change,
//! and normalizes the ticker symbol and trade-date formatting.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Status value selecting the rows that participate in the refined dataset.
pub const CLOSE_STATUS: &str = "Close";

/// Trailing market suffix stripped from ticker symbols.
pub const MARKET_SUFFIX: &str = ".SA";

/// Trade-date output format.
pub const TRADE_DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of raw exchange data.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub ticker: String,
    pub status: String,
    pub value: f64,
    /// Trade date.
    pub date: NaiveDate,
    /// Ingestion partition.
    pub dt: NaiveDate,
}

/// One row of the refined dataset.
///
/// `prox_valor` and `percentual` are `None` for the last record of each
/// ticker's series, and `percentual` is also `None` when `value` is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedRecord {
    /// Ticker symbol with the trailing market suffix stripped.
    pub ticker: String,
    pub status: String,
    pub value: f64,
    pub data_ingestao: NaiveDate,
    /// Trade date formatted as yyyy-MM-dd.
    pub data_pregao: String,
    /// Value of the next chronologically later Close record for this ticker.
    pub prox_valor: Option<f64>,
    /// Percentage change to the next record: (prox_valor - value) / value * 100.
    pub percentual: Option<f64>,
}

/// Refine raw records into the output dataset.
///
/// Rows with a status other than `Close` are dropped. The remaining rows are
/// grouped by ticker and ordered by trade date ascending within each group;
/// each row is then paired with its successor to fill `prox_valor` and
/// `percentual`. Output order is `(ticker, data_pregao)` ascending.
pub fn refine(records: Vec<RawRecord>) -> Vec<RefinedRecord> {
    let mut groups: BTreeMap<String, Vec<RawRecord>> = BTreeMap::new();
    for record in records {
        if record.status == CLOSE_STATUS {
            groups.entry(record.ticker.clone()).or_default().push(record);
        }
    }

    let mut refined = Vec::new();
    for series in groups.into_values() {
        refined.extend(refine_series(series));
    }
    refined
}

/// Refine one ticker's series.
///
/// The series is sorted by trade date ascending and each row is zipped with
/// the next; the last row pairs with `None`.
fn refine_series(mut series: Vec<RawRecord>) -> Vec<RefinedRecord> {
    series.sort_by_key(|record| record.date);

    let next_values: Vec<Option<f64>> = series
        .iter()
        .skip(1)
        .map(|next| Some(next.value))
        .chain(std::iter::once(None))
        .collect();

    series
        .into_iter()
        .zip(next_values)
        .map(|(record, prox_valor)| {
            let percentual = match prox_valor {
                // A zero value would divide by zero; the change is undefined
                Some(prox) if record.value != 0.0 => {
                    Some((prox - record.value) / record.value * 100.0)
                }
                _ => None,
            };

            let ticker = record
                .ticker
                .strip_suffix(MARKET_SUFFIX)
                .unwrap_or(&record.ticker)
                .to_string();

            RefinedRecord {
                ticker,
                status: record.status,
                value: record.value,
                data_ingestao: record.dt,
                data_pregao: record.date.format(TRADE_DATE_FORMAT).to_string(),
                prox_valor,
                percentual,
            }
        })
        .collect()
}
