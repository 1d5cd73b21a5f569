//! Adapter for converting night CSV text to raw nights
//!
//! Rows with too few fields or an empty required value are skipped. A date or
//! timestamp that does not parse rejects the whole import, since a partially
//! imported history would quietly skew the baseline. Accepted dates are
//! rewritten in zero-padded form.

use crate::error::DriftError;
use crate::features::FeatureDeriver;
use crate::schema::night_csv::{ColumnLayout, DELIMITER};
use crate::types::{ImportSummary, RawNight};

/// Parsed CSV content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvImport {
    /// Accepted nights, in file order
    pub nights: Vec<RawNight>,
    /// Non-blank data rows in the input
    pub total_rows: usize,
}

impl CsvImport {
    pub fn skipped_rows(&self) -> usize {
        self.total_rows - self.nights.len()
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            imported: self.nights.len(),
            total_rows: self.total_rows,
            skipped_rows: self.skipped_rows(),
        }
    }
}

/// Adapter for converting CSV text to raw nights
pub struct CsvNightAdapter;

impl CsvNightAdapter {
    /// Parse CSV text into raw nights
    pub fn parse(input: &str) -> Result<CsvImport, DriftError> {
        // (1-based line number, line) for every non-blank line
        let mut lines = input
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| (idx + 1, line));

        let Some((_, header)) = lines.next() else {
            return Err(DriftError::NoDataRows);
        };
        let rows: Vec<(usize, &str)> = lines.collect();
        if rows.is_empty() {
            return Err(DriftError::NoDataRows);
        }

        let layout = ColumnLayout::from_header(header).map_err(|missing| {
            DriftError::MalformedHeader(format!(
                "missing required column(s): {}",
                missing.join(", ")
            ))
        })?;

        let mut nights = Vec::with_capacity(rows.len());
        for &(line_num, line) in &rows {
            let Some(night) = parse_row(line, &layout) else {
                log::debug!("skipping incomplete CSV row on line {}", line_num);
                continue;
            };

            match FeatureDeriver::canonicalize(night) {
                Ok(night) => nights.push(night),
                Err(e) => {
                    log::warn!("rejecting CSV import at line {}: {}", line_num, e);
                    return Err(at_line(line_num, e));
                }
            }
        }

        if nights.is_empty() {
            return Err(DriftError::NoValidRows);
        }

        Ok(CsvImport {
            nights,
            total_rows: rows.len(),
        })
    }
}

/// Extract the required fields from a data row, `None` if the row is incomplete
fn parse_row(line: &str, layout: &ColumnLayout) -> Option<RawNight> {
    let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
    if fields.len() < layout.width {
        return None;
    }

    let date = fields[layout.date];
    let sleep_start = fields[layout.sleep_start];
    let sleep_end = fields[layout.sleep_end];
    if date.is_empty() || sleep_start.is_empty() || sleep_end.is_empty() {
        return None;
    }

    Some(RawNight::new(date, sleep_start, sleep_end))
}

fn at_line(line_num: usize, err: DriftError) -> DriftError {
    match err {
        DriftError::InvalidTimestamp { context, value } => DriftError::InvalidTimestamp {
            context: format!("line {}, {}", line_num, context),
            value,
        },
        DriftError::InvalidDate { context, value } => DriftError::InvalidDate {
            context: format!("line {}, {}", line_num, context),
            value,
        },
        other => other,
    }
}
