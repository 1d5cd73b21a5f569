//! Night CSV format definition
//!
//! ```text
//! date,sleep_start,sleep_end
//! 2024-01-01,2024-01-01T01:00:00.000Z,2024-01-01T08:30:00.000Z
//! ```
//!
//! Header columns may appear in any order and are matched case-insensitively.
//! Extra columns are ignored.

use crate::types::RawNight;

/// Field delimiter
pub const DELIMITER: char = ',';

/// Storage key column
pub const DATE_COLUMN: &str = "date";

/// Sleep onset column
pub const SLEEP_START_COLUMN: &str = "sleep_start";

/// Wake time column
pub const SLEEP_END_COLUMN: &str = "sleep_end";

/// Columns every import must carry
pub const REQUIRED_COLUMNS: [&str; 3] = [DATE_COLUMN, SLEEP_START_COLUMN, SLEEP_END_COLUMN];

/// Header line written by [`to_csv`]
pub const CSV_HEADER: &str = "date,sleep_start,sleep_end";

/// Positions of the required columns within a header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub date: usize,
    pub sleep_start: usize,
    pub sleep_end: usize,
    /// Number of fields in the header row
    pub width: usize,
}

impl ColumnLayout {
    /// Locate the required columns in a header row.
    ///
    /// Returns the names of any missing columns on failure.
    pub fn from_header(header: &str) -> Result<Self, Vec<&'static str>> {
        let names: Vec<String> = header
            .split(DELIMITER)
            .map(|name| name.trim().trim_start_matches('\u{feff}').to_lowercase())
            .collect();

        let position = |column: &str| names.iter().position(|name| name == column);

        match (
            position(DATE_COLUMN),
            position(SLEEP_START_COLUMN),
            position(SLEEP_END_COLUMN),
        ) {
            (Some(date), Some(sleep_start), Some(sleep_end)) => Ok(Self {
                date,
                sleep_start,
                sleep_end,
                width: names.len(),
            }),
            _ => Err(REQUIRED_COLUMNS
                .iter()
                .copied()
                .filter(|column| position(*column).is_none())
                .collect()),
        }
    }
}

/// Write nights in the documented CSV format, header first
pub fn to_csv(nights: &[RawNight]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + nights.len() * 64);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for night in nights {
        out.push_str(&night.date);
        out.push(DELIMITER);
        out.push_str(&night.sleep_start);
        out.push(DELIMITER);
        out.push_str(&night.sleep_end);
        out.push('\n');
    }
    out
}
