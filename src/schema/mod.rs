//! Night CSV schema
//!
//! This module defines the delimited text format nights are imported from and
//! exported to, and the adapter that turns that text into raw nights.

mod adapter;
mod night_csv;

pub use adapter::*;
pub use night_csv::*;
