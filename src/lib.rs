//! Sleep Drift - Sleep-regularity baseline and drift engine
//!
//! Sleep Drift turns a history of nights into a circadian drift signal through a
//! deterministic pipeline: CSV ingestion → feature derivation → window
//! selection → baseline and drift → risk classification → nudge encoding.
//!
//! ## Modules
//!
//! - **Store**: date-keyed night storage behind the [`NightStore`] trait
//! - **Pipeline**: stateless [`assess_nights`] and the stateful [`DriftProcessor`]
//! - **FFI**: C ABI for host applications

pub mod baseline;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod risk;
pub mod schema;
pub mod seed;
pub mod store;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use baseline::BaselineCalculator;
pub use config::{DriftConfig, MidsleepAxis};
pub use encoder::NudgeEncoder;
pub use error::DriftError;
pub use features::FeatureDeriver;
pub use pipeline::{assess_nights, csv_to_nudge_report, DriftProcessor};
pub use risk::RiskClassifier;
pub use schema::{CsvImport, CsvNightAdapter};
pub use seed::SeedOptions;
pub use store::{MemoryNightStore, NightStore};
pub use types::{Assessment, DerivedNight, DriftStats, ImportSummary, NudgeReport, RawNight, RiskLabel};

/// Library version embedded in nudge reports
pub const DRIFT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for nudge reports
pub const PRODUCER_NAME: &str = "sleep-drift";
