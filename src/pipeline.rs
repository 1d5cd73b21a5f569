//! Pipeline orchestration
//!
//! This module provides the public API for Sleep Drift.
//! It runs raw nights through feature derivation, window selection, the
//! baseline calculator and the risk classifier.

use crate::baseline::{select_window, BaselineCalculator};
use crate::config::DriftConfig;
use crate::encoder::NudgeEncoder;
use crate::error::DriftError;
use crate::features::FeatureDeriver;
use crate::risk::RiskClassifier;
use crate::schema::{to_csv, CsvNightAdapter};
use crate::seed::{synthetic_nights, SeedOptions};
use crate::store::{MemoryNightStore, NightStore};
use crate::types::{Assessment, DriftStats, ImportSummary, NudgeReport, RawNight};

/// Assess a set of raw nights.
///
/// # Arguments
/// * `nights` - Raw nights in any order
/// * `config` - Window, threshold and evidence settings
///
/// # Returns
/// The drift statistics and risk label for the most recent window
///
/// # Example
/// ```ignore
/// let assessment = assess_nights(&nights, &DriftConfig::default())?;
/// if assessment.label.should_nudge() { /* notify */ }
/// ```
pub fn assess_nights(nights: &[RawNight], config: &DriftConfig) -> Result<Assessment, DriftError> {
    config.validate()?;

    // Stage 1: Derive features
    let derived = FeatureDeriver::derive_all(nights)?;

    // Stage 2: Select the most recent window
    let window = select_window(derived, config.baseline_window_days);
    let most_recent_date = window.first().map(|night| night.raw.date.clone());

    // Stage 3: Baseline and drift
    let stats = BaselineCalculator::compute(&window, config);

    // Stage 4: Classify
    let label = RiskClassifier::classify(&stats, config.min_nights_for_decision);

    Ok(Assessment {
        stats,
        label,
        most_recent_date,
        min_nights_for_decision: config.min_nights_for_decision,
    })
}

/// Convert night CSV text straight into a nudge report JSON payload.
///
/// # Example
/// ```ignore
/// let report = csv_to_nudge_report(&csv_text, &DriftConfig::default())?;
/// ```
pub fn csv_to_nudge_report(csv: &str, config: &DriftConfig) -> Result<String, DriftError> {
    let import = CsvNightAdapter::parse(csv)?;
    let assessment = assess_nights(&import.nights, config)?;
    NudgeEncoder::new().encode_to_json(&assessment, config)
}

/// Stateful processor owning a night store.
///
/// The store is injected, so callers can share one across processors or
/// supply their own [`NightStore`] implementation.
pub struct DriftProcessor<S: NightStore = MemoryNightStore> {
    store: S,
    config: DriftConfig,
    encoder: NudgeEncoder,
}

impl Default for DriftProcessor<MemoryNightStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl DriftProcessor<MemoryNightStore> {
    /// Create a processor with an empty in-memory store and default settings
    pub fn new() -> Self {
        Self::with_store(MemoryNightStore::new(), DriftConfig::default())
    }

    /// Create a processor with an empty in-memory store and the given settings
    pub fn with_config(config: DriftConfig) -> Self {
        Self::with_store(MemoryNightStore::new(), config)
    }

    /// Replace the store contents from a JSON snapshot
    pub fn load_nights(&mut self, json: &str) -> Result<(), DriftError> {
        self.store = MemoryNightStore::from_json(json)?;
        Ok(())
    }

    /// Save the store contents to a JSON snapshot
    pub fn save_nights(&self) -> Result<String, DriftError> {
        Ok(self.store.to_json()?)
    }
}

impl<S: NightStore> DriftProcessor<S> {
    /// Create a processor around an existing store
    pub fn with_store(store: S, config: DriftConfig) -> Self {
        Self {
            store,
            config,
            encoder: NudgeEncoder::new(),
        }
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Log a single night, replacing any night already filed under its date.
    ///
    /// The date and timestamps are checked before the store is touched, and
    /// the date is stored in zero-padded form.
    pub fn log_night(&self, night: RawNight) -> Result<(), DriftError> {
        let night = FeatureDeriver::canonicalize(night)?;
        self.store.upsert(night);
        Ok(())
    }

    /// Import CSV text, upserting every accepted row
    pub fn import_csv(&self, csv: &str) -> Result<ImportSummary, DriftError> {
        let import = CsvNightAdapter::parse(csv)?;
        let summary = import.summary();
        self.store.upsert_many(import.nights);
        log::info!("{}", summary);
        Ok(summary)
    }

    /// Import CSV text, replacing the whole store on success
    pub fn replace_from_csv(&self, csv: &str) -> Result<ImportSummary, DriftError> {
        let import = CsvNightAdapter::parse(csv)?;
        let summary = import.summary();
        self.store.write_all(import.nights);
        log::info!("{} (store replaced)", summary);
        Ok(summary)
    }

    /// Add synthetic nights to the store, returning how many were generated
    pub fn seed(&self, options: &SeedOptions) -> Result<usize, DriftError> {
        let nights = synthetic_nights(options)?;
        let count = nights.len();
        self.store.upsert_many(nights);
        Ok(count)
    }

    /// Snapshot of stored nights, ordered by date
    pub fn nights(&self) -> Vec<RawNight> {
        self.store.read_all()
    }

    /// Export stored nights as CSV
    pub fn export_csv(&self) -> String {
        to_csv(&self.store.read_all())
    }

    /// Remove every stored night
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Drift statistics for the current store contents
    pub fn stats(&self) -> Result<DriftStats, DriftError> {
        Ok(self.assess()?.stats)
    }

    /// Assess the current store contents
    pub fn assess(&self) -> Result<Assessment, DriftError> {
        assess_nights(&self.store.read_all(), &self.config)
    }

    /// Assess and encode a nudge report
    pub fn nudge_report(&self) -> Result<NudgeReport, DriftError> {
        let assessment = self.assess()?;
        Ok(self.encoder.encode(&assessment, &self.config))
    }
}
