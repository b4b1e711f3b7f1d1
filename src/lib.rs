//! Kcal Flux - On-device analytics engine for calorie budgets
//!
//! Kcal Flux turns logged intake and body-mass samples into a daily calorie
//! budget through a deterministic pipeline: unit conversion → calendar
//! bucketing → EWMA smoothing → weight trend → maintenance estimate →
//! cycle budget with carry-over → macro targets → report encoding.
//!
//! ## Modules
//!
//! - **Analytics**: bucketing, smoothing, trend and maintenance estimation
//! - **Budgeting**: cycle windows, carry-over and macro allocation
//! - **Schema**: `health.sample.v1` event parsing and validation

pub mod bucketing;
pub mod budget;
pub mod config;
pub mod encoder;
pub mod error;
pub mod macros;
pub mod maintenance;
pub mod pipeline;
pub mod schema;
pub mod smoothing;
pub mod trend;
pub mod types;
pub mod units;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use encoder::{BudgetReport, ReportEncoder};
pub use error::ComputeError;
pub use pipeline::{analyze, samples_to_report, AnalyticsSnapshot, BudgetProcessor};
pub use units::{convert, Dimension, Measurement, Unit};

// Schema exports
pub use schema::{SampleEvent, SampleEventAdapter, SCHEMA_VERSION};

/// Kcal Flux version embedded in all reports
pub const KCAL_FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "kcal-flux";
