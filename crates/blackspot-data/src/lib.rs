//! Dataset I/O, categorical encoding, and the severity prediction service.
//!
//! This crate covers everything between a raw accident-records CSV and the
//! integer-coded matrices [`blackspot_rf`] trains on:
//!
//! - [`RecordReader`] — validated CSV loading with an optional fallback path
//! - [`RecordDataset`] / [`Schema`] — raw records and the column layout
//! - [`explore`] — frequency counts for charts and mode lookups
//! - [`ColumnEncoder`] / [`EncoderSet`] — string/code bijections, persisted
//!   in a versioned binary envelope
//! - [`SeverityPredictor`] — raw input in, severity class name out
//!
//! Categorical values are never silently coerced: any value outside a
//! column's fit-time vocabulary is an error, as is a prediction input that
//! misses or invents a column.

mod domain;
mod encoder;
mod error;
pub mod explore;
mod predictor;
mod reader;

pub use domain::{RecordDataset, Schema};
pub use encoder::{ColumnEncoder, EncoderSet};
pub use error::DataError;
pub use explore::ValueCount;
pub use predictor::SeverityPredictor;
pub use reader::RecordReader;
