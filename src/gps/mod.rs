// src/gps/mod.rs
//! NMEA 0183 ingestion: line splitting, sentence parsing and fix aggregation

pub mod aggregator;
pub mod data;
pub mod nmea;
pub mod serial;
pub mod tokenizer;

pub use aggregator::{FixAggregator, IngestStats};
pub use data::NavigationSnapshot;
pub use nmea::{FixQuality, ParsedSentence};
pub use serial::{SerialSource, StreamSource};
pub use tokenizer::{LineSplitter, RawLine};
