//! # plauder-observability
//!
//! Structured Logging via tracing-subscriber. Da das Terminal der
//! Oberflaeche gehoert, wird standardmaessig in eine Datei geloggt.

pub mod logging;

pub use logging::{log_format_gueltig, log_level_gueltig, logging_initialisieren};
