//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `PLAUDER_LOG_LEVEL`: Log-Level oder Filter-Direktive, Standard: info
//! - `PLAUDER_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Ist eine Log-Datei gesetzt, wird angehaengt statt auf stderr geschrieben.

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "PLAUDER_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "PLAUDER_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Umgebungsvariablen haben Vorrang vor `level` und `format`.
/// Faellt auf `info` / `text` zurueck, falls beides ungueltig ist.
pub fn logging_initialisieren(level: &str, format: &str, datei: Option<&str>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = log_format_aus_env().unwrap_or_else(|| format.to_string());
    let json = format == "json";

    let ergebnis = match datei.filter(|d| !d.trim().is_empty()) {
        Some(pfad) => {
            let datei = OpenOptions::new()
                .create(true)
                .append(true)
                .open(pfad)
                .map_err(|e| anyhow::anyhow!("Log-Datei '{pfad}' nicht oeffenbar: {e}"))?;
            let writer = Mutex::new(datei);
            if json {
                fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_writer(writer)
                    .try_init()
            } else {
                fmt()
                    .with_env_filter(filter)
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(writer)
                    .try_init()
            }
        }
        None => {
            if json {
                fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_writer(std::io::stderr)
                    .try_init()
            } else {
                fmt()
                    .with_env_filter(filter)
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .try_init()
            }
        }
    };

    ergebnis.map_err(|e| anyhow::anyhow!("Logging bereits initialisiert: {e}"))
}

/// Log-Format aus der Umgebung, falls gesetzt
fn log_format_aus_env() -> Option<String> {
    std::env::var(ENV_LOG_FORMAT).ok().filter(|f| log_format_gueltig(f))
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
