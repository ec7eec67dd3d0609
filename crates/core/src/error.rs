//! Fehlertypen fuer Plauder
//!
//! Zentraler Fehler-Enum fuer Crate-uebergreifende Fehlerzustaende.
//! Relay und Chat definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Plauder
pub type Result<T> = std::result::Result<T, PlauderError>;

/// Gemeinsame Fehler im Plauder-System
#[derive(Debug, Error)]
pub enum PlauderError {
    // --- Protokoll ---
    #[error("Ungueltiger Datensatz: {0}")]
    UngueltigerDatensatz(String),

    #[error("Datensatz zu gross: {groesse} Bytes (Maximum: {max} Bytes)")]
    DatensatzZuGross { groesse: usize, max: usize },

    // --- Eingaben ---
    #[error("Ungueltige Adresse: {0}")]
    UngueltigeAdresse(String),
}
