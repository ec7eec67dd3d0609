//! Fehlertypen fuer den Relay-Transport

use thiserror::Error;

/// Relay-Fehlertypen
#[derive(Debug, Error)]
pub enum RelayFehler {
    #[error("Ungueltige Relay-Konfiguration: {0}")]
    Konfiguration(String),

    #[error("Zeitlimit bei '{schritt}' nach {ms} ms ueberschritten")]
    Zeitlimit { schritt: &'static str, ms: u64 },

    #[error("TURN-Fehler bei '{schritt}': {grund}")]
    Turn { schritt: &'static str, grund: String },

    #[error("Relay nach {versuche} Versuchen nicht erreichbar: {letzter}")]
    NichtErreichbar { versuche: u32, letzter: String },

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayFehler {
    /// Gibt true zurueck wenn ein erneuter Verbindungsversuch sinnvoll ist
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(self, Self::Zeitlimit { .. } | Self::Turn { .. } | Self::Io(_))
    }
}

pub type RelayResult<T> = Result<T, RelayFehler>;
