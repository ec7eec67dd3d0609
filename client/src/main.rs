//! Plauder – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den
//! Dispatcher mit der Terminal-Oberflaeche.

use anyhow::Result;
use plauder::ui::terminal::{tasten_lesen, TerminalOberflaeche, TerminalSitzung};
use plauder::{App, ClientConfig, ConfigQuelle};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("PLAUDER_CONFIG").unwrap_or_else(|_| "plauder.toml".into());

    let (config, quelle) = ClientConfig::laden(&config_pfad)?;
    config.pruefen()?;

    plauder_observability::logging_initialisieren(
        &config.logging.level,
        &config.logging.format,
        config.logging.datei.as_deref(),
    )?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        modus = ?config.relay.modus,
        "Plauder wird gestartet"
    );
    if quelle == ConfigQuelle::Standardwerte {
        tracing::warn!(
            pfad = %config_pfad,
            "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
        );
    }

    let ergebnis = {
        // Terminal wird beim Verlassen des Blocks wiederhergestellt
        let _terminal = TerminalSitzung::starten()?;
        let mut app = App::neu(&config, TerminalOberflaeche::neu());
        tasten_lesen(app.ereignis_sender());
        app.ausfuehren().await
    };

    if let Err(e) = &ergebnis {
        tracing::error!(fehler = %e, "Plauder mit Fehler beendet");
    }
    ergebnis
}
