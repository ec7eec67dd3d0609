//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, sodass der Client ohne Konfigurationsdatei startet;
//! fuer den TURN-Modus muessen Server und Zugangsdaten gesetzt sein.

use plauder_chat::STANDARD_MAX_LUECKE;
use plauder_relay::RelayConfig;
use serde::{Deserialize, Serialize};

/// Umgebungsvariable, die `relay.passwort` ersetzt
pub const ENV_TURN_PASSWORT: &str = "PLAUDER_TURN_PASSWORT";

/// Herkunft einer geladenen Konfiguration
///
/// Das Laden passiert vor dem Logging; gemeldet wird erst danach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigQuelle {
    Datei,
    /// Datei nicht gefunden
    Standardwerte,
}

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Relay-Server und Zugangsdaten
    pub relay: RelayConfig,
    /// Eingangsqueue fuer empfangene Datensaetze
    pub eingang: EingangEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Eingangsqueue-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EingangEinstellungen {
    /// Kapazitaet; bei Ueberlauf werden die aeltesten Datensaetze verworfen
    pub puffer_groesse: usize,
    /// Groesste Sequenzluecke, die ein Datensatz aufreissen darf
    pub max_luecke: u64,
}

impl Default for EingangEinstellungen {
    fn default() -> Self {
        Self {
            puffer_groesse: 256,
            max_luecke: STANDARD_MAX_LUECKE,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
    /// Log-Datei-Pfad (None = stderr)
    pub datei: Option<String>,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
            datei: Some("logs.out".into()),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, ConfigQuelle)> {
        let (mut config, quelle) = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config = Self::aus_toml(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                (config, ConfigQuelle::Datei)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Self::default(), ConfigQuelle::Standardwerte)
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };

        if let Ok(passwort) = std::env::var(ENV_TURN_PASSWORT) {
            config.passwort_ueberschreiben(passwort);
        }
        Ok((config, quelle))
    }

    pub fn aus_toml(inhalt: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }

    /// Ersetzt das TURN-Passwort (leere Werte werden ignoriert)
    pub fn passwort_ueberschreiben(&mut self, passwort: String) {
        if !passwort.is_empty() {
            self.relay.passwort = passwort;
        }
    }

    /// Prueft Werte, die erst zur Laufzeit auffallen wuerden
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if !plauder_observability::log_level_gueltig(&self.logging.level) {
            anyhow::bail!("logging.level '{}' ist ungueltig", self.logging.level);
        }
        if !plauder_observability::log_format_gueltig(&self.logging.format) {
            anyhow::bail!("logging.format '{}' ist ungueltig", self.logging.format);
        }
        if self.eingang.puffer_groesse == 0 {
            anyhow::bail!("eingang.puffer_groesse muss groesser als 0 sein");
        }
        self.relay.pruefen()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plauder_relay::RelayModus;

    #[test]
    fn standard_config() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.eingang.puffer_groesse, 256);
        assert_eq!(cfg.eingang.max_luecke, 1024);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.datei.as_deref(), Some("logs.out"));
        assert_eq!(cfg.relay.modus, RelayModus::Turn);
        assert!(cfg.relay.passwort.is_empty(), "Keine eingebauten Zugangsdaten");
    }

    #[test]
    fn standard_config_braucht_turn_server() {
        assert!(ClientConfig::default().pruefen().is_err());
    }

    #[test]
    fn config_aus_toml_string() {
        let cfg = ClientConfig::aus_toml(
            r#"
            [relay]
            turn_server = "198.51.100.1:3478"
            benutzername = "alice"
            passwort = "geheim"
            realm = "example.org"
            max_versuche = 3

            [eingang]
            puffer_groesse = 32
            max_luecke = 64
        "#,
        )
        .unwrap();
        assert_eq!(cfg.relay.turn_server, "198.51.100.1:3478");
        assert_eq!(cfg.relay.realm, "example.org");
        assert_eq!(cfg.relay.max_versuche, 3);
        assert_eq!(cfg.eingang.puffer_groesse, 32);
        assert_eq!(cfg.eingang.max_luecke, 64);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.relay.timeout_ms, 5000);
        assert_eq!(cfg.logging.format, "text");
        assert!(cfg.pruefen().is_ok());
    }

    #[test]
    fn ungueltiges_log_level_faellt_auf() {
        let mut cfg = ClientConfig::default();
        cfg.relay = RelayConfig::lokal("127.0.0.1:0");
        cfg.logging.level = "laut".into();
        assert!(cfg.pruefen().is_err());
    }

    #[test]
    fn leere_queue_ist_ungueltig() {
        let mut cfg = ClientConfig::default();
        cfg.relay = RelayConfig::lokal("127.0.0.1:0");
        cfg.eingang.puffer_groesse = 0;
        assert!(cfg.pruefen().is_err());
    }

    #[test]
    fn passwort_wird_ueberschrieben() {
        let mut cfg = ClientConfig::default();
        cfg.relay.passwort = "alt".into();
        cfg.passwort_ueberschreiben(String::new());
        assert_eq!(cfg.relay.passwort, "alt");
        cfg.passwort_ueberschreiben("neu".into());
        assert_eq!(cfg.relay.passwort, "neu");
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let (cfg, quelle) = ClientConfig::laden("/nicht/vorhanden/plauder.toml").unwrap();
        assert_eq!(quelle, ConfigQuelle::Standardwerte);
        assert_eq!(cfg.eingang.puffer_groesse, 256);
    }

    #[test]
    fn vorhandene_datei_wird_gemeldet() {
        let pfad = std::env::temp_dir().join("plauder-vorhanden.toml");
        std::fs::write(&pfad, "[eingang]\npuffer_groesse = 8\n").unwrap();
        let (cfg, quelle) = ClientConfig::laden(pfad.to_str().unwrap()).unwrap();
        assert_eq!(quelle, ConfigQuelle::Datei);
        assert_eq!(cfg.eingang.puffer_groesse, 8);
        std::fs::remove_file(&pfad).ok();
    }

    #[test]
    fn kaputte_datei_ist_fehler() {
        let pfad = std::env::temp_dir().join("plauder-kaputt.toml");
        std::fs::write(&pfad, "[relay\nturn_server = ").unwrap();
        let err = ClientConfig::laden(pfad.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Konfigurationsfehler"));
        std::fs::remove_file(&pfad).ok();
    }
}
