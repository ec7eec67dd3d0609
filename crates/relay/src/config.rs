//! Relay-Konfiguration
//!
//! Server, Zugangsdaten und Realm kommen ausschliesslich aus der
//! Konfiguration; es gibt keine eingebauten Zugangsdaten.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{RelayFehler, RelayResult};

/// Art des Endpunkts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayModus {
    /// TURN-Allokation (NAT-Traversal)
    Turn,
    /// Lokaler UDP-Socket ohne Relay (LAN, Tests)
    Lokal,
}

/// Konfiguration fuer den Relay-Transport
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub modus: RelayModus,
    /// STUN-Server fuer den Binding-Request (leer = `turn_server`)
    pub stun_server: String,
    /// TURN-Server, z.B. "turn.example.org:3478"
    pub turn_server: String,
    pub benutzername: String,
    pub passwort: String,
    pub realm: String,
    /// Lokale Bind-Adresse des UDP-Sockets
    pub bind_adresse: String,
    /// Zeitlimit pro Netzwerk-Roundtrip im Handshake
    pub timeout_ms: u64,
    /// Maximale Anzahl Verbindungsversuche
    pub max_versuche: u32,
    /// Initiale Wartezeit zwischen Versuchen (wird verdoppelt)
    pub backoff_ms: u64,
    pub backoff_max_ms: u64,
    /// Groesse der Sende-Queue
    pub sende_queue_groesse: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            modus: RelayModus::Turn,
            stun_server: String::new(),
            turn_server: String::new(),
            benutzername: String::new(),
            passwort: String::new(),
            realm: String::new(),
            bind_adresse: "0.0.0.0:0".into(),
            timeout_ms: 5000,
            max_versuche: 5,
            backoff_ms: 500,
            backoff_max_ms: 8000,
            sende_queue_groesse: 128,
        }
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("modus", &self.modus)
            .field("stun_server", &self.stun_server)
            .field("turn_server", &self.turn_server)
            .field("benutzername", &self.benutzername)
            .field("passwort", &"***")
            .field("realm", &self.realm)
            .field("bind_adresse", &self.bind_adresse)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_versuche", &self.max_versuche)
            .finish_non_exhaustive()
    }
}

impl RelayConfig {
    /// Konfiguration fuer einen lokalen Socket auf `bind_adresse`
    pub fn lokal(bind_adresse: impl Into<String>) -> Self {
        Self {
            modus: RelayModus::Lokal,
            bind_adresse: bind_adresse.into(),
            ..Self::default()
        }
    }

    /// Prueft die Konfiguration vor dem Verbindungsaufbau
    pub fn pruefen(&self) -> RelayResult<()> {
        self.bind_socket_adresse()?;
        if self.modus == RelayModus::Turn && self.turn_server.trim().is_empty() {
            return Err(RelayFehler::Konfiguration(
                "relay.turn_server fehlt (modus = \"turn\")".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_socket_adresse(&self) -> RelayResult<SocketAddr> {
        self.bind_adresse.parse().map_err(|e| {
            RelayFehler::Konfiguration(format!("bind_adresse '{}': {}", self.bind_adresse, e))
        })
    }

    /// STUN-Server; faellt auf den TURN-Server zurueck
    pub fn stun_server_oder_turn(&self) -> &str {
        if self.stun_server.trim().is_empty() {
            &self.turn_server
        } else {
            &self.stun_server
        }
    }

    pub fn zeitlimit(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Wartezeit vor Versuch `versuch + 1` (exponentiell, gedeckelt)
    pub fn backoff(&self, versuch: u32) -> Duration {
        let faktor = 1u64.checked_shl(versuch.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_ms.saturating_mul(faktor).min(self.backoff_max_ms))
    }
}
