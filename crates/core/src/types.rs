//! Gemeinsame Identifikationstypen fuer Plauder
//!
//! Peers werden ueber ihre selbst angekuendigte Relay-Adresse identifiziert,
//! nicht ueber die beobachtete Socket-Quelle: saemtlicher Verkehr kommt vom
//! selben Relay-Endpunkt an.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::PlauderError;

/// Angekuendigte Adresse eines Peers (Anzeige- und Schluesselform)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAdresse(String);

impl PeerAdresse {
    /// Erstellt eine PeerAdresse aus der textuellen Form
    pub fn neu(adresse: impl Into<String>) -> Self {
        Self(adresse.into().trim().to_string())
    }

    /// Gibt die textuelle Form zurueck
    pub fn als_str(&self) -> &str {
        &self.0
    }

    /// Loest die Adresse in eine Transportadresse auf
    ///
    /// Nur literale `IP:Port`-Angaben werden akzeptiert. Relay-Endpunkte sind
    /// immer literal, und eine DNS-Aufloesung wuerde den Dispatcher blockieren.
    pub fn aufloesen(&self) -> Result<SocketAddr, PlauderError> {
        self.0
            .parse::<SocketAddr>()
            .map_err(|e| PlauderError::UngueltigeAdresse(format!("'{}': {}", self.0, e)))
    }

    /// Kanonische Schreibweise, falls die Adresse aufloesbar ist
    ///
    /// `[0:0::1]:3478` und `[::1]:3478` bezeichnen denselben Peer und
    /// muessen auf denselben Schluessel fallen.
    pub fn normalisiert(&self) -> Self {
        match self.aufloesen() {
            Ok(addr) => Self::from(addr),
            Err(_) => self.clone(),
        }
    }
}

impl From<SocketAddr> for PeerAdresse {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl From<&str> for PeerAdresse {
    fn from(s: &str) -> Self {
        Self::neu(s)
    }
}

impl std::fmt::Display for PeerAdresse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
