//! plauder-relay – Relay-Transport
//!
//! Besorgt einen oeffentlich erreichbaren Endpunkt (TURN-Allokation oder
//! lokaler UDP-Socket) und betreibt darauf die einzige Empfangs-Loop.
//!
//! ## Module
//! - [`config`] – Relay-Konfiguration (Server, Zugangsdaten, Zeitlimits)
//! - [`kanal`] – `RelayKanal`-Abstraktion ueber TURN und lokales UDP
//! - [`verbindung`] – Verbindungsaufbau mit Zeitlimits und Backoff
//! - [`udp`] – Empfangs-Loop und Sende-Queue

pub mod config;
pub mod error;
pub mod kanal;
pub mod udp;
pub mod verbindung;

pub use config::{RelayConfig, RelayModus};
pub use error::{RelayFehler, RelayResult};
pub use kanal::RelayKanal;
pub use udp::{EmpfangsStatistik, SendeHandle};
pub use verbindung::RelayTransport;
