//! plauder-chat – Geordnete Chat-Sitzungen
//!
//! Dieses Crate implementiert:
//! - [`Sitzung`]: Zustand pro Peer, fuehrt eigene und empfangene Nachrichten
//!   zusammen und toleriert Luecken sowie Tipp-Vorschauen
//! - [`Verzeichnis`]: Peer-Adresse -> Sitzung, in Erstellungsreihenfolge
//! - [`DatagrammSenke`]: Schnittstelle zum Versenden von Datensaetzen
//!
//! # Beispiel
//!
//! ```
//! use plauder_chat::Sitzung;
//! use plauder_core::PeerAdresse;
//! use plauder_protocol::Datensatz;
//!
//! let peer = PeerAdresse::neu("198.51.100.4:50000");
//! let mut sitzung = Sitzung::neu(peer.clone());
//! sitzung.empfangene_hinzufuegen(&Datensatz::neu(2, "jump", true, peer.clone()), &peer);
//! assert_eq!(sitzung.empfangene().len(), 3);
//! ```

pub mod error;
pub mod senke;
pub mod sitzung;
pub mod types;
pub mod verzeichnis;

// Bequeme Re-Exporte
pub use error::{ChatFehler, ChatResult};
pub use senke::DatagrammSenke;
pub use sitzung::{Sitzung, Verlauf};
pub use types::Nachricht;
pub use verzeichnis::{Verzeichnis, STANDARD_MAX_LUECKE};
