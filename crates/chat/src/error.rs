//! Fehlertypen fuer das Chat-Crate

use plauder_core::{PeerAdresse, PlauderError};
use thiserror::Error;

/// Chat-Fehlertypen
#[derive(Debug, Error)]
pub enum ChatFehler {
    #[error("Ungueltige Peer-Adresse: {0}")]
    Adresse(#[from] PlauderError),

    #[error("Sitzung mit {0} hat keine Transportadresse")]
    KeineTransportAdresse(PeerAdresse),

    #[error("Relay noch nicht verbunden")]
    NichtVerbunden,

    #[error("Sitzung nicht gefunden: Index {0}")]
    SitzungNichtGefunden(usize),

    #[error("Luecke von {luecke} Slots bei {peer} ueberschreitet Maximum {max}")]
    LueckeZuGross { peer: PeerAdresse, luecke: u64, max: u64 },

    #[error("Senden fehlgeschlagen: {0}")]
    Senden(String),
}

pub type ChatResult<T> = Result<T, ChatFehler>;
