//! Ausgangsseite einer Sitzung

use plauder_protocol::Datensatz;
use std::net::SocketAddr;

use crate::error::ChatResult;

/// Nimmt Datensaetze zum Versand an einen Peer entgegen
///
/// Implementierungen duerfen nicht blockieren: der Dispatcher ruft
/// `senden` direkt aus seiner Ereignisschleife auf.
pub trait DatagrammSenke: Send {
    /// Reiht einen Datensatz zum Versand an `ziel` ein
    fn senden(&self, datensatz: &Datensatz, ziel: SocketAddr) -> ChatResult<()>;
}
