//! Ereignis-Vokabular und Zustaende des Dispatchers

use plauder_chat::DatagrammSenke;
use plauder_core::PeerAdresse;
use plauder_protocol::Datensatz;

use crate::ui::Taste;

/// Geschlossene Menge aller Ereignisse, die den Dispatcher erreichen
pub enum AppEreignis {
    /// Programm beenden
    Beenden,
    /// Relay aufbauen und Serverbildschirm zeigen
    ServerErstellen,
    /// Adresseingabe fuer einen neuen Chat
    ChatErstellen,
    /// Getippte Adresse aufloesen und Chat oeffnen
    ServerVerbinden,
    /// Fokussierte Sitzung oeffnen
    ChatOeffnen,
    NachrichtSenden,
    /// Eingabe hat sich geaendert
    Tippen,
    Zurueck,
    /// Nur neu zeichnen
    SitzungenGeaendert,
    /// Rohe Taste aus dem Terminal
    Taste(Taste),
    /// Relay steht; einziges "Adresse bereit"-Signal pro Relay
    RelayBereit {
        adresse: PeerAdresse,
        sender: Box<dyn DatagrammSenke>,
    },
    /// Relay nach allen Versuchen nicht erreichbar
    RelayFehlgeschlagen(String),
    DatensatzEmpfangen(Datensatz),
}

impl AppEreignis {
    /// Name fuer Logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Beenden => "beenden",
            Self::ServerErstellen => "server_erstellen",
            Self::ChatErstellen => "chat_erstellen",
            Self::ServerVerbinden => "server_verbinden",
            Self::ChatOeffnen => "chat_oeffnen",
            Self::NachrichtSenden => "nachricht_senden",
            Self::Tippen => "tippen",
            Self::Zurueck => "zurueck",
            Self::SitzungenGeaendert => "sitzungen_geaendert",
            Self::Taste(_) => "taste",
            Self::RelayBereit { .. } => "relay_bereit",
            Self::RelayFehlgeschlagen(_) => "relay_fehlgeschlagen",
            Self::DatensatzEmpfangen(_) => "datensatz_empfangen",
        }
    }
}

impl std::fmt::Debug for AppEreignis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Taste(t) => write!(f, "Taste({t:?})"),
            Self::RelayBereit { adresse, .. } => write!(f, "RelayBereit({adresse})"),
            Self::RelayFehlgeschlagen(grund) => write!(f, "RelayFehlgeschlagen({grund})"),
            Self::DatensatzEmpfangen(d) => write!(f, "DatensatzEmpfangen({d:?})"),
            anderes => f.write_str(anderes.name()),
        }
    }
}

/// Zustaende des Dispatchers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppZustand {
    Starten,
    /// Relay wird aufgebaut, eigene Adresse noch unbekannt
    ServerWirdErstellt,
    ServerBereit,
    /// Adresseingabe fuer einen neuen Chat
    NeuerChat,
    AktiverChat,
    Beendet,
}
