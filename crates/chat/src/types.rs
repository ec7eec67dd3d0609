//! Oeffentliche Typen fuer Chat-Sitzungen

use chrono::{DateTime, Utc};
use plauder_core::PeerAdresse;

/// Eine Chat-Nachricht in einer Sitzung
///
/// Solange `fertig == false` ist, wird der Slot von spaeteren Vorschauen
/// derselben Sequenznummer ueberschrieben.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nachricht {
    pub text: String,
    pub sequenz: u64,
    pub zeitstempel: DateTime<Utc>,
    pub absender: PeerAdresse,
    /// Abgeschlossen (true) oder noch im Entstehen (false)
    pub fertig: bool,
    /// Lokal verfasst (true) oder empfangen (false)
    pub eigene: bool,
    /// Slot einer Luecke, noch von keinem Datensatz adressiert
    pub platzhalter: bool,
}

impl Nachricht {
    /// Leerer Platzhalter fuer einen uebersprungenen Slot
    pub(crate) fn platzhalter(
        sequenz: u64,
        zeitstempel: DateTime<Utc>,
        absender: PeerAdresse,
        fertig: bool,
    ) -> Self {
        Self {
            text: String::new(),
            sequenz,
            zeitstempel,
            absender,
            fertig,
            eigene: false,
            platzhalter: true,
        }
    }

    /// Ein Slot, dessen Inhalt hier nie beobachtet wurde
    ///
    /// Eine leere Vorschau (Peer hat alles geloescht) ist kein Platzhalter.
    pub fn ist_platzhalter(&self) -> bool {
        self.platzhalter
    }

    /// Text fuer die Anzeige; unfertige Nachrichten enden mit "..."
    pub fn anzeige_text(&self) -> String {
        if self.fertig {
            self.text.clone()
        } else {
            format!("{}...", self.text)
        }
    }
}
