//! Sitzungsverzeichnis – Peer-Adresse -> Sitzung
//!
//! Sitzungen entstehen beim ersten Kontakt (lokal gestartet oder erster
//! Datensatz eines unbekannten Absenders) und leben so lange wie das
//! Verzeichnis. Die Erstellungsreihenfolge ist die Anzeigereihenfolge.
//!
//! Schluessel ist die kanonische Schreibweise der Adresse, damit getippte
//! und angekuendigte Formen desselben Peers auf eine Sitzung fallen.

use plauder_core::PeerAdresse;
use plauder_protocol::Datensatz;
use std::collections::HashMap;

use crate::error::{ChatFehler, ChatResult};
use crate::senke::DatagrammSenke;
use crate::sitzung::Sitzung;

/// Standardwert fuer die groesste akzeptierte Sequenzluecke
pub const STANDARD_MAX_LUECKE: u64 = 1024;

/// Alle Sitzungen eines verbundenen Relays
pub struct Verzeichnis {
    /// Eigene angekuendigte Relay-Adresse (None bis das Relay bereit ist)
    eigene_adresse: Option<PeerAdresse>,
    /// Versand-Handle des Relays
    senke: Option<Box<dyn DatagrammSenke>>,
    /// Sitzungen in Erstellungsreihenfolge
    sitzungen: Vec<Sitzung>,
    /// Peer-Adresse -> Index in `sitzungen`
    index: HashMap<PeerAdresse, usize>,
    /// Fokus-Index der Oberflaeche
    fokus: usize,
    /// Hoechstens so viele Platzhalter darf ein einzelner Datensatz erzeugen
    max_luecke: u64,
}

impl Default for Verzeichnis {
    fn default() -> Self {
        Self::mit_max_luecke(STANDARD_MAX_LUECKE)
    }
}

impl Verzeichnis {
    /// Erstellt ein leeres Verzeichnis ohne Relay
    pub fn neu() -> Self {
        Self::default()
    }

    /// Wie [`Verzeichnis::neu`], mit eigener Obergrenze fuer Sequenzluecken
    pub fn mit_max_luecke(max_luecke: u64) -> Self {
        Self {
            eigene_adresse: None,
            senke: None,
            sitzungen: Vec::new(),
            index: HashMap::new(),
            fokus: 0,
            max_luecke,
        }
    }

    /// Verknuepft das Verzeichnis mit dem bereiten Relay
    pub fn relay_setzen(&mut self, eigene_adresse: PeerAdresse, senke: Box<dyn DatagrammSenke>) {
        tracing::info!(adresse = %eigene_adresse, "Eigene Relay-Adresse bekannt");
        self.eigene_adresse = Some(eigene_adresse);
        self.senke = Some(senke);
    }

    pub fn eigene_adresse(&self) -> Option<&PeerAdresse> {
        self.eigene_adresse.as_ref()
    }

    /// Relay bereit (eigene Adresse bekannt)
    pub fn ist_bereit(&self) -> bool {
        self.eigene_adresse.is_some()
    }

    pub fn sitzungen(&self) -> &[Sitzung] {
        &self.sitzungen
    }

    pub fn sitzung(&self, index: usize) -> Option<&Sitzung> {
        self.sitzungen.get(index)
    }

    /// Liefert den Index der Sitzung fuer `adresse`, legt sie bei Bedarf an
    pub fn holen_oder_erstellen(&mut self, adresse: &PeerAdresse) -> usize {
        let schluessel = adresse.normalisiert();
        if let Some(&i) = self.index.get(&schluessel) {
            return i;
        }

        let i = self.sitzungen.len();
        self.sitzungen.push(Sitzung::neu(schluessel.clone()));
        tracing::info!(peer = %schluessel, index = i, "Neue Sitzung angelegt");
        self.index.insert(schluessel, i);
        i
    }

    /// Startet (oder findet) eine Sitzung zu einer eingegebenen Adresse
    ///
    /// Nicht aufloesbare Adressen werden abgelehnt, bevor eine Sitzung
    /// entsteht.
    pub fn verbinden(&mut self, eingabe: &str) -> ChatResult<usize> {
        let adresse = PeerAdresse::neu(eingabe);
        adresse.aufloesen()?;
        Ok(self.holen_oder_erstellen(&adresse))
    }

    /// Wendet einen empfangenen Datensatz auf die Sitzung seines Absenders an
    ///
    /// Ein Datensatz, der mehr als `max_luecke` Platzhalter erzeugen wuerde,
    /// wird ganz verworfen; fuer einen unbekannten Absender entsteht dann
    /// auch keine Sitzung.
    pub fn datensatz_anwenden(&mut self, datensatz: &Datensatz) -> ChatResult<usize> {
        let schluessel = datensatz.sender.normalisiert();
        let bekannt = self
            .index
            .get(&schluessel)
            .map_or(0, |&i| self.sitzungen[i].empfangene_anzahl());
        let luecke = datensatz.sequence.saturating_sub(bekannt);
        if luecke > self.max_luecke {
            return Err(ChatFehler::LueckeZuGross {
                peer: schluessel,
                luecke,
                max: self.max_luecke,
            });
        }

        let i = self.holen_oder_erstellen(&schluessel);
        self.sitzungen[i].empfangene_hinzufuegen(datensatz, &schluessel);
        Ok(i)
    }

    // -----------------------------------------------------------------------
    // Fokus
    // -----------------------------------------------------------------------

    pub fn fokus(&self) -> usize {
        self.fokus
    }

    /// Setzt den Fokus; ausserhalb des Bereichs passiert nichts
    pub fn fokus_setzen(&mut self, index: usize) -> bool {
        if index < self.sitzungen.len() {
            self.fokus = index;
            true
        } else {
            tracing::debug!(index, anzahl = self.sitzungen.len(), "Fokus ausserhalb des Bereichs");
            false
        }
    }

    /// Index der fokussierten Sitzung, falls gueltig
    pub fn fokussiert(&self) -> Option<usize> {
        (self.fokus < self.sitzungen.len()).then_some(self.fokus)
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Schickt eine Nachricht in der Sitzung `index` ab
    pub fn senden(&mut self, index: usize, text: &str) -> ChatResult<u64> {
        let (eigene, senke) = match (&self.eigene_adresse, &self.senke) {
            (Some(a), Some(s)) => (a, s.as_ref()),
            _ => return Err(ChatFehler::NichtVerbunden),
        };
        let sitzung = self
            .sitzungen
            .get_mut(index)
            .ok_or(ChatFehler::SitzungNichtGefunden(index))?;
        sitzung.senden(text, eigene, senke)
    }

    /// Sendet eine Tipp-Vorschau in der Sitzung `index`
    pub fn tippen(&self, index: usize, text: &str) -> ChatResult<()> {
        let (eigene, senke) = match (&self.eigene_adresse, &self.senke) {
            (Some(a), Some(s)) => (a, s.as_ref()),
            _ => return Err(ChatFehler::NichtVerbunden),
        };
        let sitzung = self
            .sitzungen
            .get(index)
            .ok_or(ChatFehler::SitzungNichtGefunden(index))?;
        sitzung.tippen(text, eigene, senke)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
