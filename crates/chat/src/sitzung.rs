//! Sitzung – geordneter Nachrichtenaustausch mit einem Peer
//!
//! Zwei dichte Listen pro Sitzung:
//! - `eigene`: nur abgeschickte Nachrichten, Sequenz = Index, nie umgeschrieben
//! - `empfangene`: Index = Sequenz des Absenders; Luecken werden mit leeren
//!   Platzhaltern aufgefuellt
//!
//! Ein Platzhalter markiert "Slot existiert, Inhalt nie gesehen". Er wird nur
//! gefuellt, wenn spaeter ein Datensatz genau diesen Index adressiert; eine
//! Wiederholungsanforderung gibt es im Protokoll nicht.

use chrono::{DateTime, Utc};
use plauder_core::PeerAdresse;
use plauder_protocol::Datensatz;
use std::iter::Peekable;
use std::net::SocketAddr;
use std::slice;

use crate::error::{ChatFehler, ChatResult};
use crate::senke::DatagrammSenke;
use crate::types::Nachricht;

/// Zustand einer Chat-Sitzung mit genau einem Peer
#[derive(Debug, Clone)]
pub struct Sitzung {
    adresse: PeerAdresse,
    transport_adresse: Option<SocketAddr>,
    eigene: Vec<Nachricht>,
    empfangene: Vec<Nachricht>,
}

impl Sitzung {
    /// Erstellt eine leere Sitzung; die Transportadresse bleibt `None`,
    /// wenn `adresse` keine literale `IP:Port`-Angabe ist
    pub fn neu(adresse: PeerAdresse) -> Self {
        let transport_adresse = match adresse.aufloesen() {
            Ok(addr) => Some(addr),
            Err(e) => {
                tracing::warn!(peer = %adresse, fehler = %e, "Peer-Adresse nicht aufloesbar");
                None
            }
        };
        Self {
            adresse,
            transport_adresse,
            eigene: Vec::new(),
            empfangene: Vec::new(),
        }
    }

    pub fn adresse(&self) -> &PeerAdresse {
        &self.adresse
    }

    pub fn transport_adresse(&self) -> Option<SocketAddr> {
        self.transport_adresse
    }

    pub fn eigene(&self) -> &[Nachricht] {
        &self.eigene
    }

    pub fn empfangene(&self) -> &[Nachricht] {
        &self.empfangene
    }

    /// Naechste freie eigene Sequenznummer (`ownCount`)
    pub fn eigene_anzahl(&self) -> u64 {
        self.eigene.len() as u64
    }

    /// Anzahl bekannter Empfangs-Slots (`recvCount`)
    pub fn empfangene_anzahl(&self) -> u64 {
        self.empfangene.len() as u64
    }

    // -----------------------------------------------------------------------
    // Eigene Nachrichten
    // -----------------------------------------------------------------------

    /// Haengt eine abgeschickte eigene Nachricht an und gibt ihre Sequenz zurueck
    pub fn eigene_hinzufuegen(&mut self, text: &str, absender: &PeerAdresse) -> u64 {
        self.eigene_hinzufuegen_um(text, absender, Utc::now())
    }

    pub fn eigene_hinzufuegen_um(
        &mut self,
        text: &str,
        absender: &PeerAdresse,
        zeitstempel: DateTime<Utc>,
    ) -> u64 {
        let sequenz = self.eigene_anzahl();
        self.eigene.push(Nachricht {
            text: text.to_string(),
            sequenz,
            zeitstempel,
            absender: absender.clone(),
            fertig: true,
            eigene: true,
            platzhalter: false,
        });
        sequenz
    }

    // -----------------------------------------------------------------------
    // Empfangene Nachrichten
    // -----------------------------------------------------------------------

    /// Uebernimmt einen empfangenen Datensatz
    pub fn empfangene_hinzufuegen(&mut self, datensatz: &Datensatz, anzeige_absender: &PeerAdresse) {
        self.empfangene_hinzufuegen_um(datensatz, anzeige_absender, Utc::now());
    }

    /// Wie [`Sitzung::empfangene_hinzufuegen`], mit explizitem Zeitstempel
    ///
    /// - `sequence >= recvCount`: Luecke `[recvCount, sequence)` mit leeren
    ///   Platzhaltern fuellen, dann den Text in Slot `sequence` schreiben
    /// - `sequence < recvCount`: Slot in-place ueberschreiben (Vorschau-Revision
    ///   oder spaetes Duplikat), Laenge bleibt gleich
    pub fn empfangene_hinzufuegen_um(
        &mut self,
        datensatz: &Datensatz,
        anzeige_absender: &PeerAdresse,
        zeitstempel: DateTime<Utc>,
    ) {
        let anzahl = self.empfangene_anzahl();

        if datensatz.sequence >= anzahl {
            for sequenz in anzahl..datensatz.sequence {
                self.empfangene.push(Nachricht::platzhalter(
                    sequenz,
                    zeitstempel,
                    anzeige_absender.clone(),
                    datensatz.finished,
                ));
            }
            self.empfangene.push(Nachricht {
                text: datensatz.text.clone(),
                sequenz: datensatz.sequence,
                zeitstempel,
                absender: anzeige_absender.clone(),
                fertig: datensatz.finished,
                eigene: false,
                platzhalter: false,
            });

            if datensatz.sequence > anzahl {
                tracing::debug!(
                    peer = %self.adresse,
                    von = anzahl,
                    bis = datensatz.sequence,
                    "Luecke mit Platzhaltern gefuellt"
                );
            }
        } else {
            // Index < recvCount, also vorhanden
            let slot = &mut self.empfangene[datensatz.sequence as usize];
            slot.text = datensatz.text.clone();
            slot.zeitstempel = zeitstempel;
            slot.fertig = datensatz.finished;
            slot.platzhalter = false;
        }
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Schickt eine Nachricht ab: lokal festschreiben, dann als fertigen
    /// Datensatz unter ihrer Sequenznummer versenden
    ///
    /// Die Nachricht bleibt auch dann festgeschrieben, wenn der Versand
    /// fehlschlaegt; eine Neuuebertragung gibt es nicht.
    pub fn senden(
        &mut self,
        text: &str,
        eigene_adresse: &PeerAdresse,
        senke: &dyn DatagrammSenke,
    ) -> ChatResult<u64> {
        let sequenz = self.eigene_hinzufuegen(text, eigene_adresse);
        let datensatz = Datensatz::neu(sequenz, text, true, eigene_adresse.clone());
        self.uebertragen(&datensatz, senke)?;
        Ok(sequenz)
    }

    /// Sendet eine Tipp-Vorschau unter der noch nicht vergebenen Sequenz
    /// `ownCount`, ohne lokalen Zustand zu aendern
    pub fn tippen(
        &self,
        text: &str,
        eigene_adresse: &PeerAdresse,
        senke: &dyn DatagrammSenke,
    ) -> ChatResult<()> {
        let datensatz = Datensatz::neu(self.eigene_anzahl(), text, false, eigene_adresse.clone());
        self.uebertragen(&datensatz, senke)
    }

    fn uebertragen(&self, datensatz: &Datensatz, senke: &dyn DatagrammSenke) -> ChatResult<()> {
        let ziel = self
            .transport_adresse
            .ok_or_else(|| ChatFehler::KeineTransportAdresse(self.adresse.clone()))?;
        senke.senden(datensatz, ziel)
    }

    // -----------------------------------------------------------------------
    // Verlauf
    // -----------------------------------------------------------------------

    /// Eigene und empfangene Nachrichten nach Zeitstempel verschraenkt
    ///
    /// Bei exakt gleichem Zeitstempel kommt die eigene Nachricht zuerst.
    /// Wird bei jedem Zeichnen neu berechnet (O(n)).
    pub fn verlauf(&self) -> Verlauf<'_> {
        Verlauf {
            eigene: self.eigene.iter().peekable(),
            empfangene: self.empfangene.iter().peekable(),
        }
    }
}

/// Lazy Merge-Iterator ueber den Verlauf einer Sitzung
pub struct Verlauf<'a> {
    eigene: Peekable<slice::Iter<'a, Nachricht>>,
    empfangene: Peekable<slice::Iter<'a, Nachricht>>,
}

impl<'a> Iterator for Verlauf<'a> {
    type Item = &'a Nachricht;

    fn next(&mut self) -> Option<Self::Item> {
        match (self.eigene.peek(), self.empfangene.peek()) {
            (Some(e), Some(r)) => {
                if r.zeitstempel < e.zeitstempel {
                    self.empfangene.next()
                } else {
                    self.eigene.next()
                }
            }
            (Some(_), None) => self.eigene.next(),
            (None, _) => self.empfangene.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.eigene.len() + self.empfangene.len();
        (n, Some(n))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
