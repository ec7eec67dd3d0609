//! Wire-Format fuer UDP-Datagramme
//!
//! Ein Datagramm = ein Datensatz, JSON-kodiert, ohne Laengenfeld.
//!
//! ## Datensatz-Format
//!
//! ```text
//! {
//!   "version":  1,                  // Protokollversion
//!   "sequence": 3,                  // Slot-Nummer der Nachricht beim Absender
//!   "text":     "hallo wel",        // vollstaendiger Text-Schnappschuss
//!   "finished": false,              // false = Tipp-Vorschau, true = abgeschickt
//!   "sender":   "198.51.100.4:50000" // angekuendigte Relay-Adresse des Absenders
//! }
//! ```
//!
//! Tipp-Vorschauen sind idempotente Vollueberschreibungen: jeder Tastendruck
//! sendet den gesamten bisherigen Text unter der kuenftigen Sequenznummer,
//! das Abschicken wiederholt dieselbe Sequenznummer mit `finished = true`.

use bytes::{BufMut, BytesMut};
use plauder_core::{PeerAdresse, PlauderError};
use serde::{Deserialize, Serialize};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Aktuelle Protokollversion
pub const PROTOKOLL_VERSION: u8 = 1;

/// Maximale Datagrammgroesse (Groesse des Empfangspuffers)
pub const MAX_DATAGRAMM_GROESSE: usize = 2048;

// ---------------------------------------------------------------------------
// Datensatz
// ---------------------------------------------------------------------------

/// Ein Nachrichten-Datensatz auf dem Draht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datensatz {
    /// Protokollversion (muss == `PROTOKOLL_VERSION` sein)
    pub version: u8,
    /// Sequenznummer des Nachrichten-Slots beim Absender
    pub sequence: u64,
    /// Text-Schnappschuss (UTF-8)
    pub text: String,
    /// Nachricht abgeschlossen (false = Tipp-Vorschau)
    pub finished: bool,
    /// Selbst angekuendigte Relay-Adresse des Absenders
    pub sender: PeerAdresse,
}

impl Datensatz {
    /// Erstellt einen Datensatz in der aktuellen Protokollversion
    pub fn neu(
        sequence: u64,
        text: impl Into<String>,
        finished: bool,
        sender: PeerAdresse,
    ) -> Self {
        Self {
            version: PROTOKOLL_VERSION,
            sequence,
            text: text.into(),
            finished,
            sender,
        }
    }

    /// Serialisiert den Datensatz in ein einzelnes Datagramm
    ///
    /// # Fehler
    /// - `InvalidData` wenn das Datagramm `MAX_DATAGRAMM_GROESSE` ueberschreitet
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let json = serde_json::to_vec(self).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > MAX_DATAGRAMM_GROESSE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                PlauderError::DatensatzZuGross {
                    groesse: json.len(),
                    max: MAX_DATAGRAMM_GROESSE,
                },
            ));
        }

        Ok(json)
    }

    /// Deserialisiert einen Datensatz aus einem vollstaendigen Datagramm
    ///
    /// # Fehler
    /// - `InvalidData` bei ungueltigem JSON oder fremder Protokollversion
    pub fn decode(daten: &[u8]) -> io::Result<Self> {
        let datensatz: Datensatz = serde_json::from_slice(daten).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                PlauderError::UngueltigerDatensatz(e.to_string()),
            )
        })?;

        if datensatz.version != PROTOKOLL_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                PlauderError::UngueltigerDatensatz(format!(
                    "Protokollversion {} (erwartet {})",
                    datensatz.version, PROTOKOLL_VERSION
                )),
            ));
        }

        Ok(datensatz)
    }
}

// ---------------------------------------------------------------------------
// DatensatzCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer datagramm-basierten Transport
///
/// Der Decoder behandelt den gesamten Puffer als genau ein Datagramm;
/// Teil-Lesevorgaenge gibt es bei UDP nicht.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatensatzCodec;

impl DatensatzCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for DatensatzCodec {
    type Item = Datensatz;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // Das ganze Datagramm verbrauchen, auch wenn es ungueltig ist
        let datagramm = src.split_to(src.len());
        Datensatz::decode(&datagramm).map(Some)
    }
}

impl Encoder<Datensatz> for DatensatzCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Datensatz, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let daten = item.encode()?;
        dst.reserve(daten.len());
        dst.put_slice(&daten);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn absender() -> PeerAdresse {
        PeerAdresse::neu("198.51.100.4:50000")
    }

    #[test]
    fn vorschau_und_abschluss_teilen_sequenz() {
        let vorschau = Datensatz::neu(3, "hal", false, absender());
        let fertig = Datensatz::neu(3, "hallo", true, absender());

        let v = Datensatz::decode(&vorschau.encode().unwrap()).unwrap();
        let f = Datensatz::decode(&fertig.encode().unwrap()).unwrap();

        assert_eq!(v.sequence, f.sequence);
        assert!(!v.finished);
        assert!(f.finished);
        assert_eq!(f.text, "hallo");
        assert_eq!(f.sender, absender());
    }

    #[test]
    fn utf8_text_bleibt_erhalten() {
        let datensatz = Datensatz::neu(0, "Grüße 👋🏽 日本", true, absender());
        let decoded = Datensatz::decode(&datensatz.encode().unwrap()).unwrap();
        assert_eq!(decoded, datensatz);
    }

    #[test]
    fn muell_wird_abgelehnt() {
        assert!(Datensatz::decode(b"Hello").is_err());
        assert!(Datensatz::decode(&[0xff, 0x00, 0x13]).is_err());
        assert!(Datensatz::decode(b"{\"sequence\":1}").is_err());
    }

    #[test]
    fn negative_sequenz_abgelehnt() {
        let json = br#"{"version":1,"sequence":-1,"text":"x","finished":true,"sender":"a"}"#;
        assert!(Datensatz::decode(json).is_err());
    }

    #[test]
    fn fremde_version_abgelehnt() {
        let json = br#"{"version":9,"sequence":0,"text":"x","finished":true,"sender":"a"}"#;
        let err = Datensatz::decode(json).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn zu_grosser_datensatz_wird_nicht_kodiert() {
        let text = "x".repeat(MAX_DATAGRAMM_GROESSE);
        let gross = Datensatz::neu(0, text, false, absender());
        assert!(gross.encode().is_err());
    }

    #[test]
    fn codec_verbraucht_ganzes_datagramm() {
        let mut codec = DatensatzCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(Datensatz::neu(7, "welt", true, absender()), &mut buf)
            .unwrap();

        let decoded = codec.decode(&mut buf).unwrap().expect("Datensatz erwartet");
        assert_eq!(decoded.sequence, 7);
        assert!(buf.is_empty());

        // Leerer Puffer: kein Datensatz
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn codec_verwirft_ungueltiges_datagramm_vollstaendig() {
        let mut codec = DatensatzCodec::new();
        let mut buf = BytesMut::from(&b"kein json"[..]);
        assert!(codec.decode(&mut buf).is_err());
        assert!(buf.is_empty());
    }
}
