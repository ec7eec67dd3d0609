//! Empfangs-Loop und Sende-Queue
//!
//! ## Architektur
//!
//! ```text
//! RelayKanal::empfangen()
//!     |
//!     v
//! DatensatzCodec::decode()       <- ungueltig: verwerfen, zaehlen, weiter
//!     |
//!     v
//! broadcast::Sender<Datensatz>   <- begrenzt, aelteste werden verdraengt
//!     |
//!     v
//! Dispatcher (einziger Konsument, einziger Schreiber auf Sitzungen)
//! ```
//!
//! Die Loop fasst keine Sitzungen an. Gesendet wird ueber eine begrenzte
//! mpsc-Queue, die ein eigener Task leert; `SendeHandle::senden` blockiert
//! daher nie.

use bytes::{Bytes, BytesMut};
use plauder_chat::{ChatFehler, ChatResult, DatagrammSenke};
use plauder_protocol::{Datensatz, DatensatzCodec, MAX_DATAGRAMM_GROESSE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::codec::{Decoder, Encoder};

use crate::kanal::RelayKanal;

// ---------------------------------------------------------------------------
// SendeHandle
// ---------------------------------------------------------------------------

/// Handle auf die Sende-Queue eines Relay-Kanals
///
/// Der Sende-Task endet, sobald alle Handles gedroppt sind.
#[derive(Debug, Clone)]
pub struct SendeHandle {
    tx: mpsc::Sender<(Bytes, SocketAddr)>,
}

impl SendeHandle {
    /// Startet den Sende-Task fuer `kanal`
    pub fn starten(kanal: Arc<dyn RelayKanal>, queue_groesse: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<(Bytes, SocketAddr)>(queue_groesse.max(1));

        tokio::spawn(async move {
            while let Some((daten, ziel)) = rx.recv().await {
                match kanal.senden_an(&daten, ziel).await {
                    Ok(_) => {
                        tracing::trace!(bytes = daten.len(), ziel = %ziel, "Datagramm gesendet");
                    }
                    Err(e) => {
                        tracing::warn!(fehler = %e, ziel = %ziel, "UDP-Sendefehler");
                    }
                }
            }
            tracing::debug!("Sende-Task beendet");
        });

        Self { tx }
    }
}

impl DatagrammSenke for SendeHandle {
    fn senden(&self, datensatz: &Datensatz, ziel: SocketAddr) -> ChatResult<()> {
        let mut puffer = BytesMut::new();
        DatensatzCodec::new()
            .encode(datensatz.clone(), &mut puffer)
            .map_err(|e| ChatFehler::Senden(e.to_string()))?;

        self.tx
            .try_send((puffer.freeze(), ziel))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    ChatFehler::Senden("Sende-Queue voll, Datagramm verworfen".into())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    ChatFehler::Senden("Sende-Task beendet".into())
                }
            })
    }
}

// ---------------------------------------------------------------------------
// Empfangs-Loop
// ---------------------------------------------------------------------------

/// Zaehler der Empfangs-Loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmpfangsStatistik {
    /// Empfangene Datagramme
    pub datagramme: u64,
    /// Erfolgreich dekodierte Datensaetze
    pub datensaetze: u64,
    /// Verworfene (nicht dekodierbare) Datagramme
    pub verworfen: u64,
}

/// Empfaengt Datagramme bis `shutdown_rx` `true` meldet
pub(crate) async fn empfangs_loop(
    kanal: &dyn RelayKanal,
    ausgang: &broadcast::Sender<Datensatz>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> EmpfangsStatistik {
    // Ein Puffer fuer die ganze Loop
    let mut puffer = BytesMut::zeroed(MAX_DATAGRAMM_GROESSE);
    let mut codec = DatensatzCodec::new();
    let mut statistik = EmpfangsStatistik::default();

    tracing::info!(adresse = %kanal.angekuendigte_adresse(), "Empfangs-Loop gestartet");

    loop {
        tokio::select! {
            result = kanal.empfangen(&mut puffer[..]) => {
                match result {
                    Ok((len, quelle)) => {
                        statistik.datagramme += 1;
                        puffer.truncate(len);
                        match codec.decode(&mut puffer) {
                            Ok(Some(datensatz)) => {
                                statistik.datensaetze += 1;
                                tracing::trace!(
                                    quelle = %quelle,
                                    absender = %datensatz.sender,
                                    sequence = datensatz.sequence,
                                    finished = datensatz.finished,
                                    "Datensatz empfangen"
                                );
                                if ausgang.send(datensatz).is_err() {
                                    tracing::debug!("Kein Empfaenger fuer Datensatz");
                                }
                            }
                            Ok(None) => {
                                statistik.verworfen += 1;
                                tracing::debug!(quelle = %quelle, "Leeres Datagramm verworfen");
                            }
                            Err(e) => {
                                statistik.verworfen += 1;
                                tracing::debug!(
                                    fehler = %e,
                                    quelle = %quelle,
                                    verworfen = statistik.verworfen,
                                    "Ungueltiges Datagramm verworfen"
                                );
                            }
                        }
                        puffer.clear();
                        puffer.resize(MAX_DATAGRAMM_GROESSE, 0);
                    }
                    Err(e) => {
                        tracing::error!(fehler = %e, "UDP-Empfangsfehler");
                        // Kurze Pause um Busy-Loop bei persistentem Fehler zu vermeiden
                        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    }
                }
            }

            aenderung = shutdown_rx.changed() => {
                if aenderung.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Empfangs-Loop: Shutdown-Signal empfangen");
                    break;
                }
            }
        }
    }

    tracing::info!(
        datagramme = statistik.datagramme,
        datensaetze = statistik.datensaetze,
        verworfen = statistik.verworfen,
        "Empfangs-Loop beendet"
    );
    statistik
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kanal::LokalKanal;
    use plauder_core::PeerAdresse;
    use std::net::{IpAddr, Ipv4Addr};

    fn localhost(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[tokio::test]
    async fn sende_handle_kodiert_und_sendet() {
        let a: Arc<dyn RelayKanal> = Arc::new(LokalKanal::binden(localhost(0)).await.unwrap());
        let b = LokalKanal::binden(localhost(0)).await.unwrap();

        let handle = SendeHandle::starten(Arc::clone(&a), 8);
        let datensatz = Datensatz::neu(4, "hallo", true, PeerAdresse::from(a.angekuendigte_adresse()));
        handle.senden(&datensatz, b.angekuendigte_adresse()).unwrap();

        let mut puffer = [0u8; MAX_DATAGRAMM_GROESSE];
        let (n, _) = b.empfangen(&mut puffer).await.unwrap();
        assert_eq!(Datensatz::decode(&puffer[..n]).unwrap(), datensatz);
    }

    #[tokio::test]
    async fn sende_handle_lehnt_zu_grosse_datensaetze_ab() {
        let a: Arc<dyn RelayKanal> = Arc::new(LokalKanal::binden(localhost(0)).await.unwrap());
        let handle = SendeHandle::starten(a, 8);
        let riesig = Datensatz::neu(0, "x".repeat(4096), false, PeerAdresse::neu("a"));
        assert!(matches!(
            handle.senden(&riesig, localhost(9)),
            Err(ChatFehler::Senden(_))
        ));
    }

    #[tokio::test]
    async fn loop_verwirft_muell_und_leitet_datensaetze_weiter() {
        let kanal = LokalKanal::binden(localhost(0)).await.unwrap();
        let ziel = kanal.angekuendigte_adresse();
        let (tx, mut rx) = broadcast::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let loop_task = tokio::spawn(async move {
            empfangs_loop(&kanal, &tx, shutdown_rx).await
        });

        let peer = tokio::net::UdpSocket::bind(localhost(0)).await.unwrap();
        peer.send_to(b"Hello", ziel).await.unwrap();
        let gueltig = Datensatz::neu(0, "hi", true, PeerAdresse::neu("198.51.100.4:50000"));
        peer.send_to(&gueltig.encode().unwrap(), ziel).await.unwrap();

        let empfangen = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("Datensatz muss ankommen")
            .unwrap();
        assert_eq!(empfangen, gueltig);

        shutdown_tx.send(true).unwrap();
        let statistik = loop_task.await.unwrap();
        assert_eq!(statistik.datagramme, 2);
        assert_eq!(statistik.datensaetze, 1);
        assert_eq!(statistik.verworfen, 1);
    }
}
