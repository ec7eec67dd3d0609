//! Verbindungsaufbau – TURN-Allokation mit Zeitlimits und Backoff
//!
//! ## Ablauf (Modus `turn`)
//!
//! ```text
//! UDP-Socket binden
//!     |
//!     v
//! TURN-Client anlegen (Zugangsdaten, Realm)
//!     |
//!     v
//! listen()                 <- Zeitlimit
//!     |
//!     v
//! allocate()               <- Zeitlimit, liefert Relay-Adresse
//!     |
//!     v
//! send_binding_request()   <- Zeitlimit, liefert gemappte Adresse
//! ```
//!
//! Schlaegt ein Schritt fehl, wird der gesamte Handshake bis zu
//! `max_versuche` mal mit exponentiellem Backoff wiederholt.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, watch};
use turn::client::{Client, ClientConfig};
use webrtc_util::Conn;

use crate::config::{RelayConfig, RelayModus};
use crate::error::{RelayFehler, RelayResult};
use crate::kanal::{LokalKanal, RelayKanal, TurnKanal};
use crate::udp::{self, EmpfangsStatistik, SendeHandle};
use plauder_protocol::Datensatz;

/// Verbundener Relay-Transport
///
/// Haelt den Kanal und die Sende-Queue. Die Empfangs-Loop wird mit
/// [`RelayTransport::empfangs_loop_starten`] betrieben.
pub struct RelayTransport {
    kanal: Arc<dyn RelayKanal>,
    sender: SendeHandle,
}

impl RelayTransport {
    /// Baut den Transport gemaess Konfiguration auf
    ///
    /// Wiederholbare Fehler fuehren zu bis zu `max_versuche` Versuchen;
    /// danach `RelayFehler::NichtErreichbar`.
    pub async fn verbinden(config: &RelayConfig) -> RelayResult<Self> {
        config.pruefen()?;
        let max_versuche = config.max_versuche.max(1);

        let mut versuch = 1;
        let kanal = loop {
            match einmal_verbinden(config).await {
                Ok(kanal) => break kanal,
                Err(e) if !e.ist_wiederholbar() => return Err(e),
                Err(e) if versuch >= max_versuche => {
                    return Err(RelayFehler::NichtErreichbar {
                        versuche: versuch,
                        letzter: e.to_string(),
                    });
                }
                Err(e) => {
                    let warte = config.backoff(versuch);
                    tracing::warn!(
                        versuch,
                        max_versuche,
                        warte_ms = warte.as_millis() as u64,
                        fehler = %e,
                        "Relay-Verbindung fehlgeschlagen, neuer Versuch"
                    );
                    tokio::time::sleep(warte).await;
                    versuch += 1;
                }
            }
        };

        Ok(Self::mit_kanal(kanal, config.sende_queue_groesse))
    }

    /// Erstellt den Transport auf einem bereits verbundenen Kanal
    pub fn mit_kanal(kanal: Arc<dyn RelayKanal>, sende_queue_groesse: usize) -> Self {
        let sender = SendeHandle::starten(Arc::clone(&kanal), sende_queue_groesse);
        Self { kanal, sender }
    }

    /// Die angekuendigte eigene Adresse
    pub fn adresse(&self) -> SocketAddr {
        self.kanal.angekuendigte_adresse()
    }

    /// Handle zum Versenden (klonbar)
    pub fn sende_handle(&self) -> SendeHandle {
        self.sender.clone()
    }

    /// Betreibt die Empfangs-Loop bis `shutdown_rx` `true` meldet
    ///
    /// Gibt danach die Relay-Ressourcen frei.
    pub async fn empfangs_loop_starten(
        self,
        ausgang: broadcast::Sender<Datensatz>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> EmpfangsStatistik {
        let statistik = udp::empfangs_loop(self.kanal.as_ref(), &ausgang, shutdown_rx).await;
        self.kanal.schliessen().await;
        statistik
    }
}

// ---------------------------------------------------------------------------
// Einzelner Versuch
// ---------------------------------------------------------------------------

async fn einmal_verbinden(config: &RelayConfig) -> RelayResult<Arc<dyn RelayKanal>> {
    let bind_addr = config.bind_socket_adresse()?;
    match config.modus {
        RelayModus::Lokal => Ok(Arc::new(LokalKanal::binden(bind_addr).await?)),
        RelayModus::Turn => Ok(Arc::new(turn_allokieren(config, bind_addr).await?)),
    }
}

async fn turn_allokieren(config: &RelayConfig, bind_addr: SocketAddr) -> RelayResult<TurnKanal> {
    let socket = UdpSocket::bind(bind_addr).await?;
    tracing::debug!(lokal = %socket.local_addr()?, turn = %config.turn_server, "TURN-Handshake startet");

    let client = Client::new(ClientConfig {
        stun_serv_addr: config.stun_server_oder_turn().to_string(),
        turn_serv_addr: config.turn_server.clone(),
        username: config.benutzername.clone(),
        password: config.passwort.clone(),
        realm: config.realm.clone(),
        software: String::new(),
        rto_in_ms: 0,
        conn: Arc::new(socket),
        vnet: None,
    })
    .await
    .map_err(|e| turn_fehler("client", e))?;

    match handshake(config, &client).await {
        Ok((relay, relay_addr)) => Ok(TurnKanal::neu(client, relay, relay_addr)),
        Err(e) => {
            // Halb aufgebauten Client nicht weiterlaufen lassen
            if let Err(close_err) = client.close().await {
                tracing::debug!(fehler = %close_err, "TURN-Client schliessen fehlgeschlagen");
            }
            Err(e)
        }
    }
}

async fn handshake(
    config: &RelayConfig,
    client: &Client,
) -> RelayResult<(Arc<dyn Conn + Send + Sync>, SocketAddr)> {
    mit_zeitlimit(config, "listen", client.listen()).await?;

    let relay_conn = mit_zeitlimit(config, "allocate", client.allocate()).await?;
    let relay_addr = relay_conn
        .local_addr()
        .map_err(|e| turn_fehler("relay-adresse", e))?;
    tracing::info!(relay_adresse = %relay_addr, "TURN-Allokation erhalten");

    let gemappt = mit_zeitlimit(config, "binding-request", client.send_binding_request()).await?;
    tracing::info!(gemappte_adresse = %gemappt, "Binding-Request beantwortet");

    Ok((Arc::new(relay_conn), relay_addr))
}

/// Fuehrt einen Handshake-Schritt unter dem konfigurierten Zeitlimit aus
async fn mit_zeitlimit<T, E, F>(config: &RelayConfig, schritt: &'static str, f: F) -> RelayResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(config.zeitlimit(), f).await {
        Ok(Ok(wert)) => Ok(wert),
        Ok(Err(e)) => Err(turn_fehler(schritt, e)),
        Err(_) => Err(RelayFehler::Zeitlimit {
            schritt,
            ms: config.timeout_ms,
        }),
    }
}

fn turn_fehler(schritt: &'static str, e: impl std::fmt::Display) -> RelayFehler {
    RelayFehler::Turn {
        schritt,
        grund: e.to_string(),
    }
}
