//! RelayKanal – gemeinsame Schnittstelle fuer TURN- und lokale Endpunkte
//!
//! Empfangs-Loop und Sende-Task arbeiten nur gegen diesen Trait und wissen
//! nicht, ob darunter eine TURN-Allokation oder ein einfacher Socket liegt.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use turn::client::Client;
use webrtc_util::Conn;

/// Datagramm-Endpunkt mit angekuendigter Adresse
#[async_trait]
pub trait RelayKanal: Send + Sync {
    /// Sendet ein Datagramm an `ziel`
    async fn senden_an(&self, daten: &[u8], ziel: SocketAddr) -> io::Result<usize>;

    /// Wartet auf das naechste Datagramm
    async fn empfangen(&self, puffer: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Die Adresse, unter der Peers uns erreichen
    fn angekuendigte_adresse(&self) -> SocketAddr;

    /// Gibt Relay-Ressourcen frei
    async fn schliessen(&self);
}

// ---------------------------------------------------------------------------
// LokalKanal
// ---------------------------------------------------------------------------

/// Einfacher UDP-Socket; angekuendigt wird die lokale Adresse
pub struct LokalKanal {
    socket: UdpSocket,
    adresse: SocketAddr,
}

impl LokalKanal {
    pub async fn binden(bind_addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        let adresse = socket.local_addr()?;
        tracing::info!(addr = %adresse, "Lokaler UDP-Socket gebunden");
        Ok(Self { socket, adresse })
    }
}

#[async_trait]
impl RelayKanal for LokalKanal {
    async fn senden_an(&self, daten: &[u8], ziel: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(daten, ziel).await
    }

    async fn empfangen(&self, puffer: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(puffer).await
    }

    fn angekuendigte_adresse(&self) -> SocketAddr {
        self.adresse
    }

    async fn schliessen(&self) {}
}

// ---------------------------------------------------------------------------
// TurnKanal
// ---------------------------------------------------------------------------

/// TURN-Allokation; angekuendigt wird die Relay-Adresse der Allokation
///
/// Der `Client` muss so lange leben wie die Allokation, da er sie
/// periodisch erneuert.
pub struct TurnKanal {
    client: Client,
    relay: Arc<dyn Conn + Send + Sync>,
    adresse: SocketAddr,
}

impl TurnKanal {
    pub(crate) fn neu(client: Client, relay: Arc<dyn Conn + Send + Sync>, adresse: SocketAddr) -> Self {
        Self {
            client,
            relay,
            adresse,
        }
    }
}

fn turn_io_fehler(e: webrtc_util::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

#[async_trait]
impl RelayKanal for TurnKanal {
    async fn senden_an(&self, daten: &[u8], ziel: SocketAddr) -> io::Result<usize> {
        self.relay.send_to(daten, ziel).await.map_err(turn_io_fehler)
    }

    async fn empfangen(&self, puffer: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.relay.recv_from(puffer).await.map_err(turn_io_fehler)
    }

    fn angekuendigte_adresse(&self) -> SocketAddr {
        self.adresse
    }

    async fn schliessen(&self) {
        if let Err(e) = self.relay.close().await {
            tracing::debug!(fehler = %e, "Relay-Verbindung schliessen fehlgeschlagen");
        }
        if let Err(e) = self.client.close().await {
            tracing::debug!(fehler = %e, "TURN-Client schliessen fehlgeschlagen");
        }
    }
}
