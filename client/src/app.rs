//! App – Ereignis-Dispatcher und Zustandsautomat
//!
//! Einziger Konsument des Ereigniskanals und einziger Schreiber auf
//! Verzeichnis und Sitzungen. Die Empfangs-Loop des Relays legt dekodierte
//! Datensaetze nur in eine begrenzte Queue; angewendet werden sie hier.
//!
//! ## Zustandsuebergaenge
//!
//! ```text
//! Starten            --server_erstellen--> ServerWirdErstellt --relay_bereit--> ServerBereit
//! ServerBereit       --chat_erstellen----> NeuerChat
//! NeuerChat          --server_verbinden--> AktiverChat
//! ServerBereit       --chat_oeffnen------> AktiverChat
//! AktiverChat        --zurueck-----------> ServerBereit
//! NeuerChat          --zurueck-----------> ServerBereit
//! ServerBereit       --zurueck-----------> Starten
//! *                  --beenden-----------> Beendet
//! ```
//!
//! Kein Handler blockiert: Senden geht in die Sende-Queue, der
//! Verbindungsaufbau laeuft in einem eigenen Task.

use plauder_chat::{DatagrammSenke, Verzeichnis};
use plauder_core::PeerAdresse;
use plauder_protocol::Datensatz;
use plauder_relay::{RelayConfig, RelayTransport};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::ereignis::{AppEreignis, AppZustand};
use crate::ui::{
    befehl_fuer, Ansicht, Befehl, BildschirmArt, BildschirmKonfig, Eingabe, Menue, Oberflaeche,
    Taste,
};

/// Wartezeit auf das Aufraeumen des Relay-Tasks beim Beenden
const RELAY_ABBAU_ZEITLIMIT: Duration = Duration::from_secs(2);

/// Laufender Relay-Task
struct RelayAufgabe {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Dispatcher mit Zustandsautomat
pub struct App<U: Oberflaeche> {
    zustand: AppZustand,
    verzeichnis: Verzeichnis,
    ui: U,
    bildschirm: BildschirmKonfig,
    menue: Menue,
    eingabe: Eingabe,
    /// Validierungsfehler des aktuellen Bildschirms
    status: Option<String>,

    relay_config: RelayConfig,
    relay: Option<RelayAufgabe>,
    /// Beim Beenden noch abzuwartender Relay-Task
    ausstehend: Option<JoinHandle<()>>,
    /// Fataler Fehler, mit dem das Programm endet
    fehler: Option<String>,

    ereignis_tx: mpsc::UnboundedSender<AppEreignis>,
    ereignis_rx: mpsc::UnboundedReceiver<AppEreignis>,
    /// Eingangsqueue des aktuellen Relays, pro Relay neu angelegt
    eingang_tx: broadcast::Sender<Datensatz>,
    eingang_rx: broadcast::Receiver<Datensatz>,
    eingang_groesse: usize,
    max_luecke: u64,
}

impl<U: Oberflaeche> App<U> {
    /// Erstellt den Dispatcher im Zustand `Starten`
    pub fn neu(config: &ClientConfig, mut ui: U) -> Self {
        let (ereignis_tx, ereignis_rx) = mpsc::unbounded_channel();
        let eingang_groesse = config.eingang.puffer_groesse.max(1);
        let (eingang_tx, eingang_rx) = broadcast::channel(eingang_groesse);

        let bildschirm = BildschirmKonfig::start();
        ui.bildschirm_wechseln(bildschirm);

        Self {
            zustand: AppZustand::Starten,
            verzeichnis: Verzeichnis::mit_max_luecke(config.eingang.max_luecke),
            ui,
            bildschirm,
            menue: Menue::start(),
            eingabe: Eingabe::default(),
            status: None,
            relay_config: config.relay.clone(),
            relay: None,
            ausstehend: None,
            fehler: None,
            ereignis_tx,
            ereignis_rx,
            eingang_tx,
            eingang_rx,
            eingang_groesse,
            max_luecke: config.eingang.max_luecke,
        }
    }

    /// Sender fuer Ereignisse von aussen (Terminal-Thread)
    pub fn ereignis_sender(&self) -> mpsc::UnboundedSender<AppEreignis> {
        self.ereignis_tx.clone()
    }

    pub fn zustand(&self) -> AppZustand {
        self.zustand
    }

    pub fn verzeichnis(&self) -> &Verzeichnis {
        &self.verzeichnis
    }

    /// Verarbeitet Ereignisse bis zum Zustand `Beendet`
    ///
    /// Endet mit einem Fehler, wenn das Relay nicht erreichbar war.
    pub async fn ausfuehren(&mut self) -> anyhow::Result<()> {
        tracing::info!("Dispatcher gestartet");
        self.neu_zeichnen();

        while self.zustand != AppZustand::Beendet {
            let ereignis = tokio::select! {
                ereignis = self.ereignis_rx.recv() => match ereignis {
                    Some(e) => e,
                    None => break,
                },
                datensatz = self.eingang_rx.recv() => match datensatz {
                    Ok(d) => AppEreignis::DatensatzEmpfangen(d),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(verworfen = n, "Eingangsqueue uebergelaufen, aelteste Datensaetze verworfen");
                        continue;
                    }
                    // Der Dispatcher haelt selbst einen Sender
                    Err(broadcast::error::RecvError::Closed) => continue,
                },
            };
            self.verarbeiten(ereignis);
        }

        self.relay_abwarten().await;
        tracing::info!("Dispatcher beendet");

        match self.fehler.take() {
            Some(f) => Err(anyhow::anyhow!("Relay nicht erreichbar: {f}")),
            None => Ok(()),
        }
    }

    /// Verarbeitet ein einzelnes Ereignis und zeichnet neu
    pub fn verarbeiten(&mut self, ereignis: AppEreignis) {
        tracing::debug!(ereignis = ereignis.name(), zustand = ?self.zustand, "Ereignis");

        match ereignis {
            AppEreignis::Beenden => self.beenden(),
            AppEreignis::ServerErstellen => self.server_erstellen(),
            AppEreignis::ChatErstellen => self.chat_erstellen(),
            AppEreignis::ServerVerbinden => self.server_verbinden(),
            AppEreignis::ChatOeffnen => self.chat_oeffnen(),
            AppEreignis::NachrichtSenden => self.nachricht_senden(),
            AppEreignis::Tippen => self.tippen(),
            AppEreignis::Zurueck => self.zurueck(),
            AppEreignis::SitzungenGeaendert => {}
            AppEreignis::Taste(taste) => {
                if let Some(abgeleitet) = self.taste_uebersetzen(taste) {
                    return self.verarbeiten(abgeleitet);
                }
            }
            AppEreignis::RelayBereit { adresse, sender } => self.relay_bereit(adresse, sender),
            AppEreignis::RelayFehlgeschlagen(grund) => self.relay_fehlgeschlagen(grund),
            AppEreignis::DatensatzEmpfangen(d) => self.datensatz_empfangen(&d),
        }

        self.neu_zeichnen();
    }

    // -----------------------------------------------------------------------
    // Tasten
    // -----------------------------------------------------------------------

    /// Uebersetzt eine Taste in ein Ereignis
    ///
    /// Reihenfolge: Strg-C, Tippen, Menue, Tastenzuordnung des Zustands.
    fn taste_uebersetzen(&mut self, taste: Taste) -> Option<AppEreignis> {
        if taste == Taste::StrgC {
            return Some(AppEreignis::Beenden);
        }

        if self.bildschirm.tippen_aktiv {
            match taste {
                Taste::Zeichen(c) => {
                    self.eingabe.anhaengen(c);
                    return Some(AppEreignis::Tippen);
                }
                Taste::Ruecktaste => {
                    self.eingabe.letztes_entfernen();
                    return Some(AppEreignis::Tippen);
                }
                _ => {}
            }
        }

        if self.bildschirm.menue_aktiv {
            match taste {
                Taste::Hoch => {
                    self.menue.hoch();
                    return None;
                }
                Taste::Runter => {
                    self.menue.runter();
                    return None;
                }
                Taste::Enter => return self.menue.auswahl().map(|b| self.befehl_ausloesen(b)),
                _ => {}
            }
        }

        befehl_fuer(self.zustand, taste).map(|b| self.befehl_ausloesen(b))
    }

    fn befehl_ausloesen(&mut self, befehl: Befehl) -> AppEreignis {
        if let Befehl::SitzungOeffnen(index) = befehl {
            self.verzeichnis.fokus_setzen(index);
        }
        befehl.into()
    }

    // -----------------------------------------------------------------------
    // Handler
    // -----------------------------------------------------------------------

    fn beenden(&mut self) {
        if let Some(task) = self.relay_stoppen() {
            self.ausstehend = Some(task);
        }
        self.zustand = AppZustand::Beendet;
        tracing::info!("Beenden angefordert");
    }

    fn server_erstellen(&mut self) {
        if self.zustand != AppZustand::Starten {
            tracing::debug!(zustand = ?self.zustand, "server_erstellen ignoriert");
            return;
        }

        self.verzeichnis = Verzeichnis::mit_max_luecke(self.max_luecke);
        self.relay_starten();
        self.zustand = AppZustand::ServerWirdErstellt;
        self.bildschirm_setzen(BildschirmKonfig::server());
    }

    fn chat_erstellen(&mut self) {
        if self.zustand != AppZustand::ServerBereit {
            tracing::debug!(zustand = ?self.zustand, "chat_erstellen ignoriert");
            return;
        }
        self.zustand = AppZustand::NeuerChat;
        self.bildschirm_setzen(BildschirmKonfig::neuer_chat());
    }

    fn server_verbinden(&mut self) {
        if self.zustand != AppZustand::NeuerChat {
            return;
        }

        match self.verzeichnis.verbinden(self.eingabe.text()) {
            Ok(index) => {
                self.verzeichnis.fokus_setzen(index);
                self.zustand = AppZustand::AktiverChat;
                self.bildschirm_setzen(BildschirmKonfig::chat());
            }
            Err(e) => {
                tracing::info!(eingabe = %self.eingabe.text(), fehler = %e, "Adresse abgelehnt");
                self.status = Some(e.to_string());
            }
        }
    }

    fn chat_oeffnen(&mut self) {
        if self.zustand != AppZustand::ServerBereit {
            return;
        }
        match self.verzeichnis.fokussiert() {
            Some(index) => {
                tracing::debug!(index, "Chat geoeffnet");
                self.zustand = AppZustand::AktiverChat;
                self.bildschirm_setzen(BildschirmKonfig::chat());
            }
            None => tracing::debug!(fokus = self.verzeichnis.fokus(), "Kein gueltiger Fokus"),
        }
    }

    fn nachricht_senden(&mut self) {
        if self.zustand != AppZustand::AktiverChat {
            return;
        }
        let Some(index) = self.verzeichnis.fokussiert() else {
            return;
        };
        if self.eingabe.text().is_empty() {
            return;
        }

        match self.verzeichnis.senden(index, self.eingabe.text()) {
            Ok(sequenz) => tracing::debug!(sequenz, "Nachricht gesendet"),
            Err(e) => tracing::warn!(fehler = %e, "Nachricht festgeschrieben, Versand fehlgeschlagen"),
        }
        self.eingabe.leeren();
    }

    fn tippen(&mut self) {
        if self.zustand != AppZustand::AktiverChat {
            return;
        }
        let Some(index) = self.verzeichnis.fokussiert() else {
            return;
        };
        if let Err(e) = self.verzeichnis.tippen(index, self.eingabe.text()) {
            tracing::debug!(fehler = %e, "Tipp-Vorschau nicht gesendet");
        }
    }

    fn zurueck(&mut self) {
        match self.zustand {
            AppZustand::AktiverChat | AppZustand::NeuerChat => {
                self.zustand = AppZustand::ServerBereit;
                self.bildschirm_setzen(BildschirmKonfig::server());
            }
            AppZustand::ServerBereit | AppZustand::ServerWirdErstellt => {
                // Laufender Task raeumt nach dem Signal selbst auf
                drop(self.relay_stoppen());
                self.verzeichnis = Verzeichnis::mit_max_luecke(self.max_luecke);
                self.zustand = AppZustand::Starten;
                self.bildschirm_setzen(BildschirmKonfig::start());
            }
            AppZustand::Starten | AppZustand::Beendet => {}
        }
    }

    fn relay_bereit(&mut self, adresse: PeerAdresse, sender: Box<dyn DatagrammSenke>) {
        if self.zustand != AppZustand::ServerWirdErstellt {
            tracing::debug!(adresse = %adresse, zustand = ?self.zustand, "Veraltetes Relay-Signal ignoriert");
            return;
        }
        self.verzeichnis.relay_setzen(adresse, sender);
        self.zustand = AppZustand::ServerBereit;
        self.menue_aktualisieren();
    }

    fn relay_fehlgeschlagen(&mut self, grund: String) {
        if self.zustand != AppZustand::ServerWirdErstellt {
            tracing::debug!(grund = %grund, "Veralteter Relay-Fehler ignoriert");
            return;
        }
        tracing::error!(grund = %grund, "Relay nicht erreichbar, Programm endet");
        self.relay = None;
        self.fehler = Some(grund);
        self.zustand = AppZustand::Beendet;
    }

    fn datensatz_empfangen(&mut self, datensatz: &Datensatz) {
        if !self.verzeichnis.ist_bereit() {
            tracing::debug!(absender = %datensatz.sender, "Datensatz ohne bereites Relay verworfen");
            return;
        }
        if let Err(e) = self.verzeichnis.datensatz_anwenden(datensatz) {
            tracing::warn!(fehler = %e, sequence = datensatz.sequence, "Datensatz verworfen");
            return;
        }
        self.menue_aktualisieren();
    }

    // -----------------------------------------------------------------------
    // Relay-Task
    // -----------------------------------------------------------------------

    fn relay_starten(&mut self) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Eigene Queue pro Relay; ein auslaufender alter Task schreibt ins Leere
        let (eingang_tx, eingang_rx) = broadcast::channel(self.eingang_groesse);
        self.eingang_tx = eingang_tx;
        self.eingang_rx = eingang_rx;

        let task = tokio::spawn(relay_aufgabe(
            self.relay_config.clone(),
            self.ereignis_tx.clone(),
            self.eingang_tx.clone(),
            shutdown_rx,
        ));
        self.relay = Some(RelayAufgabe { shutdown_tx, task });
    }

    /// Signalisiert dem Relay-Task das Ende
    ///
    /// Ein Task, der noch verbindet, wird abgebrochen.
    fn relay_stoppen(&mut self) -> Option<JoinHandle<()>> {
        let relay = self.relay.take()?;
        if relay.shutdown_tx.send(true).is_err() {
            tracing::debug!("Relay-Task bereits beendet");
        }
        if self.zustand == AppZustand::ServerWirdErstellt {
            relay.task.abort();
        }
        Some(relay.task)
    }

    async fn relay_abwarten(&mut self) {
        let Some(task) = self.ausstehend.take().or_else(|| self.relay_stoppen()) else {
            return;
        };
        match tokio::time::timeout(RELAY_ABBAU_ZEITLIMIT, task).await {
            Ok(Ok(())) => tracing::debug!("Relay-Task beendet"),
            Ok(Err(e)) if e.is_cancelled() => tracing::debug!("Relay-Task abgebrochen"),
            Ok(Err(e)) => tracing::warn!(fehler = %e, "Relay-Task fehlerhaft beendet"),
            Err(_) => tracing::warn!("Relay-Task reagiert nicht, Abbau uebersprungen"),
        }
    }

    // -----------------------------------------------------------------------
    // Oberflaeche
    // -----------------------------------------------------------------------

    fn bildschirm_setzen(&mut self, konfig: BildschirmKonfig) {
        self.bildschirm = konfig;
        self.eingabe.leeren();
        self.status = None;
        self.menue = match konfig.art {
            BildschirmArt::Start => Menue::start(),
            BildschirmArt::Server => Menue::server(self.verzeichnis.sitzungen()),
            BildschirmArt::NeuerChat | BildschirmArt::Chat => Menue::default(),
        };
        self.ui.bildschirm_wechseln(konfig);
    }

    /// Baut das Servermenue nach Aenderungen der Sitzungsliste neu auf
    ///
    /// Neue Sitzungen werden vor den festen Eintraegen eingefuegt; der
    /// Cursor rueckt entsprechend nach und bleibt auf seinem Eintrag.
    fn menue_aktualisieren(&mut self) {
        if self.bildschirm.art != BildschirmArt::Server {
            return;
        }
        let alt = self.menue.eintraege().len();
        let alte_sitzungen = alt.saturating_sub(Menue::SERVER_FESTE_EINTRAEGE);
        let neu = Menue::server(self.verzeichnis.sitzungen());
        let zuwachs = neu.eintraege().len().saturating_sub(alt);

        let mut cursor = self.menue.cursor();
        if cursor >= alte_sitzungen {
            cursor += zuwachs;
        }
        self.menue = neu.mit_cursor(cursor);
    }

    fn neu_zeichnen(&mut self) {
        let ansicht = Ansicht {
            bildschirm: self.bildschirm,
            verzeichnis: &self.verzeichnis,
            menue: &self.menue,
            eingabe: self.eingabe.text(),
            status: self.status.as_deref(),
        };
        if let Err(e) = self.ui.zeichnen(&ansicht) {
            tracing::warn!(fehler = %e, "Zeichnen fehlgeschlagen");
        }
    }
}

/// Baut das Relay auf, meldet die Adresse und betreibt die Empfangs-Loop
async fn relay_aufgabe(
    config: RelayConfig,
    ereignis_tx: mpsc::UnboundedSender<AppEreignis>,
    eingang_tx: broadcast::Sender<Datensatz>,
    shutdown_rx: watch::Receiver<bool>,
) {
    let transport = match RelayTransport::verbinden(&config).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(fehler = %e, "Relay-Verbindung fehlgeschlagen");
            if !*shutdown_rx.borrow() && ereignis_tx.send(AppEreignis::RelayFehlgeschlagen(e.to_string())).is_err() {
                tracing::debug!("Dispatcher nicht mehr erreichbar");
            }
            return;
        }
    };

    if *shutdown_rx.borrow() {
        tracing::debug!("Relay nach Abbruch verbunden, wird verworfen");
        return;
    }

    let bereit = AppEreignis::RelayBereit {
        adresse: PeerAdresse::from(transport.adresse()),
        sender: Box::new(transport.sende_handle()),
    };
    if ereignis_tx.send(bereit).is_err() {
        tracing::debug!("Dispatcher nicht mehr erreichbar");
        return;
    }

    let statistik = transport.empfangs_loop_starten(eingang_tx, shutdown_rx).await;
    tracing::info!(
        datagramme = statistik.datagramme,
        datensaetze = statistik.datensaetze,
        verworfen = statistik.verworfen,
        "Relay abgebaut"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{Zeile, ZeilenStil};
    use plauder_chat::ChatResult;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct AufzeichnendeOberflaeche {
        bildschirme: Vec<BildschirmKonfig>,
        zeichnungen: usize,
        letzte_zeilen: Vec<Zeile>,
        letzte_eingabe: String,
    }

    impl Oberflaeche for AufzeichnendeOberflaeche {
        fn bildschirm_wechseln(&mut self, konfig: BildschirmKonfig) {
            self.bildschirme.push(konfig);
        }

        fn zeichnen(&mut self, ansicht: &Ansicht<'_>) -> anyhow::Result<()> {
            self.zeichnungen += 1;
            self.letzte_zeilen = ansicht.zeilen();
            self.letzte_eingabe = ansicht.eingabe.to_string();
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct AufzeichnendeSenke {
        gesendet: Arc<Mutex<Vec<(Datensatz, SocketAddr)>>>,
    }

    impl DatagrammSenke for AufzeichnendeSenke {
        fn senden(&self, datensatz: &Datensatz, ziel: SocketAddr) -> ChatResult<()> {
            self.gesendet.lock().unwrap().push((datensatz.clone(), ziel));
            Ok(())
        }
    }

    const EIGENE: &str = "203.0.113.9:40000";

    fn test_app() -> App<AufzeichnendeOberflaeche> {
        let mut config = ClientConfig::default();
        config.relay = RelayConfig::lokal("127.0.0.1:0");
        App::neu(&config, AufzeichnendeOberflaeche::default())
    }

    /// App im Zustand ServerBereit mit aufzeichnender Senke
    fn bereite_app() -> (App<AufzeichnendeOberflaeche>, AufzeichnendeSenke) {
        let mut app = test_app();
        let senke = AufzeichnendeSenke::default();
        app.verarbeiten(AppEreignis::ServerErstellen);
        app.verarbeiten(AppEreignis::RelayBereit {
            adresse: PeerAdresse::neu(EIGENE),
            sender: Box::new(senke.clone()),
        });
        assert_eq!(app.zustand(), AppZustand::ServerBereit);
        (app, senke)
    }

    fn tippen(app: &mut App<AufzeichnendeOberflaeche>, text: &str) {
        for c in text.chars() {
            app.verarbeiten(AppEreignis::Taste(Taste::Zeichen(c)));
        }
    }

    #[tokio::test]
    async fn start_zeigt_startmenue() {
        let mut app = test_app();
        app.verarbeiten(AppEreignis::SitzungenGeaendert);

        assert_eq!(app.zustand(), AppZustand::Starten);
        assert_eq!(app.ui.bildschirme, vec![BildschirmKonfig::start()]);
        assert_eq!(app.ui.letzte_zeilen[1], Zeile { text: "Start chatting".into(), stil: ZeilenStil::MenueAktiv });
        assert_eq!(app.ui.letzte_zeilen[2].text, "Exit");
    }

    #[tokio::test]
    async fn server_erstellen_wartet_auf_adresse() {
        let mut app = test_app();
        app.verarbeiten(AppEreignis::Taste(Taste::Enter));

        assert_eq!(app.zustand(), AppZustand::ServerWirdErstellt);
        assert_eq!(app.ui.bildschirme.last(), Some(&BildschirmKonfig::server()));
        assert_eq!(app.ui.letzte_zeilen[0].text, "Creating server...");
        assert!(app.relay.is_some());
    }

    #[tokio::test]
    async fn lokales_relay_meldet_adresse() {
        let mut app = test_app();
        app.verarbeiten(AppEreignis::ServerErstellen);

        let ereignis = tokio::time::timeout(Duration::from_secs(2), app.ereignis_rx.recv())
            .await
            .expect("Relay muss sich melden")
            .unwrap();
        assert!(matches!(ereignis, AppEreignis::RelayBereit { .. }));
        app.verarbeiten(ereignis);

        assert_eq!(app.zustand(), AppZustand::ServerBereit);
        assert!(app.verzeichnis().ist_bereit());
        assert!(app.ui.letzte_zeilen[0].text.starts_with("Server: 127.0.0.1:"));

        app.verarbeiten(AppEreignis::Beenden);
        app.relay_abwarten().await;
    }

    #[tokio::test]
    async fn neuer_chat_tippen_und_senden() {
        let (mut app, senke) = bereite_app();

        // Cursor steht auf "New chat"
        app.verarbeiten(AppEreignis::Taste(Taste::Enter));
        assert_eq!(app.zustand(), AppZustand::NeuerChat);

        tippen(&mut app, "10.0.0.1:5000");
        assert_eq!(app.ui.letzte_eingabe, "10.0.0.1:5000");
        assert!(senke.gesendet.lock().unwrap().is_empty(), "Adresseingabe sendet nichts");

        app.verarbeiten(AppEreignis::Taste(Taste::Enter));
        assert_eq!(app.zustand(), AppZustand::AktiverChat);
        assert_eq!(app.ui.letzte_eingabe, "", "Bildschirmwechsel leert die Eingabe");
        assert_eq!(app.verzeichnis().fokussiert(), Some(0));

        tippen(&mut app, "hi");
        app.verarbeiten(AppEreignis::Taste(Taste::Enter));

        let gesendet = senke.gesendet.lock().unwrap();
        let texte: Vec<(&str, bool, u64)> = gesendet
            .iter()
            .map(|(d, _)| (d.text.as_str(), d.finished, d.sequence))
            .collect();
        assert_eq!(texte, vec![("h", false, 0), ("hi", false, 0), ("hi", true, 0)]);
        assert!(gesendet.iter().all(|(d, ziel)| d.sender.als_str() == EIGENE && ziel.to_string() == "10.0.0.1:5000"));
        drop(gesendet);

        assert_eq!(app.ui.letzte_eingabe, "");
        assert_eq!(app.verzeichnis().sitzung(0).unwrap().eigene_anzahl(), 1);
        assert_eq!(app.ui.letzte_zeilen[1], Zeile { text: "hi".into(), stil: ZeilenStil::Eigene });
    }

    #[tokio::test]
    async fn ruecktaste_sendet_vorschau() {
        let (mut app, senke) = bereite_app();
        app.verarbeiten(AppEreignis::ChatErstellen);
        tippen(&mut app, "10.0.0.1:5000");
        app.verarbeiten(AppEreignis::ServerVerbinden);

        tippen(&mut app, "ab");
        app.verarbeiten(AppEreignis::Taste(Taste::Ruecktaste));

        let gesendet = senke.gesendet.lock().unwrap();
        assert_eq!(gesendet.last().unwrap().0.text, "a");
        assert!(!gesendet.last().unwrap().0.finished);
    }

    #[tokio::test]
    async fn ungueltige_adresse_wird_abgelehnt() {
        let (mut app, _senke) = bereite_app();
        app.verarbeiten(AppEreignis::ChatErstellen);
        tippen(&mut app, "nirgendwo");
        app.verarbeiten(AppEreignis::Taste(Taste::Enter));

        assert_eq!(app.zustand(), AppZustand::NeuerChat);
        assert!(app.verzeichnis().sitzungen().is_empty());
        assert_eq!(app.ui.letzte_zeilen.last().unwrap().stil, ZeilenStil::Status);
        // Eingabe bleibt zum Korrigieren erhalten
        assert_eq!(app.ui.letzte_eingabe, "nirgendwo");
    }

    #[tokio::test]
    async fn empfangener_datensatz_erscheint_im_servermenue() {
        let (mut app, _senke) = bereite_app();
        let peer = PeerAdresse::neu("198.51.100.4:50000");
        app.verarbeiten(AppEreignis::DatensatzEmpfangen(Datensatz::neu(0, "hallo", true, peer.clone())));

        assert_eq!(app.ui.letzte_zeilen[1].text, "Chat with 198.51.100.4:50000");

        app.verarbeiten(AppEreignis::Taste(Taste::Hoch));
        app.verarbeiten(AppEreignis::Taste(Taste::Enter));
        assert_eq!(app.zustand(), AppZustand::AktiverChat);
        assert_eq!(app.ui.letzte_zeilen[0].text, "Chat with 198.51.100.4:50000");
        assert_eq!(app.ui.letzte_zeilen[1], Zeile { text: "hallo".into(), stil: ZeilenStil::Empfangen });
    }

    #[tokio::test]
    async fn menue_cursor_bleibt_bei_neuen_sitzungen() {
        let (mut app, _senke) = bereite_app();
        app.verarbeiten(AppEreignis::Taste(Taste::Runter));
        // Cursor auf "Stop chatting"
        assert_eq!(app.menue.auswahl(), Some(Befehl::Zurueck));

        let peer = PeerAdresse::neu("198.51.100.4:50000");
        app.verarbeiten(AppEreignis::DatensatzEmpfangen(Datensatz::neu(0, "x", true, peer)));
        assert_eq!(app.menue.cursor(), 2);
        assert_eq!(app.menue.auswahl(), Some(Befehl::Zurueck));

        app.verarbeiten(AppEreignis::Taste(Taste::Enter));
        assert_eq!(app.zustand(), AppZustand::Starten);
    }

    #[tokio::test]
    async fn cursor_auf_sitzung_bleibt_auf_ihr() {
        let (mut app, _senke) = bereite_app();
        let erster = PeerAdresse::neu("198.51.100.4:50000");
        app.verarbeiten(AppEreignis::DatensatzEmpfangen(Datensatz::neu(0, "x", true, erster)));
        // Cursor von "New chat" nachgerueckt
        assert_eq!(app.menue.auswahl(), Some(Befehl::ChatErstellen));

        app.verarbeiten(AppEreignis::Taste(Taste::Hoch));
        assert_eq!(app.menue.auswahl(), Some(Befehl::SitzungOeffnen(0)));

        let zweiter = PeerAdresse::neu("198.51.100.5:50000");
        app.verarbeiten(AppEreignis::DatensatzEmpfangen(Datensatz::neu(0, "y", true, zweiter)));
        assert_eq!(app.menue.auswahl(), Some(Befehl::SitzungOeffnen(0)));
        assert_eq!(app.menue.eintraege().len(), 4);
    }

    #[tokio::test]
    async fn datensatz_mit_riesiger_luecke_wird_verworfen() {
        let (mut app, _senke) = bereite_app();
        let peer = PeerAdresse::neu("198.51.100.4:50000");
        app.verarbeiten(AppEreignis::DatensatzEmpfangen(Datensatz::neu(5_000_000, "x", true, peer)));

        assert!(app.verzeichnis().sitzungen().is_empty());
        assert_eq!(app.menue.auswahl(), Some(Befehl::ChatErstellen));
        assert_eq!(app.zustand(), AppZustand::ServerBereit);
    }

    #[tokio::test]
    async fn altes_relay_erreicht_neue_eingangsqueue_nicht() {
        let (mut app, _senke) = bereite_app();
        let alter_eingang = app.eingang_tx.clone();

        app.verarbeiten(AppEreignis::Zurueck);
        app.verarbeiten(AppEreignis::ServerErstellen);
        assert_eq!(app.zustand(), AppZustand::ServerWirdErstellt);

        let peer = PeerAdresse::neu("198.51.100.4:50000");
        assert!(alter_eingang.send(Datensatz::neu(0, "alt", true, peer)).is_err());
        assert!(matches!(
            app.eingang_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn chat_oeffnen_ohne_sitzung_ist_noop() {
        let (mut app, _senke) = bereite_app();
        app.verarbeiten(AppEreignis::ChatOeffnen);
        assert_eq!(app.zustand(), AppZustand::ServerBereit);
    }

    #[tokio::test]
    async fn zurueck_fuehrt_schrittweise_zum_start() {
        let (mut app, _senke) = bereite_app();
        app.verarbeiten(AppEreignis::ChatErstellen);
        app.verarbeiten(AppEreignis::Taste(Taste::Esc));
        assert_eq!(app.zustand(), AppZustand::ServerBereit);

        app.verarbeiten(AppEreignis::Taste(Taste::Esc));
        assert_eq!(app.zustand(), AppZustand::Starten);
        assert!(app.relay.is_none());
        assert!(!app.verzeichnis().ist_bereit());
        assert_eq!(app.ui.bildschirme.last(), Some(&BildschirmKonfig::start()));
    }

    #[tokio::test]
    async fn veraltetes_relay_signal_wird_ignoriert() {
        let mut app = test_app();
        app.verarbeiten(AppEreignis::RelayBereit {
            adresse: PeerAdresse::neu(EIGENE),
            sender: Box::new(AufzeichnendeSenke::default()),
        });
        assert_eq!(app.zustand(), AppZustand::Starten);
        assert!(!app.verzeichnis().ist_bereit());
    }

    #[tokio::test]
    async fn datensatz_vor_relay_wird_verworfen() {
        let mut app = test_app();
        let peer = PeerAdresse::neu("198.51.100.4:50000");
        app.verarbeiten(AppEreignis::DatensatzEmpfangen(Datensatz::neu(0, "x", true, peer)));
        assert!(app.verzeichnis().sitzungen().is_empty());
    }

    #[tokio::test]
    async fn relay_fehler_beendet_mit_fehler() {
        let mut app = test_app();
        app.verarbeiten(AppEreignis::ServerErstellen);
        app.verarbeiten(AppEreignis::RelayFehlgeschlagen("Zeitlimit".into()));
        assert_eq!(app.zustand(), AppZustand::Beendet);

        let ergebnis = app.ausfuehren().await;
        assert!(ergebnis.unwrap_err().to_string().contains("Zeitlimit"));
    }

    #[tokio::test]
    async fn strg_c_beendet_ueberall() {
        let (mut app, _senke) = bereite_app();
        app.verarbeiten(AppEreignis::ChatErstellen);
        app.verarbeiten(AppEreignis::Taste(Taste::StrgC));
        assert_eq!(app.zustand(), AppZustand::Beendet);
    }

    #[tokio::test]
    async fn ausfuehren_verarbeitet_kanal_bis_beenden() {
        let mut app = test_app();
        let tx = app.ereignis_sender();
        tx.send(AppEreignis::Taste(Taste::Enter)).unwrap();
        tx.send(AppEreignis::Taste(Taste::StrgC)).unwrap();

        tokio::time::timeout(Duration::from_secs(5), app.ausfuehren())
            .await
            .expect("Dispatcher muss enden")
            .expect("Kein Fehler erwartet");
        assert_eq!(app.zustand(), AppZustand::Beendet);
        assert!(app.ui.zeichnungen >= 3);
    }
}
