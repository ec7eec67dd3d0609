//! Oberflaechen-Vertrag des Dispatchers
//!
//! Der Dispatcher braucht von der Oberflaeche genau vier Dinge:
//! 1. die gueltige Tasten->Befehl-Zuordnung fuer den aktuellen Zustand
//!    ([`tasten_zuordnung`])
//! 2. einen Bildschirmwechsel mit Schaltern fuer Tippen und Menue
//!    ([`Oberflaeche::bildschirm_wechseln`])
//! 3. einen Eingangskanal fuer Ereignisse (liegt im Dispatcher)
//! 4. einen Neuzeichnen-Ausloeser ([`Oberflaeche::zeichnen`])
//!
//! Menues sind Werte pro Bildschirm, keine globalen Tabellen.

pub mod terminal;

use plauder_chat::{Sitzung, Verzeichnis};

use crate::ereignis::{AppEreignis, AppZustand};

// ---------------------------------------------------------------------------
// Tasten und Befehle
// ---------------------------------------------------------------------------

/// Tastatur-Vokabular der Oberflaeche
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taste {
    Enter,
    Hoch,
    Runter,
    Esc,
    Ruecktaste,
    StrgC,
    Zeichen(char),
}

/// Befehl, den eine Taste oder ein Menue-Eintrag ausloest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Befehl {
    Beenden,
    ServerErstellen,
    ChatErstellen,
    ServerVerbinden,
    NachrichtSenden,
    Zurueck,
    /// Sitzung an diesem Index fokussieren und oeffnen
    SitzungOeffnen(usize),
}

impl From<Befehl> for AppEreignis {
    fn from(befehl: Befehl) -> Self {
        match befehl {
            Befehl::Beenden => AppEreignis::Beenden,
            Befehl::ServerErstellen => AppEreignis::ServerErstellen,
            Befehl::ChatErstellen => AppEreignis::ChatErstellen,
            Befehl::ServerVerbinden => AppEreignis::ServerVerbinden,
            Befehl::NachrichtSenden => AppEreignis::NachrichtSenden,
            Befehl::Zurueck => AppEreignis::Zurueck,
            Befehl::SitzungOeffnen(_) => AppEreignis::ChatOeffnen,
        }
    }
}

/// Gueltige Tasten->Befehl-Zuordnung fuer `zustand`
pub fn tasten_zuordnung(zustand: AppZustand) -> &'static [(Taste, Befehl)] {
    match zustand {
        AppZustand::Starten => &[(Taste::Esc, Befehl::Beenden)],
        AppZustand::ServerWirdErstellt | AppZustand::ServerBereit => {
            &[(Taste::Esc, Befehl::Zurueck)]
        }
        AppZustand::NeuerChat => &[
            (Taste::Enter, Befehl::ServerVerbinden),
            (Taste::Esc, Befehl::Zurueck),
        ],
        AppZustand::AktiverChat => &[
            (Taste::Enter, Befehl::NachrichtSenden),
            (Taste::Esc, Befehl::Zurueck),
        ],
        AppZustand::Beendet => &[],
    }
}

/// Sucht den Befehl fuer `taste` im Zustand `zustand`
pub fn befehl_fuer(zustand: AppZustand, taste: Taste) -> Option<Befehl> {
    tasten_zuordnung(zustand)
        .iter()
        .find(|(t, _)| *t == taste)
        .map(|(_, b)| *b)
}

// ---------------------------------------------------------------------------
// Bildschirme
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BildschirmArt {
    Start,
    Server,
    NeuerChat,
    Chat,
}

/// Aktiver Bildschirm mit seinen Schaltern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BildschirmKonfig {
    pub art: BildschirmArt,
    pub tippen_aktiv: bool,
    pub menue_aktiv: bool,
}

impl BildschirmKonfig {
    pub const fn start() -> Self {
        Self {
            art: BildschirmArt::Start,
            tippen_aktiv: false,
            menue_aktiv: true,
        }
    }

    pub const fn server() -> Self {
        Self {
            art: BildschirmArt::Server,
            tippen_aktiv: false,
            menue_aktiv: true,
        }
    }

    pub const fn neuer_chat() -> Self {
        Self {
            art: BildschirmArt::NeuerChat,
            tippen_aktiv: true,
            menue_aktiv: false,
        }
    }

    pub const fn chat() -> Self {
        Self {
            art: BildschirmArt::Chat,
            tippen_aktiv: true,
            menue_aktiv: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Menue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenueEintrag {
    pub beschriftung: String,
    pub befehl: Befehl,
}

impl MenueEintrag {
    fn neu(beschriftung: impl Into<String>, befehl: Befehl) -> Self {
        Self {
            beschriftung: beschriftung.into(),
            befehl,
        }
    }
}

/// Vertikales Menue mit umlaufendem Cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menue {
    eintraege: Vec<MenueEintrag>,
    cursor: usize,
}

impl Menue {
    /// Anzahl der festen Eintraege hinter den Sitzungen im Servermenue
    pub const SERVER_FESTE_EINTRAEGE: usize = 2;

    pub fn neu(eintraege: Vec<MenueEintrag>) -> Self {
        Self {
            eintraege,
            cursor: 0,
        }
    }

    /// Startmenue
    pub fn start() -> Self {
        Self::neu(vec![
            MenueEintrag::neu("Start chatting", Befehl::ServerErstellen),
            MenueEintrag::neu("Exit", Befehl::Beenden),
        ])
    }

    /// Servermenue: alle Sitzungen in Erstellungsreihenfolge, danach die
    /// festen Eintraege
    pub fn server(sitzungen: &[Sitzung]) -> Self {
        let mut eintraege: Vec<MenueEintrag> = sitzungen
            .iter()
            .enumerate()
            .map(|(i, s)| MenueEintrag::neu(format!("Chat with {}", s.adresse()), Befehl::SitzungOeffnen(i)))
            .collect();
        eintraege.push(MenueEintrag::neu("New chat", Befehl::ChatErstellen));
        eintraege.push(MenueEintrag::neu("Stop chatting", Befehl::Zurueck));
        Self::neu(eintraege)
    }

    /// Uebernimmt die Cursorposition eines vorherigen Menues (begrenzt)
    pub fn mit_cursor(mut self, cursor: usize) -> Self {
        self.cursor = cursor.min(self.eintraege.len().saturating_sub(1));
        self
    }

    pub fn eintraege(&self) -> &[MenueEintrag] {
        &self.eintraege
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn hoch(&mut self) {
        if self.eintraege.is_empty() {
            return;
        }
        self.cursor = self.cursor.checked_sub(1).unwrap_or(self.eintraege.len() - 1);
    }

    pub fn runter(&mut self) {
        if self.eintraege.is_empty() {
            return;
        }
        self.cursor = (self.cursor + 1) % self.eintraege.len();
    }

    pub fn auswahl(&self) -> Option<Befehl> {
        self.eintraege.get(self.cursor).map(|e| e.befehl)
    }
}

// ---------------------------------------------------------------------------
// Eingabezeile
// ---------------------------------------------------------------------------

/// Getippter Text des aktiven Bildschirms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eingabe {
    text: String,
}

impl Eingabe {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn anhaengen(&mut self, c: char) {
        self.text.push(c);
    }

    /// Entfernt das letzte Zeichen (nicht das letzte Byte)
    pub fn letztes_entfernen(&mut self) {
        self.text.pop();
    }

    pub fn leeren(&mut self) {
        self.text.clear();
    }
}

// ---------------------------------------------------------------------------
// Ansicht
// ---------------------------------------------------------------------------

/// Darstellungsart einer Zeile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeilenStil {
    Titel,
    Menue,
    MenueAktiv,
    Eigene,
    Empfangen,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zeile {
    pub text: String,
    pub stil: ZeilenStil,
}

impl Zeile {
    fn neu(text: impl Into<String>, stil: ZeilenStil) -> Self {
        Self {
            text: text.into(),
            stil,
        }
    }
}

/// Momentaufnahme des Zustands, aus der gezeichnet wird
pub struct Ansicht<'a> {
    pub bildschirm: BildschirmKonfig,
    pub verzeichnis: &'a Verzeichnis,
    pub menue: &'a Menue,
    pub eingabe: &'a str,
    pub status: Option<&'a str>,
}

impl<'a> Ansicht<'a> {
    /// Inhaltszeilen von oben nach unten (ohne Eingabezeile)
    pub fn zeilen(&self) -> Vec<Zeile> {
        let mut zeilen = Vec::new();

        match self.bildschirm.art {
            BildschirmArt::Start => {
                zeilen.push(Zeile::neu("Plauder", ZeilenStil::Titel));
                self.menue_zeilen(&mut zeilen);
            }
            BildschirmArt::Server => match self.verzeichnis.eigene_adresse() {
                Some(adresse) => {
                    zeilen.push(Zeile::neu(format!("Server: {adresse}"), ZeilenStil::Titel));
                    self.menue_zeilen(&mut zeilen);
                }
                None => zeilen.push(Zeile::neu("Creating server...", ZeilenStil::Titel)),
            },
            BildschirmArt::NeuerChat => {
                zeilen.push(Zeile::neu("Input peer address", ZeilenStil::Titel));
            }
            BildschirmArt::Chat => match self.verzeichnis.fokussiert().and_then(|i| self.verzeichnis.sitzung(i)) {
                Some(sitzung) => {
                    zeilen.push(Zeile::neu(format!("Chat with {}", sitzung.adresse()), ZeilenStil::Titel));
                    zeilen.extend(sitzung.verlauf().map(|n| {
                        let stil = if n.eigene { ZeilenStil::Eigene } else { ZeilenStil::Empfangen };
                        Zeile::neu(n.anzeige_text(), stil)
                    }));
                }
                None => zeilen.push(Zeile::neu("No chat selected", ZeilenStil::Titel)),
            },
        }

        if let Some(status) = self.status {
            zeilen.push(Zeile::neu(status, ZeilenStil::Status));
        }
        zeilen
    }

    fn menue_zeilen(&self, zeilen: &mut Vec<Zeile>) {
        for (i, eintrag) in self.menue.eintraege().iter().enumerate() {
            let stil = if i == self.menue.cursor() {
                ZeilenStil::MenueAktiv
            } else {
                ZeilenStil::Menue
            };
            zeilen.push(Zeile::neu(eintrag.beschriftung.clone(), stil));
        }
    }
}

/// Oberflaeche, die der Dispatcher bedient
pub trait Oberflaeche {
    /// Wechselt den aktiven Bildschirm
    fn bildschirm_wechseln(&mut self, konfig: BildschirmKonfig);

    /// Zeichnet die Ansicht neu
    fn zeichnen(&mut self, ansicht: &Ansicht<'_>) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use plauder_core::PeerAdresse;
    use plauder_protocol::Datensatz;

    #[test]
    fn zuordnung_pro_zustand() {
        assert_eq!(befehl_fuer(AppZustand::Starten, Taste::Esc), Some(Befehl::Beenden));
        assert_eq!(befehl_fuer(AppZustand::Starten, Taste::Enter), None);
        assert_eq!(befehl_fuer(AppZustand::ServerBereit, Taste::Esc), Some(Befehl::Zurueck));
        assert_eq!(befehl_fuer(AppZustand::NeuerChat, Taste::Enter), Some(Befehl::ServerVerbinden));
        assert_eq!(befehl_fuer(AppZustand::AktiverChat, Taste::Enter), Some(Befehl::NachrichtSenden));
        assert!(tasten_zuordnung(AppZustand::Beendet).is_empty());
    }

    #[test]
    fn menue_cursor_laeuft_um() {
        let mut m = Menue::start();
        assert_eq!(m.auswahl(), Some(Befehl::ServerErstellen));
        m.hoch();
        assert_eq!(m.auswahl(), Some(Befehl::Beenden));
        m.runter();
        assert_eq!(m.cursor(), 0);
        m.runter();
        m.runter();
        assert_eq!(m.cursor(), 0);
    }

    #[test]
    fn leeres_menue_hat_keine_auswahl() {
        let mut m = Menue::default();
        m.hoch();
        m.runter();
        assert_eq!(m.auswahl(), None);
    }

    #[test]
    fn servermenue_listet_sitzungen_zuerst() {
        let mut v = Verzeichnis::neu();
        v.verbinden("10.0.0.1:5000").unwrap();
        v.verbinden("10.0.0.2:5000").unwrap();

        let m = Menue::server(v.sitzungen());
        let beschriftungen: Vec<&str> = m.eintraege().iter().map(|e| e.beschriftung.as_str()).collect();
        assert_eq!(
            beschriftungen,
            vec!["Chat with 10.0.0.1:5000", "Chat with 10.0.0.2:5000", "New chat", "Stop chatting"]
        );
        assert_eq!(m.eintraege()[1].befehl, Befehl::SitzungOeffnen(1));
    }

    #[test]
    fn cursor_wird_begrenzt() {
        let m = Menue::start().mit_cursor(9);
        assert_eq!(m.cursor(), 1);
    }

    #[test]
    fn ruecktaste_entfernt_ganzes_zeichen() {
        let mut e = Eingabe::default();
        for c in "grüß".chars() {
            e.anhaengen(c);
        }
        e.letztes_entfernen();
        assert_eq!(e.text(), "grü");
        e.leeren();
        e.letztes_entfernen();
        assert_eq!(e.text(), "");
    }

    #[test]
    fn serveransicht_wartet_auf_adresse() {
        let v = Verzeichnis::neu();
        let m = Menue::server(v.sitzungen());
        let ansicht = Ansicht {
            bildschirm: BildschirmKonfig::server(),
            verzeichnis: &v,
            menue: &m,
            eingabe: "",
            status: None,
        };
        assert_eq!(ansicht.zeilen(), vec![Zeile::neu("Creating server...", ZeilenStil::Titel)]);
    }

    #[test]
    fn chatansicht_markiert_unfertige_nachrichten() {
        let mut v = Verzeichnis::neu();
        let peer = PeerAdresse::neu("10.0.0.1:5000");
        let i = v.datensatz_anwenden(&Datensatz::neu(0, "hal", false, peer)).unwrap();
        v.fokus_setzen(i);
        let m = Menue::default();

        let ansicht = Ansicht {
            bildschirm: BildschirmKonfig::chat(),
            verzeichnis: &v,
            menue: &m,
            eingabe: "",
            status: Some("Fehler"),
        };
        let zeilen = ansicht.zeilen();
        assert_eq!(zeilen[0].text, "Chat with 10.0.0.1:5000");
        assert_eq!(zeilen[1], Zeile::neu("hal...", ZeilenStil::Empfangen));
        assert_eq!(zeilen[2], Zeile::neu("Fehler", ZeilenStil::Status));
    }
}
