//! Terminal-Oberflaeche auf Basis von crossterm
//!
//! Tasten werden in einem eigenen Thread gelesen und als
//! [`AppEreignis::Taste`] in den Ereigniskanal gelegt; gezeichnet wird nur
//! vom Dispatcher aus.

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Colors, Print, ResetColor, SetColors};
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{Ansicht, BildschirmKonfig, Oberflaeche, Taste, Zeile, ZeilenStil};
use crate::ereignis::AppEreignis;

/// Pollintervall des Tasten-Threads; bestimmt, wie schnell er nach dem
/// Ende des Dispatchers aufhoert
const POLL_INTERVALL: Duration = Duration::from_millis(200);

/// Raw-Mode und alternativer Bildschirm; beim Drop wiederhergestellt
pub struct TerminalSitzung {
    _privat: (),
}

impl TerminalSitzung {
    pub fn starten() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self { _privat: () })
    }
}

impl Drop for TerminalSitzung {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Zeichnet Ansichten ins Terminal
pub struct TerminalOberflaeche {
    stdout: Stdout,
    bildschirm: BildschirmKonfig,
}

impl TerminalOberflaeche {
    pub fn neu() -> Self {
        Self {
            stdout: io::stdout(),
            bildschirm: BildschirmKonfig::start(),
        }
    }
}

impl Default for TerminalOberflaeche {
    fn default() -> Self {
        Self::neu()
    }
}

impl Oberflaeche for TerminalOberflaeche {
    fn bildschirm_wechseln(&mut self, konfig: BildschirmKonfig) {
        tracing::debug!(bildschirm = ?konfig.art, "Bildschirmwechsel");
        self.bildschirm = konfig;
    }

    fn zeichnen(&mut self, ansicht: &Ansicht<'_>) -> anyhow::Result<()> {
        let (breite, hoehe) = terminal::size()?;
        let out = &mut self.stdout;
        queue!(out, Clear(ClearType::All))?;

        let zeilen = ansicht.zeilen();
        // Unterste Zeile gehoert der Eingabe
        let platz = usize::from(hoehe.saturating_sub(1));
        for (y, zeile) in sichtbare_zeilen(&zeilen, platz).iter().enumerate() {
            queue!(
                out,
                MoveTo(0, y as u16),
                SetColors(farben(zeile.stil)),
                Print(abschneiden(&zeile.text, usize::from(breite))),
                ResetColor
            )?;
        }

        if self.bildschirm.tippen_aktiv {
            let sichtbar = ende(ansicht.eingabe, usize::from(breite).saturating_sub(1));
            queue!(
                out,
                MoveTo(0, hoehe.saturating_sub(1)),
                SetColors(Colors::new(Color::Magenta, Color::Reset)),
                Print(sichtbar),
                ResetColor,
                Show
            )?;
        } else {
            queue!(out, Hide)?;
        }

        out.flush()?;
        Ok(())
    }
}

/// Titel plus die juengsten Zeilen, die noch passen
fn sichtbare_zeilen(zeilen: &[Zeile], platz: usize) -> Vec<&Zeile> {
    if zeilen.len() <= platz {
        return zeilen.iter().collect();
    }
    let Some((titel, rest)) = zeilen.split_first() else {
        return Vec::new();
    };
    let mut sichtbar = vec![titel];
    let n = platz.saturating_sub(1);
    sichtbar.extend(rest[rest.len() - n..].iter());
    sichtbar
}

fn farben(stil: ZeilenStil) -> Colors {
    match stil {
        ZeilenStil::Titel => Colors::new(Color::Reset, Color::Blue),
        ZeilenStil::Menue => Colors::new(Color::Reset, Color::Reset),
        ZeilenStil::MenueAktiv => Colors::new(Color::White, Color::Magenta),
        ZeilenStil::Eigene => Colors::new(Color::White, Color::Black),
        ZeilenStil::Empfangen => Colors::new(Color::Black, Color::Yellow),
        ZeilenStil::Status => Colors::new(Color::Red, Color::Reset),
    }
}

fn abschneiden(text: &str, breite: usize) -> String {
    text.chars().take(breite).collect()
}

/// Die letzten `breite` Zeichen
fn ende(text: &str, breite: usize) -> String {
    let anzahl = text.chars().count();
    text.chars().skip(anzahl.saturating_sub(breite)).collect()
}

/// Uebersetzt ein crossterm-Tastenereignis
pub fn taste_aus(ereignis: KeyEvent) -> Option<Taste> {
    if ereignis.kind != KeyEventKind::Press {
        return None;
    }
    match ereignis.code {
        KeyCode::Char('c') if ereignis.modifiers.contains(KeyModifiers::CONTROL) => Some(Taste::StrgC),
        KeyCode::Char(_) if ereignis.modifiers.contains(KeyModifiers::CONTROL) => None,
        KeyCode::Char(c) => Some(Taste::Zeichen(c)),
        KeyCode::Enter => Some(Taste::Enter),
        KeyCode::Up => Some(Taste::Hoch),
        KeyCode::Down => Some(Taste::Runter),
        KeyCode::Esc => Some(Taste::Esc),
        KeyCode::Backspace => Some(Taste::Ruecktaste),
        _ => None,
    }
}

/// Startet den Tasten-Thread
///
/// Endet, sobald der Dispatcher den Kanal geschlossen hat.
pub fn tasten_lesen(tx: mpsc::UnboundedSender<AppEreignis>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(POLL_INTERVALL) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::error!(fehler = %e, "Terminal-Ereignisse nicht lesbar");
                    break;
                }
            }

            let ereignis = match event::read() {
                Ok(Event::Key(k)) => match taste_aus(k) {
                    Some(taste) => AppEreignis::Taste(taste),
                    None => continue,
                },
                Ok(Event::Resize(breite, hoehe)) => {
                    tracing::trace!(breite, hoehe, "Terminalgroesse geaendert");
                    AppEreignis::SitzungenGeaendert
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!(fehler = %e, "Terminal-Ereignis nicht lesbar");
                    break;
                }
            };

            if tx.send(ereignis).is_err() {
                break;
            }
        }
        tracing::debug!("Tasten-Thread beendet");
    })
}
