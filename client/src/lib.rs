//! plauder – P2P-Textchat im Terminal
//!
//! ## Module
//! - [`app`] – Ereignis-Dispatcher und Zustandsautomat
//! - [`config`] – TOML-Konfiguration
//! - [`ereignis`] – Ereignis-Vokabular und Zustaende
//! - [`ui`] – Oberflaechen-Vertrag und Terminal-Implementierung

pub mod app;
pub mod config;
pub mod ereignis;
pub mod ui;

pub use app::App;
pub use config::{ClientConfig, ConfigQuelle};
pub use ereignis::{AppEreignis, AppZustand};
