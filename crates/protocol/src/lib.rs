//! plauder-protocol – Wire-Format
//!
//! Ein Datagramm traegt genau einen [`Datensatz`]. Es gibt kein
//! Laengenfeld: die Datagrammgrenze ist die Datensatzgrenze.

pub mod wire;

pub use wire::{Datensatz, DatensatzCodec, MAX_DATAGRAMM_GROESSE, PROTOKOLL_VERSION};
