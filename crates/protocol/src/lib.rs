//! tandem-protocol – Event-Protokoll der Tandem-Plattform
//!
//! Definiert die bidirektionalen Events zwischen Client und Server sowie
//! das Frame-basierte Wire-Format (Laengenpraefix + JSON).
//!
//! ## Design
//! - Tagged Enums fuer typsichere Events (`#[serde(tag = "type")]`)
//! - Signaling-Payloads sind nach `kind` getaggte Varianten mit festem
//!   Schema pro Art (Offer/Answer/ICE), kein offener Blob
//! - FIFO-Zustellung pro Verbindung uebernimmt die mpsc-Queue der
//!   Empfaengerseite

pub mod events;
pub mod wire;

pub use events::{ClientEvent, NachrichtInfo, NachrichtenTyp, ServerEvent, SignalPayload};
pub use wire::{ClientCodec, FrameCodec, ServerCodec};
