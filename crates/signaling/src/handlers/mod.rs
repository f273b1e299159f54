//! Handler fuer alle Client-Events
//!
//! Jeder Handler ist fuer einen bestimmten Event-Typ zustaendig
//! und hat Zugriff auf den gemeinsamen SignalingState.

pub mod auth_handler;
pub mod call_handler;
pub mod chat_handler;
pub mod room_handler;
