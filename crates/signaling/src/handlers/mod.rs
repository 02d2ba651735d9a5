//! Handler fuer alle Client-Nachrichten
//!
//! Jeder Handler ist fuer eine Gruppe von Nachrichtentypen zustaendig
//! und hat Zugriff auf den gemeinsamen SignalingState.

pub mod call_handler;
pub mod chat_handler;
pub mod relay_handler;
