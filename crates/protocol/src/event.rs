//! Eingehende und ausgehende Events
//!
//! ## Eingehend (Client -> Relay)
//! | Event | Nutzlast |
//! |-------|----------|
//! | `FirstConnection` | `{from}` |
//! | `newMessage` | `{value, from, to}` |
//!
//! ## Ausgehend (Relay -> Client)
//! | Event | Nutzlast |
//! |-------|----------|
//! | `onActiveUsers` | `[{socketId, userName}]` |
//! | `onReceivedGlobalMessage` | Verlaufseintrag |
//! | `<Anzeigename>` | `{messages}` (Verlaufs-Push) oder Verlaufseintrag (Direktnachricht) |
//! | `error` | `{code, message}` |

use serde::{Deserialize, Serialize};

use crate::nachricht::{
    AktiverNutzer, FehlerCode, FehlerPaket, IdentifizierenAnfrage, NachrichtSendenAnfrage,
    VerlaufEintrag, VerlaufPaket,
};

/// Event-Name fuer Identifizierung
pub const EVENT_IDENTIFIZIEREN: &str = "FirstConnection";
/// Event-Name fuer neue Nachrichten
pub const EVENT_NACHRICHT_SENDEN: &str = "newMessage";
/// Event-Name fuer Presence-Updates
pub const EVENT_AKTIVE_NUTZER: &str = "onActiveUsers";
/// Event-Name fuer globale Nachrichten
pub const EVENT_GLOBALE_NACHRICHT: &str = "onReceivedGlobalMessage";
/// Event-Name fuer Fehlermeldungen an einen einzelnen Client
pub const EVENT_FEHLER: &str = "error";

// ---------------------------------------------------------------------------
// Eingehend
// ---------------------------------------------------------------------------

/// Vom Client gesendetes Event, an der Transportgrenze validiert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum EingehendesEvent {
    #[serde(rename = "FirstConnection")]
    Identifizieren(IdentifizierenAnfrage),
    #[serde(rename = "newMessage")]
    NachrichtSenden(NachrichtSendenAnfrage),
}

impl EingehendesEvent {
    /// Event-Name auf dem Draht
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identifizieren(_) => EVENT_IDENTIFIZIEREN,
            Self::NachrichtSenden(_) => EVENT_NACHRICHT_SENDEN,
        }
    }
}

// ---------------------------------------------------------------------------
// Ausgehend
// ---------------------------------------------------------------------------

/// Vom Relay an Clients gesendetes Event
///
/// Verlaufs-Pushes und Direktnachrichten tragen den Anzeigenamen des
/// Empfaengers als Event-Namen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AusgehendesEvent {
    /// Aktuelle Presence-Liste in Verbindungsreihenfolge
    AktiveNutzer(Vec<AktiverNutzer>),
    /// Nachricht oder Lebenszyklus-Eintrag an alle
    GlobaleNachricht(VerlaufEintrag),
    /// Bisheriger Verlauf fuer eine frisch identifizierte Session
    Verlauf { name: String, paket: VerlaufPaket },
    /// An einen Anzeigenamen adressierte Nachricht
    Direktnachricht(VerlaufEintrag),
    /// Fehler an genau einen Client
    Fehler(FehlerPaket),
}

impl AusgehendesEvent {
    /// Erstellt ein Fehler-Event
    pub fn fehler(code: FehlerCode, message: impl Into<String>) -> Self {
        Self::Fehler(FehlerPaket {
            code,
            message: message.into(),
        })
    }

    /// Event-Name auf dem Draht
    pub fn name(&self) -> &str {
        match self {
            Self::AktiveNutzer(_) => EVENT_AKTIVE_NUTZER,
            Self::GlobaleNachricht(_) => EVENT_GLOBALE_NACHRICHT,
            Self::Verlauf { name, .. } => name.as_str(),
            Self::Direktnachricht(eintrag) => eintrag.to.as_str(),
            Self::Fehler(_) => EVENT_FEHLER,
        }
    }

    /// Nutzlast als JSON-Wert
    pub fn daten(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::AktiveNutzer(nutzer) => serde_json::to_value(nutzer),
            Self::GlobaleNachricht(eintrag) | Self::Direktnachricht(eintrag) => {
                serde_json::to_value(eintrag)
            }
            Self::Verlauf { paket, .. } => serde_json::to_value(paket),
            Self::Fehler(fehler) => serde_json::to_value(fehler),
        }
    }
}
