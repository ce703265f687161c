//! Nutzdaten der Relay-Events
//!
//! Die Feldnamen auf dem Draht (`fromId`, `socketId`, `userName`, ...) sind
//! mit bestehenden Chat-Clients kompatibel und werden daher per
//! `#[serde(rename)]` festgelegt.

use serde::{Deserialize, Serialize};
use treffpunkt_core::types::{SessionId, GLOBAL_ZIEL};

use crate::error::{ProtokollFehler, ProtokollResult};

// ---------------------------------------------------------------------------
// Verlaufseintraege
// ---------------------------------------------------------------------------

/// Art eines Verlaufseintrags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EintragTyp {
    /// Verbindung aufgebaut
    #[serde(rename = "connection")]
    Verbindung,
    /// Verbindung getrennt
    #[serde(rename = "disconnect")]
    Trennung,
    /// Chat-Nachricht
    #[serde(rename = "message")]
    Nachricht,
}

/// Ein Eintrag im Nachrichtenverlauf
///
/// Wird auch als Nutzlast fuer globale und direkte Nachrichten verwendet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerlaufEintrag {
    #[serde(rename = "type")]
    pub typ: EintragTyp,
    /// Nachrichtentext (leer bei Verbindungs-Eintraegen)
    pub value: String,
    /// Session, die den Eintrag erzeugt hat
    #[serde(rename = "fromId")]
    pub from_id: SessionId,
    /// Zugeordneter Anzeigename (kann leer sein)
    pub from: String,
    /// `"global"`, ein Anzeigename oder leer
    pub to: String,
}

impl VerlaufEintrag {
    /// Verbindungs-Eintrag, Name wird bei der Identifizierung nachgetragen
    pub fn verbindung(session_id: SessionId) -> Self {
        Self {
            typ: EintragTyp::Verbindung,
            value: String::new(),
            from_id: session_id,
            from: String::new(),
            to: String::new(),
        }
    }

    /// Trennungs-Eintrag mit dem letzten bekannten Namen
    pub fn trennung(session_id: SessionId, from: impl Into<String>) -> Self {
        Self {
            typ: EintragTyp::Trennung,
            value: String::new(),
            from_id: session_id,
            from: from.into(),
            to: String::new(),
        }
    }

    /// Chat-Nachricht von `session_id`
    pub fn nachricht(session_id: SessionId, anfrage: &NachrichtSendenAnfrage) -> Self {
        Self {
            typ: EintragTyp::Nachricht,
            value: anfrage.value.clone(),
            from_id: session_id,
            from: anfrage.from.clone(),
            to: anfrage.to.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Eintrag der Presence-Liste
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AktiverNutzer {
    #[serde(rename = "socketId")]
    pub session_id: SessionId,
    #[serde(rename = "userName")]
    pub user_name: String,
}

/// Verlaufs-Push an eine frisch identifizierte Session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerlaufPaket {
    pub messages: Vec<VerlaufEintrag>,
}

// ---------------------------------------------------------------------------
// Eingehende Nutzdaten
// ---------------------------------------------------------------------------

/// Anzeigename bekanntgeben
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifizierenAnfrage {
    pub from: String,
}

impl IdentifizierenAnfrage {
    /// Leere Namen sind nicht adressierbar und werden abgelehnt
    pub fn validieren(&self) -> ProtokollResult<()> {
        if self.from.is_empty() {
            return Err(ProtokollFehler::UngueltigesFeld {
                feld: "from",
                grund: "Anzeigename darf nicht leer sein".into(),
            });
        }
        Ok(())
    }
}

/// Nachricht an den globalen Raum oder an einen Anzeigenamen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NachrichtSendenAnfrage {
    pub value: String,
    /// Absendername, wird ungeprueft uebernommen
    pub from: String,
    pub to: String,
}

impl NachrichtSendenAnfrage {
    /// Prueft, ob die Nachricht an den globalen Raum geht
    pub fn ist_global(&self) -> bool {
        self.to == GLOBAL_ZIEL
    }

    /// Prueft die Felder an der Transportgrenze
    pub fn validieren(&self) -> ProtokollResult<()> {
        if self.to.is_empty() {
            return Err(ProtokollFehler::UngueltigesFeld {
                feld: "to",
                grund: "Ziel darf nicht leer sein".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fehler an den Client
// ---------------------------------------------------------------------------

/// Fehler-Codes fuer das `error`-Event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FehlerCode {
    InvalidRequest,
    NotFound,
    InternalError,
}

/// Nutzlast des `error`-Events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FehlerPaket {
    pub code: FehlerCode,
    pub message: String,
}
