//! Gemeinsame Identifikationstypen fuer Treffpunkt
//!
//! Session-IDs verwenden das Newtype-Pattern, damit sie nicht mit
//! Anzeigenamen (ebenfalls Strings auf dem Draht) verwechselt werden.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Routing-Ziel fuer den gemeinsamen Raum
pub const GLOBAL_ZIEL: &str = "global";

/// Eindeutige Session-ID einer Verbindung
///
/// Wird von der Transportschicht beim Verbindungsaufbau vergeben und bleibt
/// fuer die Lebensdauer der Verbindung stabil. Serialisiert als nackter
/// UUID-String.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
