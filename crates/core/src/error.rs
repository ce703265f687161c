//! Fehlertypen fuer Treffpunkt
//!
//! Zentraler Fehler-Enum fuer Fehler, die crate-uebergreifend auftreten.
//! Untermodule definieren eigene Fehler und koennen via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Treffpunkt
pub type Result<T> = std::result::Result<T, TreffpunktError>;

/// Crate-uebergreifende Fehler im Treffpunkt-System
#[derive(Debug, Error)]
pub enum TreffpunktError {
    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl TreffpunktError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler auf eine fehlerhafte Konfiguration
    /// zurueckgeht und ein Neustart ohne Aenderung nichts bringt
    pub fn ist_konfiguration(&self) -> bool {
        matches!(self, Self::Konfiguration(_))
    }
}
