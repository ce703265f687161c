//! Fehlertypen fuer das Relay

use thiserror::Error;
use treffpunkt_core::SessionId;
use treffpunkt_protocol::ProtokollFehler;

/// Fehlertyp fuer das Relay
///
/// Kein Fehler dieses Typs darf die Verarbeitung anderer Sessions abbrechen;
/// er wird pro Event lokal behandelt und geloggt.
#[derive(Debug, Error)]
pub enum RelayError {
    /// IO-Fehler (Socket, Listener)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Verbindung mit bereits registrierter Session-ID
    #[error("Session bereits registriert: {0}")]
    DoppelteSession(SessionId),

    /// Operation auf einer nicht (mehr) vorhandenen Session
    #[error("Session nicht gefunden: {0}")]
    NichtGefunden(SessionId),

    /// Ungueltiger Frame an der Transportgrenze
    #[error("Protokollfehler: {0}")]
    Protokoll(#[from] ProtokollFehler),

    /// Maximale Anzahl gleichzeitiger Sessions erreicht
    #[error("Server ist voll")]
    ServerVoll,

    /// Senden an Client fehlgeschlagen (Queue voll oder geschlossen)
    #[error("Senden fehlgeschlagen")]
    SendFehler,

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl RelayError {
    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

/// Result-Typ fuer das Relay
pub type RelayResult<T> = Result<T, RelayError>;
