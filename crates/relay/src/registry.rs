//! Verbindungs-Register – Welche Sessions leben, unter welchem Namen
//!
//! Haelt die Sessions in Verbindungsreihenfolge und pflegt einen
//! Sekundaerindex Anzeigename -> Sessions. Anzeigenamen sind nicht
//! eindeutig, der Index ist daher mehrwertig.
//!
//! Das Register selbst ist nicht synchronisiert; es gehoert exklusiv dem
//! [`NachrichtenRouter`](crate::router::NachrichtenRouter), der hinter dem
//! Lock in [`RelayState`](crate::server_state::RelayState) liegt.

use std::collections::HashMap;

use treffpunkt_core::SessionId;
use treffpunkt_protocol::AktiverNutzer;

use crate::error::{RelayError, RelayResult};

/// Rueckgabewert von [`VerbindungsRegister::name_von`] fuer unbekannte Sessions
pub const UNBEKANNTE_SESSION: &str = "User with given id doesn't exist";

/// Eine lebende Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: SessionId,
    /// Leer bis zur Identifizierung
    pub anzeigename: String,
}

/// Register aller verbundenen Sessions
#[derive(Debug, Default)]
pub struct VerbindungsRegister {
    sessions: HashMap<SessionId, Session>,
    /// Verbindungsreihenfolge fuer den Presence-Snapshot
    reihenfolge: Vec<SessionId>,
    /// Anzeigename -> Sessions in Benennungsreihenfolge (ohne leere Namen)
    namens_index: HashMap<String, Vec<SessionId>>,
}

impl VerbindungsRegister {
    /// Erstellt ein leeres Register
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert eine neue, noch unbenannte Session
    pub fn hinzufuegen(&mut self, session_id: SessionId) -> RelayResult<()> {
        if self.sessions.contains_key(&session_id) {
            return Err(RelayError::DoppelteSession(session_id));
        }

        self.sessions.insert(
            session_id,
            Session {
                session_id,
                anzeigename: String::new(),
            },
        );
        self.reihenfolge.push(session_id);
        Ok(())
    }

    /// Entfernt eine Session vollstaendig
    pub fn entfernen(&mut self, session_id: &SessionId) -> RelayResult<Session> {
        let session = self
            .sessions
            .remove(session_id)
            .ok_or(RelayError::NichtGefunden(*session_id))?;

        self.reihenfolge.retain(|sid| sid != session_id);
        self.aus_index_entfernen(&session.anzeigename, session_id);
        Ok(session)
    }

    /// Setzt den Anzeigenamen einer Session
    ///
    /// Eine erneute Benennung ersetzt den alten Namen auch im Index.
    pub fn name_setzen(&mut self, session_id: &SessionId, name: &str) -> RelayResult<()> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(RelayError::NichtGefunden(*session_id))?;

        let alter_name = std::mem::replace(&mut session.anzeigename, name.to_string());
        self.aus_index_entfernen(&alter_name, session_id);

        if !name.is_empty() {
            self.namens_index
                .entry(name.to_string())
                .or_default()
                .push(*session_id);
        }
        Ok(())
    }

    /// Gibt den Anzeigenamen zurueck, oder [`UNBEKANNTE_SESSION`]
    pub fn name_von(&self, session_id: &SessionId) -> &str {
        self.sessions
            .get(session_id)
            .map(|s| s.anzeigename.as_str())
            .unwrap_or(UNBEKANNTE_SESSION)
    }

    /// Presence-Liste in Verbindungsreihenfolge
    pub fn snapshot(&self) -> Vec<AktiverNutzer> {
        self.reihenfolge
            .iter()
            .filter_map(|sid| self.sessions.get(sid))
            .map(|s| AktiverNutzer {
                session_id: s.session_id,
                user_name: s.anzeigename.clone(),
            })
            .collect()
    }

    /// Alle Sessions, die aktuell `name` tragen
    ///
    /// Leere Namen werden nicht aufgeloest.
    pub fn sessions_mit_namen(&self, name: &str) -> Vec<SessionId> {
        self.namens_index.get(name).cloned().unwrap_or_default()
    }

    /// Prueft ob eine Session registriert ist
    pub fn enthaelt(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Anzahl der lebenden Sessions
    pub fn anzahl(&self) -> usize {
        self.sessions.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.sessions.is_empty()
    }

    fn aus_index_entfernen(&mut self, name: &str, session_id: &SessionId) {
        if name.is_empty() {
            return;
        }
        if let Some(ids) = self.namens_index.get_mut(name) {
            ids.retain(|sid| sid != session_id);
            if ids.is_empty() {
                self.namens_index.remove(name);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
