//! Event-Broadcaster – Verteilt ausgehende Events an die Send-Queues
//!
//! Jede verbundene Session besitzt eine begrenzte Queue, aus der ihre
//! [`ClientConnection`](crate::connection::ClientConnection) liest und auf
//! den WebSocket schreibt. Senden ist nicht-blockierend: ist eine Queue voll
//! oder geschlossen, wird das Event fuer diese Session verworfen.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use treffpunkt_core::SessionId;
use treffpunkt_protocol::AusgehendesEvent;

use crate::error::{RelayError, RelayResult};
use crate::router::{Ziel, Zustellung};

/// Standardgroesse der Send-Queue pro Session
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Session
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub session_id: SessionId,
    pub tx: mpsc::Sender<AusgehendesEvent>,
}

impl ClientSender {
    /// Reiht ein Event nicht-blockierend ein
    pub fn senden(&self, event: AusgehendesEvent) -> RelayResult<()> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "Send-Queue voll – Event verworfen"
                );
                Err(RelayError::SendFehler)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                Err(RelayError::SendFehler)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentrale Verteilung an alle verbundenen Sessions
///
/// Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<DashMap<SessionId, ClientSender>>,
}

impl EventBroadcaster {
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Registriert eine Session und gibt ihre Empfangs-Queue zurueck
    pub fn client_registrieren(
        &self,
        session_id: SessionId,
        queue_groesse: usize,
    ) -> mpsc::Receiver<AusgehendesEvent> {
        let (tx, rx) = mpsc::channel(queue_groesse.max(1));
        self.inner.insert(session_id, ClientSender { session_id, tx });
        tracing::debug!(session_id = %session_id, "Client im Broadcaster registriert");
        rx
    }

    /// Entfernt eine Session; danach erhaelt sie keine Events mehr
    pub fn client_entfernen(&self, session_id: &SessionId) {
        if self.inner.remove(session_id).is_some() {
            tracing::debug!(session_id = %session_id, "Client aus Broadcaster entfernt");
        }
    }

    /// Sendet ein Event an eine einzelne Session
    pub fn an_session_senden(
        &self,
        session_id: &SessionId,
        event: AusgehendesEvent,
    ) -> RelayResult<()> {
        match self.inner.get(session_id) {
            Some(sender) => sender.senden(event),
            None => {
                tracing::debug!(session_id = %session_id, "Senden an unbekannten Client");
                Err(RelayError::NichtGefunden(*session_id))
            }
        }
    }

    /// Sendet ein Event an alle registrierten Sessions
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, event: &AusgehendesEvent) -> usize {
        self.inner
            .iter()
            .filter(|entry| entry.value().senden(event.clone()).is_ok())
            .count()
    }

    /// Liefert Zustellungen in ihrer Reihenfolge aus
    ///
    /// Gibt `(erwartet, gesendet)` zurueck; die Differenz sind verworfene
    /// Zustellungen.
    pub fn zustellen(&self, zustellungen: Vec<Zustellung>) -> (usize, usize) {
        let mut erwartet = 0;
        let mut gesendet = 0;

        for zustellung in zustellungen {
            match zustellung.ziel {
                Ziel::Alle => {
                    erwartet += self.inner.len();
                    gesendet += self.an_alle_senden(&zustellung.event);
                }
                Ziel::Session(sid) => {
                    erwartet += 1;
                    if self.an_session_senden(&sid, zustellung.event).is_ok() {
                        gesendet += 1;
                    }
                }
            }
        }

        (erwartet, gesendet)
    }

    pub fn ist_registriert(&self, session_id: &SessionId) -> bool {
        self.inner.contains_key(session_id)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
