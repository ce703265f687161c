//! Message-Dispatcher – Routet eingehende Events an den Relay-Zustand
//!
//! Erfolgreiche Operationen antworten nie direkt: alle Folge-Events laufen
//! ueber die Send-Queues. Der Dispatcher liefert nur im Fehlerfall ein
//! `error`-Event fuer den ausloesenden Client zurueck.

use std::sync::Arc;
use treffpunkt_core::SessionId;
use treffpunkt_protocol::{AusgehendesEvent, EingehendesEvent, FehlerCode, ProtokollFehler};

use crate::error::RelayError;
use crate::server_state::RelayState;

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<RelayState>,
}

impl MessageDispatcher {
    pub fn neu(state: Arc<RelayState>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes Event einer Session
    ///
    /// Gibt `Some` nur zurueck wenn der Client einen Fehler erhalten soll.
    pub fn dispatch(
        &self,
        session_id: SessionId,
        event: EingehendesEvent,
    ) -> Option<AusgehendesEvent> {
        tracing::trace!(session_id = %session_id, event = event.name(), "Event empfangen");

        let ergebnis = match event {
            EingehendesEvent::Identifizieren(anfrage) => {
                self.state.identifizieren(session_id, &anfrage.from)
            }
            EingehendesEvent::NachrichtSenden(anfrage) => {
                self.state.nachricht_senden(session_id, &anfrage);
                Ok(())
            }
        };

        match ergebnis {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(session_id = %session_id, fehler = %e, "Event abgelehnt");
                Some(fehler_event(&e))
            }
        }
    }
}

/// Bildet einen Relay-Fehler auf das `error`-Event ab
pub fn fehler_event(fehler: &RelayError) -> AusgehendesEvent {
    let code = match fehler {
        RelayError::NichtGefunden(_) => FehlerCode::NotFound,
        RelayError::Protokoll(_) => FehlerCode::InvalidRequest,
        RelayError::DoppelteSession(_)
        | RelayError::ServerVoll
        | RelayError::SendFehler
        | RelayError::Io(_)
        | RelayError::Intern(_) => FehlerCode::InternalError,
    };
    AusgehendesEvent::fehler(code, fehler.to_string())
}

/// Fehler-Event fuer einen nicht dekodierbaren Frame
pub fn protokoll_fehler_event(fehler: ProtokollFehler) -> AusgehendesEvent {
    fehler_event(&RelayError::Protokoll(fehler))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::RelayConfig;
    use treffpunkt_observability::RelayMetriken;
    use treffpunkt_protocol::{FehlerPaket, IdentifizierenAnfrage, NachrichtSendenAnfrage};

    fn dispatcher() -> (MessageDispatcher, Arc<RelayState>) {
        let state = RelayState::neu(RelayConfig::default(), RelayMetriken::neu().unwrap());
        (MessageDispatcher::neu(Arc::clone(&state)), state)
    }

    #[tokio::test]
    async fn identifizieren_ohne_verbindung_liefert_not_found() {
        let (dispatcher, _state) = dispatcher();
        let antwort = dispatcher.dispatch(
            SessionId::new(),
            EingehendesEvent::Identifizieren(IdentifizierenAnfrage {
                from: "ghost".into(),
            }),
        );

        match antwort {
            Some(AusgehendesEvent::Fehler(FehlerPaket { code, .. })) => {
                assert_eq!(code, FehlerCode::NotFound)
            }
            anderes => panic!("Fehler erwartet, erhalten: {anderes:?}"),
        }
    }

    #[tokio::test]
    async fn erfolgreiche_events_antworten_nicht_direkt() {
        let (dispatcher, state) = dispatcher();
        let sid = SessionId::new();
        let mut rx = state.verbinden(sid).unwrap();

        assert!(dispatcher
            .dispatch(
                sid,
                EingehendesEvent::Identifizieren(IdentifizierenAnfrage {
                    from: "alice".into()
                }),
            )
            .is_none());
        assert!(dispatcher
            .dispatch(
                sid,
                EingehendesEvent::NachrichtSenden(NachrichtSendenAnfrage {
                    value: "hi".into(),
                    from: "alice".into(),
                    to: "global".into(),
                }),
            )
            .is_none());

        // Presence, Verlauf, eigener Eintrag, Nachricht
        let mut anzahl = 0;
        while rx.try_recv().is_ok() {
            anzahl += 1;
        }
        assert_eq!(anzahl, 4);
    }

    #[test]
    fn protokollfehler_wird_invalid_request() {
        let fehler = ProtokollFehler::UngueltigesFeld {
            feld: "to",
            grund: "leer".into(),
        };
        match protokoll_fehler_event(fehler) {
            AusgehendesEvent::Fehler(paket) => {
                assert_eq!(paket.code, FehlerCode::InvalidRequest);
                assert!(paket.message.contains("to"));
            }
            anderes => panic!("Fehler erwartet, erhalten: {anderes:?}"),
        }
    }
}
