//! Nachrichten-Router – Zustandsmaschine ueber die Relay-Events
//!
//! Der Router besitzt Register und Verlauf und entscheidet fuer jedes
//! eingehende Event, welche ausgehenden Events an wen gehen. Er sendet
//! selbst nichts: jede Operation liefert eine Liste von [`Zustellung`]en,
//! die [`RelayState`](crate::server_state::RelayState) ueber den
//! [`EventBroadcaster`](crate::broadcast::EventBroadcaster) ausliefert.
//!
//! ## Zustaende einer Session
//! ```text
//! abwesend --verbinden--> unbenannt --identifizieren--> benannt
//!     ^                       |                            |
//!     +--------trennen--------+------------trennen---------+
//! ```
//!
//! ## Bekannte Einschraenkungen
//! - Beim reinen Verbindungsaufbau wird nichts gesendet; Presence und
//!   Verlauf gehen erst bei der Identifizierung raus.
//! - Der Absendername einer Nachricht wird ungeprueft aus der Anfrage
//!   uebernommen und nicht mit dem Register abgeglichen.
//! - Direktnachrichten werden ueber den Anzeigenamen adressiert. Tragen
//!   mehrere Sessions denselben Namen, erhalten alle die Nachricht; traegt
//!   niemand den Namen, wird sie verworfen.

use treffpunkt_core::SessionId;
use treffpunkt_protocol::{
    AusgehendesEvent, NachrichtSendenAnfrage, VerlaufEintrag, VerlaufPaket,
};

use crate::error::{RelayError, RelayResult};
use crate::registry::VerbindungsRegister;
use crate::verlauf::Verlauf;

// ---------------------------------------------------------------------------
// Zustellungen
// ---------------------------------------------------------------------------

/// Empfaenger einer Zustellung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ziel {
    /// Alle verbundenen Sessions
    Alle,
    /// Genau eine Session
    Session(SessionId),
}

/// Ein ausgehendes Event mit seinem Empfaenger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zustellung {
    pub ziel: Ziel,
    pub event: AusgehendesEvent,
}

impl Zustellung {
    pub fn an_alle(event: AusgehendesEvent) -> Self {
        Self {
            ziel: Ziel::Alle,
            event,
        }
    }

    pub fn an_session(session_id: SessionId, event: AusgehendesEvent) -> Self {
        Self {
            ziel: Ziel::Session(session_id),
            event,
        }
    }
}

// ---------------------------------------------------------------------------
// NachrichtenRouter
// ---------------------------------------------------------------------------

/// Besitzt Register und Verlauf, entscheidet ueber den Fan-out
#[derive(Debug, Default)]
pub struct NachrichtenRouter {
    register: VerbindungsRegister,
    verlauf: Verlauf,
}

impl NachrichtenRouter {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Neue Verbindung: registrieren und protokollieren, nichts senden
    pub fn verbinden(&mut self, session_id: SessionId) -> RelayResult<Vec<Zustellung>> {
        self.register.hinzufuegen(session_id)?;
        self.verlauf.anhaengen(VerlaufEintrag::verbindung(session_id));

        tracing::info!(session_id = %session_id, "Session verbunden");
        Ok(Vec::new())
    }

    /// Anzeigename bekanntgeben
    ///
    /// Reihenfolge der Zustellungen:
    /// 1. Presence-Liste an alle
    /// 2. Verlauf ohne letzten Eintrag an die identifizierte Session
    /// 3. Letzter Verlaufseintrag an alle
    ///
    /// Der letzte Eintrag ist nur dann der eigene Verbindungs-Eintrag, wenn
    /// seit dem Verbinden nichts protokolliert wurde. Sonst steckt der eigene
    /// Eintrag im Verlaufs-Push und verteilt wird der juengste fremde Eintrag.
    pub fn identifizieren(
        &mut self,
        session_id: SessionId,
        name: &str,
    ) -> RelayResult<Vec<Zustellung>> {
        if !self.register.enthaelt(&session_id) {
            return Err(RelayError::NichtGefunden(session_id));
        }

        let benannt = self.verlauf.verbindung_benennen(&session_id, name);
        self.register.name_setzen(&session_id, name)?;

        tracing::info!(
            session_id = %session_id,
            name = %name,
            eintraege = benannt,
            "Session identifiziert"
        );

        let mut zustellungen = vec![
            Zustellung::an_alle(AusgehendesEvent::AktiveNutzer(self.register.snapshot())),
            Zustellung::an_session(
                session_id,
                AusgehendesEvent::Verlauf {
                    name: name.to_string(),
                    paket: VerlaufPaket {
                        messages: self.verlauf.ohne_letzten(),
                    },
                },
            ),
        ];

        if let Some(letzter) = self.verlauf.letzter() {
            zustellungen.push(Zustellung::an_alle(AusgehendesEvent::GlobaleNachricht(
                letzter.clone(),
            )));
        }

        Ok(zustellungen)
    }

    /// Verbindung getrennt
    ///
    /// Auch fuer eine unbekannte Session wird ein Trennungs-Eintrag (mit dem
    /// Platzhalternamen) protokolliert und verteilt; das Register meldet den
    /// Fehler nur ins Log.
    pub fn trennen(&mut self, session_id: SessionId) -> Vec<Zustellung> {
        let name = self.register.name_von(&session_id).to_string();
        let eintrag = VerlaufEintrag::trennung(session_id, name);
        self.verlauf.anhaengen(eintrag.clone());

        match self.register.entfernen(&session_id) {
            Ok(session) => tracing::info!(
                session_id = %session_id,
                name = %session.anzeigename,
                "Session getrennt"
            ),
            Err(e) => tracing::warn!(
                session_id = %session_id,
                fehler = %e,
                "Trennung einer nicht registrierten Session"
            ),
        }

        vec![
            Zustellung::an_alle(AusgehendesEvent::AktiveNutzer(self.register.snapshot())),
            Zustellung::an_alle(AusgehendesEvent::GlobaleNachricht(eintrag)),
        ]
    }

    /// Nachricht an den globalen Raum oder an einen Anzeigenamen
    ///
    /// Nur globale Nachrichten landen im Verlauf.
    pub fn nachricht_senden(
        &mut self,
        session_id: SessionId,
        anfrage: &NachrichtSendenAnfrage,
    ) -> Vec<Zustellung> {
        let eintrag = VerlaufEintrag::nachricht(session_id, anfrage);

        if anfrage.ist_global() {
            self.verlauf.anhaengen(eintrag.clone());
            tracing::debug!(session_id = %session_id, from = %anfrage.from, "Globale Nachricht");
            return vec![Zustellung::an_alle(AusgehendesEvent::GlobaleNachricht(
                eintrag,
            ))];
        }

        let empfaenger = self.register.sessions_mit_namen(&anfrage.to);
        match empfaenger.len() {
            0 => tracing::debug!(
                session_id = %session_id,
                ziel = %anfrage.to,
                "Direktnachricht ohne Empfaenger verworfen"
            ),
            1 => tracing::debug!(
                session_id = %session_id,
                ziel = %anfrage.to,
                "Direktnachricht"
            ),
            anzahl => tracing::debug!(
                session_id = %session_id,
                ziel = %anfrage.to,
                anzahl,
                "Direktnachricht an alle Traeger des Namens"
            ),
        }

        empfaenger
            .into_iter()
            .map(|sid| {
                Zustellung::an_session(sid, AusgehendesEvent::Direktnachricht(eintrag.clone()))
            })
            .collect()
    }

    pub fn register(&self) -> &VerbindungsRegister {
        &self.register
    }

    pub fn verlauf(&self) -> &Verlauf {
        &self.verlauf
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UNBEKANNTE_SESSION;
    use treffpunkt_protocol::{AktiverNutzer, EintragTyp};

    fn anfrage(value: &str, from: &str, to: &str) -> NachrichtSendenAnfrage {
        NachrichtSendenAnfrage {
            value: value.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    fn presence_zustellungen(zustellungen: &[Zustellung]) -> Vec<&Vec<AktiverNutzer>> {
        zustellungen
            .iter()
            .filter_map(|z| match &z.event {
                AusgehendesEvent::AktiveNutzer(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn verbinden_sendet_nichts() {
        let mut router = NachrichtenRouter::neu();
        let sid = SessionId::new();

        let zustellungen = router.verbinden(sid).unwrap();
        assert!(zustellungen.is_empty());
        assert_eq!(router.verlauf().laenge(), 1);
        assert_eq!(router.verlauf().eintraege()[0].typ, EintragTyp::Verbindung);
        assert_eq!(router.verlauf().eintraege()[0].from, "");
    }

    #[test]
    fn doppeltes_verbinden_protokolliert_nichts() {
        let mut router = NachrichtenRouter::neu();
        let sid = SessionId::new();
        router.verbinden(sid).unwrap();

        assert!(matches!(
            router.verbinden(sid),
            Err(RelayError::DoppelteSession(_))
        ));
        assert_eq!(router.verlauf().laenge(), 1);
        assert_eq!(router.register().anzahl(), 1);
    }

    #[test]
    fn identifizieren_reihenfolge_und_inhalt() {
        let mut router = NachrichtenRouter::neu();
        let a = SessionId::new();
        router.verbinden(a).unwrap();

        let z = router.identifizieren(a, "alice").unwrap();
        assert_eq!(z.len(), 3);

        // 1. Presence an alle
        assert_eq!(z[0].ziel, Ziel::Alle);
        assert_eq!(
            z[0].event,
            AusgehendesEvent::AktiveNutzer(vec![AktiverNutzer {
                session_id: a,
                user_name: "alice".into()
            }])
        );

        // 2. Verlauf ohne eigenen Eintrag an die Session
        assert_eq!(z[1].ziel, Ziel::Session(a));
        match &z[1].event {
            AusgehendesEvent::Verlauf { name, paket } => {
                assert_eq!(name, "alice");
                assert!(paket.messages.is_empty());
            }
            anderes => panic!("Verlauf erwartet, erhalten: {anderes:?}"),
        }

        // 3. Eigener, nun benannter Verbindungs-Eintrag an alle
        assert_eq!(z[2].ziel, Ziel::Alle);
        match &z[2].event {
            AusgehendesEvent::GlobaleNachricht(e) => {
                assert_eq!(e.typ, EintragTyp::Verbindung);
                assert_eq!(e.from, "alice");
                assert_eq!(e.from_id, a);
            }
            anderes => panic!("GlobaleNachricht erwartet, erhalten: {anderes:?}"),
        }

        assert_eq!(router.verlauf().eintraege()[0].from, "alice");
        assert_eq!(presence_zustellungen(&z).len(), 1);
    }

    #[test]
    fn identifizieren_unbekannter_session() {
        let mut router = NachrichtenRouter::neu();
        let sid = SessionId::new();
        assert!(matches!(
            router.identifizieren(sid, "ghost"),
            Err(RelayError::NichtGefunden(_))
        ));
        assert!(router.verlauf().ist_leer());
    }

    #[test]
    fn verlauf_plus_eigener_eintrag_ergibt_gesamten_verlauf() {
        let mut router = NachrichtenRouter::neu();
        let a = SessionId::new();
        let b = SessionId::new();

        router.verbinden(a).unwrap();
        router.identifizieren(a, "alice").unwrap();
        router.nachricht_senden(a, &anfrage("hallo", "alice", "global"));
        router.verbinden(b).unwrap();

        let z = router.identifizieren(b, "bob").unwrap();
        let mut rekonstruiert = match &z[1].event {
            AusgehendesEvent::Verlauf { paket, .. } => paket.messages.clone(),
            anderes => panic!("Verlauf erwartet, erhalten: {anderes:?}"),
        };
        match &z[2].event {
            AusgehendesEvent::GlobaleNachricht(e) => rekonstruiert.push(e.clone()),
            anderes => panic!("GlobaleNachricht erwartet, erhalten: {anderes:?}"),
        }

        assert_eq!(rekonstruiert, router.verlauf().eintraege());
        assert_eq!(rekonstruiert.len(), 3);
    }

    #[test]
    fn dazwischen_verbundene_session_liefert_letzten_eintrag() {
        let mut router = NachrichtenRouter::neu();
        let a = SessionId::new();
        let b = SessionId::new();
        router.verbinden(a).unwrap();
        router.verbinden(b).unwrap();

        let z = router.identifizieren(a, "alice").unwrap();
        assert_eq!(z.len(), 3);

        // Eigener, benannter Eintrag steckt im Verlauf
        let mut rekonstruiert = match &z[1].event {
            AusgehendesEvent::Verlauf { paket, .. } => paket.messages.clone(),
            anderes => panic!("Verlauf erwartet, erhalten: {anderes:?}"),
        };
        assert_eq!(rekonstruiert.len(), 1);
        assert_eq!(rekonstruiert[0].from_id, a);
        assert_eq!(rekonstruiert[0].from, "alice");

        // Verteilt wird der letzte Eintrag, also bobs unbenannte Verbindung
        assert_eq!(z[2].ziel, Ziel::Alle);
        match &z[2].event {
            AusgehendesEvent::GlobaleNachricht(e) => {
                assert_eq!(e.typ, EintragTyp::Verbindung);
                assert_eq!(e.from_id, b);
                assert_eq!(e.from, "");
                rekonstruiert.push(e.clone());
            }
            anderes => panic!("GlobaleNachricht erwartet, erhalten: {anderes:?}"),
        }
        assert_eq!(rekonstruiert, router.verlauf().eintraege());
    }

    #[test]
    fn globale_nachricht_wird_protokolliert_und_verteilt() {
        let mut router = NachrichtenRouter::neu();
        let a = SessionId::new();
        router.verbinden(a).unwrap();

        let z = router.nachricht_senden(a, &anfrage("hi", "alice", "global"));
        assert_eq!(z.len(), 1);
        assert_eq!(z[0].ziel, Ziel::Alle);
        assert_eq!(router.verlauf().laenge(), 2);

        let letzter = router.verlauf().letzter().unwrap();
        assert_eq!(letzter.typ, EintragTyp::Nachricht);
        assert_eq!(letzter.value, "hi");
        assert_eq!(letzter.to, "global");
    }

    #[test]
    fn absendername_wird_ungeprueft_uebernommen() {
        let mut router = NachrichtenRouter::neu();
        let a = SessionId::new();
        router.verbinden(a).unwrap();
        router.identifizieren(a, "alice").unwrap();

        let z = router.nachricht_senden(a, &anfrage("ich bin bob", "bob", "global"));
        match &z[0].event {
            AusgehendesEvent::GlobaleNachricht(e) => {
                assert_eq!(e.from, "bob");
                assert_eq!(e.from_id, a);
            }
            anderes => panic!("GlobaleNachricht erwartet, erhalten: {anderes:?}"),
        }
    }

    #[test]
    fn direktnachricht_ohne_empfaenger_wird_verworfen() {
        let mut router = NachrichtenRouter::neu();
        let a = SessionId::new();
        router.verbinden(a).unwrap();
        let laenge_vorher = router.verlauf().laenge();

        let z = router.nachricht_senden(a, &anfrage("psst", "alice", "bob"));
        assert!(z.is_empty());
        assert_eq!(router.verlauf().laenge(), laenge_vorher);
    }

    #[test]
    fn direktnachricht_an_alle_namenstraeger() {
        let mut router = NachrichtenRouter::neu();
        let a = SessionId::new();
        let b1 = SessionId::new();
        let b2 = SessionId::new();
        for sid in [a, b1, b2] {
            router.verbinden(sid).unwrap();
        }
        router.identifizieren(b1, "bob").unwrap();
        router.identifizieren(b2, "bob").unwrap();
        let laenge_vorher = router.verlauf().laenge();

        let z = router.nachricht_senden(a, &anfrage("psst", "alice", "bob"));
        let ziele: Vec<Ziel> = z.iter().map(|z| z.ziel).collect();
        assert_eq!(ziele, vec![Ziel::Session(b1), Ziel::Session(b2)]);
        assert!(z
            .iter()
            .all(|z| matches!(&z.event, AusgehendesEvent::Direktnachricht(e) if e.to == "bob")));
        assert_eq!(router.verlauf().laenge(), laenge_vorher);
    }

    #[test]
    fn trennen_nach_identifizierung() {
        let mut router = NachrichtenRouter::neu();
        let a = SessionId::new();
        let b = SessionId::new();
        router.verbinden(a).unwrap();
        router.verbinden(b).unwrap();
        router.identifizieren(a, "alice").unwrap();

        let z = router.trennen(a);
        assert_eq!(z.len(), 2);
        assert!(!router.register().enthaelt(&a));

        let presence = presence_zustellungen(&z);
        assert_eq!(presence.len(), 1);
        assert!(presence[0].iter().all(|n| n.session_id != a));

        match &z[1].event {
            AusgehendesEvent::GlobaleNachricht(e) => {
                assert_eq!(e.typ, EintragTyp::Trennung);
                assert_eq!(e.from, "alice");
                assert_eq!(e.to, "");
            }
            anderes => panic!("GlobaleNachricht erwartet, erhalten: {anderes:?}"),
        }
        assert_eq!(router.verlauf().letzter().unwrap().typ, EintragTyp::Trennung);
    }

    #[test]
    fn trennen_unbekannter_session_verwendet_platzhalter() {
        let mut router = NachrichtenRouter::neu();
        let sid = SessionId::new();

        let z = router.trennen(sid);
        assert_eq!(z.len(), 2);
        assert_eq!(router.verlauf().letzter().unwrap().from, UNBEKANNTE_SESSION);
        assert!(router.register().ist_leer());
    }

    #[test]
    fn sessionanzahl_entspricht_verbindungen_minus_trennungen() {
        let mut router = NachrichtenRouter::neu();
        let ids: Vec<SessionId> = (0..5).map(|_| SessionId::new()).collect();

        for (i, sid) in ids.iter().enumerate() {
            router.verbinden(*sid).unwrap();
            assert_eq!(router.register().anzahl(), i + 1);
        }
        for (i, sid) in ids.iter().take(3).enumerate() {
            router.trennen(*sid);
            assert_eq!(router.register().anzahl(), ids.len() - i - 1);
        }
    }
}
