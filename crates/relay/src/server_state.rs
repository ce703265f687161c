//! Gemeinsamer Relay-Zustand
//!
//! Haelt Router, Broadcaster und Metriken als eine Einheit, die via `Arc`
//! zwischen allen Verbindungs-Tasks geteilt wird. Jedes Event wird komplett
//! unter einem einzigen Lock verarbeitet: Zustandsaenderung und Einreihen
//! der ausgehenden Events geschehen atomar, dadurch sehen alle Sessions
//! dieselbe Reihenfolge.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use treffpunkt_core::SessionId;
use treffpunkt_observability::RelayMetriken;
use treffpunkt_protocol::{AktiverNutzer, AusgehendesEvent, NachrichtSendenAnfrage};

use crate::broadcast::{EventBroadcaster, SEND_QUEUE_GROESSE};
use crate::error::{RelayError, RelayResult};
use crate::router::{NachrichtenRouter, Zustellung};

/// Laufzeit-Konfiguration des Relays
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximale Anzahl gleichzeitiger Sessions
    pub max_clients: usize,
    /// Groesse der Send-Queue pro Session
    pub send_queue_groesse: usize,
    /// Intervall fuer WebSocket-Pings in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Maximale Groesse eines Text-Frames in Bytes
    pub max_frame_groesse: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            send_queue_groesse: SEND_QUEUE_GROESSE,
            keepalive_sek: 25,
            verbindungs_timeout_sek: 60,
            max_frame_groesse: treffpunkt_protocol::wire::DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Relay-Zustand (thread-safe, Arc-geteilt)
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    router: Mutex<NachrichtenRouter>,
    broadcaster: EventBroadcaster,
    pub metriken: RelayMetriken,
    pub start_time: Instant,
}

impl RelayState {
    pub fn neu(config: RelayConfig, metriken: RelayMetriken) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            router: Mutex::new(NachrichtenRouter::neu()),
            broadcaster: EventBroadcaster::neu(),
            metriken,
            start_time: Instant::now(),
        })
    }

    /// Nimmt eine neue Session auf und gibt ihre Empfangs-Queue zurueck
    pub fn verbinden(
        &self,
        session_id: SessionId,
    ) -> RelayResult<mpsc::Receiver<AusgehendesEvent>> {
        let mut router = self.router.lock();

        if router.register().anzahl() >= self.config.max_clients {
            tracing::warn!(
                session_id = %session_id,
                max = self.config.max_clients,
                "Verbindung abgelehnt – Server voll"
            );
            return Err(RelayError::ServerVoll);
        }

        let zustellungen = router.verbinden(session_id)?;
        let rx = self
            .broadcaster
            .client_registrieren(session_id, self.config.send_queue_groesse);
        self.ausliefern(&router, zustellungen);
        Ok(rx)
    }

    /// Setzt den Anzeigenamen einer Session und verteilt Presence und Verlauf
    pub fn identifizieren(&self, session_id: SessionId, name: &str) -> RelayResult<()> {
        let mut router = self.router.lock();
        let zustellungen = router.identifizieren(session_id, name)?;
        self.ausliefern(&router, zustellungen);
        Ok(())
    }

    /// Verarbeitet das Ende einer Verbindung
    ///
    /// Die Session wird zuerst aus dem Broadcaster genommen und erhaelt
    /// ihre eigene Trennungsmeldung nicht mehr.
    pub fn trennen(&self, session_id: SessionId) {
        let mut router = self.router.lock();
        self.broadcaster.client_entfernen(&session_id);
        let zustellungen = router.trennen(session_id);
        self.ausliefern(&router, zustellungen);
    }

    /// Leitet eine Nachricht global oder direkt weiter
    pub fn nachricht_senden(&self, session_id: SessionId, anfrage: &NachrichtSendenAnfrage) {
        let mut router = self.router.lock();
        let zustellungen = router.nachricht_senden(session_id, anfrage);
        self.metriken.nachricht_zaehlen(anfrage.ist_global());
        self.ausliefern(&router, zustellungen);
    }

    /// Sendet ein Event an genau eine Session (z.B. Fehlerantworten)
    pub fn an_session_senden(
        &self,
        session_id: &SessionId,
        event: AusgehendesEvent,
    ) -> RelayResult<()> {
        self.broadcaster.an_session_senden(session_id, event)
    }

    /// Anzahl der registrierten Sessions
    pub fn online_anzahl(&self) -> usize {
        self.router.lock().register().anzahl()
    }

    pub fn verlauf_laenge(&self) -> usize {
        self.router.lock().verlauf().laenge()
    }

    /// Aktuelle Presence-Liste
    pub fn aktive_nutzer(&self) -> Vec<AktiverNutzer> {
        self.router.lock().register().snapshot()
    }

    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Reiht Zustellungen ein und aktualisiert die Gauges
    ///
    /// Muss unter dem Router-Lock aufgerufen werden.
    fn ausliefern(&self, router: &NachrichtenRouter, zustellungen: Vec<Zustellung>) {
        let (erwartet, gesendet) = self.broadcaster.zustellen(zustellungen);
        let verworfen = erwartet.saturating_sub(gesendet);
        if verworfen > 0 {
            self.metriken
                .zustellungen_verworfen_total
                .inc_by(verworfen as u64);
        }

        self.metriken
            .verbundene_sessions
            .set(router.register().anzahl() as i64);
        self.metriken
            .verlauf_eintraege
            .set(router.verlauf().laenge() as i64);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
