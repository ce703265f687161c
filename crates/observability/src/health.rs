//! Health-Check-Endpunkt fuer Treffpunkt
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Anzahl verbundener Sessions

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Relay laeuft, nimmt aber keine neuen Verbindungen an (voll)
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub sessions: usize,
}

/// Liefert die aktuelle Anzahl verbundener Sessions
pub type SessionZaehler = Arc<dyn Fn() -> usize + Send + Sync>;

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    pub max_sessions: usize,
    sessions: SessionZaehler,
}

impl HealthState {
    pub fn neu(max_sessions: usize, sessions: SessionZaehler) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            max_sessions,
            sessions,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn sessions(&self) -> usize {
        (self.sessions)()
    }

    /// Berechnet die aktuelle Health-Antwort
    pub fn pruefen(&self) -> HealthResponse {
        let sessions = self.sessions();
        let status = if sessions >= self.max_sessions {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            sessions,
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
///
/// Auch `degraded` liefert 200, damit Probes den Prozess nicht neu starten.
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.pruefen()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn state_mit_zaehler(max: usize) -> (HealthState, Arc<AtomicUsize>) {
        let zaehler = Arc::new(AtomicUsize::new(0));
        let quelle = Arc::clone(&zaehler);
        let state = HealthState::neu(max, Arc::new(move || quelle.load(Ordering::Relaxed)));
        (state, zaehler)
    }

    #[test]
    fn health_state_uptime_frisch() {
        let (state, _) = state_mit_zaehler(10);
        assert!(state.uptime_seconds() < 5);
    }

    #[test]
    fn healthy_unter_dem_limit() {
        let (state, zaehler) = state_mit_zaehler(2);
        zaehler.store(1, Ordering::Relaxed);

        let antwort = state.pruefen();
        assert_eq!(antwort.status, HealthStatus::Healthy);
        assert_eq!(antwort.sessions, 1);
    }

    #[test]
    fn degraded_wenn_voll() {
        let (state, zaehler) = state_mit_zaehler(2);
        zaehler.store(2, Ordering::Relaxed);
        assert_eq!(state.pruefen().status, HealthStatus::Degraded);
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            sessions: 4,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":3600"));
        assert!(json.contains("\"sessions\":4"));
    }
}
