//! Prometheus-kompatible Metriken fuer Treffpunkt
//!
//! Registrierte Metriken:
//! - `treffpunkt_verbundene_sessions` – Gauge: Aktuell verbundene Sessions
//! - `treffpunkt_verlauf_eintraege` – Gauge: Laenge des Nachrichtenverlaufs
//! - `treffpunkt_nachrichten_total` – Counter: Nachrichten (ziel=global|direkt)
//! - `treffpunkt_zustellungen_verworfen_total` – Counter: Verworfene Zustellungen
//! - `treffpunkt_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `treffpunkt_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Label-Wert fuer Nachrichten an den globalen Raum
pub const ZIEL_GLOBAL: &str = "global";
/// Label-Wert fuer Direktnachrichten
pub const ZIEL_DIREKT: &str = "direkt";

/// Alle Treffpunkt-Prometheus-Metriken
///
/// Clone teilt die Registry und alle Metrik-Handles.
#[derive(Clone)]
pub struct RelayMetriken {
    pub registry: Arc<Registry>,

    // Relay-Metriken
    pub verbundene_sessions: IntGauge,
    pub verlauf_eintraege: IntGauge,
    pub nachrichten_total: IntCounterVec,
    pub zustellungen_verworfen_total: IntCounter,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl RelayMetriken {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Relay-Metriken ---
        let verbundene_sessions = IntGauge::with_opts(Opts::new(
            "treffpunkt_verbundene_sessions",
            "Anzahl aktuell verbundener Sessions",
        ))?;
        registry.register(Box::new(verbundene_sessions.clone()))?;

        let verlauf_eintraege = IntGauge::with_opts(Opts::new(
            "treffpunkt_verlauf_eintraege",
            "Anzahl der Eintraege im Nachrichtenverlauf",
        ))?;
        registry.register(Box::new(verlauf_eintraege.clone()))?;

        let nachrichten_total = IntCounterVec::new(
            Opts::new(
                "treffpunkt_nachrichten_total",
                "Gesamtanzahl weitergeleiteter Chat-Nachrichten",
            ),
            &["ziel"],
        )?;
        registry.register(Box::new(nachrichten_total.clone()))?;

        let zustellungen_verworfen_total = IntCounter::with_opts(Opts::new(
            "treffpunkt_zustellungen_verworfen_total",
            "Zustellungen, die wegen voller oder geschlossener Send-Queue verworfen wurden",
        ))?;
        registry.register(Box::new(zustellungen_verworfen_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new(
                "treffpunkt_http_requests_total",
                "Gesamtanzahl HTTP-Anfragen",
            ),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "treffpunkt_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            verbundene_sessions,
            verlauf_eintraege,
            nachrichten_total,
            zustellungen_verworfen_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Zaehlt eine weitergeleitete Nachricht
    pub fn nachricht_zaehlen(&self, global: bool) {
        let ziel = if global { ZIEL_GLOBAL } else { ZIEL_DIREKT };
        self.nachrichten_total.with_label_values(&[ziel]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RelayMetriken) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<RelayMetriken>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
