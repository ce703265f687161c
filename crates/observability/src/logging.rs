//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable, die Werte aus der Konfigurationsdatei
//! werden dabei ueberschrieben:
//! - `TP_LOG_LEVEL`: EnvFilter-Direktive (z.B. `debug` oder
//!   `info,treffpunkt_relay=trace`)
//! - `TP_LOG_FORMAT`: `text` oder `json`

use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const ENV_LOG_LEVEL: &str = "TP_LOG_LEVEL";
/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "TP_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anderes => Err(format!("Unbekanntes Log-Format '{anderes}' (erlaubt: text, json)")),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// Ein ungueltiges Format faellt auf `text` zurueck, ein ungueltiger Filter
/// auf `info`. Ein zweiter Aufruf im selben Prozess ist wirkungslos.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(ENV_LOG_FORMAT)
        .ok()
        .and_then(|f| f.parse().ok())
        .or_else(|| format.parse().ok())
        .unwrap_or(LogFormat::Text);

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    if let Err(e) = ergebnis {
        tracing::debug!(fehler = %e, "Logging war bereits initialisiert");
    }
}
