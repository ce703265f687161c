//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use treffpunkt_core::TreffpunktError;
use treffpunkt_observability::logging::LogFormat;
use treffpunkt_relay::RelayConfig;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Relay-Einstellungen (Queues, Keepalive, Frames)
    pub relay: RelayEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Sessions
    pub max_clients: usize,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Treffpunkt".into(),
            max_clients: 512,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer WebSocket- und Observability-Server
    pub bind_adresse: String,
    /// Port des WebSocket-Endpunkts
    pub port: u16,
    /// Erlaubte CORS-Origins (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec![],
        }
    }
}

/// Relay-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Groesse der Send-Queue pro Session
    pub send_queue_groesse: usize,
    /// Intervall fuer WebSocket-Pings in Sekunden
    pub keepalive_sek: u64,
    /// Inaktive Verbindungen werden nach dieser Zeit getrennt
    pub verbindungs_timeout_sek: u64,
    /// Maximale Groesse eingehender Frames in Bytes
    pub max_frame_groesse: usize,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        let relay = RelayConfig::default();
        Self {
            send_queue_groesse: relay.send_queue_groesse,
            keepalive_sek: relay.keepalive_sek,
            verbindungs_timeout_sek: relay.verbindungs_timeout_sek,
            max_frame_groesse: relay.max_frame_groesse,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level oder EnvFilter-Direktive
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.validieren()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft die Werte auf Konsistenz
    pub fn validieren(&self) -> treffpunkt_core::Result<()> {
        if self.server.max_clients == 0 {
            return Err(TreffpunktError::Konfiguration(
                "server.max_clients muss groesser als 0 sein".into(),
            ));
        }
        if self.relay.send_queue_groesse == 0 {
            return Err(TreffpunktError::Konfiguration(
                "relay.send_queue_groesse muss groesser als 0 sein".into(),
            ));
        }
        if self.relay.max_frame_groesse == 0 {
            return Err(TreffpunktError::Konfiguration(
                "relay.max_frame_groesse muss groesser als 0 sein".into(),
            ));
        }
        if self.relay.keepalive_sek == 0
            || self.relay.verbindungs_timeout_sek <= self.relay.keepalive_sek
        {
            return Err(TreffpunktError::Konfiguration(format!(
                "relay.verbindungs_timeout_sek ({}) muss groesser als relay.keepalive_sek ({}) sein",
                self.relay.verbindungs_timeout_sek, self.relay.keepalive_sek
            )));
        }
        if let Err(e) = self.logging.format.parse::<LogFormat>() {
            return Err(TreffpunktError::Konfiguration(e));
        }
        Ok(())
    }

    /// Laufzeit-Konfiguration fuer das Relay
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_clients: self.server.max_clients,
            send_queue_groesse: self.relay.send_queue_groesse,
            keepalive_sek: self.relay.keepalive_sek,
            verbindungs_timeout_sek: self.relay.verbindungs_timeout_sek,
            max_frame_groesse: self.relay.max_frame_groesse,
        }
    }

    /// Gibt die Bind-Adresse fuer den WebSocket-Server zurueck
    pub fn relay_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }
}
