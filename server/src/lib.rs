//! treffpunkt-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use treffpunkt_observability::{observability_server_starten, HealthState, RelayMetriken};
use treffpunkt_relay::{RelayServer, RelayState};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Metriken und Relay-Zustand anlegen
    /// 2. Observability-Server starten (falls aktiviert)
    /// 3. WebSocket-Relay starten
    /// 4. Auf Ctrl-C warten, dann alle Verbindungen geordnet trennen
    pub async fn starten(self) -> Result<()> {
        let relay_addr: SocketAddr = self
            .config
            .relay_bind_adresse()
            .parse()
            .with_context(|| {
                format!(
                    "Ungueltige Bind-Adresse '{}'",
                    self.config.relay_bind_adresse()
                )
            })?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %relay_addr,
            max_clients = self.config.server.max_clients,
            "Server startet"
        );

        let metriken = RelayMetriken::neu()?;
        let state = RelayState::neu(self.config.relay_config(), metriken.clone());
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let observability = if self.config.observability.aktiviert {
            let obs_addr: SocketAddr = self
                .config
                .observability_bind_adresse()
                .parse()
                .context("Ungueltige Observability-Adresse")?;
            let zaehler_state = Arc::clone(&state);
            let health = HealthState::neu(
                self.config.server.max_clients,
                Arc::new(move || zaehler_state.online_anzahl()),
            );
            let rx = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(obs_addr, metriken, health, rx).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            tracing::info!("Observability-Server deaktiviert");
            None
        };

        let relay = RelayServer::neu(
            Arc::clone(&state),
            relay_addr,
            self.config.netzwerk.cors_origins.clone(),
        );
        let mut relay_task = tokio::spawn(relay.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
            }
            ergebnis = &mut relay_task => {
                // Relay vorzeitig beendet, z.B. Port belegt
                let _ = shutdown_tx.send(true);
                ergebnis.context("Relay-Task abgebrochen")??;
                return Ok(());
            }
        }

        let _ = shutdown_tx.send(true);
        relay_task.await.context("Relay-Task abgebrochen")??;
        if let Some(task) = observability {
            let _ = task.await;
        }

        tracing::info!(
            sessions = state.online_anzahl(),
            verlauf = state.verlauf_laenge(),
            uptime_sek = state.uptime_sek(),
            "Server beendet"
        );
        Ok(())
    }
}
