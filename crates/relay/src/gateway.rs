//! WebSocket-Gateway – HTTP-Listener mit `/ws`-Endpunkt
//!
//! Der `RelayServer` bindet einen TCP-Socket, nimmt WebSocket-Upgrades auf
//! `/ws` an und startet fuer jede Verbindung eine eigene
//! [`ClientConnection`]. Ist das Session-Limit erreicht, wird das Upgrade
//! mit `503 Service Unavailable` abgelehnt.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use treffpunkt_observability::{request_timing_layer, timing_middleware};

use crate::connection::ClientConnection;
use crate::error::RelayResult;
use crate::server_state::RelayState;

/// Pfad des WebSocket-Endpunkts
pub const WS_PFAD: &str = "/ws";

/// Axum-State des Gateways
#[derive(Clone)]
struct GatewayState {
    relay: Arc<RelayState>,
    shutdown_rx: watch::Receiver<bool>,
}

/// WebSocket-Relay-Server
pub struct RelayServer {
    state: Arc<RelayState>,
    bind_addr: SocketAddr,
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt
    cors_origins: Vec<String>,
}

impl RelayServer {
    pub fn neu(state: Arc<RelayState>, bind_addr: SocketAddr, cors_origins: Vec<String>) -> Self {
        Self {
            state,
            bind_addr,
            cors_origins,
        }
    }

    /// Baut den Axum-Router fuer den WebSocket-Endpunkt
    pub fn router(&self, shutdown_rx: watch::Receiver<bool>) -> Router {
        let gateway = GatewayState {
            relay: Arc::clone(&self.state),
            shutdown_rx,
        };

        Router::new()
            .route(WS_PFAD, get(ws_handler))
            .with_state(gateway)
            .layer(axum::middleware::from_fn_with_state(
                self.state.metriken.clone(),
                timing_middleware,
            ))
            .layer(request_timing_layer())
            .layer(self.cors_layer())
    }

    /// Bindet den konfigurierten Socket und startet den Server
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> RelayResult<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.mit_listener_starten(listener, shutdown_rx).await
    }

    /// Startet den Server auf einem bereits gebundenen Listener
    pub async fn mit_listener_starten(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> RelayResult<()> {
        let lokale_addr = listener.local_addr()?;
        let app = self.router(shutdown_rx.clone());

        tracing::info!(adresse = %lokale_addr, pfad = WS_PFAD, "WebSocket-Relay gestartet");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await?;

        tracing::info!("WebSocket-Relay gestoppt");
        Ok(())
    }

    fn cors_layer(&self) -> CorsLayer {
        if self.cors_origins.is_empty() {
            return CorsLayer::permissive();
        }

        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }
}

/// GET /ws – WebSocket-Upgrade
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(gateway): State<GatewayState>,
) -> Response {
    let online = gateway.relay.online_anzahl();
    if online >= gateway.relay.config.max_clients {
        tracing::warn!(
            peer = %peer_addr,
            max = gateway.relay.config.max_clients,
            "Server voll – Upgrade abgelehnt"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Server ist voll").into_response();
    }

    tracing::debug!(peer = %peer_addr, "WebSocket-Upgrade akzeptiert");

    let verbindung = ClientConnection::neu(Arc::clone(&gateway.relay), peer_addr);
    let shutdown_rx = gateway.shutdown_rx.clone();

    ws.on_upgrade(move |socket| verbindung.verarbeiten(socket, shutdown_rx))
}
