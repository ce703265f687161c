//! treffpunkt-relay – Session-Registry und Nachrichten-Router
//!
//! Dieser Crate implementiert den Kern des Treffpunkt-Relays: er verfolgt
//! verbundene Sessions und ihre Anzeigenamen, fuehrt den globalen
//! Nachrichtenverlauf und verteilt Presence-Updates, globale Nachrichten und
//! Direktnachrichten an die richtigen Sessions.
//!
//! ## Architektur
//!
//! ```text
//! WebSocket Listener (RelayServer, GET /ws)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  FrameCodec: JSON-Umschlag {"event", "data"}
//!     v
//! MessageDispatcher
//!     |
//!     v
//! RelayState (ein Lock pro Event)
//!     +-- NachrichtenRouter
//!     |       +-- VerbindungsRegister (Sessions, Namensindex)
//!     |       +-- Verlauf             (append-only Log)
//!     +-- EventBroadcaster (Send-Queues pro Session)
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod router;
pub mod server_state;
pub mod verlauf;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{RelayError, RelayResult};
pub use gateway::RelayServer;
pub use registry::{VerbindungsRegister, UNBEKANNTE_SESSION};
pub use router::{NachrichtenRouter, Ziel, Zustellung};
pub use server_state::{RelayConfig, RelayState};
pub use verlauf::Verlauf;
