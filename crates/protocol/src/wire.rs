//! Wire-Format fuer WebSocket-Verbindungen
//!
//! Jede WebSocket-Textnachricht traegt genau ein Event im JSON-Umschlag:
//!
//! ```text
//! {"event": "<name>", "data": <nutzlast>}
//! ```
//!
//! Die maximale Frame-Groesse ist konfigurierbar (Standard: 64 KiB).

use serde::Serialize;

use crate::error::{ProtokollFehler, ProtokollResult};
use crate::event::{AusgehendesEvent, EingehendesEvent};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (64 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// JSON-Codec fuer WebSocket-Textframes
///
/// Dekodiert eingehende Frames zu validierten [`EingehendesEvent`]s und
/// kodiert [`AusgehendesEvent`]s in den Umschlag.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

/// Ausgehender Umschlag
#[derive(Serialize)]
struct Umschlag<'a> {
    event: &'a str,
    data: serde_json::Value,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Dekodiert und validiert einen eingehenden Textframe
    pub fn dekodieren(&self, text: &str) -> ProtokollResult<EingehendesEvent> {
        if text.len() > self.max_frame_size {
            return Err(ProtokollFehler::FrameZuGross {
                groesse: text.len(),
                maximum: self.max_frame_size,
            });
        }

        let event: EingehendesEvent = serde_json::from_str(text)?;
        match &event {
            EingehendesEvent::Identifizieren(anfrage) => anfrage.validieren()?,
            EingehendesEvent::NachrichtSenden(anfrage) => anfrage.validieren()?,
        }
        Ok(event)
    }

    /// Kodiert ein ausgehendes Event als Textframe
    ///
    /// Das Groessenlimit gilt nur eingehend; Verlaufs-Pushes wachsen mit dem
    /// Verlauf.
    pub fn kodieren(&self, event: &AusgehendesEvent) -> ProtokollResult<String> {
        let umschlag = Umschlag {
            event: event.name(),
            data: event.daten()?,
        };
        Ok(serde_json::to_string(&umschlag)?)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
