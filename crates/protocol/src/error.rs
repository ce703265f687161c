//! Fehlertypen fuer das Protokoll

use thiserror::Error;

/// Fehler beim Kodieren oder Dekodieren eines Frames
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    /// Ungueltiges JSON oder unbekanntes Event
    #[error("JSON-Verarbeitung fehlgeschlagen: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame ueberschreitet die konfigurierte Maximalgroesse
    #[error("Frame zu gross: {groesse} Bytes (Maximum: {maximum} Bytes)")]
    FrameZuGross { groesse: usize, maximum: usize },

    /// Syntaktisch korrektes Event mit unzulaessigem Feldinhalt
    #[error("Ungueltiges Feld '{feld}': {grund}")]
    UngueltigesFeld { feld: &'static str, grund: String },
}

/// Result-Typ fuer Protokolloperationen
pub type ProtokollResult<T> = Result<T, ProtokollFehler>;
