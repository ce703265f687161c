//! Nachrichtenverlauf – append-only Log aller globalen Ereignisse
//!
//! Einzige erlaubte Mutation eines bestehenden Eintrags ist das Nachtragen
//! des Anzeigenamens in den Verbindungs-Eintraegen einer Session.

use treffpunkt_core::SessionId;
use treffpunkt_protocol::{EintragTyp, VerlaufEintrag};

/// Geordneter Verlauf in Ankunftsreihenfolge
#[derive(Debug, Default)]
pub struct Verlauf {
    eintraege: Vec<VerlaufEintrag>,
}

impl Verlauf {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Haengt einen Eintrag an
    pub fn anhaengen(&mut self, eintrag: VerlaufEintrag) {
        self.eintraege.push(eintrag);
    }

    /// Traegt `name` in alle Verbindungs-Eintraege von `session_id` ein
    ///
    /// Gibt die Anzahl der aktualisierten Eintraege zurueck.
    pub fn verbindung_benennen(&mut self, session_id: &SessionId, name: &str) -> usize {
        let mut aktualisiert = 0;
        for eintrag in self
            .eintraege
            .iter_mut()
            .filter(|e| e.typ == EintragTyp::Verbindung && e.from_id == *session_id)
        {
            eintrag.from = name.to_string();
            aktualisiert += 1;
        }
        aktualisiert
    }

    /// Gesamter Verlauf ohne den letzten Eintrag
    pub fn ohne_letzten(&self) -> Vec<VerlaufEintrag> {
        let ende = self.eintraege.len().saturating_sub(1);
        self.eintraege[..ende].to_vec()
    }

    pub fn letzter(&self) -> Option<&VerlaufEintrag> {
        self.eintraege.last()
    }

    pub fn eintraege(&self) -> &[VerlaufEintrag] {
        &self.eintraege
    }

    pub fn laenge(&self) -> usize {
        self.eintraege.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.eintraege.is_empty()
    }
}
