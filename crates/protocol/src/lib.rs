//! treffpunkt-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen, die zwischen Client und
//! Relay ueber die WebSocket-Verbindung ausgetauscht werden, sowie den
//! JSON-Frame-Codec fuer den Umschlag `{"event": ..., "data": ...}`.

pub mod error;
pub mod event;
pub mod nachricht;
pub mod wire;

pub use error::{ProtokollFehler, ProtokollResult};
pub use event::{AusgehendesEvent, EingehendesEvent};
pub use nachricht::{
    AktiverNutzer, EintragTyp, FehlerCode, FehlerPaket, IdentifizierenAnfrage,
    NachrichtSendenAnfrage, VerlaufEintrag, VerlaufPaket,
};
pub use wire::FrameCodec;
