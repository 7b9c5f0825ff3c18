//! Fallback envelope: carries recipe details through `notes` when the
//! relational table has no detail columns.
//!
//! Wire format: [`PREFIX`] followed by a JSON object
//! `{"originalNotes": string | null, "details": {...}}`.
//! Notes without the prefix are plain user text and pass through untouched.

use serde::{Deserialize, Serialize};

use crate::model::{Details, Ferment};

/// Reserved marker at the start of an encoded `notes` value.
pub const PREFIX: &str = "__kefir_meta__:";

/// Decoded view of a `notes` value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// True when `notes` carried a well-formed fallback payload.
    pub has_fallback_payload: bool,

    /// The user's own notes.
    pub original_notes: Option<String>,

    /// Details recovered from the payload. Empty without one.
    pub details: Details,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    original_notes: Option<String>,
    #[serde(default)]
    details: Details,
}

/// Packs user notes and details into a single `notes` string.
pub fn encode(notes: Option<&str>, details: &Details) -> serde_json::Result<String> {
    let payload = Payload {
        original_notes: notes.map(str::to_owned),
        details: details.clone(),
    };
    Ok(format!("{PREFIX}{}", serde_json::to_string(&payload)?))
}

/// Unpacks a `notes` value.
///
/// Never fails: a malformed payload is logged and returned as plain notes
/// with empty details.
pub fn decode(notes: Option<&str>) -> Envelope {
    let plain = || Envelope {
        has_fallback_payload: false,
        original_notes: notes.map(str::to_owned),
        details: Details::default(),
    };

    let Some(body) = notes.and_then(|n| n.strip_prefix(PREFIX)) else {
        return plain();
    };

    match serde_json::from_str::<Payload>(body) {
        Ok(payload) => Envelope {
            has_fallback_payload: true,
            original_notes: payload.original_notes,
            details: payload.details,
        },
        Err(e) => {
            tracing::warn!(error = %e, "malformed fallback payload in notes; leaving as-is");
            plain()
        }
    }
}

/// Restores a record read from the relational store: user notes go back in
/// `notes` and recovered details fill only the fields the columns left empty.
pub fn restore(mut ferment: Ferment) -> Ferment {
    let envelope = decode(ferment.notes.as_deref());
    if envelope.has_fallback_payload {
        ferment.notes = envelope.original_notes;
        ferment.details.fill_missing(envelope.details);
    }
    ferment
}
