//! Ferment types: one tracked batch and its lifecycle states.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Details, ValidationError};

/// Opaque batch identifier.
///
/// Generated by the store: a random UUID in the mock store, a
/// server-side default in the relational store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FermentId(String);

impl FermentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first eight characters, for listings.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for FermentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which culture is fermenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KefirKind {
    #[serde(rename = "milk_kefir")]
    Milk,

    #[serde(rename = "water_kefir")]
    Water,
}

impl KefirKind {
    /// Persisted name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Milk => "milk_kefir",
            Self::Water => "water_kefir",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Milk => "Milk Kefir",
            Self::Water => "Water Kefir",
        }
    }

    /// Target duration used when none is given.
    pub fn default_hours(self) -> f64 {
        match self {
            Self::Milk => 24.0,
            Self::Water => 96.0,
        }
    }

    /// Usual fermentation window in hours, inclusive.
    /// Advisory only: any positive target is accepted.
    pub fn suggested_range(self) -> (f64, f64) {
        match self {
            Self::Milk => (12.0, 24.0),
            Self::Water => (24.0, 120.0),
        }
    }
}

impl FromStr for KefirKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "milk_kefir" => Ok(Self::Milk),
            "water_kefir" => Ok(Self::Water),
            other => Err(format!("unknown kefir type: {other}")),
        }
    }
}

/// Where a batch stands in its lifecycle.
///
/// `Fermenting` is the only non-terminal state. A batch leaves it exactly
/// once, to `Finished` (harvested) or `Archived` (stopped early).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FermentStatus {
    Fermenting,
    Finished,
    Archived,
}

impl FermentStatus {
    /// Persisted name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fermenting => "fermenting",
            Self::Finished => "finished",
            Self::Archived => "archived",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Fermenting)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: FermentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Fermenting, Self::Finished | Self::Archived)
        )
    }
}

impl FromStr for FermentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fermenting" => Ok(Self::Fermenting),
            "finished" => Ok(Self::Finished),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown ferment status: {other}")),
        }
    }
}

/// One fermentation batch as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ferment {
    pub id: FermentId,

    #[serde(rename = "user_id")]
    pub owner: String,

    #[serde(rename = "type")]
    pub kind: KefirKind,

    pub start_time: Timestamp,
    pub target_hours: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,

    pub status: FermentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created_at: Timestamp,

    #[serde(flatten)]
    pub details: Details,
}

impl Ferment {
    /// Checks the record invariants: positive target, end time present
    /// exactly for terminal states, positive detail amounts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        super::validate_target_hours(self.target_hours)?;
        if self.end_time.is_some() != self.status.is_terminal() {
            return Err(ValidationError::EndTimeMismatch);
        }
        self.details.validate()
    }

    pub fn is_fermenting(&self) -> bool {
        self.status == FermentStatus::Fermenting
    }
}

/// A batch about to be inserted. The store assigns `id` and `created_at`;
/// status is always `Fermenting` with no end time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFerment {
    pub owner: String,
    pub kind: KefirKind,
    pub start_time: Timestamp,
    pub target_hours: f64,
    pub notes: Option<String>,
    pub details: Details,
}

impl NewFerment {
    /// Materializes the full record once the store has picked the id and
    /// creation time.
    pub fn into_ferment(self, id: FermentId, created_at: Timestamp) -> Ferment {
        Ferment {
            id,
            owner: self.owner,
            kind: self.kind,
            start_time: self.start_time,
            target_hours: self.target_hours,
            end_time: None,
            status: FermentStatus::Fermenting,
            notes: self.notes,
            created_at,
            details: self.details,
        }
    }
}

/// A partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FermentPatch {
    pub status: Option<FermentStatus>,
    pub end_time: Option<Timestamp>,
    pub target_hours: Option<f64>,
}

impl FermentPatch {
    /// Ends a batch: sets the terminal status and its end time together.
    pub fn end(status: FermentStatus, at: Timestamp) -> Self {
        Self {
            status: Some(status),
            end_time: Some(at),
            target_hours: None,
        }
    }

    pub fn target_hours(hours: f64) -> Self {
        Self {
            target_hours: Some(hours),
            ..Self::default()
        }
    }

    pub fn apply(&self, ferment: &mut Ferment) {
        if let Some(status) = self.status {
            ferment.status = status;
        }
        if let Some(end_time) = self.end_time {
            ferment.end_time = Some(end_time);
        }
        if let Some(hours) = self.target_hours {
            ferment.target_hours = hours;
        }
    }
}
