//! Recipe details: the optional per-type ingredients of a batch.

use serde::{Deserialize, Serialize};

use super::{KefirKind, ValidationError};

/// Optional ingredient details.
///
/// Milk batches use `milk_type` and `milk_volume_ml`; water batches use the
/// sugar and water fields. Fields of the other type are tolerated on read
/// but never written by normal operations (see [`Details::for_kind`]).
/// Serialized names match the persisted column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milk_type: Option<String>,

    #[serde(
        rename = "milk_volume",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub milk_volume_ml: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar_type: Option<String>,

    #[serde(
        rename = "sugar_amount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sugar_amount_g: Option<f64>,

    #[serde(
        rename = "water_volume",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub water_volume_ml: Option<f64>,
}

impl Details {
    /// True when no detail field is set.
    pub fn is_empty(&self) -> bool {
        self.milk_type.is_none()
            && self.milk_volume_ml.is_none()
            && self.sugar_type.is_none()
            && self.sugar_amount_g.is_none()
            && self.water_volume_ml.is_none()
    }

    /// Keeps only the fields meaningful for `kind`.
    #[must_use]
    pub fn for_kind(self, kind: KefirKind) -> Self {
        match kind {
            KefirKind::Milk => Self {
                milk_type: self.milk_type,
                milk_volume_ml: self.milk_volume_ml,
                ..Self::default()
            },
            KefirKind::Water => Self {
                sugar_type: self.sugar_type,
                sugar_amount_g: self.sugar_amount_g,
                water_volume_ml: self.water_volume_ml,
                ..Self::default()
            },
        }
    }

    /// Fills each absent field from `other`. Present fields win.
    pub fn fill_missing(&mut self, other: Details) {
        self.milk_type = self.milk_type.take().or(other.milk_type);
        self.milk_volume_ml = self.milk_volume_ml.or(other.milk_volume_ml);
        self.sugar_type = self.sugar_type.take().or(other.sugar_type);
        self.sugar_amount_g = self.sugar_amount_g.or(other.sugar_amount_g);
        self.water_volume_ml = self.water_volume_ml.or(other.water_volume_ml);
    }

    /// Every numeric amount that is present must be positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let amounts = [
            ("milk volume", self.milk_volume_ml),
            ("sugar amount", self.sugar_amount_g),
            ("water volume", self.water_volume_ml),
        ];
        for (field, value) in amounts {
            if let Some(value) = value
                && !(value.is_finite() && value > 0.0)
            {
                return Err(ValidationError::NonPositiveAmount { field, value });
            }
        }
        Ok(())
    }
}
