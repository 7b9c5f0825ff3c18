//! Batch lifecycle: create, harvest, stop, extend.
//!
//! ```text
//! create ──▶ Fermenting ──harvest──▶ Finished
//!              │   ▲
//!              │   └── extend (target only)
//!              └──────stop─────▶ Archived
//! ```
//!
//! `Finished` and `Archived` are terminal. Ending a batch twice is a no-op
//! that reports [`Outcome::AlreadyEnded`]; the first end time stands.
//!
//! Store failures never reach the caller as errors. They are logged and
//! degrade to "nothing to show" (`list`, `get`, `create`) or
//! [`Outcome::Failed`] with the record unchanged.

use jiff::Timestamp;

use crate::model::{
    self, Details, Ferment, FermentId, FermentPatch, FermentStatus, KefirKind, NewFerment,
    ValidationError,
};
use crate::storage::FermentStore;

/// Result of a state-changing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The change was written. Carries the record as it now stands.
    Applied(Ferment),

    /// No batch has this id.
    NotFound,

    /// The batch already left `Fermenting`; nothing was written.
    AlreadyEnded(FermentStatus),

    /// The store could not be read or written; the record is unchanged.
    Failed,
}

/// Lifecycle operations over whichever store was selected at startup.
pub struct Tracker {
    store: Box<dyn FermentStore>,
}

impl Tracker {
    pub fn new(store: Box<dyn FermentStore>) -> Self {
        Self { store }
    }

    /// The owner's batches, newest first. Empty if the store fails.
    pub fn list(&self, owner: &str) -> Vec<Ferment> {
        self.store.list(owner).unwrap_or_else(|e| {
            tracing::warn!(owner, error = %e, "failed to list ferments");
            Vec::new()
        })
    }

    /// A single batch. `None` if missing or if the store fails.
    pub fn get(&self, id: &FermentId) -> Option<Ferment> {
        self.store.get(id).unwrap_or_else(|e| {
            tracing::warn!(%id, error = %e, "failed to load ferment");
            None
        })
    }

    /// Starts a new batch at `now`.
    ///
    /// Details of the other kefir type are dropped and blank notes are
    /// stored as absent. Returns `Ok(None)` when the store rejects the
    /// insert, fallback included.
    pub fn create(
        &self,
        owner: &str,
        kind: KefirKind,
        target_hours: f64,
        notes: Option<&str>,
        details: Details,
        now: Timestamp,
    ) -> Result<Option<Ferment>, ValidationError> {
        let target_hours = model::validate_target_hours(target_hours)?;
        let details = details.for_kind(kind);
        details.validate()?;

        let record = NewFerment {
            owner: owner.to_string(),
            kind,
            start_time: now,
            target_hours,
            notes: notes.filter(|n| !n.trim().is_empty()).map(str::to_owned),
            details,
        };

        match self.store.insert(&record) {
            Ok(ferment) => {
                tracing::debug!(
                    id = %ferment.id,
                    kind = kind.as_str(),
                    has_details = !ferment.details.is_empty(),
                    "ferment created"
                );
                Ok(Some(ferment))
            }
            Err(e) => {
                tracing::warn!(owner, error = %e, "failed to create ferment");
                Ok(None)
            }
        }
    }

    /// Fermenting → Finished, ending at `now`.
    pub fn harvest(&self, id: &FermentId, now: Timestamp) -> Outcome {
        self.end(id, FermentStatus::Finished, now)
    }

    /// Fermenting → Archived, ending at `now`.
    pub fn stop(&self, id: &FermentId, now: Timestamp) -> Outcome {
        self.end(id, FermentStatus::Archived, now)
    }

    /// Adds `added_hours` to the target of a fermenting batch.
    ///
    /// `added_hours` must be finite and the new target must stay positive.
    /// Status and every other field are left alone.
    pub fn extend(&self, id: &FermentId, added_hours: f64) -> Result<Outcome, ValidationError> {
        if !added_hours.is_finite() {
            return Err(ValidationError::NonFiniteHours(added_hours));
        }
        let ferment = match self.fetch(id) {
            Ok(ferment) => ferment,
            Err(outcome) => return Ok(outcome),
        };
        if !ferment.is_fermenting() {
            return Ok(Outcome::AlreadyEnded(ferment.status));
        }
        let target = model::validate_target_hours(ferment.target_hours + added_hours)?;

        tracing::debug!(%id, from = ferment.target_hours, to = target, "extending ferment");
        Ok(self.apply(ferment, &FermentPatch::target_hours(target)))
    }

    fn end(&self, id: &FermentId, status: FermentStatus, now: Timestamp) -> Outcome {
        let ferment = match self.fetch(id) {
            Ok(ferment) => ferment,
            Err(outcome) => return outcome,
        };
        if !ferment.status.can_transition_to(status) {
            tracing::debug!(%id, status = ferment.status.as_str(), "ferment already ended");
            return Outcome::AlreadyEnded(ferment.status);
        }

        tracing::debug!(%id, to = status.as_str(), "ending ferment");
        self.apply(ferment, &FermentPatch::end(status, now))
    }

    /// Loads a batch, mapping absence and failure to the matching outcome.
    fn fetch(&self, id: &FermentId) -> Result<Ferment, Outcome> {
        match self.store.get(id) {
            Ok(Some(ferment)) => Ok(ferment),
            Ok(None) => Err(Outcome::NotFound),
            Err(e) => {
                tracing::warn!(%id, error = %e, "failed to load ferment");
                Err(Outcome::Failed)
            }
        }
    }

    fn apply(&self, mut ferment: Ferment, patch: &FermentPatch) -> Outcome {
        match self.store.update(&ferment.id, patch) {
            Ok(()) => {
                patch.apply(&mut ferment);
                Outcome::Applied(ferment)
            }
            Err(e) => {
                tracing::warn!(id = %ferment.id, error = %e, "failed to update ferment");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;

    use tempfile::TempDir;

    use crate::projection;
    use crate::storage::{self, MockStore, StorageError};

    const T0: i64 = 1_700_000_000;

    fn at_hours(hours: i64) -> Timestamp {
        Timestamp::new(T0 + hours * 3600, 0).unwrap()
    }

    fn test_tracker() -> (TempDir, Tracker) {
        let dir = TempDir::new().unwrap();
        let store = MockStore::new(dir.path()).unwrap();
        (dir, Tracker::new(Box::new(store)))
    }

    fn start_milk(tracker: &Tracker) -> Ferment {
        tracker
            .create(
                "u",
                KefirKind::Milk,
                24.0,
                Some("on the shelf"),
                Details {
                    milk_type: Some("whole".into()),
                    milk_volume_ml: Some(500.0),
                    sugar_type: Some("should be dropped".into()),
                    ..Details::default()
                },
                at_hours(0),
            )
            .unwrap()
            .unwrap()
    }

    /// A store whose every call fails.
    struct BrokenStore;

    fn broken() -> StorageError {
        StorageError::Io(io::Error::other("disk on fire"))
    }

    impl FermentStore for BrokenStore {
        fn list(&self, _owner: &str) -> storage::Result<Vec<Ferment>> {
            Err(broken())
        }
        fn get(&self, _id: &FermentId) -> storage::Result<Option<Ferment>> {
            Err(broken())
        }
        fn insert(&self, _record: &NewFerment) -> storage::Result<Ferment> {
            Err(broken())
        }
        fn update(&self, _id: &FermentId, _patch: &FermentPatch) -> storage::Result<()> {
            Err(broken())
        }
    }

    /// Reads succeed from a fixed record; writes fail.
    struct ReadOnlyStore {
        ferment: Ferment,
    }

    impl FermentStore for ReadOnlyStore {
        fn list(&self, _owner: &str) -> storage::Result<Vec<Ferment>> {
            Ok(vec![self.ferment.clone()])
        }
        fn get(&self, _id: &FermentId) -> storage::Result<Option<Ferment>> {
            Ok(Some(self.ferment.clone()))
        }
        fn insert(&self, _record: &NewFerment) -> storage::Result<Ferment> {
            Err(broken())
        }
        fn update(&self, _id: &FermentId, _patch: &FermentPatch) -> storage::Result<()> {
            Err(broken())
        }
    }

    #[test]
    fn create_starts_fermenting_now() {
        let (_dir, tracker) = test_tracker();
        let ferment = start_milk(&tracker);

        assert_eq!(ferment.status, FermentStatus::Fermenting);
        assert!(ferment.end_time.is_none());
        assert_eq!(ferment.start_time, at_hours(0));
        assert_eq!(ferment.target_hours, 24.0);
        assert_eq!(ferment.notes.as_deref(), Some("on the shelf"));
        assert_eq!(ferment.details.milk_type.as_deref(), Some("whole"));
        assert!(ferment.details.sugar_type.is_none());
        assert!(ferment.validate().is_ok());
    }

    #[test]
    fn create_stores_blank_notes_as_absent() {
        let (_dir, tracker) = test_tracker();
        let ferment = tracker
            .create(
                "u",
                KefirKind::Water,
                96.0,
                Some("   "),
                Details::default(),
                at_hours(0),
            )
            .unwrap()
            .unwrap();
        assert!(ferment.notes.is_none());
    }

    #[test]
    fn create_rejects_invalid_target() {
        let (_dir, tracker) = test_tracker();
        for hours in [0.0, -1.0, f64::NAN] {
            assert!(
                tracker
                    .create("u", KefirKind::Milk, hours, None, Details::default(), at_hours(0))
                    .is_err()
            );
        }
        assert!(tracker.list("u").is_empty());
    }

    #[test]
    fn create_rejects_non_positive_amounts() {
        let (_dir, tracker) = test_tracker();
        let details = Details {
            milk_volume_ml: Some(-5.0),
            ..Details::default()
        };
        let err = tracker
            .create("u", KefirKind::Milk, 24.0, None, details, at_hours(0))
            .unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveAmount { .. }));
    }

    #[test]
    fn harvest_finishes_and_records_end() {
        let (_dir, tracker) = test_tracker();
        let ferment = start_milk(&tracker);

        let Outcome::Applied(harvested) = tracker.harvest(&ferment.id, at_hours(22)) else {
            panic!("expected harvest to apply");
        };
        assert_eq!(harvested.status, FermentStatus::Finished);
        assert_eq!(harvested.end_time, Some(at_hours(22)));
        assert_eq!(projection::elapsed_hours(&harvested, at_hours(100)), 22.0);
        assert_eq!(tracker.get(&ferment.id), Some(harvested));
    }

    #[test]
    fn stop_archives_and_records_end() {
        let (_dir, tracker) = test_tracker();
        let ferment = start_milk(&tracker);

        let Outcome::Applied(stopped) = tracker.stop(&ferment.id, at_hours(3)) else {
            panic!("expected stop to apply");
        };
        assert_eq!(stopped.status, FermentStatus::Archived);
        assert_eq!(stopped.end_time, Some(at_hours(3)));
        assert!(stopped.validate().is_ok());
    }

    #[test]
    fn ending_twice_keeps_first_end() {
        let (_dir, tracker) = test_tracker();
        let ferment = start_milk(&tracker);

        tracker.harvest(&ferment.id, at_hours(24));
        assert_eq!(
            tracker.harvest(&ferment.id, at_hours(30)),
            Outcome::AlreadyEnded(FermentStatus::Finished)
        );
        assert_eq!(
            tracker.stop(&ferment.id, at_hours(31)),
            Outcome::AlreadyEnded(FermentStatus::Finished)
        );

        let loaded = tracker.get(&ferment.id).unwrap();
        assert_eq!(loaded.status, FermentStatus::Finished);
        assert_eq!(loaded.end_time, Some(at_hours(24)));
    }

    #[test]
    fn extend_adds_exactly_and_nothing_else() {
        let (_dir, tracker) = test_tracker();
        let ferment = start_milk(&tracker);

        let Outcome::Applied(extended) = tracker.extend(&ferment.id, 4.5).unwrap() else {
            panic!("expected extend to apply");
        };
        assert_eq!(extended.target_hours, 28.5);

        let mut expected = ferment.clone();
        expected.target_hours = 28.5;
        assert_eq!(tracker.get(&ferment.id), Some(expected));
    }

    #[test]
    fn extend_rejects_non_finite_hours() {
        let (_dir, tracker) = test_tracker();
        let ferment = start_milk(&tracker);

        let err = tracker.extend(&ferment.id, f64::NAN).unwrap_err();
        assert!(matches!(err, ValidationError::NonFiniteHours(_)));
        assert_eq!(tracker.get(&ferment.id).unwrap().target_hours, 24.0);
    }

    #[test]
    fn extend_cannot_drop_target_to_zero() {
        let (_dir, tracker) = test_tracker();
        let ferment = start_milk(&tracker);

        let err = tracker.extend(&ferment.id, -24.0).unwrap_err();
        assert!(matches!(err, ValidationError::NonPositiveHours(_)));
        assert_eq!(tracker.get(&ferment.id).unwrap().target_hours, 24.0);

        // Shortening that stays positive is allowed.
        assert!(matches!(
            tracker.extend(&ferment.id, -4.0).unwrap(),
            Outcome::Applied(_)
        ));
    }

    #[test]
    fn extend_ended_batch_is_refused() {
        let (_dir, tracker) = test_tracker();
        let ferment = start_milk(&tracker);
        tracker.stop(&ferment.id, at_hours(2));

        assert_eq!(
            tracker.extend(&ferment.id, 4.0).unwrap(),
            Outcome::AlreadyEnded(FermentStatus::Archived)
        );
        assert_eq!(tracker.get(&ferment.id).unwrap().target_hours, 24.0);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (_dir, tracker) = test_tracker();
        let id = FermentId::new("missing");

        assert_eq!(tracker.harvest(&id, at_hours(1)), Outcome::NotFound);
        assert_eq!(tracker.stop(&id, at_hours(1)), Outcome::NotFound);
        assert_eq!(tracker.extend(&id, 1.0).unwrap(), Outcome::NotFound);
        assert!(tracker.get(&id).is_none());
    }

    #[test]
    fn store_failures_degrade_to_absence() {
        let tracker = Tracker::new(Box::new(BrokenStore));
        let id = FermentId::new("any");

        assert!(tracker.list("u").is_empty());
        assert!(tracker.get(&id).is_none());
        assert_eq!(
            tracker
                .create("u", KefirKind::Milk, 24.0, None, Details::default(), at_hours(0))
                .unwrap(),
            None
        );
        assert_eq!(tracker.harvest(&id, at_hours(1)), Outcome::Failed);
        assert_eq!(tracker.extend(&id, 1.0).unwrap(), Outcome::Failed);
    }

    #[test]
    fn failed_update_reports_failed() {
        let (_dir, tracker) = test_tracker();
        let ferment = start_milk(&tracker);
        let id = ferment.id.clone();
        let tracker = Tracker::new(Box::new(ReadOnlyStore { ferment }));

        assert_eq!(tracker.harvest(&id, at_hours(24)), Outcome::Failed);
        assert_eq!(tracker.extend(&id, 2.0).unwrap(), Outcome::Failed);
        assert_eq!(tracker.list("u").len(), 1);
    }
}
