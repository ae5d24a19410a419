//! # Lifecycle
//!
//! The cleanup finalizer and the deletion flag together describe where a record
//! is in its life:
//!
//! | finalizer | deletion requested | state                          |
//! |-----------|--------------------|--------------------------------|
//! | absent    | no                 | `Absent` (never reconciled)    |
//! | present   | no                 | `Reconciling` / `Failing`      |
//! | present   | yes                | `Deleting`                     |
//! | absent    | yes                | nothing to clean up            |
//!
//! [`Lifecycle::on_outcome`] maps a cycle outcome to the next state, the status
//! phase to write and the finalizer change to apply.

use crate::crd::{ResourceStatus, StatusPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Absent,
    Reconciling,
    Failing,
    Deleting,
}

/// Change to the record's finalizer list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardChange {
    Add,
    Keep,
    /// Remote side effects are gone; the record may be finalized
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Lifecycle,
    pub phase: StatusPhase,
    pub guard: GuardChange,
}

impl Lifecycle {
    /// Current state of a record, `None` when a deletion needs no cleanup
    pub fn observe(
        guarded: bool,
        deletion_requested: bool,
        status: Option<&ResourceStatus>,
    ) -> Option<Self> {
        match (guarded, deletion_requested) {
            (false, true) => None,
            (false, false) => Some(Self::Absent),
            (true, true) => Some(Self::Deleting),
            (true, false) => match status.and_then(|s| s.phase) {
                Some(StatusPhase::Failing) => Some(Self::Failing),
                _ => Some(Self::Reconciling),
            },
        }
    }

    /// Transition taken after a cycle that succeeded on every target or failed on one
    ///
    /// A first cycle that fails does not add the finalizer.
    pub fn on_outcome(self, success: bool) -> Transition {
        use GuardChange::{Add, Keep, Remove};
        use Lifecycle::{Absent, Deleting, Failing, Reconciling};

        let (next, guard) = match (self, success) {
            (Absent, true) => (Reconciling, Add),
            (Absent, false) => (Failing, Keep),
            (Reconciling | Failing, true) => (Reconciling, Keep),
            (Reconciling | Failing, false) => (Failing, Keep),
            (Deleting, true) => (Deleting, Remove),
            (Deleting, false) => (Deleting, Keep),
        };
        Transition {
            next,
            phase: if success {
                StatusPhase::Reconciling
            } else {
                StatusPhase::Failing
            },
            guard,
        }
    }
}

/// Finalizer list after applying `change`, `None` when it is unchanged
pub fn apply_guard(finalizers: &[String], finalizer: &str, change: GuardChange) -> Option<Vec<String>> {
    let present = finalizers.iter().any(|f| f == finalizer);
    match change {
        GuardChange::Add if !present => {
            let mut next = finalizers.to_vec();
            next.push(finalizer.to_string());
            Some(next)
        }
        GuardChange::Remove if present => Some(
            finalizers
                .iter()
                .filter(|f| *f != finalizer)
                .cloned()
                .collect(),
        ),
        _ => None,
    }
}
