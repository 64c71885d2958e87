//! Trigger side resources and their convergence.
//!
//! [`plan`] is the pure diff between the resource a Task's trigger calls for
//! and the one currently stored; [`TriggerReconciler`] applies it against
//! the object store for all three kinds at once.

pub mod reconcile;

use tasklane_types::resource::{Resource, TaskOwned};
use tasklane_types::trigger::{CronJob, EmailReceiver, Webhook};

pub use reconcile::TriggerReconciler;

/// A resource derived from a Task's trigger.
pub trait TriggerResource: Resource + TaskOwned {
    /// Whether `self` differs from `desired` in a field that may be changed
    /// in place.
    fn drifted(&self, _desired: &Self) -> bool {
        false
    }

    /// Copy the in-place mutable fields of `desired` into `self`.
    fn adopt(&mut self, _desired: &Self) {}
}

impl TriggerResource for CronJob {
    fn drifted(&self, desired: &Self) -> bool {
        self.spec.schedule != desired.spec.schedule
    }

    fn adopt(&mut self, desired: &Self) {
        self.spec.schedule = desired.spec.schedule.clone();
    }
}

// Webhooks and email receivers are immutable once created.
impl TriggerResource for Webhook {}

impl TriggerResource for EmailReceiver {}

/// What to do to move the stored resource to the desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<R> {
    /// Not declared and not stored.
    Nothing,
    Create(R),
    /// Stored and already as declared.
    Keep(R),
    /// Stored with drift; carries the observed resource with desired fields
    /// adopted, so its resource version guards the write.
    Update(R),
    /// Stored but no longer declared.
    Delete(R),
}

pub fn plan<R: TriggerResource>(desired: Option<&R>, observed: Option<R>) -> Action<R> {
    match (desired, observed) {
        (None, None) => Action::Nothing,
        (None, Some(observed)) => Action::Delete(observed),
        (Some(desired), None) => Action::Create(desired.clone()),
        (Some(desired), Some(mut observed)) => {
            if observed.drifted(desired) {
                observed.adopt(desired);
                Action::Update(observed)
            } else {
                Action::Keep(observed)
            }
        }
    }
}
