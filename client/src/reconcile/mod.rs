mod orphan_waitlist;
mod reconciler;

pub use orphan_waitlist::{OrphanKey, OrphanWaitlist};
pub use reconciler::{ParentCycle, ParentReconciler, ReconcileOutcome};
