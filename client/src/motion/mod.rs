mod extrapolator;

pub use extrapolator::MotionExtrapolator;
pub(crate) use extrapolator::mark_authoritative;
