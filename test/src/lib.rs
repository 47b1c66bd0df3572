//! Harness shared by the objsync integration tests: a manually clocked
//! client, a scriptable circuit and builders for wire-format update blocks.

pub mod helpers;

pub use helpers::*;

#[doc(hidden)]
pub use objsync_shared as shared;
