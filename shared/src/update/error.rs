use objsync_serde::SerdeErr;
use thiserror::Error;

use crate::{update::UpdateKind, LocalId};

/// Field group a decode error was confined to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    Header,
    Positional,
    Topology,
    ScratchPad,
    Text,
    MediaUrl,
    Particles,
    ExtraParams,
    Sound,
    NameValue,
}

/// Errors produced while translating a wire block into an `UpdateDelta`.
/// Only `Header` errors abort the block; every other group is skipped alone.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The positional blob length does not match any layout for this update kind
    #[error("Unexpected object data length {length} for {kind:?} update of local id {local_id}")]
    UnexpectedObjectDataLength {
        kind: UpdateKind,
        local_id: LocalId,
        length: usize,
    },

    /// A field group ran past the end of its buffer
    #[error("Truncated {group:?} group: {source}")]
    Truncated {
        group: FieldGroup,
        #[source]
        source: SerdeErr,
    },

    /// A string field was terminated but did not hold valid UTF-8
    #[error("Unreadable string in {group:?} group: {source}")]
    InvalidText {
        group: FieldGroup,
        #[source]
        source: SerdeErr,
    },

    /// The update kind cannot be carried by this block shape
    #[error("{kind:?} updates cannot be decoded from a {shape} block")]
    UnsupportedSource {
        kind: UpdateKind,
        shape: &'static str,
    },

    /// An extra parameter block of a known type could not be read
    #[error("Malformed extra parameter 0x{param_type:02x} ({size} bytes): {reason}")]
    ExtraParam {
        param_type: u16,
        size: usize,
        reason: &'static str,
    },
}

impl DecodeError {
    pub fn truncated(group: FieldGroup) -> impl FnOnce(SerdeErr) -> DecodeError {
        move |source| DecodeError::Truncated { group, source }
    }

    /// Field group the error was confined to
    pub fn group(&self) -> FieldGroup {
        match self {
            DecodeError::UnexpectedObjectDataLength { .. } => FieldGroup::Positional,
            DecodeError::Truncated { group, .. } | DecodeError::InvalidText { group, .. } => {
                *group
            }
            DecodeError::UnsupportedSource { .. } => FieldGroup::Header,
            DecodeError::ExtraParam { .. } => FieldGroup::ExtraParams,
        }
    }
}
