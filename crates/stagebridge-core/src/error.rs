//! Errors raised while allocating or filling tuples

use crate::value::SlotKind;

/// Errors from type resolution and tuple shape checks
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TupleError {
    /// A vendor type name or driver scan type has no canonical kind
    #[error("Unsupported type for column {column}: {type_name}")]
    UnsupportedType { column: String, type_name: String },

    #[error("Shape mismatch: expected {expected} slots, found {found}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("Shape mismatch at slot {slot}: expected {expected}, found {found}")]
    KindMismatch {
        slot: usize,
        expected: SlotKind,
        found: String,
    },

    #[error("Slot {slot} is not nullable ({kind}) but received NULL")]
    NullInNonNullable { slot: usize, kind: SlotKind },

    #[error("Slot index {slot} out of range for tuple of width {width}")]
    SlotOutOfRange { slot: usize, width: usize },
}

impl TupleError {
    /// Whether this error is a shape mismatch rather than a resolution failure
    pub fn is_shape_mismatch(&self) -> bool {
        !matches!(self, Self::UnsupportedType { .. })
    }
}
