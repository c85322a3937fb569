//! Fixed-shape ordered value container
//!
//! A [`Tuple`] is allocated once per stream and reused as a scratch buffer for
//! every row. Its width and per-slot kinds never change after construction;
//! only the values do. Pumps hand it out as `&mut Tuple` for a single
//! pull/push cycle, so a sink that needs a value past that cycle has to clone
//! it.

use crate::error::TupleError;
use crate::value::{SlotKind, Value};

/// One typed slot of a tuple
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    kind: SlotKind,
    value: Value,
}

impl Slot {
    /// Allocate a slot holding the kind's initial value
    pub fn new(kind: SlotKind) -> Self {
        Self {
            value: kind.initial_value(),
            kind,
        }
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Ordered, fixed-width sequence of typed slots
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tuple {
    slots: Vec<Slot>,
}

impl Tuple {
    /// Allocate a tuple with one slot per kind
    pub fn new(kinds: impl IntoIterator<Item = SlotKind>) -> Self {
        Self {
            slots: kinds.into_iter().map(Slot::new).collect(),
        }
    }

    /// Allocate a tuple and fill it with values
    ///
    /// Fails when a value does not fit its slot kind.
    pub fn with_values(
        kinds: impl IntoIterator<Item = SlotKind>,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self, TupleError> {
        let mut tuple = Self::new(kinds);
        let values: Vec<Value> = values.into_iter().collect();
        if values.len() != tuple.width() {
            return Err(TupleError::WidthMismatch {
                expected: tuple.width(),
                found: values.len(),
            });
        }
        for (i, value) in values.into_iter().enumerate() {
            tuple.set(i, value)?;
        }
        Ok(tuple)
    }

    /// Number of slots
    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot kinds in order
    pub fn shape(&self) -> Vec<SlotKind> {
        self.slots.iter().map(Slot::kind).collect()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Values in slot order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.slots.iter().map(Slot::value)
    }

    pub fn kind(&self, slot: usize) -> Option<SlotKind> {
        self.slots.get(slot).map(Slot::kind)
    }

    pub fn get(&self, slot: usize) -> Option<&Value> {
        self.slots.get(slot).map(Slot::value)
    }

    /// Replace the value of one slot
    ///
    /// The slot kind is fixed: a value of another kind, or NULL in a
    /// non-nullable slot, is rejected and the slot keeps its old value.
    pub fn set(&mut self, slot: usize, value: Value) -> Result<(), TupleError> {
        let width = self.width();
        let target = self
            .slots
            .get_mut(slot)
            .ok_or(TupleError::SlotOutOfRange { slot, width })?;

        if !target.kind.accepts(&value) {
            return Err(match value.kind() {
                None => TupleError::NullInNonNullable {
                    slot,
                    kind: target.kind,
                },
                Some(found) => TupleError::KindMismatch {
                    slot,
                    expected: target.kind,
                    found: found.to_string(),
                },
            });
        }

        target.value = value;
        Ok(())
    }

    /// Check that this tuple has exactly the given shape
    pub fn check_shape(&self, expected: &[SlotKind]) -> Result<(), TupleError> {
        if self.width() != expected.len() {
            return Err(TupleError::WidthMismatch {
                expected: expected.len(),
                found: self.width(),
            });
        }
        for (slot, (have, want)) in self.slots.iter().zip(expected).enumerate() {
            if have.kind != *want {
                return Err(TupleError::KindMismatch {
                    slot,
                    expected: *want,
                    found: have.kind.to_string(),
                });
            }
        }
        Ok(())
    }
}
