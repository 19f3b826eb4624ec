//! Operand types used by [`crate::instruction::Opcode`].
//!
//! The VM is stack-based: instructions never name a register, only the
//! auxiliary data that doesn't fit on the stack itself (local slot indices,
//! constant-pool indices, atom ids, jump displacements).

use serde::{Deserialize, Serialize};

/// Interned string id used for variable and property name operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Atom(pub u32);

impl Atom {
    /// Create an atom from a raw interner id.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw interner id.
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Index into a [`crate::constant::ConstantPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ConstantIndex(pub u32);

impl ConstantIndex {
    /// Create a new constant index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index value.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Index into a function's local-variable slot array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LocalIndex(pub u16);

impl LocalIndex {
    /// Create a new local index.
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Raw index value.
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

/// Index into a function's capture (upvalue) array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct CaptureIndex(pub u16);

impl CaptureIndex {
    /// Create a new capture index.
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Raw index value.
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

/// Byte offset into a bytecode unit's instruction stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BytecodeOffset(pub u32);

impl BytecodeOffset {
    /// Create a new bytecode offset.
    #[inline]
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// Raw byte offset value.
    #[inline]
    pub const fn offset(self) -> u32 {
        self.0
    }
}

/// The fixed operand footprint an opcode carries, immediately following its
/// one-byte tag. The compiler only needs to know this width to emit operands
/// correctly; it never inspects VM-side decoding logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandWidth {
    /// No operand bytes follow the tag.
    None,
    /// A single unsigned byte follows.
    U8,
    /// A little-endian `u16` follows.
    U16,
    /// A little-endian `u32` follows (used for atoms and constant indices).
    U32,
    /// A little-endian `i32` follows (used for signed immediates).
    I32,
    /// A 32-bit signed relative jump displacement follows.
    JumpOffset,
}

impl OperandWidth {
    /// Number of bytes this operand occupies in the instruction stream.
    #[inline]
    pub const fn byte_len(self) -> usize {
        match self {
            OperandWidth::None => 0,
            OperandWidth::U8 => 1,
            OperandWidth::U16 => 2,
            OperandWidth::U32 | OperandWidth::I32 | OperandWidth::JumpOffset => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_roundtrip() {
        let a = Atom::new(42);
        assert_eq!(a.id(), 42);
    }

    #[test]
    fn operand_width_bytes() {
        assert_eq!(OperandWidth::None.byte_len(), 0);
        assert_eq!(OperandWidth::U8.byte_len(), 1);
        assert_eq!(OperandWidth::U16.byte_len(), 2);
        assert_eq!(OperandWidth::U32.byte_len(), 4);
        assert_eq!(OperandWidth::JumpOffset.byte_len(), 4);
    }
}
