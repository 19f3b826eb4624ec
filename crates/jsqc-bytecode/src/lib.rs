//! # jsqc-bytecode
//!
//! The bytecode format lowered JavaScript compiles to: a QuickJS-style
//! stack-based instruction set.
//!
//! ## Design principles
//!
//! - **Stack-based**: opcodes operate on an implicit value stack, never on
//!   named registers.
//! - **Fixed operand footprint**: every opcode's operand width is a
//!   function of its tag alone (see [`instruction::Opcode::operand_width`]);
//!   the VM never needs to speculatively probe operand length.
//! - **Serializable**: a [`module::CompiledProgram`] can be cached to disk
//!   by the embedding VM; this crate only defines the format.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constant;
pub mod error;
pub mod function;
pub mod instruction;
pub mod module;
pub mod operand;

pub use constant::{Constant, ConstantPool};
pub use error::BytecodeError;
pub use function::{BytecodeUnit, CaptureSource, SourceMap, SourceMapEntry, UnitFlags};
pub use instruction::Opcode;
pub use module::CompiledProgram;
pub use operand::{Atom, BytecodeOffset, CaptureIndex, ConstantIndex, LocalIndex, OperandWidth};

/// Bytecode format version.
pub const BYTECODE_VERSION: u32 = 1;

/// Magic bytes identifying a serialized [`CompiledProgram`].
pub const BYTECODE_MAGIC: [u8; 8] = *b"JSQCBC\0\0";
