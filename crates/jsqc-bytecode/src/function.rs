//! The compiled bytecode unit: one per function body (and one for the top
//! level of a program), holding its byte-buffer program, constant pool,
//! local-name table, and capture/flag metadata.

use serde::{Deserialize, Serialize};

use crate::constant::ConstantPool;
use crate::operand::{CaptureIndex, LocalIndex};

/// Flags describing how a bytecode unit's body should be invoked and what
/// ambient bindings it is allowed to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFlags {
    /// Declared with `async`.
    pub is_async: bool,
    /// Declared as a generator (`function*`).
    pub is_generator: bool,
    /// Declared as an arrow function (no own `this`/`arguments`/`super`/`new.target`).
    pub is_arrow: bool,
    /// Body (or an enclosing class field initializer) is strict-mode code.
    pub is_strict: bool,
    /// Usable as a constructor (`new`); false for arrows, methods, accessors.
    pub is_constructor: bool,
    /// Is an object or class method (has a `[[HomeObject]]` for `super`).
    pub is_method: bool,
    /// Has a rest parameter.
    pub has_rest_param: bool,
    /// References the implicit `arguments` object and needs it materialized.
    pub uses_arguments: bool,
    /// Top-level unit of a module rather than a script.
    pub is_module: bool,
}

/// Where a captured variable's storage comes from, from the perspective of
/// the function doing the capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureSource {
    /// Read directly from a local slot in the immediately enclosing function.
    Local(LocalIndex),
    /// Read from a reference cell already captured by the immediately
    /// enclosing function, at the given index in *its* capture list
    /// (transitive capture, chained through every intermediate function).
    VarRef(CaptureIndex),
}

/// One compiled function body, or the top level of a compiled program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeUnit {
    /// Declared name, if any (empty for anonymous function expressions).
    pub name: Option<String>,
    /// Raw instruction stream: opcode tag bytes interleaved with their
    /// fixed-width operand bytes, in emission order.
    pub bytecode: Vec<u8>,
    /// Constants referenced by `PUSH_CONST`, `FCLOSURE`, and tagged-template
    /// opcodes, including nested function bytecode units.
    pub constants: ConstantPool,
    /// Local slot names, indexed by `LocalIndex`, kept for diagnostics and
    /// `arguments`/closure introspection; not consulted at normal runtime.
    pub local_names: Vec<String>,
    /// Total number of local slots this unit's frame must allocate.
    pub max_locals: u16,
    /// Number of declared (non-rest) formal parameters.
    pub param_count: u8,
    /// Behavioral flags.
    pub flags: UnitFlags,
    /// In declaration order, how each of this unit's capture slots is
    /// sourced from the immediately enclosing function.
    pub captures: Vec<CaptureSource>,
    /// The capture slot holding a named function expression's own binding,
    /// for recursive self-reference, if this unit captures itself.
    pub self_capture_slot: Option<CaptureIndex>,
    /// Byte offsets `(start, end)` into the original source text this unit
    /// was compiled from, used to serve `Function.prototype.toString`.
    pub source_span: (u32, u32),
    /// Instruction-offset to source-location mapping, used for diagnostics.
    pub source_map: Option<SourceMap>,
}

impl BytecodeUnit {
    /// An empty unit with no instructions, used as a placeholder in tests
    /// and while incrementally building nested units.
    pub fn empty() -> Self {
        Self {
            name: None,
            bytecode: Vec::new(),
            constants: ConstantPool::new(),
            local_names: Vec::new(),
            max_locals: 0,
            param_count: 0,
            flags: UnitFlags::default(),
            captures: Vec::new(),
            self_capture_slot: None,
            source_span: (0, 0),
            source_map: None,
        }
    }

    /// The declared name, or a display placeholder for anonymous units.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    /// Whether this unit is both async and a generator.
    #[inline]
    pub fn is_async_generator(&self) -> bool {
        self.flags.is_async && self.flags.is_generator
    }
}

/// Instruction-offset to source-location mapping for diagnostics.
///
/// Built once at the end of emission from the source-offset annotations the
/// emitter records per instruction; never consulted during lowering itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    /// Entries in increasing `bytecode_offset` order.
    pub entries: Vec<SourceMapEntry>,
}

/// A single source map entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceMapEntry {
    /// Byte offset of the instruction's tag within the unit's bytecode.
    pub bytecode_offset: u32,
    /// Source file byte offset this instruction was lowered from.
    pub source_offset: u32,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl SourceMap {
    /// Create a new empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping entry. Entries must be appended in increasing
    /// `bytecode_offset` order for `find` to work.
    pub fn add(&mut self, bytecode_offset: u32, source_offset: u32, line: u32, column: u32) {
        self.entries.push(SourceMapEntry {
            bytecode_offset,
            source_offset,
            line,
            column,
        });
    }

    /// Find the source location active at the given bytecode offset: the
    /// entry at or immediately before it.
    pub fn find(&self, bytecode_offset: u32) -> Option<&SourceMapEntry> {
        let idx = self
            .entries
            .binary_search_by_key(&bytecode_offset, |e| e.bytecode_offset);

        match idx {
            Ok(i) => Some(&self.entries[i]),
            Err(i) if i > 0 => Some(&self.entries[i - 1]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_display_name_falls_back() {
        let unit = BytecodeUnit::empty();
        assert_eq!(unit.display_name(), "<anonymous>");
    }

    #[test]
    fn async_generator_flag_combo() {
        let mut unit = BytecodeUnit::empty();
        unit.flags.is_async = true;
        unit.flags.is_generator = true;
        assert!(unit.is_async_generator());
    }

    #[test]
    fn source_map_lookup_between_entries() {
        let mut map = SourceMap::new();
        map.add(0, 0, 1, 1);
        map.add(5, 20, 2, 5);
        map.add(10, 50, 3, 1);

        assert_eq!(map.find(0).unwrap().line, 1);
        assert_eq!(map.find(5).unwrap().line, 2);
        assert_eq!(map.find(7).unwrap().line, 2);
        assert_eq!(map.find(10).unwrap().line, 3);
    }
}
