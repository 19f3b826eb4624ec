//! Byte-buffer emitter.
//!
//! A thin wrapper around a growable byte vector: opcodes go in with their
//! fixed-width operands, jump targets start as placeholders and get patched
//! once their destination is known, and [`Emitter::finish`] packages the
//! result as a [`BytecodeUnit`]. This is the only place that writes raw
//! bytes; every lowering module goes through it.

use rustc_hash::FxHashMap;

use jsqc_bytecode::{
    Atom, BytecodeOffset, BytecodeUnit, CaptureIndex, CaptureSource, ConstantIndex, ConstantPool,
    Constant, Opcode, SourceMap, UnitFlags,
};

use crate::error::RuntimeErrorKind;

/// Byte-buffer emitter for a single bytecode unit (one function body, or a
/// program's top level).
pub struct Emitter {
    bytecode: Vec<u8>,
    constants: ConstantPool,
    atoms: FxHashMap<String, Atom>,
    atom_names: Vec<String>,
    local_names: Vec<String>,
    source_map: SourceMap,
    current_source_offset: u32,
}

impl Emitter {
    /// Create a new, empty emitter.
    pub fn new() -> Self {
        Self {
            bytecode: Vec::new(),
            constants: ConstantPool::new(),
            atoms: FxHashMap::default(),
            atom_names: Vec::new(),
            local_names: Vec::new(),
            source_map: SourceMap::new(),
            current_source_offset: 0,
        }
    }

    /// Current write position; the offset a just-emitted opcode's tag sits at.
    pub fn offset(&self) -> BytecodeOffset {
        BytecodeOffset::new(self.bytecode.len() as u32)
    }

    /// Record the source offset lowering has reached, so the next emitted
    /// instruction's source-map entry points at it.
    pub fn set_source_offset(&mut self, offset: u32, line: u32, column: u32) {
        self.current_source_offset = offset;
        self.source_map
            .add(self.bytecode.len() as u32, offset, line, column);
    }

    /// Intern a string as an atom, reusing an existing id for repeats.
    pub fn intern_atom(&mut self, name: &str) -> Atom {
        if let Some(&atom) = self.atoms.get(name) {
            return atom;
        }
        let atom = Atom::new(self.atom_names.len() as u32);
        self.atom_names.push(name.to_string());
        self.atoms.insert(name.to_string(), atom);
        atom
    }

    /// The interned atom's backing string, if emitted code ever needs to
    /// re-derive it (diagnostics only; the VM owns the runtime atom table).
    pub fn atom_name(&self, atom: Atom) -> &str {
        &self.atom_names[atom.id() as usize]
    }

    /// Add a constant-pool entry, deduplicating structurally.
    pub fn add_constant(&mut self, constant: Constant) -> ConstantIndex {
        ConstantIndex::new(self.constants.add(constant))
    }

    /// Append a nested function's bytecode unit as a constant, never
    /// deduplicated.
    pub fn add_function_constant(&mut self, unit: BytecodeUnit) -> ConstantIndex {
        ConstantIndex::new(self.constants.add_function(unit))
    }

    /// Declare a local slot's name, for diagnostics. Must be called in
    /// slot-index order.
    pub fn declare_local_name(&mut self, name: impl Into<String>) {
        self.local_names.push(name.into());
    }

    /// Emit a zero-operand opcode.
    pub fn emit(&mut self, op: Opcode) {
        self.bytecode.push(op.to_byte());
    }

    /// Emit an opcode with a `u8` operand.
    pub fn emit_u8(&mut self, op: Opcode, value: u8) {
        self.bytecode.push(op.to_byte());
        self.bytecode.push(value);
    }

    /// Emit an opcode with a `u16` operand.
    pub fn emit_u16(&mut self, op: Opcode, value: u16) {
        self.bytecode.push(op.to_byte());
        self.bytecode.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit an opcode with a `u32` operand.
    pub fn emit_u32(&mut self, op: Opcode, value: u32) {
        self.bytecode.push(op.to_byte());
        self.bytecode.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit an opcode with an `i32` operand.
    pub fn emit_i32(&mut self, op: Opcode, value: i32) {
        self.bytecode.push(op.to_byte());
        self.bytecode.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit an opcode whose operand is an atom id.
    pub fn emit_atom(&mut self, op: Opcode, atom: Atom) {
        self.emit_u32(op, atom.id());
    }

    /// Emit an opcode whose operand is a constant-pool index.
    pub fn emit_const(&mut self, op: Opcode, index: ConstantIndex) {
        self.emit_u32(op, index.index());
    }

    /// Emit a `THROW_ERROR`, whose compound operand is an atom followed by
    /// a one-byte error-kind tag.
    pub fn emit_throw_error(&mut self, message: Atom, kind: RuntimeErrorKind) {
        self.bytecode.push(Opcode::ThrowError.to_byte());
        self.bytecode.extend_from_slice(&message.id().to_le_bytes());
        self.bytecode.push(kind.tag());
    }

    /// Emit a jump opcode with a placeholder displacement, returning the
    /// offset of the placeholder's first byte so it can later be patched.
    pub fn emit_jump(&mut self, op: Opcode) -> BytecodeOffset {
        debug_assert!(matches!(
            op,
            Opcode::Goto | Opcode::IfTrue | Opcode::IfFalse | Opcode::Catch
        ));
        self.bytecode.push(op.to_byte());
        let placeholder = self.offset();
        self.bytecode.extend_from_slice(&0i32.to_le_bytes());
        placeholder
    }

    /// Patch a previously emitted jump's displacement to land at `target`,
    /// relative to the byte immediately following the displacement operand.
    pub fn patch_jump(&mut self, placeholder: BytecodeOffset, target: BytecodeOffset) {
        let operand_end = placeholder.offset() as i64 + 4;
        let displacement = target.offset() as i64 - operand_end;
        let bytes = (displacement as i32).to_le_bytes();
        let at = placeholder.offset() as usize;
        self.bytecode[at..at + 4].copy_from_slice(&bytes);
    }

    /// Patch a jump to land at the emitter's current write position.
    pub fn patch_jump_here(&mut self, placeholder: BytecodeOffset) {
        let here = self.offset();
        self.patch_jump(placeholder, here);
    }

    /// Bytes emitted so far.
    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    /// Whether no bytes have been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    /// Package the emitted bytes and constant pool into a finished unit.
    #[allow(clippy::too_many_arguments)]
    pub fn finish(
        self,
        name: Option<String>,
        max_locals: u16,
        param_count: u8,
        flags: UnitFlags,
        captures: Vec<CaptureSource>,
        self_capture_slot: Option<CaptureIndex>,
        source_span: (u32, u32),
    ) -> BytecodeUnit {
        BytecodeUnit {
            name,
            bytecode: self.bytecode,
            constants: self.constants,
            local_names: self.local_names,
            max_locals,
            param_count,
            flags,
            captures,
            self_capture_slot,
            source_span,
            source_map: Some(self.source_map),
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_interning_is_stable() {
        let mut em = Emitter::new();
        let a = em.intern_atom("x");
        let b = em.intern_atom("y");
        let a2 = em.intern_atom("x");
        assert_eq!(a, a2);
        assert_ne!(a, b);
    }

    #[test]
    fn jump_patch_forward() {
        let mut em = Emitter::new();
        let placeholder = em.emit_jump(Opcode::Goto);
        em.emit(Opcode::Null);
        em.emit(Opcode::Drop);
        let target = em.offset();
        em.patch_jump(placeholder, target);

        // tag(1) + i32(4) + Null(1) + Drop(1)
        assert_eq!(em.len(), 7);
        let disp = i32::from_le_bytes(em.bytecode[1..5].try_into().unwrap());
        assert_eq!(disp, 2);
    }

    #[test]
    fn jump_patch_backward() {
        let mut em = Emitter::new();
        let loop_start = em.offset();
        em.emit(Opcode::Null);
        let placeholder = em.emit_jump(Opcode::Goto);
        em.patch_jump(placeholder, loop_start);

        let disp = i32::from_le_bytes(
            em.bytecode[(placeholder.offset() as usize)..(placeholder.offset() as usize + 4)]
                .try_into()
                .unwrap(),
        );
        assert!(disp < 0);
    }

    #[test]
    fn finish_packages_unit() {
        let mut em = Emitter::new();
        em.emit(Opcode::Undefined);
        em.emit(Opcode::Return);
        let unit = em.finish(
            Some("f".into()),
            0,
            0,
            UnitFlags::default(),
            Vec::new(),
            None,
            (0, 0),
        );
        assert_eq!(unit.bytecode.len(), 2);
        assert_eq!(unit.name.as_deref(), Some("f"));
    }
}
