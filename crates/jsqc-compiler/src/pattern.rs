//! Pattern lowering: binding patterns (`let {a, b: [c, ...d] = e} = f`) and
//! their assignment-expression counterparts (`({a, b} = f)`).
//!
//! Every pattern form bottoms out in one of two primitives: declaring a
//! fresh local (declaration context) or storing into an already-resolved
//! target (expression context). Object and array patterns recurse, leaving
//! the stack balanced after each sub-pattern consumes its slice of the
//! source value. The value being destructured is always the stack top when
//! a `lower_*` method here is called, and is always fully consumed by it.

use oxc_ast::ast::{
    AssignmentTarget, AssignmentTargetMaybeDefault, AssignmentTargetProperty, BindingPattern,
    PropertyKey,
};

use jsqc_bytecode::Opcode;

use crate::compiler::Compiler;
use crate::error::{CompileError, CompileResult};

impl Compiler {
    /// Declare bindings for `pattern`, consuming the value on top of the
    /// stack. Used by `var`/`let`/`const` declarations, catch parameters,
    /// and function parameters.
    pub(crate) fn declare_pattern(
        &mut self,
        pattern: &BindingPattern,
        is_const: bool,
    ) -> CompileResult<()> {
        match pattern {
            BindingPattern::BindingIdentifier(id) => {
                self.declare_pattern_identifier(&id.name, is_const, id.span.start)
            }
            BindingPattern::ObjectPattern(obj) => {
                for prop in &obj.properties {
                    self.emitter().emit(Opcode::Dup);
                    match &prop.key {
                        PropertyKey::StaticIdentifier(ident) => {
                            let atom = self.emitter().intern_atom(&ident.name);
                            self.emitter().emit_atom(Opcode::GetField, atom);
                        }
                        PropertyKey::StringLiteral(s) => {
                            let atom = self.emitter().intern_atom(&s.value);
                            self.emitter().emit_atom(Opcode::GetField, atom);
                        }
                        other => {
                            self.lower_expression(other.to_expression())?;
                            self.emitter().emit(Opcode::GetArrayEl);
                        }
                    }
                    self.declare_pattern(&prop.value, is_const)?;
                }
                if let Some(rest) = &obj.rest {
                    if let BindingPattern::BindingIdentifier(id) = &rest.argument {
                        self.emitter().emit(Opcode::Dup);
                        self.declare_pattern_identifier(&id.name, is_const, id.span.start)?;
                    } else {
                        return Err(CompileError::unsupported(
                            "rest element in object pattern must bind an identifier",
                        ));
                    }
                }
                self.emitter().emit(Opcode::Drop);
                Ok(())
            }
            BindingPattern::ArrayPattern(arr) => {
                if arr.elements.iter().all(Option::is_some) && arr.rest.is_none() {
                    for (i, elem) in arr.elements.iter().enumerate() {
                        let elem = elem.as_ref().unwrap();
                        self.emitter().emit(Opcode::Dup);
                        self.emitter().emit_i32(Opcode::PushI32, i as i32);
                        self.emitter().emit(Opcode::GetArrayEl);
                        self.declare_pattern(elem, is_const)?;
                    }
                    self.emitter().emit(Opcode::Drop);
                    return Ok(());
                }

                self.emitter().emit(Opcode::ForOfStart);
                for elem in &arr.elements {
                    self.emitter().emit_u8(Opcode::ForOfNext, 0);
                    self.emitter().emit(Opcode::Drop); // done flag
                    match elem {
                        Some(p) => self.declare_pattern(p, is_const)?,
                        None => self.emitter().emit(Opcode::Drop),
                    }
                }
                if let Some(rest) = &arr.rest {
                    self.emitter().emit_u16(Opcode::ArrayFrom, 0);
                    self.emitter().emit_i32(Opcode::PushI32, 0);
                    let loop_start = self.emitter().offset();
                    self.emitter().emit_u8(Opcode::ForOfNext, 2);
                    let done_jump = self.emitter().emit_jump(Opcode::IfTrue);
                    self.emitter().emit(Opcode::DefineArrayEl);
                    self.emitter().emit(Opcode::Inc);
                    let back = self.emitter().emit_jump(Opcode::Goto);
                    self.emitter().patch_jump(back, loop_start);
                    self.emitter().patch_jump_here(done_jump);
                    self.emitter().emit(Opcode::Drop); // trailing undefined
                    self.emitter().emit(Opcode::Drop); // index
                    self.declare_pattern(&rest.argument, is_const)?;
                }
                self.emitter().emit(Opcode::Drop); // catchOffset
                self.emitter().emit(Opcode::Drop); // next
                self.emitter().emit(Opcode::Drop); // iter
                Ok(())
            }
            BindingPattern::AssignmentPattern(assign) => {
                self.emitter().emit(Opcode::Dup);
                self.emitter().emit(Opcode::IsUndefined);
                let skip = self.emitter().emit_jump(Opcode::IfFalse);
                self.emitter().emit(Opcode::Drop);
                self.lower_expression(&assign.right)?;
                self.emitter().patch_jump_here(skip);
                self.declare_pattern(&assign.left, is_const)
            }
        }
    }

    fn declare_pattern_identifier(
        &mut self,
        name: &str,
        is_const: bool,
        offset: u32,
    ) -> CompileResult<()> {
        if self.ctx().in_global_scope && self.scope().current_is_function_scope() {
            let atom = self.emitter().intern_atom(name);
            self.emitter().emit_atom(Opcode::PutVar, atom);
            self.non_deletable_globals.insert(name.to_string());
        } else {
            let (line, column) = self.locate(offset);
            let slot = self.scope().declare(name, is_const).ok_or_else(|| {
                CompileError::early_error(format!("redeclaration of '{name}'"), line, column)
            })?;
            self.emitter().declare_local_name(name);
            self.emitter().emit_u16(Opcode::PutLocal, slot.index());
        }
        Ok(())
    }

    /// Assign to `target` (an expression-context destructuring target, or a
    /// leaf identifier/member expression), consuming the value on the stack.
    pub(crate) fn assign_to_target(&mut self, target: &AssignmentTarget) -> CompileResult<()> {
        match target {
            AssignmentTarget::AssignmentTargetIdentifier(id) => self.store_identifier(&id.name),
            AssignmentTarget::ArrayAssignmentTarget(arr) => {
                for (i, elem) in arr.elements.iter().enumerate() {
                    let Some(elem) = elem else { continue };
                    self.emitter().emit(Opcode::Dup);
                    self.emitter().emit_i32(Opcode::PushI32, i as i32);
                    self.emitter().emit(Opcode::GetArrayEl);
                    self.assign_target_maybe_default(elem)?;
                }
                self.emitter().emit(Opcode::Drop);
                Ok(())
            }
            AssignmentTarget::ObjectAssignmentTarget(obj) => {
                for prop in &obj.properties {
                    self.emitter().emit(Opcode::Dup);
                    match prop {
                        AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(id_prop) => {
                            let atom = self.emitter().intern_atom(&id_prop.binding.name);
                            self.emitter().emit_atom(Opcode::GetField, atom);
                            if let Some(init) = &id_prop.init {
                                self.emitter().emit(Opcode::Dup);
                                self.emitter().emit(Opcode::IsUndefined);
                                let skip = self.emitter().emit_jump(Opcode::IfFalse);
                                self.emitter().emit(Opcode::Drop);
                                self.lower_expression(init)?;
                                self.emitter().patch_jump_here(skip);
                            }
                            self.store_identifier(&id_prop.binding.name)?;
                        }
                        AssignmentTargetProperty::AssignmentTargetPropertyProperty(prop_prop) => {
                            match &prop_prop.name {
                                PropertyKey::StaticIdentifier(ident) => {
                                    let atom = self.emitter().intern_atom(&ident.name);
                                    self.emitter().emit_atom(Opcode::GetField, atom);
                                }
                                other => {
                                    self.lower_expression(other.to_expression())?;
                                    self.emitter().emit(Opcode::GetArrayEl);
                                }
                            }
                            self.assign_target_maybe_default(&prop_prop.binding)?;
                        }
                    }
                }
                self.emitter().emit(Opcode::Drop);
                Ok(())
            }
            other => self.lower_member_assignment_target(other),
        }
    }

    fn assign_target_maybe_default(
        &mut self,
        elem: &AssignmentTargetMaybeDefault,
    ) -> CompileResult<()> {
        match elem {
            AssignmentTargetMaybeDefault::AssignmentTargetWithDefault(with_default) => {
                self.emitter().emit(Opcode::Dup);
                self.emitter().emit(Opcode::IsUndefined);
                let skip = self.emitter().emit_jump(Opcode::IfFalse);
                self.emitter().emit(Opcode::Drop);
                self.lower_expression(&with_default.init)?;
                self.emitter().patch_jump_here(skip);
                self.assign_to_target(&with_default.binding)
            }
            other => self.assign_to_target(other.to_assignment_target()),
        }
    }

    /// A destructuring-assignment leaf that isn't a plain identifier or
    /// nested pattern: a member expression (`({a} = obj)`'s `a` could be
    /// `x.y` or `x[i]`). The value being destructured into it is always the
    /// stack top; this evaluates the member target's own sub-expressions
    /// and reorders the stack so `PutField`/`PutArrayEl` see their usual
    /// `[object, value]`/`[object, key, value]` shape, fully consuming the
    /// value (no result is preserved, unlike a plain assignment expression).
    fn lower_member_assignment_target(&mut self, target: &AssignmentTarget) -> CompileResult<()> {
        match target {
            AssignmentTarget::StaticMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.emitter().emit(Opcode::Swap);
                let atom = self.emitter().intern_atom(&m.property.name);
                self.emitter().emit_atom(Opcode::PutField, atom);
                Ok(())
            }
            AssignmentTarget::ComputedMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.lower_expression(&m.expression)?;
                self.emitter().emit(Opcode::Rot3L);
                self.emitter().emit(Opcode::PutArrayEl);
                Ok(())
            }
            other => Err(CompileError::unsupported(format!(
                "destructuring assignment target not supported: {other:?}"
            ))),
        }
    }
}
