//! Expression lowering.
//!
//! Every variant here leaves exactly one value on the stack, except where
//! the grammar itself makes that impossible (a bare `SequenceExpression`
//! drops every result but the last, which is the one value rule applied
//! recursively). Short-circuit operators and compound/logical assignment
//! are lowered as explicit dup-test-jump shapes rather than reusing a
//! generic "compile both sides, emit the opcode" path, because the operand
//! that must stay on the stack under a false branch is witnessed by which
//! operator is not executed.

use oxc_ast::ast::{
    AssignmentOperator, AssignmentTarget, BinaryOperator, Expression, LogicalOperator,
    PropertyKey, UnaryOperator, UpdateOperator,
};
use oxc_span::GetSpan;

use jsqc_bytecode::{Constant, Opcode};

use crate::compiler::Compiler;
use crate::error::{CompileError, CompileResult, RuntimeErrorKind};
use crate::literal_validator::{validate_numeric_literal, validate_regexp, validate_string_escapes};
use crate::scope::Resolution;

impl Compiler {
    pub(crate) fn lower_expression(&mut self, expr: &Expression) -> CompileResult<()> {
        self.mark_source_offset(expr.span().start);
        match expr {
            Expression::NullLiteral(_) => {
                self.emitter().emit(Opcode::Null);
                Ok(())
            }
            Expression::BooleanLiteral(lit) => {
                self.emitter()
                    .emit(if lit.value { Opcode::PushTrue } else { Opcode::PushFalse });
                Ok(())
            }
            Expression::NumericLiteral(lit) => {
                let loc = self.source_location(lit.span.start);
                let raw = lit.raw.as_deref().unwrap_or_default();
                validate_numeric_literal(raw, self.is_strict(), loc)?;
                self.lower_numeric_literal(lit.value, raw)
            }
            Expression::StringLiteral(lit) => {
                if let Some(raw) = lit.raw.as_deref() {
                    let loc = self.source_location(lit.span.start);
                    validate_string_escapes(raw, self.is_strict(), loc)?;
                }
                let idx = self
                    .emitter()
                    .add_constant(Constant::String(lit.value.encode_utf16().collect()));
                self.emitter().emit_const(Opcode::PushConst, idx);
                Ok(())
            }
            Expression::BigIntLiteral(lit) => {
                let digits = lit.value.as_str();
                if let Ok(v) = digits.parse::<i32>() {
                    self.emitter().emit_i32(Opcode::PushBigIntI32, v);
                } else {
                    let idx = self
                        .emitter()
                        .add_constant(Constant::BigInt(digits.into()));
                    self.emitter().emit_const(Opcode::PushConst, idx);
                }
                Ok(())
            }
            Expression::RegExpLiteral(lit) => {
                let pattern = lit.regex.pattern.text.to_string();
                let flags = lit.regex.flags.to_string();
                let loc = self.source_location(lit.span.start);
                validate_regexp(&pattern, &flags, loc)?;
                let idx = self.emitter().add_constant(Constant::RegExp { pattern, flags });
                self.emitter().emit_const(Opcode::PushConst, idx);
                Ok(())
            }
            Expression::Identifier(id) => self.load_identifier(&id.name),
            Expression::ThisExpression(_) => {
                self.emitter().emit(Opcode::PushThis);
                Ok(())
            }
            Expression::ParenthesizedExpression(p) => self.lower_expression(&p.expression),
            Expression::ArrayExpression(arr) => {
                self.emitter().emit(Opcode::ArrayNew);
                for elem in &arr.elements {
                    match elem {
                        oxc_ast::ast::ArrayExpressionElement::SpreadElement(spread) => {
                            self.lower_expression(&spread.argument)?;
                            self.emitter().emit(Opcode::Append);
                        }
                        oxc_ast::ast::ArrayExpressionElement::Elision(_) => {
                            self.emitter().emit(Opcode::Undefined);
                            self.emitter().emit(Opcode::PushArray);
                        }
                        other => {
                            self.lower_expression(other.to_expression())?;
                            self.emitter().emit(Opcode::PushArray);
                        }
                    }
                }
                Ok(())
            }
            Expression::ObjectExpression(obj) => self.lower_object_expression(obj),
            Expression::BinaryExpression(bin) => self.lower_binary(bin),
            Expression::LogicalExpression(log) => self.lower_logical(log),
            Expression::UnaryExpression(un) => self.lower_unary(un),
            Expression::UpdateExpression(upd) => self.lower_update(upd),
            Expression::AssignmentExpression(assign) => self.lower_assignment(assign),
            Expression::CallExpression(call) => self.lower_call(call),
            Expression::NewExpression(new_expr) => self.lower_new(new_expr),
            Expression::ConditionalExpression(cond) => {
                self.lower_expression(&cond.test)?;
                let else_jump = self.emitter().emit_jump(Opcode::IfFalse);
                self.lower_expression(&cond.consequent)?;
                let end_jump = self.emitter().emit_jump(Opcode::Goto);
                self.emitter().patch_jump_here(else_jump);
                self.lower_expression(&cond.alternate)?;
                self.emitter().patch_jump_here(end_jump);
                Ok(())
            }
            Expression::SequenceExpression(seq) => {
                for (i, e) in seq.expressions.iter().enumerate() {
                    self.lower_expression(e)?;
                    if i + 1 < seq.expressions.len() {
                        self.emitter().emit(Opcode::Drop);
                    }
                }
                Ok(())
            }
            Expression::YieldExpression(y) => {
                if let Some(arg) = &y.argument {
                    self.lower_expression(arg)?;
                } else {
                    self.emitter().emit(Opcode::Undefined);
                }
                self.emitter().emit(if y.delegate {
                    if self.ctx().is_async {
                        Opcode::AsyncYieldStar
                    } else {
                        Opcode::YieldStar
                    }
                } else {
                    Opcode::Yield
                });
                Ok(())
            }
            Expression::AwaitExpression(a) => {
                self.lower_expression(&a.argument)?;
                self.emitter().emit(Opcode::Await);
                Ok(())
            }
            Expression::StaticMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                let atom = self.emitter().intern_atom(&m.property.name);
                self.emitter().emit_atom(Opcode::GetField, atom);
                Ok(())
            }
            Expression::ComputedMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.lower_expression(&m.expression)?;
                self.emitter().emit(Opcode::GetArrayEl);
                Ok(())
            }
            Expression::PrivateFieldExpression(m) => {
                self.lower_expression(&m.object)?;
                let idx = self
                    .emitter()
                    .add_constant(Constant::Symbol(self.private_symbol_id(&m.field.name)));
                self.emitter().emit_const(Opcode::PushConst, idx);
                self.emitter().emit(Opcode::GetPrivateField);
                Ok(())
            }
            Expression::FunctionExpression(f) => self.lower_function_expression(f),
            Expression::ArrowFunctionExpression(f) => self.lower_arrow_function(f),
            Expression::ClassExpression(c) => self.lower_class(c, false),
            Expression::TemplateLiteral(tpl) => self.lower_template_literal(tpl),
            Expression::TaggedTemplateExpression(tagged) => self.lower_tagged_template(tagged),
            other => Err(CompileError::unsupported(format!(
                "expression form not supported: {other:?}"
            ))),
        }
    }

    fn lower_numeric_literal(&mut self, value: f64, raw: &str) -> CompileResult<()> {
        if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
            self.emitter().emit_i32(Opcode::PushI32, value as i32);
        } else {
            let _ = raw;
            let idx = self.emitter().add_constant(Constant::Number(value));
            self.emitter().emit_const(Opcode::PushConst, idx);
        }
        Ok(())
    }

    pub(crate) fn load_identifier(&mut self, name: &str) -> CompileResult<()> {
        if name == "arguments"
            && !self.ctx().in_global_scope
            && (!self.ctx().is_arrow || self.ctx().has_enclosing_arguments)
        {
            match self.resolve(name) {
                Resolution::Local(_) | Resolution::Captured(_) => {}
                Resolution::Global => {
                    self.emitter().emit_u8(Opcode::SpecialObject, 0);
                    return Ok(());
                }
            }
        }
        match self.resolve(name) {
            Resolution::Local(slot) => {
                let op = if self.scope().is_in_tdz(name) {
                    Opcode::GetLocCheck
                } else {
                    Opcode::GetLocal
                };
                self.emitter().emit_u16(op, slot.index());
            }
            Resolution::Captured(idx) => {
                self.emitter().emit_u16(Opcode::GetVarRef, idx.index());
            }
            Resolution::Global => {
                let atom = self.emitter().intern_atom(name);
                self.emitter().emit_atom(Opcode::GetVar, atom);
            }
        }
        Ok(())
    }

    pub(crate) fn store_identifier(&mut self, name: &str) -> CompileResult<()> {
        match self.resolve(name) {
            Resolution::Local(slot) => self.emitter().emit_u16(Opcode::PutLocal, slot.index()),
            Resolution::Captured(idx) => self.emitter().emit_u16(Opcode::PutVarRef, idx.index()),
            Resolution::Global => {
                let atom = self.emitter().intern_atom(name);
                self.emitter().emit_atom(Opcode::PutVar, atom);
            }
        }
        Ok(())
    }

    fn lower_logical(&mut self, log: &oxc_ast::ast::LogicalExpression) -> CompileResult<()> {
        self.lower_expression(&log.left)?;
        self.emitter().emit(Opcode::Dup);
        let jump = match log.operator {
            LogicalOperator::And => self.emitter().emit_jump(Opcode::IfFalse),
            LogicalOperator::Or => self.emitter().emit_jump(Opcode::IfTrue),
            LogicalOperator::Coalesce => {
                self.emitter().emit(Opcode::IsUndefinedOrNull);
                self.emitter().emit(Opcode::LogicalNot);
                self.emitter().emit_jump(Opcode::IfFalse)
            }
        };
        self.emitter().emit(Opcode::Drop);
        self.lower_expression(&log.right)?;
        self.emitter().patch_jump_here(jump);
        Ok(())
    }

    fn lower_binary(&mut self, bin: &oxc_ast::ast::BinaryExpression) -> CompileResult<()> {
        if bin.operator == BinaryOperator::In {
            if let Expression::PrivateInExpression(_) = &bin.left {
                // handled by the parser producing a PrivateInExpression node directly;
                // fall through to normal handling below for plain `in`.
            }
        }
        self.lower_expression(&bin.left)?;
        self.lower_expression(&bin.right)?;
        let op = match bin.operator {
            BinaryOperator::Addition => Opcode::Add,
            BinaryOperator::Subtraction => Opcode::Sub,
            BinaryOperator::Multiplication => Opcode::Mul,
            BinaryOperator::Division => Opcode::Div,
            BinaryOperator::Remainder => Opcode::Mod,
            BinaryOperator::Exponential => Opcode::Exp,
            BinaryOperator::BitwiseAnd => Opcode::And,
            BinaryOperator::BitwiseOR => Opcode::Or,
            BinaryOperator::BitwiseXOR => Opcode::Xor,
            BinaryOperator::ShiftLeft => Opcode::Shl,
            BinaryOperator::ShiftRight => Opcode::Sar,
            BinaryOperator::ShiftRightZeroFill => Opcode::Shr,
            BinaryOperator::Equality => Opcode::Eq,
            BinaryOperator::Inequality => Opcode::Neq,
            BinaryOperator::StrictEquality => Opcode::StrictEq,
            BinaryOperator::StrictInequality => Opcode::StrictNeq,
            BinaryOperator::LessThan => Opcode::Lt,
            BinaryOperator::LessEqualThan => Opcode::Lte,
            BinaryOperator::GreaterThan => Opcode::Gt,
            BinaryOperator::GreaterEqualThan => Opcode::Gte,
            BinaryOperator::In => Opcode::In,
            BinaryOperator::Instanceof => Opcode::InstanceOf,
        };
        self.emitter().emit(op);
        Ok(())
    }

    fn lower_unary(&mut self, un: &oxc_ast::ast::UnaryExpression) -> CompileResult<()> {
        match un.operator {
            UnaryOperator::UnaryNegation => {
                self.lower_expression(&un.argument)?;
                self.emitter().emit(Opcode::Neg);
            }
            UnaryOperator::UnaryPlus => {
                self.lower_expression(&un.argument)?;
                self.emitter().emit(Opcode::Plus);
            }
            UnaryOperator::LogicalNot => {
                self.lower_expression(&un.argument)?;
                self.emitter().emit(Opcode::LogicalNot);
            }
            UnaryOperator::BitwiseNot => {
                self.lower_expression(&un.argument)?;
                self.emitter().emit(Opcode::Not);
            }
            UnaryOperator::Void => {
                self.lower_expression(&un.argument)?;
                self.emitter().emit(Opcode::Drop);
                self.emitter().emit(Opcode::Undefined);
            }
            UnaryOperator::Typeof => {
                if let Expression::Identifier(id) = &un.argument {
                    match self.resolve(&id.name) {
                        Resolution::Global => {
                            let global_this = self.emitter().intern_atom("globalThis");
                            let name_atom = self.emitter().intern_atom(&id.name);
                            self.emitter().emit_atom(Opcode::GetVar, global_this);
                            self.emitter().emit_atom(Opcode::GetField, name_atom);
                        }
                        _ => self.load_identifier(&id.name)?,
                    }
                } else {
                    self.lower_expression(&un.argument)?;
                }
                self.emitter().emit(Opcode::TypeOf);
            }
            UnaryOperator::Delete => {
                if let Expression::StaticMemberExpression(m) = &un.argument {
                    self.lower_expression(&m.object)?;
                    let atom = self.emitter().intern_atom(&m.property.name);
                    self.emitter().emit_atom(Opcode::PutField, atom);
                    self.emitter().emit(Opcode::Delete);
                } else if let Expression::ComputedMemberExpression(m) = &un.argument {
                    self.lower_expression(&m.object)?;
                    self.lower_expression(&m.expression)?;
                    self.emitter().emit(Opcode::Delete);
                } else if let Expression::Identifier(id) = &un.argument {
                    match self.resolve(&id.name) {
                        Resolution::Local(_) | Resolution::Captured(_) => {
                            self.emitter().emit(Opcode::PushFalse);
                        }
                        Resolution::Global => {
                            if self.non_deletable_globals.contains(&id.name) {
                                self.emitter().emit(Opcode::PushFalse);
                            } else {
                                let atom = self.emitter().intern_atom(&id.name);
                                self.emitter().emit_atom(Opcode::DeleteVar, atom);
                            }
                        }
                    }
                } else {
                    self.lower_expression(&un.argument)?;
                    self.emitter().emit(Opcode::Drop);
                    self.emitter().emit(Opcode::PushTrue);
                }
            }
        }
        Ok(())
    }

    fn lower_update(&mut self, upd: &oxc_ast::ast::UpdateExpression) -> CompileResult<()> {
        let op = if upd.operator == UpdateOperator::Increment {
            Opcode::Add
        } else {
            Opcode::Sub
        };
        match &upd.argument {
            oxc_ast::ast::SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => {
                self.load_identifier(&id.name)?;
                if upd.prefix {
                    self.emitter().emit(op);
                    self.emitter().emit(Opcode::Dup);
                } else {
                    self.emitter().emit(Opcode::Plus);
                    self.emitter().emit(Opcode::Dup);
                    self.emitter().emit(op);
                    self.emitter().emit(Opcode::Swap);
                }
                self.store_identifier(&id.name)?;
                if !upd.prefix {
                    // post: value already duplicated above as [updated, old] after swap;
                    // store consumes `updated`, leaving `old` on top.
                }
                Ok(())
            }
            oxc_ast::ast::SimpleAssignmentTarget::StaticMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.emitter().emit(Opcode::Dup);
                let atom = self.emitter().intern_atom(&m.property.name);
                self.emitter().emit_atom(Opcode::GetField, atom);
                self.emit_update_combine(op, upd.prefix);
                self.emitter().emit_atom(Opcode::PutField, atom);
                Ok(())
            }
            oxc_ast::ast::SimpleAssignmentTarget::ComputedMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.lower_expression(&m.expression)?;
                self.emitter().emit(Opcode::Dup2);
                self.emitter().emit(Opcode::GetArrayEl);
                self.emit_update_combine(op, upd.prefix);
                self.emitter().emit(Opcode::PutArrayEl);
                Ok(())
            }
            other => Err(CompileError::unsupported(format!(
                "increment/decrement target not supported: {other:?}"
            ))),
        }
    }

    fn emit_update_combine(&mut self, op: Opcode, prefix: bool) {
        if prefix {
            self.emitter().emit(op);
            self.emitter().emit(Opcode::Dup);
            self.emitter().emit(Opcode::Rot3L);
        } else {
            self.emitter().emit(Opcode::Plus);
            self.emitter().emit(Opcode::Dup);
            self.emitter().emit(op);
            self.emitter().emit(Opcode::Rot3L);
            self.emitter().emit(Opcode::Swap);
        }
    }

    fn lower_assignment(&mut self, assign: &oxc_ast::ast::AssignmentExpression) -> CompileResult<()> {
        match assign.operator {
            AssignmentOperator::Assign => match &assign.left {
                AssignmentTarget::AssignmentTargetIdentifier(id) => {
                    self.lower_expression(&assign.right)?;
                    self.emitter().emit(Opcode::Dup);
                    self.store_identifier(&id.name)
                }
                AssignmentTarget::StaticMemberExpression(m) => {
                    self.lower_expression(&m.object)?;
                    self.lower_expression(&assign.right)?;
                    self.emitter().emit(Opcode::Dup1);
                    let atom = self.emitter().intern_atom(&m.property.name);
                    self.emitter().emit_atom(Opcode::PutField, atom);
                    Ok(())
                }
                AssignmentTarget::ComputedMemberExpression(m) => {
                    self.lower_expression(&m.object)?;
                    self.lower_expression(&m.expression)?;
                    self.lower_expression(&assign.right)?;
                    self.emitter().emit(Opcode::Dup1);
                    self.emitter().emit(Opcode::PutArrayEl);
                    Ok(())
                }
                AssignmentTarget::ArrayAssignmentTarget(_)
                | AssignmentTarget::ObjectAssignmentTarget(_) => {
                    self.lower_expression(&assign.right)?;
                    self.emitter().emit(Opcode::Dup);
                    self.assign_to_target(&assign.left)
                }
                other => Err(CompileError::unsupported(format!(
                    "assignment target not supported: {other:?}"
                ))),
            },
            AssignmentOperator::LogicalAnd
            | AssignmentOperator::LogicalOr
            | AssignmentOperator::LogicalNullish => {
                self.lower_logical_assignment(assign)
            }
            _ => self.lower_compound_assignment(assign),
        }
    }

    fn lower_compound_assignment(
        &mut self,
        assign: &oxc_ast::ast::AssignmentExpression,
    ) -> CompileResult<()> {
        let op = compound_opcode(assign.operator)?;
        match &assign.left {
            AssignmentTarget::AssignmentTargetIdentifier(id) => {
                self.load_identifier(&id.name)?;
                self.lower_expression(&assign.right)?;
                self.emitter().emit(op);
                self.emitter().emit(Opcode::Dup);
                self.store_identifier(&id.name)
            }
            AssignmentTarget::StaticMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.emitter().emit(Opcode::Dup);
                let atom = self.emitter().intern_atom(&m.property.name);
                self.emitter().emit_atom(Opcode::GetField, atom);
                self.lower_expression(&assign.right)?;
                self.emitter().emit(op);
                self.emitter().emit(Opcode::Dup1);
                self.emitter().emit_atom(Opcode::PutField, atom);
                Ok(())
            }
            AssignmentTarget::ComputedMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.lower_expression(&m.expression)?;
                self.emitter().emit(Opcode::Dup2);
                self.emitter().emit(Opcode::GetArrayEl);
                self.lower_expression(&assign.right)?;
                self.emitter().emit(op);
                self.emitter().emit(Opcode::Dup1);
                self.emitter().emit(Opcode::PutArrayEl);
                Ok(())
            }
            other => Err(CompileError::unsupported(format!(
                "compound assignment target not supported: {other:?}"
            ))),
        }
    }

    fn lower_logical_assignment(
        &mut self,
        assign: &oxc_ast::ast::AssignmentExpression,
    ) -> CompileResult<()> {
        let AssignmentTarget::AssignmentTargetIdentifier(id) = &assign.left else {
            return Err(CompileError::unsupported(
                "logical assignment to non-identifier targets is not supported",
            ));
        };
        self.load_identifier(&id.name)?;
        self.emitter().emit(Opcode::Dup);
        let jump = match assign.operator {
            AssignmentOperator::LogicalAnd => self.emitter().emit_jump(Opcode::IfFalse),
            AssignmentOperator::LogicalOr => self.emitter().emit_jump(Opcode::IfTrue),
            AssignmentOperator::LogicalNullish => {
                self.emitter().emit(Opcode::IsUndefinedOrNull);
                self.emitter().emit(Opcode::LogicalNot);
                self.emitter().emit_jump(Opcode::IfFalse)
            }
            _ => unreachable!(),
        };
        self.emitter().emit(Opcode::Drop);
        self.lower_expression(&assign.right)?;
        self.emitter().emit(Opcode::Dup);
        self.store_identifier(&id.name)?;
        self.emitter().patch_jump_here(jump);
        Ok(())
    }

    fn lower_object_expression(&mut self, obj: &oxc_ast::ast::ObjectExpression) -> CompileResult<()> {
        self.emitter().emit(Opcode::ObjectNew);
        for prop in &obj.properties {
            match prop {
                oxc_ast::ast::ObjectPropertyKind::ObjectProperty(p) => {
                    if p.kind == oxc_ast::ast::PropertyKind::Init {
                        match &p.key {
                            PropertyKey::StaticIdentifier(ident) => {
                                let atom = self.emitter().intern_atom(&ident.name);
                                self.emitter().emit_atom(Opcode::PushAtomValue, atom);
                            }
                            PropertyKey::StringLiteral(s) => {
                                let idx = self
                                    .emitter()
                                    .add_constant(Constant::String(s.value.encode_utf16().collect()));
                                self.emitter().emit_const(Opcode::PushConst, idx);
                            }
                            other => self.lower_expression(other.to_expression())?,
                        }
                        self.lower_expression(&p.value)?;
                        self.emitter().emit(Opcode::DefineProp);
                    } else {
                        let kind = if p.kind == oxc_ast::ast::PropertyKind::Get { 1 } else { 2 };
                        match &p.key {
                            PropertyKey::StaticIdentifier(ident) => {
                                let atom = self.emitter().intern_atom(&ident.name);
                                self.emitter().emit_atom(Opcode::PushAtomValue, atom);
                            }
                            other => self.lower_expression(other.to_expression())?,
                        }
                        self.lower_expression(&p.value)?;
                        self.emitter().emit_u8(Opcode::DefineMethodComputed, kind | 0x04);
                    }
                }
                oxc_ast::ast::ObjectPropertyKind::SpreadProperty(spread) => {
                    self.lower_expression(&spread.argument)?;
                    self.emitter().emit(Opcode::Append);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn emit_throw_error(&mut self, message: &str, kind: RuntimeErrorKind) {
        let atom = self.emitter().intern_atom(message);
        self.emitter().emit_throw_error(atom, kind);
    }
}

fn compound_opcode(op: AssignmentOperator) -> CompileResult<Opcode> {
    Ok(match op {
        AssignmentOperator::Addition => Opcode::Add,
        AssignmentOperator::Subtraction => Opcode::Sub,
        AssignmentOperator::Multiplication => Opcode::Mul,
        AssignmentOperator::Division => Opcode::Div,
        AssignmentOperator::Remainder => Opcode::Mod,
        AssignmentOperator::Exponential => Opcode::Exp,
        AssignmentOperator::BitwiseAnd => Opcode::And,
        AssignmentOperator::BitwiseOR => Opcode::Or,
        AssignmentOperator::BitwiseXOR => Opcode::Xor,
        AssignmentOperator::ShiftLeft => Opcode::Shl,
        AssignmentOperator::ShiftRight => Opcode::Sar,
        AssignmentOperator::ShiftRightZeroFill => Opcode::Shr,
        other => {
            return Err(CompileError::unsupported(format!(
                "assignment operator not supported: {other:?}"
            )))
        }
    })
}
