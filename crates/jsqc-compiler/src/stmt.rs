//! Statement lowering.
//!
//! The program-body procedure is the single hardest piece of this module:
//! it interleaves scope setup, Annex B hoisting, and a two-phase lowering
//! order (function declarations first, then everything else) before
//! wrapping the result in the synthetic `$program_result` local every
//! top-level script needs so its completion value can flow to `RETURN`
//! after any `using` disposal. Every other statement form lowers in a
//! single pass since it cannot introduce hoisted function declarations of
//! its own (sloppy-mode Annex B block-function hoisting aside, handled by
//! `hoist_annex_b`).

use oxc_ast::ast::{
    AssignmentTarget, ForStatementInit, ForStatementLeft, Program, Statement,
    VariableDeclarationKind,
};
use oxc_span::{GetSpan, Span};

use jsqc_bytecode::{BytecodeUnit, Opcode, UnitFlags};

use crate::analysis::{collect_annex_b_candidates, collect_var_names};
use crate::compiler::{AnnexBTarget, Compiler};
use crate::error::{CompileError, CompileResult, RuntimeErrorKind};
use crate::scope::LoopFrame;

impl Compiler {
    pub(crate) fn lower_program(&mut self, program: &Program) -> CompileResult<BytecodeUnit> {
        self.ctx_mut().in_global_scope = true;
        if program.source_type.is_module() || program_is_strict(program) {
            *self.strict_stack.last_mut().unwrap() = true;
        }

        let mut var_names = Vec::new();
        collect_var_names(&program.body, &mut var_names);
        for name in &var_names {
            self.non_deletable_globals.insert(name.clone());
        }

        for stmt in &program.body {
            if let Statement::FunctionDeclaration(f) = stmt {
                if let Some(id) = &f.id {
                    self.non_deletable_globals.insert(id.name.to_string());
                }
            }
        }

        for stmt in &program.body {
            if let Statement::FunctionDeclaration(f) = stmt {
                self.lower_function_declaration(f)?;
            }
        }

        let hoisted_functions: std::collections::HashSet<&str> = program
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::FunctionDeclaration(f) => f.id.as_ref().map(|id| id.name.as_str()),
                _ => None,
            })
            .collect();
        for name in &var_names {
            if hoisted_functions.contains(name.as_str()) {
                continue;
            }
            let value_atom = self.emitter().intern_atom(name);
            let global_this_atom = self.emitter().intern_atom("globalThis");
            self.emitter().emit_atom(Opcode::PushAtomValue, value_atom);
            self.emitter().emit_atom(Opcode::GetVar, global_this_atom);
            self.emitter().emit(Opcode::In);
            let skip = self.emitter().emit_jump(Opcode::IfTrue);
            self.emitter().emit(Opcode::Undefined);
            self.emitter().emit_atom(Opcode::PutVar, value_atom);
            self.emitter().patch_jump_here(skip);
        }

        self.hoist_annex_b(&program.body, &hoisted_functions)?;

        let mut last_value_index = None;
        for (i, stmt) in program.body.iter().enumerate() {
            if !matches!(stmt, Statement::FunctionDeclaration(_)) {
                last_value_index = Some(i);
            }
        }

        for (i, stmt) in program.body.iter().enumerate() {
            if matches!(stmt, Statement::FunctionDeclaration(_)) {
                continue;
            }
            let is_last = Some(i) == last_value_index;
            self.lower_statement(stmt, is_last)?;
        }

        if last_value_index.is_none() {
            self.emitter().emit(Opcode::Undefined);
        }

        let result_name = self.new_temp_name();
        let slot = self
            .scope()
            .declare(&result_name, false)
            .ok_or_else(|| CompileError::internal("program result temp redeclared"))?;
        self.emitter().declare_local_name(&result_name);
        self.emitter().emit_u16(Opcode::PutLocal, slot.index());
        self.emitter().emit_u16(Opcode::GetLocal, slot.index());
        self.emitter().emit(Opcode::Return);

        let max_locals = self.scope().local_count();
        let flags = UnitFlags {
            is_strict: self.is_strict(),
            is_module: self.is_module,
            ..UnitFlags::default()
        };
        let emitter = std::mem::replace(self.emitter(), crate::emitter::Emitter::new());
        Ok(self.finish_unit(emitter, None, max_locals, 0, Vec::new(), None, flags, (0, 0)))
    }

    /// Lower one statement. `is_last` marks the single statement in a
    /// program/function body whose completion value (if it produces one)
    /// should be preserved rather than dropped.
    pub(crate) fn lower_statement(&mut self, stmt: &Statement, is_last: bool) -> CompileResult<()> {
        self.mark_source_offset(stmt.span().start);
        match stmt {
            Statement::ExpressionStatement(e) => {
                self.lower_expression(&e.expression)?;
                if !is_last {
                    self.emitter().emit(Opcode::Drop);
                }
                Ok(())
            }
            Statement::BlockStatement(block) => self.lower_block(&block.body, is_last),
            Statement::VariableDeclaration(decl) => {
                if matches!(
                    decl.kind,
                    VariableDeclarationKind::Var | VariableDeclarationKind::Let | VariableDeclarationKind::Const
                ) {
                    for d in &decl.declarations {
                        match &d.init {
                            Some(init) => self.lower_expression(init)?,
                            None => self.emitter().emit(Opcode::Undefined),
                        }
                        let is_const = decl.kind == VariableDeclarationKind::Const;
                        self.declare_pattern(&d.id, is_const)?;
                    }
                    Ok(())
                } else {
                    Err(CompileError::unsupported("using/await using declarations"))
                }
            }
            Statement::IfStatement(if_stmt) => {
                self.lower_expression(&if_stmt.test)?;
                let else_jump = self.emitter().emit_jump(Opcode::IfFalse);
                self.lower_statement(&if_stmt.consequent, false)?;
                if let Some(alt) = &if_stmt.alternate {
                    let end_jump = self.emitter().emit_jump(Opcode::Goto);
                    self.emitter().patch_jump_here(else_jump);
                    self.lower_statement(alt, false)?;
                    self.emitter().patch_jump_here(end_jump);
                } else {
                    self.emitter().patch_jump_here(else_jump);
                }
                Ok(())
            }
            Statement::WhileStatement(w) => {
                let labels = self.take_pending_label();
                let start = self.emitter().offset();
                self.lower_expression(&w.test)?;
                let end_jump = self.emitter().emit_jump(Opcode::IfFalse);
                self.loops().push(LoopFrame {
                    continue_target: start,
                    labels,
                    ..LoopFrame::default()
                });
                self.lower_statement(&w.body, false)?;
                let back = self.emitter().emit_jump(Opcode::Goto);
                self.emitter().patch_jump(back, start);
                self.emitter().patch_jump_here(end_jump);
                self.finish_loop_frame();
                Ok(())
            }
            Statement::DoWhileStatement(d) => {
                let labels = self.take_pending_label();
                let start = self.emitter().offset();
                self.loops().push(LoopFrame {
                    continue_target: start,
                    labels,
                    ..LoopFrame::default()
                });
                self.lower_statement(&d.body, false)?;
                let test_offset = self.emitter().offset();
                self.lower_expression(&d.test)?;
                let back = self.emitter().emit_jump(Opcode::IfTrue);
                self.emitter().patch_jump(back, start);
                let frame = self.loops().pop().unwrap();
                for p in frame.continue_patches {
                    self.emitter().patch_jump(p, test_offset);
                }
                for p in frame.break_patches {
                    self.emitter().patch_jump_here(p);
                }
                Ok(())
            }
            Statement::ForStatement(f) => self.lower_for(f),
            Statement::ForInStatement(f) => self.lower_for_in(f),
            Statement::ForOfStatement(f) => self.lower_for_of(f),
            Statement::TryStatement(t) => self.lower_try(t, is_last),
            Statement::SwitchStatement(s) => self.lower_switch(s),
            Statement::ThrowStatement(t) => {
                self.lower_expression(&t.argument)?;
                self.emitter().emit(Opcode::Throw);
                Ok(())
            }
            Statement::ReturnStatement(r) => {
                match &r.argument {
                    Some(arg) => self.lower_expression(arg)?,
                    None => self.emitter().emit(Opcode::Undefined),
                }
                self.emitter()
                    .emit(if self.ctx().is_async { Opcode::ReturnAsync } else { Opcode::Return });
                Ok(())
            }
            Statement::BreakStatement(b) => {
                self.lower_break(b.label.as_ref().map(|l| l.name.as_str()), b.span)
            }
            Statement::ContinueStatement(c) => {
                self.lower_continue(c.label.as_ref().map(|l| l.name.as_str()), c.span)
            }
            Statement::LabeledStatement(l) => self.lower_labeled(l),
            Statement::FunctionDeclaration(f) => self.lower_function_declaration(f),
            Statement::ClassDeclaration(c) => self.lower_class(c, true).map(|_| ()),
            Statement::EmptyStatement(_) => Ok(()),
            other => Err(CompileError::unsupported(format!(
                "statement form not supported: {other:?}"
            ))),
        }
    }

    fn lower_block(&mut self, body: &[Statement], is_last: bool) -> CompileResult<()> {
        self.scope().enter(false);
        let was_global = self.ctx().in_global_scope;
        self.ctx_mut().in_global_scope = false;

        for stmt in body {
            if let Statement::FunctionDeclaration(f) = stmt {
                self.lower_function_declaration(f)?;
            }
        }

        let mut last_value_index = None;
        for (i, stmt) in body.iter().enumerate() {
            if !matches!(stmt, Statement::FunctionDeclaration(_)) {
                last_value_index = Some(i);
            }
        }

        for (i, stmt) in body.iter().enumerate() {
            if matches!(stmt, Statement::FunctionDeclaration(_)) {
                continue;
            }
            let stmt_is_last = is_last && Some(i) == last_value_index;
            self.lower_statement(stmt, stmt_is_last)?;
        }

        self.ctx_mut().in_global_scope = was_global;
        self.scope().exit();
        Ok(())
    }

    fn lower_for(&mut self, f: &oxc_ast::ast::ForStatement) -> CompileResult<()> {
        let labels = self.take_pending_label();
        self.scope().enter(false);
        if let Some(init) = &f.init {
            match init {
                ForStatementInit::VariableDeclaration(decl) => {
                    for d in &decl.declarations {
                        match &d.init {
                            Some(init) => self.lower_expression(init)?,
                            None => self.emitter().emit(Opcode::Undefined),
                        }
                        self.declare_pattern(&d.id, decl.kind == VariableDeclarationKind::Const)?;
                    }
                }
                other => {
                    self.lower_expression(other.to_expression())?;
                    self.emitter().emit(Opcode::Drop);
                }
            }
        }

        let test_offset = self.emitter().offset();
        let end_jump = if let Some(test) = &f.test {
            self.lower_expression(test)?;
            Some(self.emitter().emit_jump(Opcode::IfFalse))
        } else {
            None
        };

        self.loops().push(LoopFrame {
            continue_target: test_offset,
            labels,
            ..LoopFrame::default()
        });
        self.lower_statement(&f.body, false)?;

        let continue_offset = self.emitter().offset();
        for slot in self.scope().captured_in_current_scope() {
            self.emitter().emit_u16(Opcode::CloseLoc, slot.index());
        }
        if let Some(update) = &f.update {
            self.lower_expression(update)?;
            self.emitter().emit(Opcode::Drop);
        }
        let back = self.emitter().emit_jump(Opcode::Goto);
        self.emitter().patch_jump(back, test_offset);

        if let Some(end_jump) = end_jump {
            self.emitter().patch_jump_here(end_jump);
        }

        let frame = self.loops().pop().unwrap();
        for p in frame.continue_patches {
            self.emitter().patch_jump(p, continue_offset);
        }
        for p in frame.break_patches {
            self.emitter().patch_jump_here(p);
        }
        self.scope().exit();
        Ok(())
    }

    fn lower_for_in(&mut self, f: &oxc_ast::ast::ForInStatement) -> CompileResult<()> {
        let labels = self.take_pending_label();
        self.lower_expression(&f.right)?;
        self.emitter().emit(Opcode::ForInStart);
        self.scope().enter(false);
        let loop_start = self.emitter().offset();
        self.emitter().emit(Opcode::ForInNext);
        self.emitter().emit(Opcode::Dup);
        self.emitter().emit(Opcode::IsUndefinedOrNull);
        let end_jump = self.emitter().emit_jump(Opcode::IfTrue);
        self.assign_for_in_head(&f.left)?;

        self.loops().push(LoopFrame {
            continue_target: loop_start,
            labels,
            ..LoopFrame::default()
        });
        self.lower_statement(&f.body, false)?;
        let continue_offset = self.emitter().offset();
        for slot in self.scope().captured_in_current_scope() {
            self.emitter().emit_u16(Opcode::CloseLoc, slot.index());
        }
        let back = self.emitter().emit_jump(Opcode::Goto);
        self.emitter().patch_jump(back, loop_start);
        self.emitter().patch_jump_here(end_jump);
        self.emitter().emit(Opcode::Drop);

        let frame = self.loops().pop().unwrap();
        for p in frame.continue_patches {
            self.emitter().patch_jump(p, continue_offset);
        }
        for p in frame.break_patches {
            self.emitter().patch_jump_here(p);
        }
        self.emitter().emit(Opcode::ForInEnd);
        self.scope().exit();
        Ok(())
    }

    fn lower_for_of(&mut self, f: &oxc_ast::ast::ForOfStatement) -> CompileResult<()> {
        let labels = self.take_pending_label();
        self.lower_expression(&f.right)?;
        self.emitter()
            .emit(if f.r#await { Opcode::ForAwaitOfStart } else { Opcode::ForOfStart });
        self.scope().enter(false);
        let loop_start = self.emitter().offset();
        if f.r#await {
            self.emitter().emit(Opcode::ForAwaitOfNext);
            self.emitter().emit(Opcode::Await);
            self.emitter().emit(Opcode::Dup);
            let done_atom = self.emitter().intern_atom("done");
            self.emitter().emit_atom(Opcode::GetField, done_atom);
        } else {
            self.emitter().emit_u8(Opcode::ForOfNext, 0);
        }
        let end_jump = self.emitter().emit_jump(Opcode::IfTrue);
        if f.r#await {
            let value_atom = self.emitter().intern_atom("value");
            self.emitter().emit_atom(Opcode::GetField, value_atom);
        }
        self.assign_for_of_head(&f.left)?;

        self.loops().push(LoopFrame {
            continue_target: loop_start,
            labels,
            ..LoopFrame::default()
        });
        self.lower_statement(&f.body, false)?;
        let continue_offset = self.emitter().offset();
        for slot in self.scope().captured_in_current_scope() {
            self.emitter().emit_u16(Opcode::CloseLoc, slot.index());
        }
        let back = self.emitter().emit_jump(Opcode::Goto);
        self.emitter().patch_jump(back, loop_start);
        self.emitter().patch_jump_here(end_jump);
        self.emitter().emit(Opcode::Drop);

        let frame = self.loops().pop().unwrap();
        for p in frame.continue_patches {
            self.emitter().patch_jump(p, continue_offset);
        }
        self.emitter().emit(Opcode::IteratorClose);
        for p in frame.break_patches {
            self.emitter().patch_jump_here(p);
        }
        self.scope().exit();
        Ok(())
    }

    fn assign_for_in_head(&mut self, left: &ForStatementLeft) -> CompileResult<()> {
        match left {
            ForStatementLeft::VariableDeclaration(decl) => {
                let d = decl
                    .declarations
                    .first()
                    .ok_or_else(|| CompileError::internal("for-head declaration is empty"))?;
                self.declare_pattern(&d.id, decl.kind == VariableDeclarationKind::Const)
            }
            ForStatementLeft::AssignmentTarget(target) => {
                if matches!(target, AssignmentTarget::ComputedMemberExpression(_)) {
                    return Err(CompileError::unsupported(
                        "computed member expression as a for-in loop head",
                    ));
                }
                self.assign_to_target(target)
            }
        }
    }

    fn assign_for_of_head(&mut self, left: &ForStatementLeft) -> CompileResult<()> {
        match left {
            ForStatementLeft::VariableDeclaration(decl) => {
                let d = decl
                    .declarations
                    .first()
                    .ok_or_else(|| CompileError::internal("for-head declaration is empty"))?;
                self.declare_pattern(&d.id, decl.kind == VariableDeclarationKind::Const)
            }
            ForStatementLeft::AssignmentTarget(target) => match target {
                AssignmentTarget::AssignmentTargetIdentifier(_)
                | AssignmentTarget::StaticMemberExpression(_)
                | AssignmentTarget::ComputedMemberExpression(_)
                | AssignmentTarget::ArrayAssignmentTarget(_)
                | AssignmentTarget::ObjectAssignmentTarget(_) => self.assign_to_target(target),
                _ => {
                    // Legacy Annex B grammar lets a for-of head be any
                    // LeftHandSideExpression; anything that isn't a valid
                    // simple assignment target (e.g. a bare call) throws a
                    // ReferenceError at the point of assignment instead of
                    // failing to compile.
                    self.emitter().emit(Opcode::Drop);
                    self.emit_throw_error(
                        "invalid assignment target in for-of loop head",
                        RuntimeErrorKind::ReferenceError,
                    );
                    Ok(())
                }
            },
        }
    }

    /// Annex B.3.3: hoist sloppy-mode block-scoped `FunctionDeclaration`s
    /// whose names aren't shadowed by a lexical binding so a later plain
    /// `var`-style reference to the name can see the most recent block
    /// execution's function value. `already_hoisted` is the set of names
    /// already declared as ordinary top-level function declarations, which
    /// never need (or get) a second Annex B binding.
    pub(crate) fn hoist_annex_b(
        &mut self,
        body: &[oxc_ast::ast::Statement],
        already_hoisted: &std::collections::HashSet<&str>,
    ) -> CompileResult<()> {
        if self.is_strict() {
            return Ok(());
        }
        let candidates = collect_annex_b_candidates(body);
        let in_global = self.ctx().in_global_scope && self.scope().current_is_function_scope();
        for name in candidates {
            if already_hoisted.contains(name.as_str()) {
                continue;
            }
            if in_global {
                self.non_deletable_globals.insert(name.clone());
                let value_atom = self.emitter().intern_atom(&name);
                let global_this_atom = self.emitter().intern_atom("globalThis");
                self.emitter().emit_atom(Opcode::PushAtomValue, value_atom);
                self.emitter().emit_atom(Opcode::GetVar, global_this_atom);
                self.emitter().emit(Opcode::In);
                let skip = self.emitter().emit_jump(Opcode::IfTrue);
                self.emitter().emit(Opcode::Undefined);
                self.emitter().emit_atom(Opcode::PutVar, value_atom);
                self.emitter().patch_jump_here(skip);
                self.annex_b_var_slots
                    .last_mut()
                    .expect("annex-b scope stack empty")
                    .insert(name, AnnexBTarget::Global);
            } else if self.scope().resolve_local(&name) == crate::scope::LocalResolution::Unresolved
            {
                if let Some(slot) = self.scope().declare(&name, false) {
                    self.emitter().declare_local_name(&name);
                    self.annex_b_var_slots
                        .last_mut()
                        .expect("annex-b scope stack empty")
                        .insert(name, AnnexBTarget::Local(slot));
                }
            }
        }
        Ok(())
    }

    /// Store the just-closed function value into its Annex B `var` binding,
    /// in addition to its normal block-scoped binding. The caller must have
    /// already duplicated the value on the stack when `annex_b_target`
    /// returns `Some` for this name; this consumes that duplicate. No-op
    /// (and leaves the stack untouched) for names that didn't scan as
    /// Annex B candidates.
    pub(crate) fn store_annex_b_target(&mut self, name: &str) -> CompileResult<()> {
        match self.annex_b_target(name) {
            Some(AnnexBTarget::Global) => {
                let atom = self.emitter().intern_atom(name);
                self.emitter().emit_atom(Opcode::PutVar, atom);
                Ok(())
            }
            Some(AnnexBTarget::Local(idx)) => {
                self.emitter().emit_u16(Opcode::PutLocal, idx.index());
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn lower_try(&mut self, t: &oxc_ast::ast::TryStatement, is_last: bool) -> CompileResult<()> {
        let has_handler = t.handler.is_some();
        let catch_placeholder = if has_handler {
            Some(self.emitter().emit_jump(Opcode::Catch))
        } else {
            None
        };

        self.scope().enter(false);
        self.lower_block_statements(&t.block.body, is_last)?;
        self.scope().exit();

        if has_handler {
            self.emitter().emit(Opcode::NipCatch);
        }
        let skip_catch = if has_handler {
            Some(self.emitter().emit_jump(Opcode::Goto))
        } else {
            None
        };

        if let (Some(placeholder), Some(handler)) = (catch_placeholder, &t.handler) {
            self.emitter().patch_jump_here(placeholder);
            self.scope().enter(false);
            if let Some(param) = &handler.param {
                match &param.pattern {
                    oxc_ast::ast::BindingPattern::BindingIdentifier(id) => {
                        let slot = self
                            .scope()
                            .declare(&id.name, false)
                            .ok_or_else(|| CompileError::internal("catch param redeclared"))?;
                        self.emitter().declare_local_name(&id.name);
                        self.scope().mark_simple_catch_param(&id.name);
                        self.emitter().emit_u16(Opcode::PutLocal, slot.index());
                    }
                    _ => self.declare_pattern(&param.pattern, false)?,
                }
            } else {
                self.emitter().emit(Opcode::Drop);
            }
            self.lower_block_statements(&handler.body.body, is_last)?;
            self.scope().exit();
        }

        if let Some(skip) = skip_catch {
            self.emitter().patch_jump_here(skip);
        }

        if let Some(finalizer) = &t.finalizer {
            self.scope().enter(false);
            self.lower_block_statements(&finalizer.body, false)?;
            self.scope().exit();
        }
        Ok(())
    }

    fn lower_block_statements(&mut self, body: &[Statement], is_last: bool) -> CompileResult<()> {
        let mut last_value_index = None;
        for (i, stmt) in body.iter().enumerate() {
            if !matches!(stmt, Statement::FunctionDeclaration(_)) {
                last_value_index = Some(i);
            }
        }
        let mut produced = false;
        for (i, stmt) in body.iter().enumerate() {
            let stmt_is_last = is_last && Some(i) == last_value_index;
            self.lower_statement(stmt, stmt_is_last)?;
            if stmt_is_last {
                produced = true;
            }
        }
        if is_last && !produced {
            self.emitter().emit(Opcode::Undefined);
        }
        Ok(())
    }

    fn lower_switch(&mut self, s: &oxc_ast::ast::SwitchStatement) -> CompileResult<()> {
        self.lower_expression(&s.discriminant)?;
        self.scope().enter(false);
        self.loops().push(LoopFrame {
            is_switch: true,
            ..LoopFrame::default()
        });

        let mut test_jumps = Vec::new();
        let mut default_index = None;
        for (i, case) in s.cases.iter().enumerate() {
            match &case.test {
                Some(test) => {
                    self.emitter().emit(Opcode::Dup);
                    self.lower_expression(test)?;
                    self.emitter().emit(Opcode::StrictEq);
                    let next_test = self.emitter().emit_jump(Opcode::IfFalse);
                    self.emitter().emit(Opcode::Drop);
                    let goto_body = self.emitter().emit_jump(Opcode::Goto);
                    self.emitter().patch_jump_here(next_test);
                    test_jumps.push((i, goto_body));
                }
                None => default_index = Some(i),
            }
        }
        self.emitter().emit(Opcode::Drop);
        let end_or_default_jump = self.emitter().emit_jump(Opcode::Goto);

        let mut case_offsets = Vec::with_capacity(s.cases.len());
        for case in &s.cases {
            case_offsets.push(self.emitter().offset());
            self.lower_block_statements(&case.consequent, false)?;
        }
        let end_offset = self.emitter().offset();

        for (i, jump) in test_jumps {
            self.emitter().patch_jump(jump, case_offsets[i]);
        }
        match default_index {
            Some(i) => self.emitter().patch_jump(end_or_default_jump, case_offsets[i]),
            None => self.emitter().patch_jump(end_or_default_jump, end_offset),
        }

        let frame = self.loops().pop().unwrap();
        for p in frame.break_patches {
            self.emitter().patch_jump_here(p);
        }
        self.scope().exit();
        Ok(())
    }

    fn lower_break(&mut self, label: Option<&str>, span: Span) -> CompileResult<()> {
        let jump = self.emitter().emit_jump(Opcode::Goto);
        let frames = self.loops();
        let idx = match label {
            Some(l) => frames.iter().rposition(|f| f.labels.iter().any(|n| n == l)),
            None => frames.iter().rposition(|_| true),
        };
        match idx {
            Some(idx) => {
                self.loops()[idx].break_patches.push(jump);
                Ok(())
            }
            None => {
                let (line, column) = self.locate(span.start);
                Err(CompileError::syntax("break outside a loop or switch", line, column))
            }
        }
    }

    fn lower_continue(&mut self, label: Option<&str>, span: Span) -> CompileResult<()> {
        let jump = self.emitter().emit_jump(Opcode::Goto);
        let frames = self.loops();
        let idx = match label {
            Some(l) => frames
                .iter()
                .rposition(|f| !f.is_switch && f.labels.iter().any(|n| n == l)),
            None => frames.iter().rposition(|f| !f.is_switch),
        };
        match idx {
            Some(idx) => {
                self.loops()[idx].continue_patches.push(jump);
                Ok(())
            }
            None => {
                let (line, column) = self.locate(span.start);
                Err(CompileError::syntax("continue outside a loop", line, column))
            }
        }
    }

    fn lower_labeled(&mut self, l: &oxc_ast::ast::LabeledStatement) -> CompileResult<()> {
        let label = l.label.name.to_string();
        match &*l.body {
            Statement::WhileStatement(_)
            | Statement::DoWhileStatement(_)
            | Statement::ForStatement(_)
            | Statement::ForInStatement(_)
            | Statement::ForOfStatement(_) => {
                self.pending_label = Some(label);
                self.lower_statement(&l.body, false)
            }
            _ => {
                self.loops().push(LoopFrame {
                    labels: vec![label],
                    is_switch: true,
                    ..LoopFrame::default()
                });
                self.lower_statement(&l.body, false)?;
                let frame = self.loops().pop().unwrap();
                for p in frame.break_patches {
                    self.emitter().patch_jump_here(p);
                }
                Ok(())
            }
        }
    }

    fn finish_loop_frame(&mut self) {
        let frame = self.loops().pop().unwrap();
        for p in frame.continue_patches {
            self.emitter().patch_jump(p, frame.continue_target);
        }
        for p in frame.break_patches {
            self.emitter().patch_jump_here(p);
        }
    }
}

fn program_is_strict(program: &Program) -> bool {
    program
        .directives
        .iter()
        .any(|d| d.directive.as_str() == "use strict")
}
