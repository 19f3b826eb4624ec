//! Function and class lowering.
//!
//! Functions nest: a parameter default, a method body, a static block all
//! compile as a child unit through [`Compiler::enter_function`]/
//! `exit_function`, attached to the parent's constant pool via `FCLOSURE`.
//! Classes lower to a five-segment sequence executed at class-definition
//! time (constructor build, `DEFINE_CLASS`, method installation, computed
//! field key caching, static initializers) described inline below.

use oxc_ast::ast::{
    Argument, Class, ClassElement, Expression, FormalParameters, Function, FunctionBody,
    MethodDefinitionKind, PropertyKey, TemplateLiteral,
};

use jsqc_bytecode::{Constant, Opcode};

use crate::compiler::{Compiler, FunctionContext};
use crate::error::{CompileError, CompileResult};
use crate::literal_validator::validate_untagged_template_cooked;

impl Compiler {
    pub(crate) fn lower_function_declaration(&mut self, f: &Function) -> CompileResult<()> {
        let name = f.id.as_ref().map(|id| id.name.to_string());
        if let Some(id) = &f.id {
            self.declare_function_binding(&id.name, id.span.start)?;
        }
        let unit = self.build_function_unit(
            &f.params,
            f.body.as_ref().expect("function declaration has a body"),
            FunctionContext {
                is_async: f.r#async,
                is_generator: f.generator,
                is_arrow: false,
                is_constructor: false,
                in_global_scope: false,
                has_enclosing_arguments: false,
                param_count: f.params.items.len() as u8,
                name: name.clone(),
            },
            name.clone(),
        )?;
        let self_capture = name.as_deref().and_then(|n| self.self_capture_slot(Some(n)));
        let idx = self.emitter().add_function_constant(unit);
        self.emitter().emit_const(Opcode::FClosure, idx);
        let _ = self_capture;
        if let Some(name) = &name {
            if self.annex_b_target(name).is_some() {
                self.emitter().emit(Opcode::Dup);
            }
            self.store_hoisted_binding(name)?;
            self.store_annex_b_target(name)?;
        }
        Ok(())
    }

    pub(crate) fn lower_function_expression(&mut self, f: &Function) -> CompileResult<()> {
        let name = f.id.as_ref().map(|id| id.name.to_string());
        let unit = self.build_function_unit(
            &f.params,
            f.body.as_ref().expect("function expression has a body"),
            FunctionContext {
                is_async: f.r#async,
                is_generator: f.generator,
                is_arrow: false,
                is_constructor: false,
                in_global_scope: false,
                has_enclosing_arguments: false,
                param_count: f.params.items.len() as u8,
                name: name.clone(),
            },
            name,
        )?;
        let idx = self.emitter().add_function_constant(unit);
        self.emitter().emit_const(Opcode::FClosure, idx);
        Ok(())
    }

    pub(crate) fn lower_arrow_function(
        &mut self,
        f: &oxc_ast::ast::ArrowFunctionExpression,
    ) -> CompileResult<()> {
        let unit = self.build_function_unit(
            &f.params,
            &f.body,
            FunctionContext {
                is_async: f.r#async,
                is_generator: false,
                is_arrow: true,
                is_constructor: false,
                in_global_scope: false,
                has_enclosing_arguments: self.ctx().has_enclosing_arguments
                    || !self.ctx().is_arrow,
                param_count: f.params.items.len() as u8,
                name: None,
            },
            None,
        )?;
        let idx = self.emitter().add_function_constant(unit);
        self.emitter().emit_const(Opcode::FClosure, idx);
        Ok(())
    }

    /// Declare a function declaration's own name ahead of lowering its body,
    /// so the body can capture it recursively.
    fn declare_function_binding(&mut self, name: &str, offset: u32) -> CompileResult<()> {
        if self.ctx().in_global_scope && self.scope().current_is_function_scope() {
            self.non_deletable_globals.insert(name.to_string());
            Ok(())
        } else {
            let (line, column) = self.locate(offset);
            self.scope().declare(name, false).ok_or_else(|| {
                CompileError::early_error(format!("redeclaration of '{name}'"), line, column)
            })?;
            self.emitter().declare_local_name(name);
            Ok(())
        }
    }

    /// Pre-declare a class declaration's own name ahead of evaluating its
    /// superclass expression, putting the binding in the temporal dead zone
    /// until the class value is fully built. Unlike a function declaration's
    /// binding, a class binding is not usable before its definition runs.
    fn declare_class_binding(&mut self, name: &str, offset: u32) -> CompileResult<()> {
        if self.ctx().in_global_scope && self.scope().current_is_function_scope() {
            self.non_deletable_globals.insert(name.to_string());
        } else {
            let (line, column) = self.locate(offset);
            let slot = self.scope().declare(name, false).ok_or_else(|| {
                CompileError::early_error(format!("redeclaration of '{name}'"), line, column)
            })?;
            self.emitter().declare_local_name(name);
            self.emitter().emit_u16(Opcode::SetLocUninitialized, slot.index());
            self.scope().mark_uninitialized(name);
        }
        Ok(())
    }

    fn store_hoisted_binding(&mut self, name: &str) -> CompileResult<()> {
        if self.ctx().in_global_scope && self.scope().current_is_function_scope() {
            let atom = self.emitter().intern_atom(name);
            self.emitter().emit_atom(Opcode::PutVar, atom);
        } else if let crate::scope::LocalResolution::Local(idx) = self.scope().resolve_local(name) {
            self.emitter().emit_u16(Opcode::PutLocal, idx.index());
        } else {
            return Err(CompileError::internal("hoisted function binding vanished"));
        }
        Ok(())
    }

    /// Build a nested function unit for a parameter list and body, leaving
    /// the parent's emitter untouched until the child is fully lowered.
    fn build_function_unit(
        &mut self,
        params: &FormalParameters,
        body: &FunctionBody,
        ctx: FunctionContext,
        name: Option<String>,
    ) -> CompileResult<jsqc_bytecode::BytecodeUnit> {
        let strict = self.is_strict() || body_is_strict(body);
        self.enter_function(ctx, strict);
        self.scope().enter(true);

        let mut defined_arg_count: u8 = 0;
        let mut seen_default_or_rest = false;
        for (i, param) in params.items.iter().enumerate() {
            self.emitter().emit_u16(Opcode::GetArg, i as u16);
            if matches!(
                param.pattern,
                oxc_ast::ast::BindingPattern::AssignmentPattern(_)
            ) {
                seen_default_or_rest = true;
            }
            self.declare_pattern(&param.pattern, false)?;
            if !seen_default_or_rest {
                defined_arg_count = defined_arg_count.saturating_add(1);
            }
        }
        if let Some(rest) = &params.rest {
            self.emitter().emit_u16(Opcode::Rest, params.items.len() as u16);
            self.declare_pattern(&rest.rest.argument, false)?;
        }

        if self.ctx().is_generator {
            self.emitter().emit(Opcode::InitialYield);
        }

        let mut var_names = Vec::new();
        crate::analysis::collect_var_names(&body.statements, &mut var_names);
        for name in &var_names {
            if self.scope().resolve_local(name) == crate::scope::LocalResolution::Unresolved {
                let slot = self.scope().declare(name, false);
                if let Some(slot) = slot {
                    self.emitter().declare_local_name(name);
                    let _ = slot;
                }
            }
        }

        let top_level_functions: std::collections::HashSet<&str> = body
            .statements
            .iter()
            .filter_map(|stmt| match stmt {
                oxc_ast::ast::Statement::FunctionDeclaration(f) => {
                    f.id.as_ref().map(|id| id.name.as_str())
                }
                _ => None,
            })
            .collect();
        self.hoist_annex_b(&body.statements, &top_level_functions)?;

        for stmt in &body.statements {
            if let oxc_ast::ast::Statement::FunctionDeclaration(f) = stmt {
                self.lower_function_declaration(f)?;
            }
        }

        let mut last_value_index = None;
        for (i, stmt) in body.statements.iter().enumerate() {
            if !matches!(stmt, oxc_ast::ast::Statement::FunctionDeclaration(_)) {
                last_value_index = Some(i);
            }
        }
        let _ = last_value_index;

        let mut has_return = false;
        for stmt in &body.statements {
            if matches!(stmt, oxc_ast::ast::Statement::FunctionDeclaration(_)) {
                continue;
            }
            if matches!(stmt, oxc_ast::ast::Statement::ReturnStatement(_)) {
                has_return = true;
            }
            self.lower_statement(stmt, false)?;
        }
        if !has_return {
            self.emitter().emit(Opcode::Undefined);
            self.emitter()
                .emit(if self.ctx().is_async { Opcode::ReturnAsync } else { Opcode::Return });
        }

        let max_locals = self.scope().local_count();
        self.scope().exit();
        let (emitter, captures, ctx) = self.exit_function();
        let self_capture_slot = name
            .as_deref()
            .and_then(|n| self.self_capture_slot(Some(n)));

        let flags = jsqc_bytecode::UnitFlags {
            is_async: ctx.is_async,
            is_generator: ctx.is_generator,
            is_arrow: ctx.is_arrow,
            is_strict: strict,
            is_constructor: ctx.is_constructor && !ctx.is_arrow,
            is_method: false,
            has_rest_param: params.rest.is_some(),
            uses_arguments: !ctx.is_arrow,
            is_module: false,
        };
        Ok(self.finish_unit(
            emitter,
            name,
            max_locals,
            defined_arg_count,
            captures,
            self_capture_slot,
            flags,
            (0, 0),
        ))
    }

    pub(crate) fn lower_call(&mut self, call: &oxc_ast::ast::CallExpression) -> CompileResult<()> {
        let has_spread = call.arguments.iter().any(|a| matches!(a, Argument::SpreadElement(_)));

        match &call.callee {
            Expression::StaticMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.emitter().emit(Opcode::Dup);
                let atom = self.emitter().intern_atom(&m.property.name);
                self.emitter().emit_atom(Opcode::GetField, atom);
                self.emitter().emit(Opcode::Swap);
                self.finish_call(&call.arguments, has_spread)
            }
            Expression::ComputedMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.emitter().emit(Opcode::Dup);
                self.lower_expression(&m.expression)?;
                self.emitter().emit(Opcode::GetArrayEl);
                self.emitter().emit(Opcode::Swap);
                self.finish_call(&call.arguments, has_spread)
            }
            Expression::Super(_) => {
                self.emitter().emit_u8(Opcode::SpecialObject, 3);
                self.emitter().emit_u8(Opcode::SpecialObject, 2);
                self.emitter().emit(Opcode::GetSuper);
                self.lower_arguments(&call.arguments)?;
                self.emitter().emit_u16(Opcode::Apply, 1);
                self.emitter().emit(Opcode::InitCtor);
                Ok(())
            }
            callee => {
                self.lower_expression(callee)?;
                self.emitter().emit(Opcode::Undefined);
                self.emitter().emit(Opcode::Swap);
                self.finish_call(&call.arguments, has_spread)
            }
        }
    }

    fn finish_call(&mut self, args: &[Argument], has_spread: bool) -> CompileResult<()> {
        if has_spread {
            self.lower_arguments(args)?;
            self.emitter().emit_u16(Opcode::Apply, 0);
        } else {
            for arg in args {
                self.lower_expression(arg.to_expression())?;
            }
            self.emitter().emit_u16(Opcode::Call, args.len() as u16);
        }
        Ok(())
    }

    pub(crate) fn lower_new(&mut self, new_expr: &oxc_ast::ast::NewExpression) -> CompileResult<()> {
        let has_spread = new_expr
            .arguments
            .iter()
            .any(|a| matches!(a, Argument::SpreadElement(_)));
        self.lower_expression(&new_expr.callee)?;
        if has_spread {
            self.emitter().emit(Opcode::Dup);
            self.lower_arguments(&new_expr.arguments)?;
            self.emitter().emit_u16(Opcode::Apply, 1);
        } else {
            for arg in &new_expr.arguments {
                self.lower_expression(arg.to_expression())?;
            }
            self.emitter()
                .emit_u16(Opcode::CallConstructor, new_expr.arguments.len() as u16);
        }
        Ok(())
    }

    /// The spread-argument builder shared by calls, `new`, and array
    /// literals with a spread element: an index-tracking `ARRAY_NEW` build
    /// once any spread is present, a plain `PUSH_ARRAY` append chain
    /// otherwise.
    fn lower_arguments(&mut self, args: &[Argument]) -> CompileResult<()> {
        self.emitter().emit(Opcode::ArrayNew);
        let mut index_tracking = false;
        for arg in args {
            match arg {
                Argument::SpreadElement(s) => {
                    if !index_tracking {
                        let len = args
                            .iter()
                            .take_while(|a| !matches!(a, Argument::SpreadElement(_)))
                            .count();
                        self.emitter().emit_i32(Opcode::PushI32, len as i32);
                        index_tracking = true;
                    }
                    self.lower_expression(&s.argument)?;
                    self.emitter().emit(Opcode::Append);
                }
                other => {
                    self.lower_expression(other.to_expression())?;
                    if index_tracking {
                        self.emitter().emit(Opcode::DefineArrayEl);
                        self.emitter().emit(Opcode::Inc);
                    } else {
                        self.emitter().emit(Opcode::PushArray);
                    }
                }
            }
        }
        if index_tracking {
            self.emitter().emit(Opcode::Drop);
        }
        Ok(())
    }

    pub(crate) fn lower_template_literal(&mut self, tpl: &TemplateLiteral) -> CompileResult<()> {
        let all_cooked: Vec<Option<String>> = tpl
            .quasis
            .iter()
            .map(|q| q.value.cooked.as_ref().map(|c| c.to_string()))
            .collect();
        validate_untagged_template_cooked(&all_cooked, self.source_location(tpl.span.start))?;

        let mut quasis = tpl.quasis.iter();
        let first = quasis
            .next()
            .ok_or_else(|| CompileError::internal("template literal has no quasis"))?;
        let cooked = first
            .value
            .cooked
            .as_ref()
            .expect("validated above: every quasi has a cooked value");
        let idx = self
            .emitter()
            .add_constant(Constant::string_from_str(cooked));
        self.emitter().emit_const(Opcode::PushConst, idx);

        for (expr, quasi) in tpl.expressions.iter().zip(quasis) {
            self.lower_expression(expr)?;
            self.emitter().emit(Opcode::Add);
            if !quasi.value.raw.is_empty() {
                let cooked = quasi
                    .value
                    .cooked
                    .as_ref()
                    .expect("validated above: every quasi has a cooked value");
                let idx = self
                    .emitter()
                    .add_constant(Constant::string_from_str(cooked));
                self.emitter().emit_const(Opcode::PushConst, idx);
                self.emitter().emit(Opcode::Add);
            }
        }
        Ok(())
    }

    pub(crate) fn lower_tagged_template(
        &mut self,
        tagged: &oxc_ast::ast::TaggedTemplateExpression,
    ) -> CompileResult<()> {
        let cooked: Vec<Option<Vec<u16>>> = tagged
            .quasi
            .quasis
            .iter()
            .map(|q| q.value.cooked.as_ref().map(|s| s.encode_utf16().collect()))
            .collect();
        let raw: Vec<Vec<u16>> = tagged
            .quasi
            .quasis
            .iter()
            .map(|q| q.value.raw.encode_utf16().collect())
            .collect();
        let site_id = self.new_template_site_id();
        let idx = self
            .emitter()
            .add_constant(Constant::template_literal(site_id, cooked, raw));

        match &tagged.tag {
            Expression::StaticMemberExpression(m) => {
                self.lower_expression(&m.object)?;
                self.emitter().emit(Opcode::Dup);
                let atom = self.emitter().intern_atom(&m.property.name);
                self.emitter().emit_atom(Opcode::GetField, atom);
                self.emitter().emit(Opcode::Swap);
            }
            other => {
                self.lower_expression(other)?;
                self.emitter().emit(Opcode::Undefined);
                self.emitter().emit(Opcode::Swap);
            }
        }
        self.emitter().emit_const(Opcode::PushConst, idx);
        for expr in &tagged.quasi.expressions {
            self.lower_expression(expr)?;
        }
        self.emitter()
            .emit_u16(Opcode::Call, 1 + tagged.quasi.expressions.len() as u16);
        Ok(())
    }

    fn new_template_site_id(&mut self) -> u32 {
        let id = self.template_site_counter;
        self.template_site_counter += 1;
        id
    }

    pub(crate) fn lower_class(&mut self, class: &Class, is_declaration: bool) -> CompileResult<()> {
        let name = class.id.as_ref().map(|id| id.name.to_string());
        if is_declaration {
            if let Some(id) = &class.id {
                self.declare_class_binding(&id.name, id.span.start)?;
            }
        }
        self.push_private_symbol_scope();

        match &class.super_class {
            Some(expr) => self.lower_expression(expr)?,
            None => self.emitter().emit(Opcode::Undefined),
        }

        let mut ctor = None;
        let mut instance_methods = Vec::new();
        let mut private_instance_methods = Vec::new();
        let mut private_static_methods = Vec::new();
        let mut static_methods = Vec::new();
        let mut instance_fields = Vec::new();
        let mut static_initializers = Vec::new();

        for el in &class.body.body {
            match el {
                ClassElement::MethodDefinition(m) => {
                    if m.kind == MethodDefinitionKind::Constructor {
                        ctor = Some(m);
                    } else if is_private_key(&m.key) {
                        if m.r#static {
                            private_static_methods.push(m);
                        } else {
                            private_instance_methods.push(m);
                        }
                    } else if m.r#static {
                        static_methods.push(m);
                    } else {
                        instance_methods.push(m);
                    }
                }
                ClassElement::PropertyDefinition(p) => {
                    if p.r#static {
                        static_initializers.push(StaticInit::Field(p));
                    } else {
                        instance_fields.push(p);
                    }
                }
                ClassElement::StaticBlock(b) => {
                    static_initializers.push(StaticInit::Block(b));
                }
                ClassElement::AccessorProperty(_) | ClassElement::TSIndexSignature(_) => {}
            }
        }

        let ctor_ctx = FunctionContext {
            is_async: false,
            is_generator: false,
            is_arrow: false,
            is_constructor: true,
            in_global_scope: false,
            has_enclosing_arguments: false,
            param_count: ctor.map(|c| c.value.params.items.len()).unwrap_or(0) as u8,
            name: name.clone(),
        };
        let has_super = class.super_class.is_some();
        let ctor_unit = match ctor {
            Some(m) => self.build_constructor_unit(
                &m.value.params,
                m.value.body.as_ref().expect("constructor has a body"),
                ctor_ctx,
                has_super,
                &private_instance_methods,
                &instance_fields,
            )?,
            None => self.build_default_constructor_unit(
                ctor_ctx,
                has_super,
                &private_instance_methods,
                &instance_fields,
            )?,
        };

        let ctor_idx = self.emitter().add_function_constant(ctor_unit);
        self.emitter().emit_const(Opcode::PushConst, ctor_idx);
        let class_name_atom = self.emitter().intern_atom(name.as_deref().unwrap_or(""));
        self.emitter().emit_atom(Opcode::DefineClass, class_name_atom);
        self.emitter().emit(Opcode::Swap);

        for m in &instance_methods {
            self.emit_class_method(m)?;
        }
        self.emitter().emit(Opcode::Swap);
        for m in &static_methods {
            self.emit_class_method(m)?;
        }
        for m in &private_static_methods {
            self.emit_private_static_method(m)?;
        }
        self.emitter().emit(Opcode::Swap);

        for init in &static_initializers {
            self.emitter().emit(Opcode::Dup);
            let unit = self.build_static_initializer_unit(init)?;
            let idx = self.emitter().add_function_constant(unit);
            self.emitter().emit_const(Opcode::PushConst, idx);
            self.emitter().emit(Opcode::Swap);
            self.emitter().emit_u16(Opcode::Call, 0);
            self.emitter().emit(Opcode::Drop);
        }

        self.emitter().emit(Opcode::Nip);
        self.pop_private_symbol_scope();

        if is_declaration {
            if let Some(name) = &name {
                self.scope().mark_initialized(name);
                self.store_hoisted_binding(name)?;
            }
            Ok(())
        } else {
            Ok(())
        }
    }

    fn emit_class_method(&mut self, m: &oxc_ast::ast::MethodDefinition) -> CompileResult<()> {
        let unit = self.build_function_unit(
            &m.value.params,
            m.value.body.as_ref().expect("method has a body"),
            FunctionContext {
                is_async: m.value.r#async,
                is_generator: m.value.generator,
                is_arrow: false,
                is_constructor: false,
                in_global_scope: false,
                has_enclosing_arguments: false,
                param_count: m.value.params.items.len() as u8,
                name: None,
            },
            None,
        )?;
        let idx = self.emitter().add_function_constant(unit);
        match m.kind {
            MethodDefinitionKind::Get | MethodDefinitionKind::Set => {
                let key_idx = self.method_key_constant(&m.key)?;
                self.emitter().emit_const(Opcode::PushConst, key_idx);
                self.emitter().emit_const(Opcode::PushConst, idx);
                let kind = if m.kind == MethodDefinitionKind::Get { 1 } else { 2 };
                self.emitter().emit_u8(Opcode::DefineMethodComputed, kind);
            }
            _ => {
                self.emitter().emit_const(Opcode::PushConst, idx);
                match &m.key {
                    PropertyKey::StaticIdentifier(ident) => {
                        let atom = self.emitter().intern_atom(&ident.name);
                        self.emitter().emit_atom(Opcode::DefineMethod, atom);
                    }
                    _ => {
                        return Err(CompileError::unsupported(
                            "computed non-private method names",
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    fn emit_private_static_method(&mut self, m: &oxc_ast::ast::MethodDefinition) -> CompileResult<()> {
        let name = private_key_name(&m.key)?;
        let symbol = self.private_symbol_id(name);
        let unit = self.build_function_unit(
            &m.value.params,
            m.value.body.as_ref().expect("method has a body"),
            FunctionContext {
                is_async: m.value.r#async,
                is_generator: m.value.generator,
                is_arrow: false,
                is_constructor: false,
                in_global_scope: false,
                has_enclosing_arguments: false,
                param_count: m.value.params.items.len() as u8,
                name: None,
            },
            None,
        )?;
        let method_idx = self.emitter().add_function_constant(unit);
        let symbol_idx = self.emitter().add_constant(Constant::Symbol(symbol));
        self.emitter().emit(Opcode::Swap);
        self.emitter().emit(Opcode::Dup);
        self.emitter().emit_const(Opcode::PushConst, method_idx);
        self.emitter().emit_const(Opcode::PushConst, symbol_idx);
        self.emitter().emit(Opcode::Swap);
        self.emitter().emit(Opcode::DefinePrivateField);
        self.emitter().emit(Opcode::Drop);
        self.emitter().emit(Opcode::Swap);
        Ok(())
    }

    fn method_key_constant(&mut self, key: &PropertyKey) -> CompileResult<jsqc_bytecode::ConstantIndex> {
        match key {
            PropertyKey::StaticIdentifier(ident) => {
                Ok(self.emitter().add_constant(Constant::string_from_str(&ident.name)))
            }
            PropertyKey::StringLiteral(s) => {
                Ok(self.emitter().add_constant(Constant::string_from_str(&s.value)))
            }
            _ => Err(CompileError::unsupported("computed accessor method name")),
        }
    }

    fn build_constructor_unit(
        &mut self,
        params: &FormalParameters,
        body: &FunctionBody,
        ctx: FunctionContext,
        has_super: bool,
        private_methods: &[&oxc_ast::ast::MethodDefinition],
        fields: &[&oxc_ast::ast::PropertyDefinition],
    ) -> CompileResult<jsqc_bytecode::BytecodeUnit> {
        let strict = true;
        self.enter_function(ctx, strict);
        self.scope().enter(true);
        for (i, param) in params.items.iter().enumerate() {
            self.emitter().emit_u16(Opcode::GetArg, i as u16);
            self.declare_pattern(&param.pattern, false)?;
        }
        self.emit_field_initializers(has_super, private_methods, fields)?;
        for stmt in &body.statements {
            self.lower_statement(stmt, false)?;
        }
        self.emitter().emit(Opcode::PushThis);
        self.emitter().emit(Opcode::Return);
        let max_locals = self.scope().local_count();
        self.scope().exit();
        let (emitter, captures, ctx) = self.exit_function();
        let flags = jsqc_bytecode::UnitFlags {
            is_constructor: true,
            is_strict: true,
            is_method: true,
            uses_arguments: true,
            ..Default::default()
        };
        let _ = ctx;
        Ok(self.finish_unit(emitter, None, max_locals, params.items.len() as u8, captures, None, flags, (0, 0)))
    }

    fn build_default_constructor_unit(
        &mut self,
        ctx: FunctionContext,
        has_super: bool,
        private_methods: &[&oxc_ast::ast::MethodDefinition],
        fields: &[&oxc_ast::ast::PropertyDefinition],
    ) -> CompileResult<jsqc_bytecode::BytecodeUnit> {
        self.enter_function(ctx, true);
        self.scope().enter(true);
        if has_super {
            self.emitter().emit_u8(Opcode::SpecialObject, 3);
            self.emitter().emit(Opcode::Rest);
            self.emitter().emit(Opcode::InitCtor);
            self.emitter().emit(Opcode::Drop);
        }
        self.emit_field_initializers(has_super, private_methods, fields)?;
        self.emitter().emit(Opcode::PushThis);
        self.emitter().emit(Opcode::Return);
        let max_locals = self.scope().local_count();
        self.scope().exit();
        let (emitter, captures, _ctx) = self.exit_function();
        let flags = jsqc_bytecode::UnitFlags {
            is_constructor: true,
            is_strict: true,
            is_method: true,
            ..Default::default()
        };
        Ok(self.finish_unit(emitter, None, max_locals, 0, captures, None, flags, (0, 0)))
    }

    fn emit_field_initializers(
        &mut self,
        _has_super: bool,
        private_methods: &[&oxc_ast::ast::MethodDefinition],
        fields: &[&oxc_ast::ast::PropertyDefinition],
    ) -> CompileResult<()> {
        for m in private_methods {
            let name = private_key_name(&m.key)?;
            let symbol = self.private_symbol_id(name);
            let unit = self.build_function_unit(
                &m.value.params,
                m.value.body.as_ref().expect("method has a body"),
                FunctionContext {
                    is_async: m.value.r#async,
                    is_generator: m.value.generator,
                    is_arrow: false,
                    is_constructor: false,
                    in_global_scope: false,
                    has_enclosing_arguments: false,
                    param_count: m.value.params.items.len() as u8,
                    name: None,
                },
                None,
            )?;
            let method_idx = self.emitter().add_function_constant(unit);
            let symbol_idx = self.emitter().add_constant(Constant::Symbol(symbol));
            self.emitter().emit(Opcode::PushThis);
            self.emitter().emit_const(Opcode::PushConst, method_idx);
            self.emitter().emit_const(Opcode::PushConst, symbol_idx);
            self.emitter().emit(Opcode::Swap);
            self.emitter().emit(Opcode::DefinePrivateField);
            self.emitter().emit(Opcode::Drop);
        }

        for field in fields {
            self.emitter().emit(Opcode::PushThis);
            let is_private = is_private_key(&field.key);
            if is_private {
                let name = private_key_name(&field.key)?;
                let symbol = self.private_symbol_id(name);
                match &field.value {
                    Some(v) => self.lower_expression(v)?,
                    None => self.emitter().emit(Opcode::Undefined),
                }
                let symbol_idx = self.emitter().add_constant(Constant::Symbol(symbol));
                self.emitter().emit_const(Opcode::PushConst, symbol_idx);
                self.emitter().emit(Opcode::Swap);
                self.emitter().emit(Opcode::DefinePrivateField);
            } else {
                match &field.key {
                    PropertyKey::StaticIdentifier(ident) => {
                        let idx = self
                            .emitter()
                            .add_constant(Constant::string_from_str(&ident.name));
                        self.emitter().emit_const(Opcode::PushConst, idx);
                    }
                    _ => {
                        return Err(CompileError::unsupported(
                            "computed public field keys are not yet cached via the class symbol table",
                        ))
                    }
                }
                match &field.value {
                    Some(v) => self.lower_expression(v)?,
                    None => self.emitter().emit(Opcode::Undefined),
                }
                self.emitter().emit(Opcode::DefineProp);
            }
            self.emitter().emit(Opcode::Drop);
        }
        Ok(())
    }

    fn build_static_initializer_unit(&mut self, init: &StaticInit) -> CompileResult<jsqc_bytecode::BytecodeUnit> {
        self.enter_function(
            FunctionContext {
                is_async: false,
                is_generator: false,
                is_arrow: false,
                is_constructor: false,
                in_global_scope: false,
                has_enclosing_arguments: false,
                param_count: 0,
                name: None,
            },
            true,
        );
        self.scope().enter(true);
        match init {
            StaticInit::Field(p) => {
                self.emitter().emit(Opcode::PushThis);
                match &p.value {
                    Some(v) => self.lower_expression(v)?,
                    None => self.emitter().emit(Opcode::Undefined),
                }
                match &p.key {
                    PropertyKey::StaticIdentifier(ident) => {
                        let idx = self
                            .emitter()
                            .add_constant(Constant::string_from_str(&ident.name));
                        self.emitter().emit_const(Opcode::PushConst, idx);
                        self.emitter().emit(Opcode::Swap);
                    }
                    _ => {
                        return Err(CompileError::unsupported(
                            "computed static field key caching",
                        ))
                    }
                }
                self.emitter().emit(Opcode::DefineProp);
            }
            StaticInit::Block(b) => {
                for stmt in &b.body {
                    self.lower_statement(stmt, false)?;
                }
            }
        }
        self.emitter().emit(Opcode::Undefined);
        self.emitter().emit(Opcode::Return);
        let max_locals = self.scope().local_count();
        self.scope().exit();
        let (emitter, captures, _ctx) = self.exit_function();
        let flags = jsqc_bytecode::UnitFlags {
            is_strict: true,
            ..Default::default()
        };
        Ok(self.finish_unit(emitter, None, max_locals, 0, captures, None, flags, (0, 0)))
    }
}

enum StaticInit<'a> {
    Field(&'a oxc_ast::ast::PropertyDefinition<'a>),
    Block(&'a oxc_ast::ast::StaticBlock<'a>),
}

fn is_private_key(key: &PropertyKey) -> bool {
    matches!(key, PropertyKey::PrivateIdentifier(_))
}

fn private_key_name<'k>(key: &'k PropertyKey) -> CompileResult<&'k str> {
    match key {
        PropertyKey::PrivateIdentifier(p) => Ok(&p.name),
        _ => Err(CompileError::internal("expected a private key")),
    }
}

fn body_is_strict(body: &FunctionBody) -> bool {
    body.directives
        .iter()
        .any(|d| d.directive.as_str() == "use strict")
}
