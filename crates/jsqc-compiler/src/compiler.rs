//! Top-level compiler entry point.
//!
//! [`Compiler`] owns everything lowering needs: the emitter/scope stack for
//! whichever function unit is currently being written, the parent-linked
//! capture resolver, and the handful of flags (strict mode, non-deletable
//! globals, `is_module`/`is_eval`) that every lowering module reads. The
//! actual per-construct lowering lives in sibling modules (`expr`, `stmt`,
//! `pattern`, `function`) as `impl Compiler` blocks; this file only owns the
//! struct and the `compile` entry point.

use std::collections::HashMap;
use std::rc::Rc;

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use rustc_hash::FxHashSet;

use jsqc_bytecode::{
    BytecodeUnit, CaptureIndex, CaptureSource, CompiledProgram, LocalIndex, UnitFlags,
};

use crate::emitter::Emitter;
use crate::error::{CompileError, CompileResult};
use crate::literal_validator::SourceLocation;
use crate::scope::{CaptureResolver, LoopFrame, Resolution, ScopeChain};

/// Where an Annex-B.3.3-hoisted function-declaration name's `var` binding
/// lives, captured at scan time so the declaration site (nested arbitrarily
/// deep inside blocks) can still find it later without re-resolving through
/// live scope lookup.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AnnexBTarget {
    Global,
    Local(LocalIndex),
}

/// Per-active-function lowering flags, pushed/popped alongside the
/// emitter/resolver stack in [`Compiler::enter_function`]/`exit_function`.
#[derive(Debug, Clone)]
pub(crate) struct FunctionContext {
    pub is_async: bool,
    pub is_generator: bool,
    pub is_arrow: bool,
    pub is_constructor: bool,
    pub in_global_scope: bool,
    pub has_enclosing_arguments: bool,
    pub param_count: u8,
    pub name: Option<String>,
}

impl FunctionContext {
    pub(crate) fn global() -> Self {
        Self {
            is_async: false,
            is_generator: false,
            is_arrow: false,
            is_constructor: false,
            in_global_scope: true,
            has_enclosing_arguments: false,
            param_count: 0,
            name: None,
        }
    }
}

/// Lowers a parsed JavaScript program into a [`CompiledProgram`].
pub struct Compiler {
    pub(crate) resolver: CaptureResolver,
    pub(crate) emitters: Vec<Emitter>,
    pub(crate) contexts: Vec<FunctionContext>,
    pub(crate) source: Rc<str>,
    pub(crate) non_deletable_globals: FxHashSet<String>,
    pub(crate) strict_stack: Vec<bool>,
    pub(crate) is_module: bool,
    pub(crate) is_eval: bool,
    pub(crate) pending_label: Option<String>,
    pub(crate) template_site_counter: u32,
    tmp_counter: u32,
    line_starts: Vec<u32>,
    pub(crate) private_symbol_scopes: Vec<HashMap<String, u64>>,
    private_symbol_counter: u64,
    pub(crate) annex_b_var_slots: Vec<HashMap<String, AnnexBTarget>>,
}

impl Compiler {
    fn new(source: Rc<str>, is_module: bool) -> Self {
        let line_starts = Self::compute_line_starts(&source);
        Self {
            resolver: CaptureResolver::new(),
            emitters: vec![Emitter::new()],
            contexts: vec![FunctionContext::global()],
            source,
            non_deletable_globals: FxHashSet::default(),
            strict_stack: vec![is_module],
            is_module,
            is_eval: false,
            pending_label: None,
            template_site_counter: 0,
            tmp_counter: 0,
            line_starts,
            private_symbol_scopes: Vec::new(),
            private_symbol_counter: 0,
            annex_b_var_slots: vec![HashMap::new()],
        }
    }

    fn compute_line_starts(source: &str) -> Vec<u32> {
        let mut starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                starts.push((i + 1) as u32);
            }
        }
        starts
    }

    /// Resolve a byte offset into the source text to a 1-based `(line,
    /// column)` pair.
    pub(crate) fn locate(&self, offset: u32) -> (u32, u32) {
        let idx = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[idx];
        ((idx + 1) as u32, offset - line_start + 1)
    }

    /// Resolve a byte offset and wrap it as a [`SourceLocation`] for
    /// `literal_validator` calls.
    pub(crate) fn source_location(&self, offset: u32) -> SourceLocation {
        let (line, column) = self.locate(offset);
        SourceLocation::new(line, column)
    }

    /// Record the source position a lowering step is about to emit
    /// bytecode for, so `BytecodeUnit::source_map` can map addresses back
    /// to `line:column` for diagnostics.
    pub(crate) fn mark_source_offset(&mut self, offset: u32) {
        let (line, column) = self.locate(offset);
        self.emitter().set_source_offset(offset, line, column);
    }

    pub(crate) fn push_private_symbol_scope(&mut self) {
        self.private_symbol_scopes.push(HashMap::new());
    }

    pub(crate) fn pop_private_symbol_scope(&mut self) {
        self.private_symbol_scopes.pop();
    }

    /// Allocate (or reuse) a runtime symbol id for a private name, scoped to
    /// the class body currently being lowered. Nested classes search
    /// outward so a private name used but not redeclared by an inner class
    /// resolves to its enclosing class's symbol, the way lexical scoping of
    /// private names works; two unrelated classes that both declare the
    /// same name never share an id because they never share a scope entry.
    pub(crate) fn private_symbol_id(&mut self, name: &str) -> u64 {
        for scope in self.private_symbol_scopes.iter().rev() {
            if let Some(&id) = scope.get(name) {
                return id;
            }
        }
        let id = self.private_symbol_counter;
        self.private_symbol_counter += 1;
        if let Some(scope) = self.private_symbol_scopes.last_mut() {
            scope.insert(name.to_string(), id);
        }
        id
    }

    pub(crate) fn push_annex_b_scope(&mut self) {
        self.annex_b_var_slots.push(HashMap::new());
    }

    pub(crate) fn pop_annex_b_scope(&mut self) {
        self.annex_b_var_slots.pop();
    }

    pub(crate) fn annex_b_target(&self, name: &str) -> Option<AnnexBTarget> {
        self.annex_b_var_slots.last()?.get(name).copied()
    }

    /// Consume the label attached by an enclosing `LabeledStatement`, if
    /// any, for the loop about to push its [`LoopFrame`].
    pub(crate) fn take_pending_label(&mut self) -> Vec<String> {
        self.pending_label.take().into_iter().collect()
    }

    /// Mark this compilation as eval code. Only affects whether a top-level
    /// `return` is accepted; that check is the parser's job, so this flag is
    /// informational here.
    pub fn set_eval(&mut self, is_eval: bool) {
        self.is_eval = is_eval;
    }

    /// Compile a whole program to a [`CompiledProgram`].
    pub fn compile(source: &str, is_module: bool) -> CompileResult<CompiledProgram> {
        let source_rc: Rc<str> = Rc::from(source);
        let allocator = Allocator::default();
        let source_type = if is_module {
            SourceType::default().with_module(true)
        } else {
            SourceType::default()
        };
        let parsed = Parser::new(&allocator, source, source_type).parse();
        if !parsed.errors.is_empty() {
            let message = parsed
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CompileError::Parse(message));
        }

        tracing::debug!(is_module, len = source.len(), "compiling program");

        let mut compiler = Compiler::new(source_rc, is_module);
        let top_level = compiler.lower_program(&parsed.program)?;
        let program = CompiledProgram::new(String::from("<script>"), top_level, is_module);
        Ok(program)
    }

    pub(crate) fn emitter(&mut self) -> &mut Emitter {
        self.emitters.last_mut().expect("no active emitter")
    }

    pub(crate) fn scope(&mut self) -> &mut ScopeChain {
        self.resolver.locals()
    }

    pub(crate) fn loops(&mut self) -> &mut Vec<LoopFrame> {
        self.resolver.loops()
    }

    pub(crate) fn ctx(&self) -> &FunctionContext {
        self.contexts.last().expect("no active function context")
    }

    pub(crate) fn ctx_mut(&mut self) -> &mut FunctionContext {
        self.contexts.last_mut().expect("no active function context")
    }

    pub(crate) fn is_strict(&self) -> bool {
        *self.strict_stack.last().expect("no active strict flag")
    }

    pub(crate) fn resolve(&mut self, name: &str) -> Resolution {
        self.resolver.resolve(name)
    }

    /// Allocate a compiler-generated temporary name, excluded from the
    /// unit's local-name table by its `$` prefix.
    pub(crate) fn new_temp_name(&mut self) -> String {
        let n = self.tmp_counter;
        self.tmp_counter += 1;
        format!("$tmp_{n}")
    }

    /// Enter a nested function's lowering context: fresh emitter, fresh
    /// resolver frame, inherited strict mode.
    pub(crate) fn enter_function(&mut self, ctx: FunctionContext, strict: bool) {
        self.emitters.push(Emitter::new());
        self.resolver.enter_function();
        self.strict_stack.push(strict);
        self.contexts.push(ctx);
        self.push_annex_b_scope();
    }

    /// Exit the current function, returning its emitter (not yet finished)
    /// and accumulated captures.
    pub(crate) fn exit_function(&mut self) -> (Emitter, Vec<CaptureSource>, FunctionContext) {
        let emitter = self
            .emitters
            .pop()
            .expect("exit_function without enter_function");
        let captures = self.resolver.exit_function();
        self.strict_stack.pop();
        let ctx = self
            .contexts
            .pop()
            .expect("exit_function without enter_function");
        self.pop_annex_b_scope();
        (emitter, captures, ctx)
    }

    /// Detect a self-capture: a function that captured its own declared
    /// name, used for recursive block-scoped function declarations.
    pub(crate) fn self_capture_slot(&mut self, name: Option<&str>) -> Option<CaptureIndex> {
        let name = name?;
        match self.resolve(name) {
            Resolution::Captured(idx) => Some(idx),
            _ => None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn finish_unit(
        &self,
        emitter: Emitter,
        name: Option<String>,
        max_locals: u16,
        param_count: u8,
        captures: Vec<CaptureSource>,
        self_capture_slot: Option<CaptureIndex>,
        flags: UnitFlags,
        span: (u32, u32),
    ) -> BytecodeUnit {
        emitter.finish(
            name,
            max_locals,
            param_count,
            flags,
            captures,
            self_capture_slot,
            span,
        )
    }
}
