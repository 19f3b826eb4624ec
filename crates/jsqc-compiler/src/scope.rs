//! Scope and capture resolution core.
//!
//! Two layers: [`ScopeChain`] resolves a name to a local slot within one
//! function (tracking lexical block nesting, the temporal dead zone, and
//! simple catch-parameter bindings for Annex B eligibility), and
//! [`CaptureResolver`] walks outward across function boundaries, lazily
//! allocating a capture slot in every intermediate function and chaining
//! `VarRef` descriptors so a deeply nested closure only ever reads through
//! its own immediate capture list, never reaching past its parent.

use std::collections::{HashMap, HashSet};

use jsqc_bytecode::{BytecodeOffset, CaptureIndex, CaptureSource, LocalIndex};

/// A variable binding within one lexical scope.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Local slot index, allocated at the owning function's scope.
    pub slot: LocalIndex,
    /// Declared `const` (rejects reassignment; checked at lowering time).
    pub is_const: bool,
    /// Captured by at least one nested closure.
    pub is_captured: bool,
    /// Declared name.
    pub name: String,
}

/// One lexical scope: a function body, or a block/loop/catch clause nested
/// within one.
#[derive(Debug)]
pub struct Scope {
    parent: Option<usize>,
    bindings: HashMap<String, Binding>,
    is_function: bool,
}

impl Scope {
    fn new(parent: Option<usize>, is_function: bool) -> Self {
        Self {
            parent,
            bindings: HashMap::new(),
            is_function,
        }
    }
}

/// Resolution result for a name looked up in one function's [`ScopeChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalResolution {
    /// Bound to a local slot in this function.
    Local(LocalIndex),
    /// Not declared anywhere in this function; resolve as global, or ask
    /// the enclosing [`CaptureResolver`] to look further out.
    Unresolved,
}

/// Scope chain for one function: tracks block nesting, slot allocation,
/// the temporal dead zone, and simple catch-parameter names.
#[derive(Debug)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
    current: usize,
    next_local: u16,
    /// Names currently in the temporal dead zone (declared but not yet
    /// initialized `let`/`const`/class bindings).
    tdz: HashSet<String>,
    /// Names bound by a single-identifier (non-destructuring) catch
    /// clause parameter, eligible for Annex B.3.3 var-shadowing.
    simple_catch_params: HashSet<String>,
}

impl ScopeChain {
    /// Create a chain rooted at one function-level scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None, true)],
            current: 0,
            next_local: 0,
            tdz: HashSet::new(),
            simple_catch_params: HashSet::new(),
        }
    }

    /// Enter a nested block (or another function-level scope, for the rare
    /// case of compiling a class static block in the same chain).
    pub fn enter(&mut self, is_function: bool) {
        let scope = Scope::new(Some(self.current), is_function);
        self.current = self.scopes.len();
        self.scopes.push(scope);
    }

    /// Exit the current scope, returning to its parent.
    pub fn exit(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    /// Declare a binding in the current scope, allocating a fresh slot.
    /// Returns `None` if the name is already bound in this exact scope
    /// (a redeclaration, which callers turn into an early error).
    pub fn declare(&mut self, name: &str, is_const: bool) -> Option<LocalIndex> {
        if self.scopes[self.current].bindings.contains_key(name) {
            return None;
        }
        let slot = LocalIndex::new(self.next_local);
        self.next_local += 1;
        self.scopes[self.current].bindings.insert(
            name.to_string(),
            Binding {
                slot,
                is_const,
                is_captured: false,
                name: name.to_string(),
            },
        );
        Some(slot)
    }

    /// Put a just-declared `let`/`const`/class binding into the TDZ.
    pub fn mark_uninitialized(&mut self, name: &str) {
        self.tdz.insert(name.to_string());
    }

    /// Clear a binding's TDZ status once its initializer has run.
    pub fn mark_initialized(&mut self, name: &str) {
        self.tdz.remove(name);
    }

    /// Whether `name` is currently in the temporal dead zone.
    pub fn is_in_tdz(&self, name: &str) -> bool {
        self.tdz.contains(name)
    }

    /// Record that `name` is a simple (non-destructuring) catch parameter.
    pub fn mark_simple_catch_param(&mut self, name: &str) {
        self.simple_catch_params.insert(name.to_string());
    }

    /// Whether `name` is bound by a simple catch parameter anywhere still
    /// on the chain, which blocks Annex B.3.3 var-hoisting of a
    /// same-named function declaration into this scope.
    pub fn is_simple_catch_param(&self, name: &str) -> bool {
        self.simple_catch_params.contains(name)
    }

    /// Resolve a name to a local slot by walking outward from the current
    /// scope, staying within this function.
    pub fn resolve_local(&self, name: &str) -> LocalResolution {
        let mut idx = Some(self.current);
        while let Some(i) = idx {
            if let Some(binding) = self.scopes[i].bindings.get(name) {
                return LocalResolution::Local(binding.slot);
            }
            idx = self.scopes[i].parent;
        }
        LocalResolution::Unresolved
    }

    /// Mark a local binding as captured by a nested closure, used to decide
    /// whether `CLOSE_LOC` is needed when the binding's scope exits (e.g.
    /// per-iteration loop bindings).
    pub fn mark_captured(&mut self, name: &str) {
        let mut idx = Some(self.current);
        while let Some(i) = idx {
            if let Some(binding) = self.scopes[i].bindings.get_mut(name) {
                binding.is_captured = true;
                return;
            }
            idx = self.scopes[i].parent;
        }
    }

    /// Locals declared directly in the current (innermost) scope that are
    /// captured, in declaration order — these need `CLOSE_LOC` when the
    /// scope exits (e.g. at the end of each loop iteration).
    pub fn captured_in_current_scope(&self) -> Vec<LocalIndex> {
        self.scopes[self.current]
            .bindings
            .values()
            .filter(|b| b.is_captured)
            .map(|b| b.slot)
            .collect()
    }

    /// Whether the current scope is a function's own top-level scope
    /// (not a nested block), used to decide where `var` bindings attach.
    pub fn current_is_function_scope(&self) -> bool {
        self.scopes[self.current].is_function
    }

    /// Total number of local slots this function's frame needs.
    pub fn local_count(&self) -> u16 {
        self.next_local
    }
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

/// One loop or labeled-statement control frame, tracking jump patch sites
/// for `break`/`continue`.
#[derive(Debug, Default)]
pub struct LoopFrame {
    /// Labels attached directly to this statement (`label: for (...) {}`).
    pub labels: Vec<String>,
    /// Bytecode offset `continue` jumps back to.
    pub continue_target: BytecodeOffset,
    /// Placeholder offsets of `GOTO`s emitted for `break`, patched to the
    /// statement's end once it is fully lowered.
    pub break_patches: Vec<BytecodeOffset>,
    /// Placeholder offsets of `GOTO`s emitted for `continue`, patched to
    /// `continue_target` (for `for` loops, the update-expression position)
    /// once it is known.
    pub continue_patches: Vec<BytecodeOffset>,
    /// Whether this frame is a `switch` (labeled `break` target only, no
    /// valid `continue` target).
    pub is_switch: bool,
}

/// Per-function capture-resolution frame: its own [`ScopeChain`] plus the
/// capture slots it has allocated so far, memoized by name so repeated
/// references to the same captured binding reuse one slot.
struct FunctionFrame {
    locals: ScopeChain,
    captures: Vec<CaptureSource>,
    capture_slots: HashMap<String, CaptureIndex>,
    loops: Vec<LoopFrame>,
}

impl FunctionFrame {
    fn new() -> Self {
        Self {
            locals: ScopeChain::new(),
            captures: Vec::new(),
            capture_slots: HashMap::new(),
            loops: Vec::new(),
        }
    }
}

/// How a name resolved, from the perspective of the function doing the
/// looking-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A local slot in this same function.
    Local(LocalIndex),
    /// A captured variable; read/written through `GET_VAR_REF`/`PUT_VAR_REF`
    /// at this capture index.
    Captured(CaptureIndex),
    /// Not declared anywhere on the function chain; a global.
    Global,
}

/// Stack of [`FunctionFrame`]s mirroring the nested-function compilation
/// stack, implementing the transitive-capture algorithm: a binding three
/// functions out gets a capture slot allocated in every function between
/// the reference and its owner, each one chained by `VarRef` to the next.
pub struct CaptureResolver {
    frames: Vec<FunctionFrame>,
}

impl CaptureResolver {
    /// Start with a single top-level function frame.
    pub fn new() -> Self {
        Self {
            frames: vec![FunctionFrame::new()],
        }
    }

    /// Enter a newly nested function (called when lowering begins on a
    /// function/arrow/method body).
    pub fn enter_function(&mut self) {
        self.frames.push(FunctionFrame::new());
    }

    /// Exit the current function, returning its accumulated capture list
    /// in declaration order (the shape `BytecodeUnit::captures` expects).
    pub fn exit_function(&mut self) -> Vec<CaptureSource> {
        self.frames
            .pop()
            .expect("exit_function without matching enter_function")
            .captures
    }

    /// The current function's own lexical scope chain.
    pub fn locals(&mut self) -> &mut ScopeChain {
        &mut self.frames.last_mut().unwrap().locals
    }

    /// The current function's loop/label control-frame stack.
    pub fn loops(&mut self) -> &mut Vec<LoopFrame> {
        &mut self.frames.last_mut().unwrap().loops
    }

    /// Resolve `name` against the current function: its own locals first,
    /// then (lazily, allocating slots as needed) captures from enclosing
    /// functions, finally falling back to a global reference.
    pub fn resolve(&mut self, name: &str) -> Resolution {
        let depth = self.frames.len() - 1;
        self.resolve_at(depth, name)
    }

    fn resolve_at(&mut self, depth: usize, name: &str) -> Resolution {
        if let LocalResolution::Local(slot) = self.frames[depth].locals.resolve_local(name) {
            return Resolution::Local(slot);
        }

        if let Some(&idx) = self.frames[depth].capture_slots.get(name) {
            return Resolution::Captured(idx);
        }

        if depth == 0 {
            return Resolution::Global;
        }

        let source = match self.resolve_at(depth - 1, name) {
            Resolution::Local(parent_slot) => {
                self.frames[depth - 1].locals.mark_captured(name);
                CaptureSource::Local(parent_slot)
            }
            Resolution::Captured(parent_capture) => CaptureSource::VarRef(parent_capture),
            Resolution::Global => return Resolution::Global,
        };

        let idx = CaptureIndex::new(self.frames[depth].captures.len() as u16);
        self.frames[depth].captures.push(source);
        self.frames[depth]
            .capture_slots
            .insert(name.to_string(), idx);
        Resolution::Captured(idx)
    }
}

impl Default for CaptureResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_and_resolve_local() {
        let mut chain = ScopeChain::new();
        let x = chain.declare("x", false).unwrap();
        let y = chain.declare("y", true).unwrap();
        assert_eq!(chain.resolve_local("x"), LocalResolution::Local(x));
        assert_eq!(chain.resolve_local("y"), LocalResolution::Local(y));
        assert_ne!(x, y);
    }

    #[test]
    fn redeclaration_in_same_scope_rejected() {
        let mut chain = ScopeChain::new();
        chain.declare("x", false).unwrap();
        assert!(chain.declare("x", false).is_none());
    }

    #[test]
    fn block_scope_sees_outer_locals() {
        let mut chain = ScopeChain::new();
        let x = chain.declare("x", false).unwrap();
        chain.enter(false);
        chain.declare("y", false).unwrap();
        assert_eq!(chain.resolve_local("x"), LocalResolution::Local(x));
        chain.exit();
        assert_eq!(chain.resolve_local("y"), LocalResolution::Unresolved);
    }

    #[test]
    fn tdz_tracking() {
        let mut chain = ScopeChain::new();
        chain.declare("x", false).unwrap();
        chain.mark_uninitialized("x");
        assert!(chain.is_in_tdz("x"));
        chain.mark_initialized("x");
        assert!(!chain.is_in_tdz("x"));
    }

    #[test]
    fn direct_capture_from_immediate_parent() {
        let mut resolver = CaptureResolver::new();
        resolver.locals().declare("x", false).unwrap();
        resolver.enter_function();

        match resolver.resolve("x") {
            Resolution::Captured(idx) => assert_eq!(idx.index(), 0),
            other => panic!("expected capture, got {other:?}"),
        }
        // Second reference reuses the same slot.
        match resolver.resolve("x") {
            Resolution::Captured(idx) => assert_eq!(idx.index(), 0),
            other => panic!("expected capture, got {other:?}"),
        }
        let captures = resolver.exit_function();
        assert_eq!(captures.len(), 1);
        assert!(matches!(captures[0], CaptureSource::Local(_)));
    }

    #[test]
    fn transitive_capture_chains_var_ref() {
        let mut resolver = CaptureResolver::new();
        resolver.locals().declare("x", false).unwrap();
        resolver.enter_function(); // middle function, itself a closure over x
        resolver.enter_function(); // innermost function, references x

        assert!(matches!(resolver.resolve("x"), Resolution::Captured(_)));

        let innermost_captures = resolver.exit_function();
        assert_eq!(innermost_captures.len(), 1);
        assert!(matches!(innermost_captures[0], CaptureSource::VarRef(_)));

        let middle_captures = resolver.exit_function();
        assert_eq!(middle_captures.len(), 1);
        assert!(matches!(middle_captures[0], CaptureSource::Local(_)));
    }

    #[test]
    fn unresolved_name_is_global() {
        let mut resolver = CaptureResolver::new();
        assert_eq!(resolver.resolve("console"), Resolution::Global);
    }
}
