//! Lexical scopes, symbols and loop handles.
//!
//! Slot numbering is function-scoped, not block-scoped: every scope shares
//! the slot counter of its nearest enclosing function (or global) frame, so
//! two sibling blocks never hand out the same slot.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use lime_types::TypeTag;

use crate::jump::Label;

/// Shared handle to a symbol; the emitter patches function addresses in
/// after the declaration's entry label is marked.
pub type SymbolRef = Rc<RefCell<Symbol>>;

/// Shared handle to a scope.
pub type ScopeRef = Rc<Scope>;

/// Shared handle to a loop's labels.
pub type LoopRef = Rc<Loop>;

/// What kind of block a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Plain `{ }` block.
    Normal,
    /// Body of a `for` loop; owns a fresh [`Loop`] handle.
    Loop,
    /// Body of a function; owns a fresh slot counter.
    Func,
    /// The top-level scope; owns the program's slot counter.
    Global,
}

/// A named binding with its frame slot and type-specific extras.
#[derive(Debug)]
pub struct Symbol {
    /// Source name.
    pub name: String,
    /// Resolved type; `Unknown` until inference settles it.
    pub ty: TypeTag,
    /// Frame-relative slot of the value (for arrays, of the header word).
    pub slot: u16,
    /// Type-specific payload.
    pub extra: SymbolExtra,
}

/// Extra data carried by function and array symbols.
#[derive(Debug, Default)]
pub enum SymbolExtra {
    /// Scalar variables carry nothing extra.
    #[default]
    None,
    /// Function: signature plus the entry address once emitted.
    Func {
        /// Declared return type.
        ret: TypeTag,
        /// Ordered parameter types.
        params: Vec<TypeTag>,
        /// Code address of the `proc`, assigned during emission.
        addr: Option<u16>,
    },
    /// Array: element type and length. The symbol's slot holds the header
    /// word; the elements live in the `len` slots after it.
    Array {
        /// Element type.
        element: TypeTag,
        /// Element count.
        len: u16,
    },
}

/// The three labels every loop exposes to `break`/`continue` and to its own
/// emission.
#[derive(Debug, Default)]
pub struct Loop {
    /// Address of the condition check.
    pub begin: RefCell<Label>,
    /// Address of the post expression.
    pub post: RefCell<Label>,
    /// First address after the loop.
    pub end: RefCell<Label>,
}

/// One node of the scope tree.
#[derive(Debug)]
pub struct Scope {
    parent: Option<ScopeRef>,
    kind: ScopeKind,
    symbols: RefCell<HashMap<String, SymbolRef>>,
    /// Slot counter of the owning frame, shared by every nested block.
    slots: Rc<Cell<u16>>,
    /// Nearest enclosing loop, if any.
    loop_ctx: Option<LoopRef>,
    in_func: bool,
}

impl Scope {
    /// The program's top-level scope.
    pub fn global() -> ScopeRef {
        Rc::new(Self {
            parent: None,
            kind: ScopeKind::Global,
            symbols: RefCell::new(HashMap::new()),
            slots: Rc::new(Cell::new(0)),
            loop_ctx: None,
            in_func: false,
        })
    }

    /// A child scope. `Func` children start a fresh frame (new slot
    /// counter, no inherited loop); `Loop` children mint a fresh loop
    /// handle; everything else inherits both.
    pub fn child(parent: &ScopeRef, kind: ScopeKind) -> ScopeRef {
        let fresh_frame = matches!(kind, ScopeKind::Func | ScopeKind::Global);

        Rc::new(Self {
            parent: Some(Rc::clone(parent)),
            kind,
            symbols: RefCell::new(HashMap::new()),
            slots: if fresh_frame {
                Rc::new(Cell::new(0))
            } else {
                Rc::clone(&parent.slots)
            },
            loop_ctx: match kind {
                ScopeKind::Loop => Some(Rc::new(Loop::default())),
                ScopeKind::Func => None,
                _ => parent.loop_ctx.clone(),
            },
            in_func: kind == ScopeKind::Func || parent.in_func,
        })
    }

    /// This scope's kind.
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Whether this is the top-level scope.
    pub fn is_global(&self) -> bool {
        self.kind == ScopeKind::Global
    }

    /// Whether this scope sits inside a function body.
    pub fn in_function(&self) -> bool {
        self.in_func
    }

    /// The nearest enclosing loop handle.
    pub fn innermost_loop(&self) -> Option<LoopRef> {
        self.loop_ctx.clone()
    }

    /// Bind `name` in this scope with no slot yet.
    pub fn define(&self, name: &str, ty: TypeTag) -> SymbolRef {
        let symbol = Rc::new(RefCell::new(Symbol {
            name: name.to_owned(),
            ty,
            slot: 0,
            extra: SymbolExtra::None,
        }));

        self.symbols
            .borrow_mut()
            .insert(name.to_owned(), Rc::clone(&symbol));

        symbol
    }

    /// Look `name` up in this scope alone.
    pub fn get_local(&self, name: &str) -> Option<SymbolRef> {
        self.symbols.borrow().get(name).cloned()
    }

    /// Look `name` up here and in every enclosing scope.
    pub fn get(&self, name: &str) -> Option<SymbolRef> {
        if let Some(symbol) = self.get_local(name) {
            return Some(symbol);
        }

        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Claim `count` consecutive slots from the owning frame; returns the
    /// first.
    pub fn alloc_slots(&self, count: u16) -> u16 {
        let base = self.slots.get();
        self.slots.set(base + count);
        base
    }

    /// Total slots handed out by the owning frame so far.
    pub fn allocated(&self) -> u16 {
        self.slots.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_blocks_share_the_frame_counter() {
        let global = Scope::global();

        let first = Scope::child(&global, ScopeKind::Normal);
        let x = first.define("x", TypeTag::I32);
        x.borrow_mut().slot = first.alloc_slots(1);

        let second = Scope::child(&global, ScopeKind::Normal);
        let y = second.define("y", TypeTag::I32);
        y.borrow_mut().slot = second.alloc_slots(1);

        assert_eq!(x.borrow().slot, 0);
        assert_eq!(y.borrow().slot, 1);
        assert_eq!(global.allocated(), 2);
    }

    #[test]
    fn function_scopes_start_a_fresh_frame() {
        let global = Scope::global();
        global.alloc_slots(3);

        let body = Scope::child(&global, ScopeKind::Func);
        assert_eq!(body.alloc_slots(1), 0);
        assert_eq!(global.allocated(), 3);
        assert!(body.in_function());
        assert!(body.innermost_loop().is_none());
    }

    #[test]
    fn loops_are_visible_through_nested_blocks_but_not_functions() {
        let global = Scope::global();
        let loop_scope = Scope::child(&global, ScopeKind::Loop);
        let inner = Scope::child(&loop_scope, ScopeKind::Normal);

        assert!(inner.innermost_loop().is_some());
        assert!(Rc::ptr_eq(
            &inner.innermost_loop().unwrap(),
            &loop_scope.innermost_loop().unwrap()
        ));

        let func_body = Scope::child(&inner, ScopeKind::Func);
        assert!(func_body.innermost_loop().is_none());
    }

    #[test]
    fn lookup_walks_parents_and_shadowing_wins() {
        let global = Scope::global();
        global.define("x", TypeTag::I32);

        let inner = Scope::child(&global, ScopeKind::Normal);
        assert!(inner.get("x").is_some());
        assert!(inner.get_local("x").is_none());

        let shadow = inner.define("x", TypeTag::Real);
        assert!(Rc::ptr_eq(&inner.get("x").unwrap(), &shadow));
    }
}
