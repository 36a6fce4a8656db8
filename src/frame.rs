//! The lexical environment / call-stack record the evaluator threads
//! through every expression: a per-frame binding map, a parent pointer for
//! lexical lookup, a shared argument stack for call handoff, and a
//! human-readable description used to build runtime tracebacks.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// A LIFO stack of argument values, shared by reference across a frame and
/// every frame derived from it via [`Frame::new_child`]. `Application`
/// pushes onto it in reverse source order; `Fun::apply` pops `arity` values
/// off it in declaration order.
#[derive(Debug, Default)]
pub struct ArgStack {
    values: RefCell<Vec<Value>>,
}

impl ArgStack {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn push(&self, value: Value) {
        self.values.borrow_mut().push(value);
    }

    pub fn pop(&self) -> Option<Value> {
        self.values.borrow_mut().pop()
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains every currently-pending value off the stack, in pop order
    /// (most-recently-pushed first) — used to snapshot a partial call's
    /// arguments before currying re-pushes them merged with new ones.
    pub fn drain_all(&self) -> Vec<Value> {
        let mut v = self.values.borrow_mut();
        let mut drained = std::mem::take(&mut *v);
        drained.reverse();
        drained
    }
}

pub type FrameRef = Rc<Frame>;

/// A lexical frame. Cheap to hand around as an `Rc`; `env` uses interior
/// mutability so `Def` and recursive `Let`/`fn` bindings can write into a
/// frame that other code already holds a reference to.
#[derive(Debug)]
pub struct Frame {
    parent: Option<FrameRef>,
    env: RefCell<HashMap<String, Value>>,
    arg_stack: Rc<ArgStack>,
    pub description: String,
}

impl Frame {
    /// A fresh root frame: no parent, empty environment, fresh argument
    /// stack. Every program run starts from exactly one of these.
    pub fn new_root() -> FrameRef {
        Rc::new(Self {
            parent: None,
            env: RefCell::new(HashMap::new()),
            arg_stack: ArgStack::new(),
            description: "__NewRootClosure()".to_string(),
        })
    }

    /// A child frame: fresh environment, same shared argument stack, parent
    /// set to `self`.
    pub fn new_child(self: &FrameRef, description: impl Into<String>) -> FrameRef {
        Rc::new(Self {
            parent: Some(Rc::clone(self)),
            env: RefCell::new(HashMap::new()),
            arg_stack: Rc::clone(&self.arg_stack),
            description: description.into(),
        })
    }

    /// A shallow copy: same parent and argument stack, independent
    /// (cloned) environment map. Used by non-recursive `let` to give each
    /// init expression a snapshot that doesn't see sibling bindings.
    pub fn copy_shallow(self: &FrameRef) -> FrameRef {
        Rc::new(Self {
            parent: self.parent.clone(),
            env: RefCell::new(self.env.borrow().clone()),
            arg_stack: Rc::clone(&self.arg_stack),
            description: self.description.clone(),
        })
    }

    pub fn arg_stack(&self) -> &Rc<ArgStack> {
        &self.arg_stack
    }

    pub fn parent(&self) -> Option<&FrameRef> {
        self.parent.as_ref()
    }

    pub fn bind(&self, name: impl Into<String>, value: Value) {
        self.env.borrow_mut().insert(name.into(), value);
    }

    /// Looks `name` up in this frame's environment, then recursively up the
    /// parent chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.env.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Walks the parent chain from `self` (inclusive), joining each
    /// frame's description with a newline — the traceback format mandated
    /// for runtime-error diagnostics.
    pub fn build_traceback(self: &FrameRef) -> String {
        let mut lines = Vec::new();
        let mut cur = Some(Rc::clone(self));
        while let Some(f) = cur {
            lines.push(f.description.clone());
            cur = f.parent.clone();
        }
        lines.join("\n")
    }

    /// All names visible from this frame, recursively through parents —
    /// an introspection helper, not used by the core evaluation paths.
    pub fn env_names(&self) -> std::collections::BTreeSet<String> {
        let mut names: std::collections::BTreeSet<String> = self.env.borrow().keys().cloned().collect();
        if let Some(p) = &self.parent {
            names.extend(p.env_names());
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_shares_arg_stack_with_parent() {
        let root = Frame::new_root();
        let child = root.new_child("child");
        child.arg_stack().push(Value::Int(1));
        assert_eq!(root.arg_stack().len(), 1);
        assert!(matches!(child.arg_stack().pop(), Some(Value::Int(1))));
    }

    #[test]
    fn lookup_recurses_through_parent() {
        let root = Frame::new_root();
        root.bind("x", Value::Int(5));
        let child = root.new_child("child");
        assert!(matches!(child.lookup("x"), Some(Value::Int(5))));
        assert!(child.lookup("missing").is_none());
    }

    #[test]
    fn copy_is_independent_of_source_env() {
        let root = Frame::new_root();
        root.bind("x", Value::Int(1));
        let copy = root.copy_shallow();
        copy.bind("y", Value::Int(2));
        assert!(root.lookup("y").is_none());
        assert!(matches!(copy.lookup("x"), Some(Value::Int(1))));
    }

    #[test]
    fn traceback_joins_descriptions_up_the_parent_chain() {
        let root = Frame::new_root();
        let child = root.new_child("mid");
        let grand = child.new_child("leaf");
        let tb = grand.build_traceback();
        assert_eq!(tb, "leaf\nmid\n__NewRootClosure()");
    }
}
