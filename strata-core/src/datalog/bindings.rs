//! Variable bindings
//!
//! Two representations share the [`BindingEnv`] interface:
//! - [`Bindings`]: a flat, ordered map handed to and returned from queries
//! - [`BindingArena`]: scoped frames used while a goal list is being matched.
//!   Each branch pushes a child frame over its parent, so trying one candidate
//!   fact never disturbs the bindings a sibling branch sees.

use super::types::Term;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Read access to variable bindings
pub trait BindingEnv {
    /// Value bound to `var`, if any
    fn lookup(&self, var: &str) -> Option<&Term>;

    /// Follow a variable to its binding; constants and unbound variables resolve to themselves
    fn resolve<'a>(&'a self, term: &'a Term) -> &'a Term {
        match term {
            Term::Variable(name) => self.lookup(name).unwrap_or(term),
            Term::Constant(_) => term,
        }
    }

    /// Whether `var` has a binding
    fn is_bound(&self, var: &str) -> bool {
        self.lookup(var).is_some()
    }
}

/// Bindings that can be extended
pub trait BindingEnvMut: BindingEnv {
    /// Bind `var` to `value` in the innermost scope
    fn bind(&mut self, var: Arc<str>, value: Term);
}

/// A complete answer: variable name to bound term, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings {
    vars: BTreeMap<Arc<str>, Term>,
}

impl Bindings {
    /// Create empty bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Build bindings from `(variable, constant)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (Arc::from(k.as_ref()), Term::constant(v)))
            .collect();
        Bindings { vars }
    }

    /// Bind a variable, replacing any previous value
    pub fn insert(&mut self, var: impl AsRef<str>, value: Term) {
        self.vars.insert(Arc::from(var.as_ref()), value);
    }

    /// Look up a variable
    pub fn get(&self, var: &str) -> Option<&Term> {
        self.vars.get(var)
    }

    /// Constant text bound to a variable
    pub fn get_text(&self, var: &str) -> Option<&str> {
        self.vars.get(var).map(Term::text)
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True when nothing is bound
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate in variable-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.vars.iter().map(|(k, v)| (k.as_ref(), v))
    }
}

impl BindingEnv for Bindings {
    fn lookup(&self, var: &str) -> Option<&Term> {
        self.vars.get(var)
    }
}

impl BindingEnvMut for Bindings {
    fn bind(&mut self, var: Arc<str>, value: Term) {
        self.vars.insert(var, value);
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, value)) in self.vars.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", var, value)?;
        }
        write!(f, "}}")
    }
}

/// Handle to a frame inside a [`BindingArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(usize);

#[derive(Debug)]
struct Frame {
    parent: Option<FrameId>,
    vars: Vec<(Arc<str>, Term)>,
}

/// Stack of binding frames. Lookups walk from a frame towards the root;
/// writes only touch the given frame.
#[derive(Debug, Default)]
pub struct BindingArena {
    frames: Vec<Frame>,
}

impl BindingArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a parentless frame holding a copy of `seed`
    pub fn root(&mut self, seed: &Bindings) -> FrameId {
        let vars = seed.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        self.frames.push(Frame { parent: None, vars });
        FrameId(self.frames.len() - 1)
    }

    /// Push an empty child frame of `parent`
    pub fn push(&mut self, parent: FrameId) -> FrameId {
        self.frames.push(Frame {
            parent: Some(parent),
            vars: Vec::new(),
        });
        FrameId(self.frames.len() - 1)
    }

    /// Look a variable up through the frame chain
    pub fn get(&self, frame: FrameId, var: &str) -> Option<&Term> {
        let mut current = Some(frame);
        while let Some(FrameId(idx)) = current {
            let frame = &self.frames[idx];
            if let Some((_, value)) = frame.vars.iter().rev().find(|(k, _)| k.as_ref() == var) {
                return Some(value);
            }
            current = frame.parent;
        }
        None
    }

    /// Bind a variable in `frame` itself
    pub fn put(&mut self, frame: FrameId, var: Arc<str>, value: Term) {
        let vars = &mut self.frames[frame.0].vars;
        match vars.iter_mut().find(|(k, _)| *k == var) {
            Some(slot) => slot.1 = value,
            None => vars.push((var, value)),
        }
    }

    /// Collapse the chain ending at `frame` into flat bindings; inner frames win
    pub fn flatten(&self, frame: FrameId) -> Bindings {
        let mut chain = Vec::new();
        let mut current = Some(frame);
        while let Some(id) = current {
            chain.push(id);
            current = self.frames[id.0].parent;
        }

        let mut out = Bindings::new();
        for FrameId(idx) in chain.into_iter().rev() {
            for (var, value) in &self.frames[idx].vars {
                out.vars.insert(var.clone(), value.clone());
            }
        }
        out
    }

    /// Current frame count, for use with [`BindingArena::truncate`]
    pub fn mark(&self) -> usize {
        self.frames.len()
    }

    /// Drop every frame pushed after `mark`. Their ids must not be used again.
    pub fn truncate(&mut self, mark: usize) {
        self.frames.truncate(mark);
    }

    /// Mutable view of one frame
    pub fn scope(&mut self, frame: FrameId) -> Scope<'_> {
        Scope { arena: self, frame }
    }

    /// Read-only view of one frame
    pub fn view(&self, frame: FrameId) -> ScopeView<'_> {
        ScopeView { arena: self, frame }
    }
}

/// A frame of a [`BindingArena`] that accepts new bindings
pub struct Scope<'a> {
    arena: &'a mut BindingArena,
    frame: FrameId,
}

impl BindingEnv for Scope<'_> {
    fn lookup(&self, var: &str) -> Option<&Term> {
        self.arena.get(self.frame, var)
    }
}

impl BindingEnvMut for Scope<'_> {
    fn bind(&mut self, var: Arc<str>, value: Term) {
        self.arena.put(self.frame, var, value);
    }
}

/// A read-only frame of a [`BindingArena`]
#[derive(Clone, Copy)]
pub struct ScopeView<'a> {
    arena: &'a BindingArena,
    frame: FrameId,
}

impl BindingEnv for ScopeView<'_> {
    fn lookup(&self, var: &str) -> Option<&Term> {
        self.arena.get(self.frame, var)
    }
}
