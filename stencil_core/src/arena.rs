use crate::node::{FieldNode, FillerNode, TemplateBodyNode, ValueNode};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(0);

/// A typed, non-owning reference to a node stored in a [`NodeArena`].
///
/// Handles are indices stamped with the issuing arena: copying one never
/// copies the node, and a handle stays valid for as long as its arena.
pub struct Handle<T> {
    arena: u32,
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(arena: u32, index: usize) -> Self {
        Self {
            arena,
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(self) -> usize {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.arena == other.arena && self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arena.hash(state);
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}:{})", self.arena, self.index)
    }
}

/// Node kinds the arena can store. Each kind lives in its own slot vector.
pub trait ArenaNode: Sized {
    fn slots(arena: &NodeArena) -> &Vec<Self>;
    fn slots_mut(arena: &mut NodeArena) -> &mut Vec<Self>;
}

/// Owns every construction node created during one compilation.
///
/// Nodes are append-only: nothing is freed individually, the whole arena is
/// dropped as a unit together with the script that owns it.
#[derive(Debug)]
pub struct NodeArena {
    id: u32,
    values: Vec<ValueNode>,
    fillers: Vec<FillerNode>,
    fields: Vec<FieldNode>,
    templates: Vec<TemplateBodyNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            values: Vec::new(),
            fillers: Vec::new(),
            fields: Vec::new(),
            templates: Vec::new(),
        }
    }

    pub fn alloc<T: ArenaNode>(&mut self, node: T) -> Handle<T> {
        let id = self.id;
        let slots = T::slots_mut(self);
        slots.push(node);
        Handle::new(id, slots.len() - 1)
    }

    /// `None` only for a handle issued by a different arena.
    pub fn get<T: ArenaNode>(&self, handle: Handle<T>) -> Option<&T> {
        if handle.arena != self.id {
            return None;
        }
        T::slots(self).get(handle.index)
    }

    pub fn contains<T: ArenaNode>(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len() + self.fillers.len() + self.fields.len() + self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! arena_node {
    ($node:ty, $slot:ident) => {
        impl ArenaNode for $node {
            fn slots(arena: &NodeArena) -> &Vec<Self> {
                &arena.$slot
            }
            fn slots_mut(arena: &mut NodeArena) -> &mut Vec<Self> {
                &mut arena.$slot
            }
        }
    };
}

arena_node!(ValueNode, values);
arena_node!(FillerNode, fillers);
arena_node!(FieldNode, fields);
arena_node!(TemplateBodyNode, templates);
