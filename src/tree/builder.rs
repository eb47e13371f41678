// ABOUTME: Stack based builder that populates a hardware tree scope by scope
// ABOUTME: Provides the open/close context stack, declaration helpers and snapshots

use super::alias::Alias;
use super::binding::SharedBinding;
use super::dirent::{Dirent, DirentRef};
use super::error::{Error, Result};
use super::field::{Field, SharedDatatype};
use super::path::{Addressing, Path, PathElement};
use super::register::Register;
use super::scope::{HwTree, LookupMode, ScopeId, ScopeRef};
use super::value::BitWidth;
use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::mem;
use log::{debug, warn};

/// An open scope and the name it will take in its parent
#[derive(Debug, Clone)]
struct Context {
    scope: ScopeId,
    name: String,
}

/// Builds a tree by opening and closing nested scopes
///
/// Every scope opened with [`Builder::open_scope`] already knows its parent,
/// so datatypes, bindings and bookmarks resolve while it is being filled.
/// It is inserted into the parent under its name when closed.
#[derive(Debug)]
pub struct Builder<'t> {
    tree: &'t mut HwTree,
    start: ScopeId,
    current: Context,
    stack: Vec<Context>,
}

impl<'t> Builder<'t> {
    /// Create a builder positioned at the tree root
    pub fn new(tree: &'t mut HwTree) -> Self {
        let root = tree.root();
        Self::at(tree, root)
    }

    /// Create a builder positioned at `scope`
    pub fn at(tree: &'t mut HwTree, scope: ScopeId) -> Self {
        Self {
            tree,
            start: scope,
            current: Context {
                scope,
                name: String::new(),
            },
            stack: Vec::new(),
        }
    }

    /// Number of scopes currently open
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Scope receiving declarations
    pub fn current(&self) -> ScopeId {
        self.current.scope
    }

    /// Read access to the tree under construction
    pub fn tree(&self) -> &HwTree {
        self.tree
    }

    /// Open a child scope of the current scope and make it current
    ///
    /// `name` may be an append element such as `cpu[]`.
    pub fn open_scope(&mut self, name: &str, binding: Option<SharedBinding>) -> ScopeId {
        let element = PathElement::parse(name);
        if element.addressing == Addressing::Plain
            && self.tree.get(self.current.scope).contains(&element.name)
        {
            warn!("scope '{}' redefines an existing entry", name);
        }

        let child = self.tree.new_child_scope(self.current.scope, binding);
        let parent = mem::replace(
            &mut self.current,
            Context {
                scope: child,
                name: name.to_string(),
            },
        );
        self.stack.push(parent);
        debug!("opened scope '{}' at depth {}", name, self.depth());
        child
    }

    /// Close the current scope and insert it into its parent
    ///
    /// `rename` replaces the name given at open time. An existing entry of
    /// the final name is overwritten; the redefinition warning comes from
    /// `open_scope`, or from here when renamed.
    ///
    /// If the scope cannot be inserted, for instance because `cpu[]` names a
    /// field, the builder still returns to the parent and the finished scope
    /// is left detached.
    ///
    /// # Panics
    ///
    /// Panics if no scope is open.
    pub fn close_scope(&mut self, rename: Option<&str>) -> Result<ScopeId> {
        let Some(parent) = self.stack.pop() else {
            panic!("close_scope called with no open scope");
        };
        let finished = mem::replace(&mut self.current, parent);
        let name = rename.map_or(finished.name, str::to_string);

        let inserted = self.tree.insert_dirent(
            self.current.scope,
            &PathElement::parse(&name),
            Dirent::Scope(finished.scope),
            rename.is_some(),
        );
        if let Err(err) = inserted {
            warn!("could not close scope '{}': {}", name, err);
            self.tree.orphan(finished.scope);
            return Err(err);
        }
        debug!("closed scope '{}' at depth {}", name, self.depth());
        Ok(finished.scope)
    }

    /// Insert a dirent into the current scope
    pub fn add(&mut self, name: &str, dirent: Dirent) -> Result<()> {
        self.tree
            .add_dirent(self.current.scope, &PathElement::parse(name), dirent)
    }

    /// Declare a register on the nearest binding
    pub fn register(&mut self, name: &str, address: u64, width: BitWidth) -> Result<Register> {
        let binding = self
            .tree
            .binding(self.current.scope)
            .cloned()
            .ok_or_else(|| Error::NoBinding {
                name: name.to_string(),
            })?;
        let register = Register::new(binding, address, width);
        self.add(name, Dirent::Register(register.clone()))?;
        Ok(register)
    }

    /// Declare a field
    pub fn field(&mut self, name: &str, field: impl Field + 'static) -> Result<()> {
        self.add(name, Dirent::field(field))
    }

    /// Declare an alias to `target`, resolved relative to the current scope
    pub fn alias(&mut self, name: &str, target: impl Into<Path>) -> Result<()> {
        self.add(name, Dirent::Alias(Alias::new(target)))
    }

    /// Declare a named datatype
    pub fn datatype(&mut self, name: &str, datatype: SharedDatatype) {
        self.tree.add_datatype(self.current.scope, name, datatype);
    }

    /// Declare a datatype with no name
    pub fn anonymous_datatype(&mut self, datatype: SharedDatatype) {
        self.tree.add_datatype(self.current.scope, "", datatype);
    }

    /// Mark the current scope with a bookmark
    pub fn bookmark(&mut self, name: &str) {
        self.tree.add_bookmark(self.current.scope, name);
    }

    /// Attach a binding to the current scope
    pub fn bind(&mut self, binding: SharedBinding) {
        self.tree.set_binding(self.current.scope, binding);
    }

    /// Resolve a path from the current scope
    pub fn lookup(&self, path: impl Into<Path>, mode: LookupMode) -> Result<Option<DirentRef<'_>>> {
        self.tree.lookup(self.current.scope, &path.into(), mode)
    }

    /// Resolve a register from the current scope, for composing fields
    pub fn lookup_register(&self, path: impl Into<Path>) -> Result<Option<Register>> {
        Ok(self
            .tree
            .lookup_register(self.current.scope, &path.into())?
            .cloned())
    }

    /// Resolve a datatype from the current scope outwards
    pub fn resolve_datatype(&self, name: &str) -> Option<SharedDatatype> {
        self.tree
            .resolve_datatype(self.current.scope, name)
            .cloned()
    }

    /// Read-only view of the builder state
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tree: self.tree,
            current: self.current.scope,
            depth: self.depth(),
        }
    }

    /// End construction and return the starting scope
    ///
    /// # Panics
    ///
    /// Panics if scopes are still open.
    pub fn finish(self) -> ScopeId {
        assert!(
            self.stack.is_empty(),
            "{} scope(s) still open at finish",
            self.stack.len()
        );
        self.start
    }
}

/// Read-only view of a builder's position in the tree
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    tree: &'a HwTree,
    current: ScopeId,
    depth: usize,
}

impl<'a> Snapshot<'a> {
    /// Scope the builder was filling
    pub fn current(&self) -> ScopeRef<'a> {
        self.tree.scope(self.current)
    }

    /// Number of scopes open when the snapshot was taken
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Any scope of the tree
    pub fn scope(&self, id: ScopeId) -> ScopeRef<'a> {
        self.tree.scope(id)
    }

    /// Resolve a path from the current scope
    pub fn lookup(&self, path: impl Into<Path>, mode: LookupMode) -> Result<Option<DirentRef<'a>>> {
        self.tree.lookup(self.current, &path.into(), mode)
    }

    /// Resolve a datatype from the current scope outwards
    pub fn resolve_datatype(&self, name: &str) -> Option<&'a SharedDatatype> {
        self.tree.resolve_datatype(self.current, name)
    }
}
