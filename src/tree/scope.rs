// ABOUTME: Scope arena holding the hardware tree and its path resolution
// ABOUTME: Provides construction, datatype/binding climbing, lookup and traversal

use super::alias::Alias;
use super::array::Array;
use super::binding::SharedBinding;
use super::datatype::{Datatype, HexDatatype};
use super::dirent::{Dirent, DirentRef};
use super::error::{Error, Result};
use super::field::{Field, SharedDatatype};
use super::path::{Addressing, Path, PathElement};
use super::register::Register;
use super::value::Value;
use super::{NameMap, NameSet};
use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::fmt;
use core::num::NonZeroU32;
use log::{trace, warn};

/// Identifies a scope within its [`HwTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(NonZeroU32);

impl ScopeId {
    #[inline]
    fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index + 1).ok().and_then(NonZeroU32::new).map(Self)
    }

    #[inline]
    fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

/// Whether lookups transparently follow aliases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupMode {
    /// Return aliases as they are
    #[default]
    Literal,
    /// Resolve an alias in final position to its target
    FollowAliases,
}

/// One level of the hierarchy
#[derive(Debug, Default)]
pub struct Scope {
    parent: Option<ScopeId>,
    binding: Option<SharedBinding>,
    dirents: NameMap<Dirent>,
    datatypes: NameMap<SharedDatatype>,
    anonymous_datatypes: Vec<SharedDatatype>,
    bookmarks: NameSet,
}

impl Scope {
    /// Parent scope, unset for a root
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Whether this scope has no parent
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Binding attached directly to this scope
    pub fn own_binding(&self) -> Option<&SharedBinding> {
        self.binding.as_ref()
    }

    /// Attach or replace the binding of this scope
    pub fn set_binding(&mut self, binding: SharedBinding) {
        self.binding = Some(binding);
    }

    /// Direct child dirent by name
    pub fn dirent(&self, name: &str) -> Option<&Dirent> {
        self.dirents.get(name)
    }

    /// Whether a direct child dirent exists under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.dirents.contains_key(name)
    }

    /// Direct child dirents in insertion order
    pub fn dirents(&self) -> impl DoubleEndedIterator<Item = (&str, &Dirent)> {
        self.dirents.iter().map(|(name, dirent)| (name.as_str(), dirent))
    }

    /// Number of direct child dirents
    pub fn len(&self) -> usize {
        self.dirents.len()
    }

    /// Whether the scope has no dirents
    pub fn is_empty(&self) -> bool {
        self.dirents.is_empty()
    }

    /// Local named datatype
    pub fn datatype(&self, name: &str) -> Option<&SharedDatatype> {
        self.datatypes.get(name)
    }

    /// Local named datatypes in insertion order
    pub fn datatypes(&self) -> impl Iterator<Item = (&str, &SharedDatatype)> {
        self.datatypes.iter().map(|(name, dt)| (name.as_str(), dt))
    }

    /// Datatypes declared without a name
    pub fn anonymous_datatypes(&self) -> &[SharedDatatype] {
        &self.anonymous_datatypes
    }

    /// Declare a datatype; an empty name makes it anonymous
    pub fn add_datatype(&mut self, name: &str, datatype: SharedDatatype) {
        if name.is_empty() {
            self.anonymous_datatypes.push(datatype);
        } else if self.datatypes.insert(name.to_string(), datatype).is_some() {
            warn!("redefinition of datatype '{}'", name);
        }
    }

    /// Mark this scope with a bookmark
    pub fn add_bookmark(&mut self, name: &str) {
        self.bookmarks.insert(name.to_string());
    }

    /// Whether this scope carries a bookmark
    pub fn has_bookmark(&self, name: &str) -> bool {
        self.bookmarks.contains(name)
    }

    /// Bookmarks in insertion order
    pub fn bookmarks(&self) -> impl Iterator<Item = &str> {
        self.bookmarks.iter().map(String::as_str)
    }

    fn insert_dirent(&mut self, name: &str, dirent: Dirent, warn_redefinition: bool) -> Option<Dirent> {
        let previous = self.dirents.insert(name.to_string(), dirent);
        if previous.is_some() && warn_redefinition {
            warn!("redefinition of '{}'", name);
        }
        previous
    }

    fn append_dirent(&mut self, name: &str, dirent: Dirent) -> Result<()> {
        let kind = dirent.kind();
        let entry = self
            .dirents
            .entry(name.to_string())
            .or_insert_with(|| Dirent::Array(Array::new(kind)));
        let array = entry.as_array_mut().map_err(|err| err.at_element(name))?;
        array.append(dirent).map_err(|err| err.at_element(name))?;
        Ok(())
    }

    /// Path element under which `child` is stored here
    fn element_of(&self, child: ScopeId) -> Option<PathElement> {
        self.dirents.iter().find_map(|(name, dirent)| match dirent {
            Dirent::Scope(id) if *id == child => Some(PathElement::plain(name.as_str())),
            Dirent::Array(array) => array
                .iter()
                .position(|item| matches!(item, Dirent::Scope(id) if *id == child))
                .map(|index| PathElement::new(name.as_str(), Addressing::ArrayIndex(index))),
            _ => None,
        })
    }
}

/// Register or field resolved for value access
enum Accessor<'a> {
    Register(&'a Register),
    Field(&'a dyn Field),
}

/// Arena owning every scope of a hardware tree
///
/// Scopes refer to their parent by [`ScopeId`], so parent links never own
/// anything. The first scope is the primary root.
#[derive(Debug)]
pub struct HwTree {
    scopes: Vec<Scope>,
}

impl Default for HwTree {
    fn default() -> Self {
        Self::new()
    }
}

impl HwTree {
    /// Create a tree with an empty, unbound root scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Create a tree whose root scope uses `binding`
    pub fn with_binding(binding: SharedBinding) -> Self {
        let mut tree = Self::new();
        let root = tree.root();
        tree.get_mut(root).set_binding(binding);
        tree
    }

    /// The primary root scope
    pub fn root(&self) -> ScopeId {
        ScopeId(NonZeroU32::MIN)
    }

    /// Number of scopes in the arena, attached or not
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Borrow a scope as a navigable view
    pub fn scope(&self, id: ScopeId) -> ScopeRef<'_> {
        ScopeRef { tree: self, id }
    }

    /// Borrow a scope's data
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Mutably borrow a scope's data
    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    /// Create a detached scope, a root until it is added to a parent
    pub fn new_scope(&mut self, binding: Option<SharedBinding>) -> ScopeId {
        let id = ScopeId::from_index(self.scopes.len()).expect("scope arena exhausted");
        self.scopes.push(Scope {
            binding,
            ..Scope::default()
        });
        id
    }

    /// Create a scope whose parent is already `parent`, not yet named there
    pub fn new_child_scope(&mut self, parent: ScopeId, binding: Option<SharedBinding>) -> ScopeId {
        let id = self.new_scope(binding);
        self.get_mut(id).parent = Some(parent);
        id
    }

    /// Insert a dirent into `scope` under a plain or append element
    ///
    /// Plain elements overwrite an existing dirent with a warning. Append
    /// elements add to the array named by the element, creating it with the
    /// dirent's kind if needed. Inserting a scope links its parent to
    /// `scope`. Scopes displaced by an overwrite are detached and stay in the
    /// arena as roots.
    ///
    /// # Panics
    ///
    /// Panics if a scope dirent already belongs to another parent, is
    /// already stored in `scope`, or is an ancestor of `scope`.
    pub fn add_dirent(&mut self, scope: ScopeId, element: &PathElement, dirent: Dirent) -> Result<()> {
        self.insert_dirent(scope, element, dirent, true)
    }

    pub(crate) fn insert_dirent(
        &mut self,
        scope: ScopeId,
        element: &PathElement,
        dirent: Dirent,
        warn_redefinition: bool,
    ) -> Result<()> {
        let child = dirent.as_scope().ok();
        if let Some(child) = child {
            self.check_adoptable(scope, child);
        }

        match element.addressing {
            Addressing::Plain => {
                let displaced =
                    self.get_mut(scope)
                        .insert_dirent(&element.name, dirent, warn_redefinition);
                if let Some(displaced) = displaced {
                    self.detach(&displaced);
                }
            }
            Addressing::ArrayAppend => self.get_mut(scope).append_dirent(&element.name, dirent)?,
            _ => {
                return Err(Error::InvalidPath(format!(
                    "array write is not an append: '{}'",
                    element
                )));
            }
        }

        if let Some(child) = child {
            self.get_mut(child).parent = Some(scope);
        }
        Ok(())
    }

    fn check_adoptable(&self, parent: ScopeId, child: ScopeId) {
        if let Some(existing) = self.get(child).parent {
            assert_eq!(
                existing, parent,
                "scope {} already belongs to scope {}",
                child, existing
            );
        }
        assert!(
            self.get(parent).element_of(child).is_none(),
            "scope {} is already stored in scope {}",
            child,
            parent
        );
        assert!(
            !self.ancestors(parent).any(|id| id == child),
            "scope {} cannot be added below itself",
            child
        );
    }

    /// Unlink scopes held by a dirent that left the tree
    fn detach(&mut self, dirent: &Dirent) {
        match dirent {
            Dirent::Scope(id) => self.orphan(*id),
            Dirent::Array(array) => {
                for item in array {
                    self.detach(item);
                }
            }
            _ => {}
        }
    }

    /// Clear the parent of a scope that is not stored under any name
    pub(crate) fn orphan(&mut self, scope: ScopeId) {
        self.get_mut(scope).parent = None;
    }

    /// Declare a datatype in `scope`; an empty name makes it anonymous
    pub fn add_datatype(&mut self, scope: ScopeId, name: &str, datatype: SharedDatatype) {
        self.get_mut(scope).add_datatype(name, datatype);
    }

    /// Mark `scope` with a bookmark
    pub fn add_bookmark(&mut self, scope: ScopeId, name: &str) {
        self.get_mut(scope).add_bookmark(name);
    }

    /// Attach a binding to `scope`
    pub fn set_binding(&mut self, scope: ScopeId, binding: SharedBinding) {
        self.get_mut(scope).set_binding(binding);
    }

    /// `scope` followed by each of its ancestors up to the root
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        core::iter::successors(Some(scope), move |id| self.get(*id).parent)
    }

    /// Top-most ancestor of `scope`
    pub fn root_of(&self, scope: ScopeId) -> ScopeId {
        self.ancestors(scope).last().unwrap_or(scope)
    }

    /// Parent of `scope`, or `scope` itself at the root
    pub fn parent_or_self(&self, scope: ScopeId) -> ScopeId {
        self.get(scope).parent.unwrap_or(scope)
    }

    /// Nearest binding, searching `scope` then its ancestors
    pub fn binding(&self, scope: ScopeId) -> Option<&SharedBinding> {
        self.ancestors(scope)
            .find_map(|id| self.get(id).binding.as_ref())
    }

    /// Resolve a datatype by name, falling back to enclosing scopes
    pub fn resolve_datatype(&self, scope: ScopeId, name: &str) -> Option<&SharedDatatype> {
        self.ancestors(scope)
            .find_map(|id| self.get(id).datatypes.get(name))
    }

    /// Nearest scope, from `scope` upwards, carrying bookmark `name`
    pub fn find_bookmark(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        self.ancestors(scope).find(|id| self.get(*id).has_bookmark(name))
    }

    /// Resolve `path` relative to `scope`
    ///
    /// Returns `Ok(None)` when the path does not resolve. Errors mean the
    /// path is ill-typed: an array addressed element that is not an array,
    /// an intermediate element that is not a scope, or an alias cycle.
    pub fn lookup(&self, scope: ScopeId, path: &Path, mode: LookupMode) -> Result<Option<DirentRef<'_>>> {
        let mut visited = Vec::new();
        self.lookup_from(scope, path, mode, &mut visited)
    }

    fn lookup_from<'a>(
        &'a self,
        scope: ScopeId,
        path: &Path,
        mode: LookupMode,
        visited: &mut Vec<&'a Alias>,
    ) -> Result<Option<DirentRef<'a>>> {
        let start = if path.is_absolute() {
            self.root_of(scope)
        } else {
            scope
        };

        if path.is_empty() {
            return Ok(Some(DirentRef::Scope(self.scope(start))));
        }

        self.lookup_elements(start, path.elements(), mode, visited)
    }

    fn lookup_elements<'a>(
        &'a self,
        scope: ScopeId,
        elements: &[PathElement],
        mode: LookupMode,
        visited: &mut Vec<&'a Alias>,
    ) -> Result<Option<DirentRef<'a>>> {
        let (element, rest) = elements.split_first().ok_or(Error::EmptyPath)?;

        let candidate = match element.addressing {
            Addressing::ParentRef => DirentRef::Scope(self.scope(self.parent_or_self(scope))),
            Addressing::Bookmark => match self.find_bookmark(scope, &element.name) {
                Some(marked) => DirentRef::Scope(self.scope(marked)),
                None => return Ok(None),
            },
            _ => match self.get(scope).dirent(&element.name) {
                Some(dirent) => dirent.view(self),
                None => return Ok(None),
            },
        };

        let candidate = if element.addressing.is_array() {
            let array = candidate
                .as_array()
                .map_err(|err| err.at_element(&element.name))?;
            let index = match element.addressing {
                Addressing::ArrayIndex(index) if index < array.size() => index,
                Addressing::ArrayTail if !array.is_empty() => array.size() - 1,
                _ => return Ok(None),
            };
            array.at(index)?.view(self)
        } else {
            candidate
        };

        if rest.is_empty() {
            return match (mode, candidate) {
                (LookupMode::FollowAliases, DirentRef::Alias(alias)) => {
                    self.follow_alias(scope, alias, visited)
                }
                _ => Ok(Some(candidate)),
            };
        }

        let next = candidate
            .as_scope()
            .map_err(|err| err.at_element(&element.name))?;
        self.lookup_elements(next.id(), rest, mode, visited)
    }

    fn follow_alias<'a>(
        &'a self,
        scope: ScopeId,
        alias: &'a Alias,
        visited: &mut Vec<&'a Alias>,
    ) -> Result<Option<DirentRef<'a>>> {
        if visited.iter().any(|seen| core::ptr::eq(*seen, alias)) {
            return Err(Error::AliasCycle {
                target: alias.target().to_string(),
            });
        }
        visited.push(alias);
        trace!("following alias to '{}'", alias.target());
        self.lookup_from(scope, alias.target(), LookupMode::FollowAliases, visited)
    }

    /// Whether `path` resolves without error
    pub fn dirent_defined(&self, scope: ScopeId, path: &Path) -> bool {
        matches!(self.lookup(scope, path, LookupMode::Literal), Ok(Some(_)))
    }

    /// Resolve `path` to a register, following aliases
    pub fn lookup_register(&self, scope: ScopeId, path: &Path) -> Result<Option<&Register>> {
        let found = self.lookup(scope, path, LookupMode::FollowAliases)?;
        Ok(found.map(DirentRef::as_register).transpose()?)
    }

    /// Resolve `path` to a field, following aliases
    pub fn lookup_field(&self, scope: ScopeId, path: &Path) -> Result<Option<&dyn Field>> {
        let found = self.lookup(scope, path, LookupMode::FollowAliases)?;
        Ok(found.map(DirentRef::as_field).transpose()?)
    }

    /// Resolve `path` to a scope, following aliases
    pub fn lookup_scope(&self, scope: ScopeId, path: &Path) -> Result<Option<ScopeRef<'_>>> {
        let found = self.lookup(scope, path, LookupMode::FollowAliases)?;
        Ok(found.map(DirentRef::as_scope).transpose()?)
    }

    /// Resolve `path` to an array, following aliases
    pub fn lookup_array(&self, scope: ScopeId, path: &Path) -> Result<Option<&Array>> {
        let found = self.lookup(scope, path, LookupMode::FollowAliases)?;
        Ok(found.map(DirentRef::as_array).transpose()?)
    }

    /// Resolve `path` to an alias without following it
    pub fn lookup_alias(&self, scope: ScopeId, path: &Path) -> Result<Option<&Alias>> {
        let found = self.lookup(scope, path, LookupMode::Literal)?;
        Ok(found.map(DirentRef::as_alias).transpose()?)
    }

    fn accessor(&self, scope: ScopeId, path: &Path) -> Result<Accessor<'_>> {
        match self.lookup(scope, path, LookupMode::FollowAliases)? {
            Some(DirentRef::Register(register)) => Ok(Accessor::Register(register)),
            Some(DirentRef::Field(field)) => Ok(Accessor::Field(field)),
            Some(other) => Err(Error::NotAccessible {
                path: path.to_string(),
                kind: other.kind(),
            }),
            None => Err(Error::NotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Read the register or field at `path`
    pub fn read(&self, scope: ScopeId, path: &Path) -> Result<Value> {
        match self.accessor(scope, path)? {
            Accessor::Register(register) => register.read(),
            Accessor::Field(field) => field.read(),
        }
    }

    /// Write the register or field at `path`
    pub fn write(&self, scope: ScopeId, path: &Path, value: Value) -> Result<()> {
        match self.accessor(scope, path)? {
            Accessor::Register(register) => register.write(value),
            Accessor::Field(field) => field.write(value),
        }
    }

    /// Read and render the register or field at `path`
    ///
    /// Registers render as zero padded hex of their width.
    pub fn evaluate(&self, scope: ScopeId, path: &Path) -> Result<String> {
        match self.accessor(scope, path)? {
            Accessor::Register(register) => {
                let value = register.read()?;
                Ok(HexDatatype::new(register.width().bits()).evaluate(value))
            }
            Accessor::Field(field) => field.evaluate(),
        }
    }

    /// Absolute path of `scope` from its root
    ///
    /// A scope that has a parent but has not been inserted under a name
    /// yet contributes no element.
    pub fn path_of(&self, scope: ScopeId) -> Path {
        let mut elements = Vec::new();
        let mut current = scope;
        while let Some(parent) = self.get(current).parent {
            if let Some(element) = self.get(parent).element_of(current) {
                elements.push(element);
            }
            current = parent;
        }
        elements.reverse();

        let mut path = Path::from_elements(elements);
        path.set_absolute(true);
        path
    }

    /// Depth-first iterator over every dirent below `scope`
    pub fn walk(&self, scope: ScopeId) -> Walk<'_> {
        Walk::new(self, scope)
    }
}

/// Borrowed handle to one scope of a tree
#[derive(Clone, Copy)]
pub struct ScopeRef<'a> {
    tree: &'a HwTree,
    id: ScopeId,
}

impl fmt::Debug for ScopeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRef").field("id", &self.id).finish()
    }
}

impl PartialEq for ScopeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for ScopeRef<'_> {}

impl<'a> ScopeRef<'a> {
    /// Id of this scope
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Tree the scope belongs to
    pub fn tree(&self) -> &'a HwTree {
        self.tree
    }

    /// Scope data
    pub fn data(&self) -> &'a Scope {
        self.tree.get(self.id)
    }

    /// Parent scope, if any
    pub fn parent(&self) -> Option<ScopeRef<'a>> {
        self.data().parent.map(|id| self.tree.scope(id))
    }

    /// Whether this scope has no parent
    pub fn is_root(&self) -> bool {
        self.data().is_root()
    }

    /// Top-most ancestor
    pub fn root(&self) -> ScopeRef<'a> {
        self.tree.scope(self.tree.root_of(self.id))
    }

    /// Nearest binding, searching ancestors
    pub fn binding(&self) -> Option<&'a SharedBinding> {
        self.tree.binding(self.id)
    }

    /// Direct child dirent by name
    pub fn dirent(&self, name: &str) -> Option<DirentRef<'a>> {
        self.data().dirent(name).map(|dirent| dirent.view(self.tree))
    }

    /// Whether this scope carries a bookmark
    pub fn has_bookmark(&self, name: &str) -> bool {
        self.data().has_bookmark(name)
    }

    /// Resolve a datatype by name, falling back to enclosing scopes
    pub fn resolve_datatype(&self, name: &str) -> Option<&'a SharedDatatype> {
        self.tree.resolve_datatype(self.id, name)
    }

    /// Resolve a path relative to this scope
    pub fn lookup(&self, path: impl Into<Path>, mode: LookupMode) -> Result<Option<DirentRef<'a>>> {
        self.tree.lookup(self.id, &path.into(), mode)
    }

    /// Whether a path resolves without error
    pub fn dirent_defined(&self, path: impl Into<Path>) -> bool {
        self.tree.dirent_defined(self.id, &path.into())
    }

    /// Resolve a path to a register
    pub fn lookup_register(&self, path: impl Into<Path>) -> Result<Option<&'a Register>> {
        self.tree.lookup_register(self.id, &path.into())
    }

    /// Resolve a path to a field
    pub fn lookup_field(&self, path: impl Into<Path>) -> Result<Option<&'a dyn Field>> {
        self.tree.lookup_field(self.id, &path.into())
    }

    /// Resolve a path to a scope
    pub fn lookup_scope(&self, path: impl Into<Path>) -> Result<Option<ScopeRef<'a>>> {
        self.tree.lookup_scope(self.id, &path.into())
    }

    /// Resolve a path to an array
    pub fn lookup_array(&self, path: impl Into<Path>) -> Result<Option<&'a Array>> {
        self.tree.lookup_array(self.id, &path.into())
    }

    /// Resolve a path to an alias without following it
    pub fn lookup_alias(&self, path: impl Into<Path>) -> Result<Option<&'a Alias>> {
        self.tree.lookup_alias(self.id, &path.into())
    }

    /// Read the register or field at a path
    pub fn read(&self, path: impl Into<Path>) -> Result<Value> {
        self.tree.read(self.id, &path.into())
    }

    /// Write the register or field at a path
    pub fn write(&self, path: impl Into<Path>, value: Value) -> Result<()> {
        self.tree.write(self.id, &path.into(), value)
    }

    /// Read and render the register or field at a path
    pub fn evaluate(&self, path: impl Into<Path>) -> Result<String> {
        self.tree.evaluate(self.id, &path.into())
    }

    /// Absolute path of this scope
    pub fn path(&self) -> Path {
        self.tree.path_of(self.id)
    }

    /// Depth-first iterator over every dirent below this scope
    pub fn walk(&self) -> Walk<'a> {
        self.tree.walk(self.id)
    }
}

/// Depth-first traversal yielding each dirent with its path relative to the start
pub struct Walk<'a> {
    tree: &'a HwTree,
    stack: Vec<(Path, DirentRef<'a>)>,
}

impl<'a> Walk<'a> {
    fn new(tree: &'a HwTree, scope: ScopeId) -> Self {
        let mut walk = Self {
            tree,
            stack: Vec::new(),
        };
        walk.push_scope(&Path::new(), scope);
        walk
    }

    fn push_scope(&mut self, base: &Path, scope: ScopeId) {
        let tree = self.tree;
        // Reverse order so the first child is popped first
        for (name, dirent) in tree.get(scope).dirents().rev() {
            let mut path = base.clone();
            path.push(PathElement::plain(name));
            self.stack.push((path, dirent.view(tree)));
        }
    }

    fn push_array(&mut self, base: &Path, array: &'a Array) {
        let Some(last) = base.back() else {
            return;
        };
        for (index, dirent) in array.iter().enumerate().rev() {
            let mut path = base.clone();
            // The array's own element is replaced by an indexed one
            let _ = path.pop_back();
            path.push(PathElement::new(
                last.name.as_str(),
                Addressing::ArrayIndex(index),
            ));
            self.stack.push((path, dirent.view(self.tree)));
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (Path, DirentRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, dirent) = self.stack.pop()?;
        match dirent {
            DirentRef::Scope(scope) => self.push_scope(&path, scope.id()),
            DirentRef::Array(array) => self.push_array(&path, array),
            _ => {}
        }
        Some((path, dirent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::binding::SimBinding;
    use crate::tree::datatype::IntDatatype;
    use crate::tree::dirent::DirentKind;
    use crate::tree::field::ConstantField;
    use crate::tree::value::BitWidth;
    use alloc::rc::Rc;

    fn walk_kinds(walk: Walk<'_>) -> Vec<DirentKind> {
        walk.map(|(_, dirent)| dirent.kind()).collect()
    }

    fn field(value: Value) -> Dirent {
        Dirent::field(ConstantField::new(value))
    }

    fn attach(tree: &mut HwTree, parent: ScopeId, name: &str) -> ScopeId {
        let child = tree.new_scope(None);
        tree.add_dirent(parent, &PathElement::parse(name), Dirent::Scope(child))
            .unwrap();
        child
    }

    #[test]
    fn test_tree_creation() {
        let tree = HwTree::new();
        let root = tree.scope(tree.root());
        assert!(root.is_root());
        assert!(root.parent().is_none());
        assert_eq!(tree.scope_count(), 1);
        assert!(root.binding().is_none());
    }

    #[test]
    fn test_add_dirent_sets_parent_once() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let cpu = attach(&mut tree, root, "cpu");

        assert_eq!(tree.get(cpu).parent(), Some(root));
        assert!(!tree.get(cpu).is_root());
        assert_eq!(tree.root_of(cpu), root);
    }

    #[test]
    #[should_panic(expected = "already belongs")]
    fn test_add_scope_to_second_parent_panics() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let a = attach(&mut tree, root, "a");
        let b = attach(&mut tree, root, "b");
        tree.add_dirent(b, &PathElement::plain("a"), Dirent::Scope(a))
            .unwrap();
    }

    #[test]
    #[should_panic(expected = "already stored")]
    fn test_add_scope_twice_to_same_parent_panics() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let a = attach(&mut tree, root, "a");
        tree.add_dirent(root, &PathElement::plain("b"), Dirent::Scope(a))
            .unwrap();
    }

    #[test]
    #[should_panic(expected = "already stored")]
    fn test_add_array_member_again_panics() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let cpu = attach(&mut tree, root, "cpu[]");
        tree.add_dirent(root, &PathElement::parse("cpu[]"), Dirent::Scope(cpu))
            .unwrap();
    }

    #[test]
    fn test_overwritten_scopes_are_detached() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let old = attach(&mut tree, root, "dev");
        let first = attach(&mut tree, root, "bank[]");
        let second = attach(&mut tree, root, "bank[]");

        let replacement = attach(&mut tree, root, "dev");
        tree.add_dirent(root, &PathElement::plain("bank"), field(0))
            .unwrap();

        assert!(tree.get(old).is_root());
        assert!(tree.get(first).is_root());
        assert!(tree.get(second).is_root());
        assert_eq!(tree.get(replacement).parent(), Some(root));
        assert_eq!(tree.path_of(replacement).to_string(), "/dev");
        // Detached scopes can be stored again
        tree.add_dirent(root, &PathElement::plain("old"), Dirent::Scope(old))
            .unwrap();
        assert_eq!(tree.path_of(old).to_string(), "/old");
    }

    #[test]
    #[should_panic(expected = "below itself")]
    fn test_add_root_below_descendant_panics() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let a = attach(&mut tree, root, "a");
        tree.add_dirent(a, &PathElement::plain("root"), Dirent::Scope(root))
            .unwrap();
    }

    #[test]
    fn test_redefinition_overwrites_in_place() {
        let mut tree = HwTree::new();
        let root = tree.root();
        tree.add_dirent(root, &PathElement::plain("x"), field(1)).unwrap();
        tree.add_dirent(root, &PathElement::plain("y"), field(2)).unwrap();
        tree.add_dirent(root, &PathElement::plain("x"), field(3)).unwrap();

        let names: Vec<_> = tree.get(root).dirents().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(tree.scope(root).read("x").unwrap(), 3);
    }

    #[test]
    fn test_add_dirent_rejects_index_addressing() {
        let mut tree = HwTree::new();
        let root = tree.root();
        for segment in ["regs[0]", "regs[-1]", "$mark", ".."] {
            let err = tree
                .add_dirent(root, &PathElement::parse(segment), field(0))
                .unwrap_err();
            assert!(matches!(err, Error::InvalidPath(_)), "{}", segment);
        }
        assert!(tree.get(root).is_empty());
    }

    #[test]
    fn test_append_creates_and_extends_array() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let append = PathElement::parse("regs[]");
        tree.add_dirent(root, &append, field(10)).unwrap();
        tree.add_dirent(root, &append, field(20)).unwrap();

        let scope = tree.scope(root);
        let array = scope.lookup_array("regs").unwrap().unwrap();
        assert_eq!(array.size(), 2);
        assert_eq!(array.element_kind(), DirentKind::Field);
        assert_eq!(scope.read("regs[0]").unwrap(), 10);
        assert_eq!(scope.read("regs[-1]").unwrap(), 20);
    }

    #[test]
    fn test_append_kind_mismatch() {
        let mut tree = HwTree::new();
        let root = tree.root();
        tree.add_dirent(root, &PathElement::parse("regs[]"), field(1))
            .unwrap();
        let sub = tree.new_scope(None);
        let err = tree
            .add_dirent(root, &PathElement::parse("regs[]"), Dirent::Scope(sub))
            .unwrap_err();
        let conversion = err.as_conversion().unwrap();
        assert_eq!(conversion.requested, DirentKind::Field);
        assert_eq!(conversion.actual, DirentKind::Scope);
        // The rejected scope stays detached
        assert!(tree.get(sub).is_root());

        tree.add_dirent(root, &PathElement::plain("plain"), field(1))
            .unwrap();
        let err = tree
            .add_dirent(root, &PathElement::parse("plain[]"), field(2))
            .unwrap_err();
        assert_eq!(err.as_conversion().unwrap().requested, DirentKind::Array);
    }

    #[test]
    fn test_append_scopes_into_array() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let cpu0 = attach(&mut tree, root, "cpu[]");
        let cpu1 = attach(&mut tree, root, "cpu[]");

        assert_eq!(tree.get(cpu1).parent(), Some(root));
        let scope = tree.scope(root);
        assert_eq!(scope.lookup_scope("cpu[0]").unwrap().unwrap().id(), cpu0);
        assert_eq!(scope.lookup_scope("cpu[-1]").unwrap().unwrap().id(), cpu1);
        assert_eq!(tree.path_of(cpu1).to_string(), "/cpu[1]");
    }

    #[test]
    fn test_lookup_empty_and_root_paths() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let a = attach(&mut tree, root, "a");

        let found = tree.lookup(a, &Path::new(), LookupMode::Literal).unwrap().unwrap();
        assert!(found.is_scope_id(a));
        let found = tree.lookup(a, &Path::root(), LookupMode::Literal).unwrap().unwrap();
        assert!(found.is_scope_id(root));
    }

    #[test]
    fn test_lookup_nested_and_parent() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let a = attach(&mut tree, root, "a");
        let b = attach(&mut tree, a, "b");

        let scope = tree.scope(root);
        assert!(scope.lookup("a/b", LookupMode::Literal).unwrap().unwrap().is_scope_id(b));
        assert!(scope.lookup("a/b/..", LookupMode::Literal).unwrap().unwrap().is_scope_id(a));
        assert!(scope.lookup("..", LookupMode::Literal).unwrap().unwrap().is_scope_id(root));
        assert!(tree.scope(b).lookup("/a", LookupMode::Literal).unwrap().unwrap().is_scope_id(a));
        assert!(scope.lookup("a/missing/b", LookupMode::Literal).unwrap().is_none());
    }

    #[test]
    fn test_lookup_through_non_scope_fails() {
        let mut tree = HwTree::new();
        let root = tree.root();
        tree.add_dirent(root, &PathElement::plain("leaf"), field(1)).unwrap();

        let err = tree
            .scope(root)
            .lookup("leaf/below", LookupMode::Literal)
            .unwrap_err();
        let conversion = err.as_conversion().unwrap();
        assert_eq!(conversion.requested, DirentKind::Scope);
        assert_eq!(conversion.actual, DirentKind::Field);
        assert_eq!(conversion.element.as_deref(), Some("leaf"));
    }

    #[test]
    fn test_array_addressing_edges() {
        let mut tree = HwTree::new();
        let root = tree.root();
        tree.add_dirent(root, &PathElement::plain("leaf"), field(1)).unwrap();
        tree.add_dirent(root, &PathElement::parse("regs[]"), field(1)).unwrap();

        let scope = tree.scope(root);
        let err = scope.lookup("leaf[0]", LookupMode::Literal).unwrap_err();
        assert_eq!(err.as_conversion().unwrap().requested, DirentKind::Array);

        assert!(scope.lookup("regs[]", LookupMode::Literal).unwrap().is_none());
        assert!(scope.lookup("regs[1]", LookupMode::Literal).unwrap().is_none());
        assert!(scope.lookup("regs[0]", LookupMode::Literal).unwrap().is_some());
        assert!(scope.lookup("missing[0]", LookupMode::Literal).unwrap().is_none());
    }

    #[test]
    fn test_tail_of_empty_array_not_found() {
        let mut tree = HwTree::new();
        let root = tree.root();
        tree.add_dirent(
            root,
            &PathElement::plain("empty"),
            Dirent::Array(Array::new(DirentKind::Field)),
        )
        .unwrap();
        assert!(tree.scope(root).lookup("empty[-1]", LookupMode::Literal).unwrap().is_none());
    }

    #[test]
    fn test_bookmarks() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let pci = attach(&mut tree, root, "pci");
        let dev = attach(&mut tree, pci, "dev");
        let other = attach(&mut tree, root, "other");
        tree.add_bookmark(pci, "bus");
        tree.add_dirent(pci, &PathElement::plain("id"), field(7)).unwrap();

        assert_eq!(tree.find_bookmark(dev, "bus"), Some(pci));
        assert_eq!(tree.scope(dev).read("$bus/id").unwrap(), 7);
        assert!(tree.scope(pci).lookup("$bus", LookupMode::Literal).unwrap().unwrap().is_scope_id(pci));
        assert!(tree.scope(other).lookup("$bus", LookupMode::Literal).unwrap().is_none());
        assert!(!tree.scope(root).dirent_defined("$bus/id"));
    }

    #[test]
    fn test_aliases() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let cpu = attach(&mut tree, root, "cpu");
        tree.add_dirent(cpu, &PathElement::plain("count"), field(4)).unwrap();
        tree.add_dirent(root, &PathElement::plain("ncpu"), Dirent::Alias(Alias::new("cpu/count")))
            .unwrap();
        tree.add_dirent(cpu, &PathElement::plain("up"), Dirent::Alias(Alias::new("..")))
            .unwrap();
        tree.add_dirent(cpu, &PathElement::plain("abs"), Dirent::Alias(Alias::new("/ncpu")))
            .unwrap();

        let scope = tree.scope(root);
        assert!(scope.lookup("ncpu", LookupMode::Literal).unwrap().unwrap().is_alias());
        assert!(scope.lookup("ncpu", LookupMode::FollowAliases).unwrap().unwrap().is_field());
        assert_eq!(scope.read("cpu/abs").unwrap(), 4);
        assert!(scope.lookup("cpu/up", LookupMode::FollowAliases).unwrap().unwrap().is_scope_id(root));
        assert_eq!(scope.lookup_alias("ncpu").unwrap().unwrap().target(), &Path::parse("cpu/count"));
        // Intermediate aliases are not traversed
        assert!(scope.lookup("cpu/up/cpu", LookupMode::FollowAliases).is_err());
    }

    #[test]
    fn test_alias_cycle_detected() {
        let mut tree = HwTree::new();
        let root = tree.root();
        tree.add_dirent(root, &PathElement::plain("a"), Dirent::Alias(Alias::new("b")))
            .unwrap();
        tree.add_dirent(root, &PathElement::plain("b"), Dirent::Alias(Alias::new("/a")))
            .unwrap();
        tree.add_dirent(root, &PathElement::plain("me"), Dirent::Alias(Alias::new("me")))
            .unwrap();

        let scope = tree.scope(root);
        assert!(matches!(
            scope.lookup("a", LookupMode::FollowAliases),
            Err(Error::AliasCycle { .. })
        ));
        assert!(matches!(
            scope.lookup("me", LookupMode::FollowAliases),
            Err(Error::AliasCycle { .. })
        ));
        assert!(scope.dirent_defined("a"));
    }

    #[test]
    fn test_typed_lookups() {
        let sim = Rc::new(SimBinding::new());
        let mut tree = HwTree::with_binding(sim.clone());
        let root = tree.root();
        let reg = Register::new(sim, 0, BitWidth::Bits32);
        tree.add_dirent(root, &PathElement::plain("%eax"), Dirent::Register(reg)).unwrap();
        tree.add_dirent(root, &PathElement::plain("vendor"), field(1)).unwrap();

        let scope = tree.scope(root);
        assert!(scope.lookup_register("%eax").unwrap().is_some());
        assert!(scope.lookup_register("vendor").unwrap_err().is_conversion());
        assert!(scope.lookup_register("missing").unwrap().is_none());
        assert!(scope.lookup_field("vendor").unwrap().is_some());
        assert!(scope.lookup_scope("").unwrap().is_some());
        assert!(scope.lookup_array("vendor").is_err());
    }

    #[test]
    fn test_value_access_errors() {
        let mut tree = HwTree::new();
        let root = tree.root();
        attach(&mut tree, root, "cpu");

        let scope = tree.scope(root);
        assert!(matches!(scope.read("nothing"), Err(Error::NotFound { .. })));
        assert!(matches!(
            scope.write("cpu", 1),
            Err(Error::NotAccessible { kind: DirentKind::Scope, .. })
        ));
    }

    #[test]
    fn test_evaluate_register_and_field() {
        let sim = Rc::new(SimBinding::new().with_value(0x10, 0xbeef));
        let mut tree = HwTree::with_binding(sim.clone());
        let root = tree.root();
        tree.add_dirent(
            root,
            &PathElement::plain("status"),
            Dirent::Register(Register::new(sim, 0x10, BitWidth::Bits32)),
        )
        .unwrap();
        tree.add_dirent(root, &PathElement::plain("count"), field(12)).unwrap();

        let scope = tree.scope(root);
        assert_eq!(scope.evaluate("status").unwrap(), "0x0000beef");
        assert_eq!(scope.evaluate("count").unwrap(), "12");
    }

    #[test]
    fn test_datatype_resolution_climbs() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let a = attach(&mut tree, root, "a");
        let b = attach(&mut tree, a, "b");
        tree.add_datatype(root, "int", Rc::new(IntDatatype::new()));
        tree.add_datatype(a, "mhz", Rc::new(IntDatatype::with_units("MHz")));
        tree.add_datatype(b, "", Rc::new(IntDatatype::new()));

        let scope = tree.scope(b);
        assert_eq!(scope.resolve_datatype("mhz").unwrap().evaluate(5), "5 MHz");
        assert!(scope.resolve_datatype("int").is_some());
        assert!(scope.resolve_datatype("missing").is_none());
        assert!(tree.scope(root).resolve_datatype("mhz").is_none());
        assert_eq!(tree.get(b).anonymous_datatypes().len(), 1);
        assert!(tree.get(b).datatype("").is_none());
    }

    #[test]
    fn test_binding_climbs_to_ancestor() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let io = attach(&mut tree, root, "io");
        let dev = attach(&mut tree, io, "dev");
        assert!(tree.binding(dev).is_none());

        tree.set_binding(io, Rc::new(SimBinding::new()));
        assert!(tree.binding(dev).is_some());
        assert!(tree.binding(root).is_none());
    }

    #[test]
    fn test_path_of_and_walk() {
        let mut tree = HwTree::new();
        let root = tree.root();
        let pci = attach(&mut tree, root, "pci");
        let dev = attach(&mut tree, pci, "dev[]");
        tree.add_dirent(dev, &PathElement::plain("id"), field(1)).unwrap();
        tree.add_dirent(root, &PathElement::plain("top"), field(2)).unwrap();

        assert_eq!(tree.path_of(dev).to_string(), "/pci/dev[0]");
        assert_eq!(tree.path_of(root), Path::root());

        let paths: Vec<_> = tree
            .walk(root)
            .map(|(path, _)| path.to_string())
            .collect();
        assert_eq!(paths, vec!["pci", "pci/dev", "pci/dev[0]", "pci/dev[0]/id", "top"]);
        assert_eq!(
            walk_kinds(tree.walk(pci)),
            vec![DirentKind::Array, DirentKind::Scope, DirentKind::Field]
        );
    }
}
