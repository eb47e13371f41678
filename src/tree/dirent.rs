// ABOUTME: Directory entries of the hardware tree and their kind discriminant
// ABOUTME: Provides the owned Dirent sum type, borrowed views and safe downcasts

use super::alias::Alias;
use super::array::Array;
use super::error::ConversionError;
use super::field::Field;
use super::register::Register;
use super::scope::{HwTree, ScopeId, ScopeRef};
use alloc::boxed::Box;
use core::fmt;

/// Discriminant of a dirent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirentKind {
    /// Hardware register
    Register,
    /// Decoded field
    Field,
    /// Nested scope
    Scope,
    /// Homogeneous array
    Array,
    /// Symbolic reference to another path
    Alias,
}

impl DirentKind {
    /// Kind name prefixed with its indefinite article
    pub fn with_article(self) -> &'static str {
        match self {
            DirentKind::Register => "a register",
            DirentKind::Field => "a field",
            DirentKind::Scope => "a scope",
            DirentKind::Array => "an array",
            DirentKind::Alias => "an alias",
        }
    }
}

impl fmt::Display for DirentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DirentKind::Register => "register",
            DirentKind::Field => "field",
            DirentKind::Scope => "scope",
            DirentKind::Array => "array",
            DirentKind::Alias => "alias",
        };
        f.write_str(name)
    }
}

/// Owned entry stored in a scope or array
///
/// Scopes live in the [`HwTree`] arena, so a scope entry holds its id.
#[derive(Debug)]
pub enum Dirent {
    /// Hardware register
    Register(Register),
    /// Decoded field
    Field(Box<dyn Field>),
    /// Nested scope
    Scope(ScopeId),
    /// Homogeneous array
    Array(Array),
    /// Symbolic reference to another path
    Alias(Alias),
}

/// Generates `is_*`, `as_*` and `as_*_mut` for variants holding a sized value inline
macro_rules! downcasts {
    ($($variant:ident: $ty:ty => $is:ident, $as:ident, $as_mut:ident;)*) => {
        $(
            #[doc = concat!("Whether this dirent is a `", stringify!($variant), "`")]
            pub fn $is(&self) -> bool {
                self.kind() == DirentKind::$variant
            }

            #[doc = concat!("View this dirent as a `", stringify!($variant), "`")]
            pub fn $as(&self) -> Result<&$ty, ConversionError> {
                match self {
                    Dirent::$variant(inner) => {
                        let inner: &$ty = inner;
                        Ok(inner)
                    }
                    other => Err(ConversionError::new(DirentKind::$variant, other.kind())),
                }
            }

            #[doc = concat!("Mutably view this dirent as a `", stringify!($variant), "`")]
            pub fn $as_mut(&mut self) -> Result<&mut $ty, ConversionError> {
                match self {
                    Dirent::$variant(inner) => {
                        let inner: &mut $ty = inner;
                        Ok(inner)
                    }
                    other => Err(ConversionError::new(DirentKind::$variant, other.kind())),
                }
            }
        )*
    };
}

impl Dirent {
    /// Wrap a field implementation
    pub fn field(field: impl Field + 'static) -> Self {
        Dirent::Field(Box::new(field))
    }

    /// Kind of this dirent
    pub fn kind(&self) -> DirentKind {
        match self {
            Dirent::Register(_) => DirentKind::Register,
            Dirent::Field(_) => DirentKind::Field,
            Dirent::Scope(_) => DirentKind::Scope,
            Dirent::Array(_) => DirentKind::Array,
            Dirent::Alias(_) => DirentKind::Alias,
        }
    }

    downcasts! {
        Register: Register => is_register, as_register, as_register_mut;
        Array: Array => is_array, as_array, as_array_mut;
        Alias: Alias => is_alias, as_alias, as_alias_mut;
    }

    /// Whether this dirent is a `Field`
    pub fn is_field(&self) -> bool {
        self.kind() == DirentKind::Field
    }

    /// View this dirent as a `Field`
    pub fn as_field(&self) -> Result<&dyn Field, ConversionError> {
        match self {
            Dirent::Field(field) => Ok(field.as_ref()),
            other => Err(ConversionError::new(DirentKind::Field, other.kind())),
        }
    }

    /// Mutably view this dirent as a `Field`
    pub fn as_field_mut(&mut self) -> Result<&mut dyn Field, ConversionError> {
        match self {
            Dirent::Field(field) => Ok(field.as_mut()),
            other => Err(ConversionError::new(DirentKind::Field, other.kind())),
        }
    }

    /// Whether this dirent is a scope
    pub fn is_scope(&self) -> bool {
        self.kind() == DirentKind::Scope
    }

    /// Id of the scope this dirent refers to
    pub fn as_scope(&self) -> Result<ScopeId, ConversionError> {
        match self {
            Dirent::Scope(id) => Ok(*id),
            other => Err(ConversionError::new(DirentKind::Scope, other.kind())),
        }
    }

    /// Borrow this dirent as a view that can walk into scopes
    pub fn view<'a>(&'a self, tree: &'a HwTree) -> DirentRef<'a> {
        match self {
            Dirent::Register(register) => DirentRef::Register(register),
            Dirent::Field(field) => DirentRef::Field(field.as_ref()),
            Dirent::Scope(id) => DirentRef::Scope(tree.scope(*id)),
            Dirent::Array(array) => DirentRef::Array(array),
            Dirent::Alias(alias) => DirentRef::Alias(alias),
        }
    }
}

impl From<Register> for Dirent {
    fn from(register: Register) -> Self {
        Dirent::Register(register)
    }
}

impl From<Box<dyn Field>> for Dirent {
    fn from(field: Box<dyn Field>) -> Self {
        Dirent::Field(field)
    }
}

impl From<ScopeId> for Dirent {
    fn from(id: ScopeId) -> Self {
        Dirent::Scope(id)
    }
}

impl From<Array> for Dirent {
    fn from(array: Array) -> Self {
        Dirent::Array(array)
    }
}

impl From<Alias> for Dirent {
    fn from(alias: Alias) -> Self {
        Dirent::Alias(alias)
    }
}

/// Borrowed, read-only view of a resolved dirent
#[derive(Debug, Clone, Copy)]
pub enum DirentRef<'a> {
    /// Hardware register
    Register(&'a Register),
    /// Decoded field
    Field(&'a dyn Field),
    /// Nested scope
    Scope(ScopeRef<'a>),
    /// Homogeneous array
    Array(&'a Array),
    /// Symbolic reference to another path
    Alias(&'a Alias),
}

impl<'a> DirentRef<'a> {
    /// Kind of the viewed dirent
    pub fn kind(&self) -> DirentKind {
        match self {
            DirentRef::Register(_) => DirentKind::Register,
            DirentRef::Field(_) => DirentKind::Field,
            DirentRef::Scope(_) => DirentKind::Scope,
            DirentRef::Array(_) => DirentKind::Array,
            DirentRef::Alias(_) => DirentKind::Alias,
        }
    }

    /// View as a register
    pub fn as_register(self) -> Result<&'a Register, ConversionError> {
        match self {
            DirentRef::Register(register) => Ok(register),
            other => Err(ConversionError::new(DirentKind::Register, other.kind())),
        }
    }

    /// View as a field
    pub fn as_field(self) -> Result<&'a dyn Field, ConversionError> {
        match self {
            DirentRef::Field(field) => Ok(field),
            other => Err(ConversionError::new(DirentKind::Field, other.kind())),
        }
    }

    /// View as a scope
    pub fn as_scope(self) -> Result<ScopeRef<'a>, ConversionError> {
        match self {
            DirentRef::Scope(scope) => Ok(scope),
            other => Err(ConversionError::new(DirentKind::Scope, other.kind())),
        }
    }

    /// View as an array
    pub fn as_array(self) -> Result<&'a Array, ConversionError> {
        match self {
            DirentRef::Array(array) => Ok(array),
            other => Err(ConversionError::new(DirentKind::Array, other.kind())),
        }
    }

    /// View as an alias
    pub fn as_alias(self) -> Result<&'a Alias, ConversionError> {
        match self {
            DirentRef::Alias(alias) => Ok(alias),
            other => Err(ConversionError::new(DirentKind::Alias, other.kind())),
        }
    }

    /// Whether the view is a register
    pub fn is_register(&self) -> bool {
        self.kind() == DirentKind::Register
    }

    /// Whether the view is a field
    pub fn is_field(&self) -> bool {
        self.kind() == DirentKind::Field
    }

    /// Whether the view is a scope
    pub fn is_scope(&self) -> bool {
        self.kind() == DirentKind::Scope
    }

    /// Whether this view is the scope `id`
    pub fn is_scope_id(&self, id: ScopeId) -> bool {
        matches!(self, DirentRef::Scope(scope) if scope.id() == id)
    }

    /// Whether the view is an array
    pub fn is_array(&self) -> bool {
        self.kind() == DirentKind::Array
    }

    /// Whether the view is an alias
    pub fn is_alias(&self) -> bool {
        self.kind() == DirentKind::Alias
    }
}
