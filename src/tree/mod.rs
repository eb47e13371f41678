// ABOUTME: Hardware tree module tying together paths, dirents, scopes and the builder
// ABOUTME: Provides no_std compatible introspection of registers, fields and scopes

pub mod alias;
pub mod array;
pub mod binding;
pub mod builder;
pub mod datatype;
pub mod dirent;
pub mod error;
pub mod field;
pub mod path;
pub mod register;
pub mod scope;
pub mod value;

use alloc::string::String;

/// Insertion ordered map keyed by dirent or datatype name
pub(crate) type NameMap<V> = indexmap::IndexMap<String, V, rustc_hash::FxBuildHasher>;

/// Insertion ordered set of names
pub(crate) type NameSet = indexmap::IndexSet<String, rustc_hash::FxBuildHasher>;

pub use alias::Alias;
pub use array::Array;
pub use binding::{Access, AccessKind, Binding, BindingError, SharedBinding, SimBinding};
pub use builder::{Builder, Snapshot};
pub use datatype::{
    BitmaskDatatype, BoolDatatype, Datatype, EnumDatatype, HexDatatype, IntDatatype, Operand,
};
pub use dirent::{Dirent, DirentKind, DirentRef};
pub use error::{ConversionError, Error, Result};
pub use field::{ConstantField, Field, ProcField, RegisterBitsField, SharedDatatype};
pub use path::{Addressing, Path, PathElement};
pub use register::Register;
pub use scope::{HwTree, LookupMode, Scope, ScopeId, ScopeRef, Walk};
pub use value::{BitRange, BitWidth, Value};
