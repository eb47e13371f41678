// ABOUTME: Hardware description tree library with path based introspection
// ABOUTME: Provides scopes, registers, fields, arrays and aliases for no_std targets

//! # hwtree
//!
//! Describe hardware as a tree of named entries and address them with
//! filesystem-like paths such as `/cpu[0]/%eax` or `$pci/vendor`.
//! Designed for embedded and host tooling alike with `no_std` compatibility.
//!
//! ## Quick Start
//!
//! ```rust
//! # use hwtree::{BitWidth, Builder, ConstantField, HwTree, SimBinding, Error};
//! # use std::rc::Rc;
//! # fn main() -> Result<(), Error> {
//! let io = Rc::new(SimBinding::new().with_value(0, 0x8086));
//! let mut tree = HwTree::new();
//!
//! let mut builder = Builder::new(&mut tree);
//! builder.open_scope("cpu[]", Some(io));
//! builder.register("%eax", 0, BitWidth::Bits32)?;
//! builder.field("cores", ConstantField::new(4))?;
//! builder.close_scope(None)?;
//! let root = builder.finish();
//!
//! let root = tree.scope(root);
//! assert_eq!(root.read("/cpu[0]/%eax")?, 0x8086);
//! assert_eq!(root.evaluate("cpu[-1]/cores")?, "4");
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Path addressing**: plain names, `..`, `$bookmark` and `name[i]`, `name[-1]`, `name[]`
//! - **Typed lookups**: conversion errors when a path names the wrong kind
//! - **Aliases**: resolved transparently with cycle detection
//! - **Datatypes**: values rendered and parsed through scoped datatypes
//! - **`no_std` compatible**: works in embedded environments with `alloc`
//!
//! ## Main Types
//!
//! - [`HwTree`] - Arena of scopes and the lookup entry point
//! - [`Builder`] - Open/close context stack for populating a tree
//! - [`Path`] - Parsed path expressions
//! - [`Dirent`] - Register, field, scope, array or alias entries
//! - [`Binding`] - Driver interface used by registers

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod tree;


// Re-export main types
pub use tree::{
    Alias, Array, BitWidth, Binding, BindingError, Builder, ConstantField, ConversionError,
    Datatype, Dirent, DirentKind, DirentRef, Error, Field, HwTree, LookupMode, Path, PathElement,
    Register, RegisterBitsField, Result, ScopeId, ScopeRef, SharedBinding, SimBinding, Snapshot,
    Value,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_creation() {
        let tree = HwTree::new();
        assert!(tree.scope(tree.root()).is_root());
        assert_eq!(Path::parse("/a/b").len(), 2);
    }
}
