// ABOUTME: Homogeneous append-only arrays of dirents
// ABOUTME: Enforces a single element kind and bounds-checked access

use super::dirent::{Dirent, DirentKind};
use super::error::{ConversionError, Error, Result};
use alloc::vec::Vec;

/// Ordered collection of dirents that all share one kind
#[derive(Debug)]
pub struct Array {
    kind: DirentKind,
    items: Vec<Dirent>,
}

impl Array {
    /// Create an empty array accepting dirents of `kind`
    pub fn new(kind: DirentKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    /// Kind every element must have
    pub fn element_kind(&self) -> DirentKind {
        self.kind
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.items.len()
    }

    /// Whether the array has no elements
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a dirent, rejecting a kind mismatch
    pub fn append(&mut self, dirent: Dirent) -> core::result::Result<(), ConversionError> {
        if dirent.kind() != self.kind {
            return Err(ConversionError::new(self.kind, dirent.kind()));
        }
        self.items.push(dirent);
        Ok(())
    }

    /// Element at `index`
    pub fn at(&self, index: usize) -> Result<&Dirent> {
        let size = self.size();
        self.items.get(index).ok_or(Error::Index { index, size })
    }

    /// Mutable element at `index`
    pub fn at_mut(&mut self, index: usize) -> Result<&mut Dirent> {
        let size = self.size();
        self.items.get_mut(index).ok_or(Error::Index { index, size })
    }

    /// Last element, if any
    pub fn last(&self) -> Option<&Dirent> {
        self.items.last()
    }

    /// Iterate over elements in order
    pub fn iter(&self) -> core::slice::Iter<'_, Dirent> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Dirent;
    type IntoIter = core::slice::Iter<'a, Dirent>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::alias::Alias;
    use crate::tree::field::ConstantField;
    use crate::tree::path::Path;

    #[test]
    fn test_append_grows_by_one() {
        let mut array = Array::new(DirentKind::Field);
        assert!(array.is_empty());

        array.append(Dirent::field(ConstantField::new(1))).unwrap();
        assert_eq!(array.size(), 1);
        array.append(Dirent::field(ConstantField::new(1))).unwrap();
        assert_eq!(array.size(), 2);
        assert_eq!(array.element_kind(), DirentKind::Field);
    }

    #[test]
    fn test_append_wrong_kind() {
        let mut array = Array::new(DirentKind::Field);
        array.append(Dirent::field(ConstantField::new(1))).unwrap();

        let err = array
            .append(Dirent::Alias(Alias::new(Path::parse("/x"))))
            .unwrap_err();
        assert_eq!(err.requested, DirentKind::Field);
        assert_eq!(err.actual, DirentKind::Alias);
        assert_eq!(array.size(), 1);
    }

    #[test]
    fn test_at_bounds() {
        let mut array = Array::new(DirentKind::Field);
        array.append(Dirent::field(ConstantField::new(10))).unwrap();
        array.append(Dirent::field(ConstantField::new(20))).unwrap();

        let second = array.at(1).unwrap().as_field().unwrap();
        assert_eq!(second.read().unwrap(), 20);
        assert!(matches!(array.at(2), Err(Error::Index { index: 2, size: 2 })));
        assert!(array.at_mut(5).is_err());
        assert_eq!(array.iter().count(), 2);
        assert!(array.last().is_some());
    }
}
