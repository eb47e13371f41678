// ABOUTME: Path expressions addressing dirents in the hardware tree
// ABOUTME: Parses delimited strings into elements with array and bookmark addressing

use super::error::{Error, Result};
use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::convert::Infallible;
use core::fmt;
use core::ops::Add;
use core::str::FromStr;

/// Default path delimiter
pub const DELIMITER: char = '/';

/// Prefix marking a bookmark element, e.g. `$cpu/%eax`
///
/// Names starting with `%` are plain.
pub const BOOKMARK_SIGIL: char = '$';

/// Name of the parent reference element
pub const PARENT: &str = "..";

/// How a path element selects its dirent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addressing {
    /// Direct name lookup
    Plain,
    /// `..`, the parent scope
    ParentRef,
    /// `$name`, the nearest enclosing scope carrying the bookmark
    Bookmark,
    /// `name[N]`, element N of an array
    ArrayIndex(usize),
    /// `name[-1]`, the last element of an array
    ArrayTail,
    /// `name[]`, append to an array (write only)
    ArrayAppend,
}

impl Addressing {
    /// Whether this addressing mode selects into an array
    pub fn is_array(self) -> bool {
        matches!(
            self,
            Addressing::ArrayIndex(_) | Addressing::ArrayTail | Addressing::ArrayAppend
        )
    }
}

/// A single element of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElement {
    /// Dirent or bookmark name, without sigil or index suffix
    pub name: String,
    /// Addressing mode
    pub addressing: Addressing,
}

impl PathElement {
    /// Create a plain element
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addressing: Addressing::Plain,
        }
    }

    /// Create an element with an explicit addressing mode
    pub fn new(name: impl Into<String>, addressing: Addressing) -> Self {
        Self {
            name: name.into(),
            addressing,
        }
    }

    /// Parse a single path segment
    ///
    /// A bracket suffix that is not `[]`, `[-1]` or `[N]` leaves the whole
    /// segment as a plain name.
    pub fn parse(segment: &str) -> Self {
        if segment == PARENT {
            return Self::new(PARENT, Addressing::ParentRef);
        }

        if let Some(element) = parse_array_suffix(segment) {
            return element;
        }

        match segment.strip_prefix(BOOKMARK_SIGIL) {
            Some(mark) if !mark.is_empty() => Self::new(mark, Addressing::Bookmark),
            _ => Self::plain(segment),
        }
    }
}

/// Split `name[...]` into an array addressed element
fn parse_array_suffix(segment: &str) -> Option<PathElement> {
    let body = segment.strip_suffix(']')?;
    let open = body.rfind('[')?;
    let (name, index) = (&body[..open], &body[open + 1..]);
    if name.is_empty() {
        return None;
    }

    let addressing = match index {
        "" => Addressing::ArrayAppend,
        "-1" => Addressing::ArrayTail,
        digits if digits.bytes().all(|b| b.is_ascii_digit()) => {
            Addressing::ArrayIndex(digits.parse().ok()?)
        }
        _ => return None,
    };
    Some(PathElement::new(name, addressing))
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addressing {
            Addressing::Plain => write!(f, "{}", self.name),
            Addressing::ParentRef => write!(f, "{}", PARENT),
            Addressing::Bookmark => write!(f, "{}{}", BOOKMARK_SIGIL, self.name),
            Addressing::ArrayIndex(index) => write!(f, "{}[{}]", self.name, index),
            Addressing::ArrayTail => write!(f, "{}[-1]", self.name),
            Addressing::ArrayAppend => write!(f, "{}[]", self.name),
        }
    }
}

/// Ordered sequence of path elements, absolute or relative
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    absolute: bool,
    elements: Vec<PathElement>,
}

impl Path {
    /// Create an empty relative path
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty absolute path
    pub fn root() -> Self {
        Self {
            absolute: true,
            elements: Vec::new(),
        }
    }

    /// Parse a `/` delimited path
    pub fn parse(input: &str) -> Self {
        Self::with_delimiter(input, DELIMITER)
    }

    /// Parse a path using a custom delimiter
    ///
    /// Empty segments are dropped, so repeated, leading and trailing
    /// delimiters never produce empty elements. A leading delimiter marks
    /// the path absolute.
    pub fn with_delimiter(input: &str, delimiter: char) -> Self {
        Self {
            absolute: input.starts_with(delimiter),
            elements: input
                .split(delimiter)
                .filter(|segment| !segment.is_empty())
                .map(PathElement::parse)
                .collect(),
        }
    }

    /// Build a relative path from elements
    pub fn from_elements(elements: impl IntoIterator<Item = PathElement>) -> Self {
        Self {
            absolute: false,
            elements: elements.into_iter().collect(),
        }
    }

    /// Whether the path starts at the tree root
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Mark the path absolute or relative
    pub fn set_absolute(&mut self, absolute: bool) {
        self.absolute = absolute;
    }

    /// Whether the path has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Elements in order
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// First element, if any
    pub fn front(&self) -> Option<&PathElement> {
        self.elements.first()
    }

    /// Last element, if any
    pub fn back(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Remove and return the first element
    pub fn pop_front(&mut self) -> Result<PathElement> {
        if self.elements.is_empty() {
            return Err(Error::EmptyPath);
        }
        Ok(self.elements.remove(0))
    }

    /// Remove and return the last element
    pub fn pop_back(&mut self) -> Result<PathElement> {
        self.elements.pop().ok_or(Error::EmptyPath)
    }

    /// Append an element
    pub fn push(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    /// Concatenate `other` onto this path, keeping this path's absoluteness
    pub fn join(&self, other: &Path) -> Path {
        let mut joined = self.clone();
        joined.elements.extend(other.elements.iter().cloned());
        joined
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "{}", DELIMITER)?;
        }
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", DELIMITER)?;
            }
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<&String> for Path {
    fn from(s: &String) -> Self {
        Path::parse(s)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

impl From<PathElement> for Path {
    fn from(element: PathElement) -> Self {
        Path::from_elements([element])
    }
}

impl Add<&Path> for Path {
    type Output = Path;

    fn add(mut self, rhs: &Path) -> Path {
        self.elements.extend(rhs.elements.iter().cloned());
        self
    }
}

impl Add<Path> for Path {
    type Output = Path;

    fn add(self, rhs: Path) -> Path {
        self + &rhs
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = core::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}
