// ABOUTME: Hardware access bindings used by registers for address+width I/O
// ABOUTME: Defines the Binding contract and an in-memory simulated binding

use super::value::{BitWidth, Value};
use alloc::{collections::BTreeMap, rc::Rc, vec::Vec};
use core::cell::RefCell;
use core::fmt;

/// Driver level failure reported by a binding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// Nothing is mapped at the address
    #[error("no device mapped at address {address:#x}")]
    Unmapped { address: u64 },
    /// The device does not support accesses of this width
    #[error("{width}-bit access not supported at address {address:#x}")]
    UnsupportedWidth { address: u64, width: BitWidth },
    /// Any other driver failure
    #[error("i/o error at address {address:#x}")]
    Io { address: u64 },
}

/// Low level hardware access handle (I/O port, physical memory, MSR, ...)
///
/// Implementations that need to mutate state on access use interior
/// mutability, since bindings are shared by every register that uses them.
pub trait Binding: fmt::Debug {
    /// Read `width` bits at `address`
    fn read(&self, address: u64, width: BitWidth) -> Result<Value, BindingError>;

    /// Write the low `width` bits of `value` at `address`
    fn write(&self, address: u64, width: BitWidth, value: Value) -> Result<(), BindingError>;
}

/// Binding shared between scopes and registers
pub type SharedBinding = Rc<dyn Binding>;

/// Direction of a recorded access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Read access
    Read,
    /// Write access
    Write(Value),
}

/// One access made through a [`SimBinding`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// Address accessed
    pub address: u64,
    /// Width of the access
    pub width: BitWidth,
    /// Read or write
    pub kind: AccessKind,
}

/// In-memory binding backed by an address map
///
/// Unwritten addresses read as zero unless the binding is strict, in which
/// case they report [`BindingError::Unmapped`]. Every access is recorded.
#[derive(Debug, Default)]
pub struct SimBinding {
    cells: RefCell<BTreeMap<u64, Value>>,
    accesses: RefCell<Vec<Access>>,
    strict: bool,
}

impl SimBinding {
    /// Create an empty binding where unknown addresses read as zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty binding that rejects unknown addresses
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Preload a value at an address
    pub fn with_value(self, address: u64, value: Value) -> Self {
        self.cells.borrow_mut().insert(address, value);
        self
    }

    /// Current stored value at an address
    pub fn peek(&self, address: u64) -> Option<Value> {
        self.cells.borrow().get(&address).copied()
    }

    /// All accesses made so far, oldest first
    pub fn accesses(&self) -> Vec<Access> {
        self.accesses.borrow().clone()
    }

    /// Wrap the binding for sharing between scopes
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    fn record(&self, address: u64, width: BitWidth, kind: AccessKind) {
        self.accesses.borrow_mut().push(Access {
            address,
            width,
            kind,
        });
    }
}

impl Binding for SimBinding {
    fn read(&self, address: u64, width: BitWidth) -> Result<Value, BindingError> {
        self.record(address, width, AccessKind::Read);
        match self.cells.borrow().get(&address) {
            Some(value) => Ok(value & width.mask()),
            None if self.strict => Err(BindingError::Unmapped { address }),
            None => Ok(0),
        }
    }

    fn write(&self, address: u64, width: BitWidth, value: Value) -> Result<(), BindingError> {
        self.record(address, width, AccessKind::Write(value));
        let mut cells = self.cells.borrow_mut();
        if self.strict && !cells.contains_key(&address) {
            return Err(BindingError::Unmapped { address });
        }
        cells.insert(address, value & width.mask());
        Ok(())
    }
}
