// ABOUTME: Register dirents backed by a shared hardware binding
// ABOUTME: Reads and writes delegate to the binding at a fixed address and width

use super::binding::SharedBinding;
use super::error::Result;
use super::value::{BitWidth, Value};

/// Hardware register at an address within a binding
#[derive(Debug, Clone)]
pub struct Register {
    binding: SharedBinding,
    address: u64,
    width: BitWidth,
}

impl Register {
    /// Create a register accessed through `binding`
    pub fn new(binding: SharedBinding, address: u64, width: BitWidth) -> Self {
        Self {
            binding,
            address,
            width,
        }
    }

    /// Address within the binding
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Access width
    pub fn width(&self) -> BitWidth {
        self.width
    }

    /// Binding used for access
    pub fn binding(&self) -> &SharedBinding {
        &self.binding
    }

    /// Read the register
    pub fn read(&self) -> Result<Value> {
        Ok(self.binding.read(self.address, self.width)?)
    }

    /// Write the register
    pub fn write(&self, value: Value) -> Result<()> {
        Ok(self.binding.write(self.address, self.width, value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::binding::{AccessKind, BindingError, SimBinding};
    use crate::tree::error::Error;
    use alloc::rc::Rc;

    #[test]
    fn test_register_delegates_to_binding() {
        let sim = Rc::new(SimBinding::new().with_value(0x40, 0xdead_beef));
        let reg = Register::new(sim.clone(), 0x40, BitWidth::Bits16);

        assert_eq!(reg.read().unwrap(), 0xbeef);
        reg.write(0x1234).unwrap();
        assert_eq!(sim.peek(0x40), Some(0x1234));

        let accesses = sim.accesses();
        assert_eq!(accesses.len(), 2);
        assert_eq!(accesses[0].width, BitWidth::Bits16);
        assert_eq!(accesses[1].kind, AccessKind::Write(0x1234));
    }

    #[test]
    fn test_register_propagates_binding_error() {
        let reg = Register::new(Rc::new(SimBinding::strict()), 0x8, BitWidth::Bits8);
        match reg.read() {
            Err(Error::Binding(BindingError::Unmapped { address })) => assert_eq!(address, 0x8),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
