// ABOUTME: Field dirents exposing decoded values through a datatype
// ABOUTME: Provides constant, register-bits and procedural field implementations

use super::datatype::{Datatype, IntDatatype, Operand};
use super::error::{Error, Result};
use super::register::Register;
use super::value::{BitRange, Value, mask};
use alloc::{boxed::Box, rc::Rc, string::String, vec::Vec};
use core::cmp::Ordering;
use core::fmt;

/// Datatype shared between fields and scopes
pub type SharedDatatype = Rc<dyn Datatype>;

/// A value that can be read, written and interpreted through a datatype
pub trait Field: fmt::Debug {
    /// Read the raw value
    fn read(&self) -> Result<Value>;

    /// Write a raw value
    fn write(&self, value: Value) -> Result<()>;

    /// Datatype used to interpret the value
    fn datatype(&self) -> &dyn Datatype;

    /// Read and render the value as text
    fn evaluate(&self) -> Result<String> {
        Ok(self.datatype().evaluate(self.read()?))
    }

    /// Read and order the value against an operand
    fn compare(&self, operand: Operand<'_>) -> Result<Ordering> {
        self.datatype().compare(self.read()?, operand)
    }

    /// Read and select the bits named by an operand
    fn test(&self, operand: Operand<'_>) -> Result<Value> {
        self.datatype().test(self.read()?, operand)
    }

    /// Resolve an operand through the datatype and write it
    fn write_operand(&self, operand: Operand<'_>) -> Result<()> {
        self.write(self.datatype().lookup(operand)?)
    }
}

fn default_datatype() -> SharedDatatype {
    Rc::new(IntDatatype::new())
}

/// Read-only field with a fixed value
#[derive(Debug, Clone)]
pub struct ConstantField {
    value: Value,
    datatype: SharedDatatype,
}

impl ConstantField {
    /// Constant rendered as a plain integer
    pub fn new(value: Value) -> Self {
        Self::with_datatype(value, default_datatype())
    }

    /// Constant rendered through `datatype`
    pub fn with_datatype(value: Value, datatype: SharedDatatype) -> Self {
        Self { value, datatype }
    }
}

impl Field for ConstantField {
    fn read(&self) -> Result<Value> {
        Ok(self.value)
    }

    fn write(&self, _value: Value) -> Result<()> {
        Err(Error::ReadOnly)
    }

    fn datatype(&self) -> &dyn Datatype {
        self.datatype.as_ref()
    }
}

/// Field composed of bit ranges taken from one or more registers
///
/// Ranges are concatenated in declaration order, the first range supplying
/// the least significant bits. Pieces starting at or beyond bit 64 of the
/// composed value are neither read nor written.
#[derive(Debug, Clone)]
pub struct RegisterBitsField {
    pieces: Vec<(Register, BitRange)>,
    datatype: SharedDatatype,
}

impl RegisterBitsField {
    /// Empty field interpreted through `datatype`
    pub fn new(datatype: SharedDatatype) -> Self {
        Self {
            pieces: Vec::new(),
            datatype,
        }
    }

    /// Append bits `lo..=hi` of `register` as the next most significant piece
    pub fn bits(mut self, register: &Register, lo: u32, hi: u32) -> Self {
        self.pieces.push((register.clone(), BitRange::new(lo, hi)));
        self
    }

    /// Total number of bits declared
    pub fn width(&self) -> u32 {
        self.pieces
            .iter()
            .fold(0u32, |total, (_, range)| total.saturating_add(range.width()))
    }
}

impl Field for RegisterBitsField {
    fn read(&self) -> Result<Value> {
        let mut value: Value = 0;
        let mut shift = 0u32;
        for (register, range) in &self.pieces {
            if shift >= Value::BITS {
                break;
            }
            value |= range.extract(register.read()?) << shift;
            shift = shift.saturating_add(range.width());
        }
        Ok(value)
    }

    fn write(&self, value: Value) -> Result<()> {
        let mut shift = 0u32;
        for (register, range) in &self.pieces {
            if shift >= Value::BITS {
                break;
            }
            let bits = (value >> shift) & mask(range.width());
            register.write(range.insert(register.read()?, bits))?;
            shift = shift.saturating_add(range.width());
        }
        Ok(())
    }

    fn datatype(&self) -> &dyn Datatype {
        self.datatype.as_ref()
    }
}

type ReadFn = Box<dyn Fn() -> Result<Value>>;
type WriteFn = Box<dyn Fn(Value) -> Result<()>>;

/// Field computed by callbacks
pub struct ProcField {
    read: ReadFn,
    write: Option<WriteFn>,
    datatype: SharedDatatype,
}

impl ProcField {
    /// Read-only procedural field
    pub fn new(datatype: SharedDatatype, read: impl Fn() -> Result<Value> + 'static) -> Self {
        Self {
            read: Box::new(read),
            write: None,
            datatype,
        }
    }

    /// Make the field writable through `write`
    pub fn with_write(mut self, write: impl Fn(Value) -> Result<()> + 'static) -> Self {
        self.write = Some(Box::new(write));
        self
    }
}

impl fmt::Debug for ProcField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcField")
            .field("writable", &self.write.is_some())
            .field("datatype", &self.datatype)
            .finish()
    }
}

impl Field for ProcField {
    fn read(&self) -> Result<Value> {
        (self.read)()
    }

    fn write(&self, value: Value) -> Result<()> {
        match &self.write {
            Some(write) => write(value),
            None => Err(Error::ReadOnly),
        }
    }

    fn datatype(&self) -> &dyn Datatype {
        self.datatype.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::binding::SimBinding;
    use crate::tree::datatype::{EnumDatatype, HexDatatype};
    use crate::tree::value::BitWidth;
    use core::cell::Cell;

    #[test]
    fn test_constant_field() {
        let field = ConstantField::new(42);
        assert_eq!(field.read().unwrap(), 42);
        assert_eq!(field.evaluate().unwrap(), "42");
        assert!(matches!(field.write(1), Err(Error::ReadOnly)));
        assert_eq!(field.compare(Operand::Value(41)).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_register_bits_field_composes_pieces() {
        let sim = Rc::new(
            SimBinding::new()
                .with_value(0, 0x0000_00ab)
                .with_value(4, 0x0000_0c00),
        );
        let low = Register::new(sim.clone(), 0, BitWidth::Bits32);
        let high = Register::new(sim.clone(), 4, BitWidth::Bits32);

        let field = RegisterBitsField::new(Rc::new(HexDatatype::new(12)))
            .bits(&low, 0, 7)
            .bits(&high, 8, 11);
        assert_eq!(field.width(), 12);
        assert_eq!(field.read().unwrap(), 0xcab);
        assert_eq!(field.evaluate().unwrap(), "0xcab");

        field.write(0x5cd).unwrap();
        assert_eq!(sim.peek(0), Some(0xcd));
        assert_eq!(sim.peek(4), Some(0x500));
    }

    #[test]
    fn test_register_bits_field_wider_than_value() {
        let sim = Rc::new(
            SimBinding::new()
                .with_value(0, 0x1122_3344_5566_7788)
                .with_value(8, 0xaa),
        );
        let wide = Register::new(sim.clone(), 0, BitWidth::Bits64);
        let extra = Register::new(sim.clone(), 8, BitWidth::Bits64);

        let field = RegisterBitsField::new(default_datatype())
            .bits(&wide, 0, 63)
            .bits(&extra, 0, 7);
        assert_eq!(field.width(), 72);
        assert_eq!(field.read().unwrap(), 0x1122_3344_5566_7788);

        field.write(0x0102_0304_0506_0708).unwrap();
        assert_eq!(sim.peek(0), Some(0x0102_0304_0506_0708));
        assert_eq!(sim.peek(8), Some(0xaa));

        let beyond = RegisterBitsField::new(default_datatype()).bits(&extra, 64, 70);
        assert_eq!(beyond.read().unwrap(), 0);
    }

    #[test]
    fn test_register_bits_field_datatype_operands() {
        let sim = Rc::new(SimBinding::new().with_value(0, 0x2));
        let reg = Register::new(sim.clone(), 0, BitWidth::Bits8);
        let mode = RegisterBitsField::new(Rc::new(
            EnumDatatype::new().with("off", 0).with("on", 2),
        ))
        .bits(&reg, 0, 1);

        assert_eq!(mode.evaluate().unwrap(), "on");
        assert_eq!(mode.compare(Operand::Text("on")).unwrap(), Ordering::Equal);
        mode.write_operand(Operand::Text("off")).unwrap();
        assert_eq!(sim.peek(0), Some(0));
    }

    #[test]
    fn test_proc_field() {
        let counter = Rc::new(Cell::new(5));
        let reader = counter.clone();
        let writer = counter.clone();
        let field = ProcField::new(default_datatype(), move || Ok(reader.get()))
            .with_write(move |v| {
                writer.set(v);
                Ok(())
            });

        assert_eq!(field.read().unwrap(), 5);
        field.write(9).unwrap();
        assert_eq!(counter.get(), 9);

        let read_only = ProcField::new(default_datatype(), || Ok(1));
        assert!(matches!(read_only.write(0), Err(Error::ReadOnly)));
    }
}
