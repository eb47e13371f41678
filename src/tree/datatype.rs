// ABOUTME: Datatypes that decode raw field values into text and back
// ABOUTME: Provides integer, hex, boolean, enum and bitmask interpretations

use super::NameMap;
use super::error::{Error, Result};
use super::value::Value;
use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::cmp::Ordering;
use core::fmt;

/// Right-hand side of a comparison: a raw value or its textual form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand<'a> {
    /// Raw value
    Value(Value),
    /// Text interpreted by the datatype
    Text(&'a str),
}

impl From<Value> for Operand<'_> {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl<'a> From<&'a str> for Operand<'a> {
    fn from(text: &'a str) -> Self {
        Operand::Text(text)
    }
}

/// Interpretation rule for raw values
pub trait Datatype: fmt::Debug {
    /// Render a raw value as text
    fn evaluate(&self, value: Value) -> String;

    /// Map text back to a raw value, if the datatype knows it
    fn parse(&self, text: &str) -> Option<Value>;

    /// Resolve an operand to a raw value
    fn lookup(&self, operand: Operand<'_>) -> Result<Value> {
        match operand {
            Operand::Value(value) => Ok(value),
            Operand::Text(text) => self.parse(text).ok_or_else(|| Error::UnknownValue {
                text: text.to_string(),
            }),
        }
    }

    /// Order `value` against an operand
    fn compare(&self, value: Value, operand: Operand<'_>) -> Result<Ordering> {
        Ok(value.cmp(&self.lookup(operand)?))
    }

    /// Bits of `value` selected by the operand
    fn test(&self, value: Value, operand: Operand<'_>) -> Result<Value> {
        Ok(value & self.lookup(operand)?)
    }
}

/// Parse a decimal, `0x` hex or `0b` binary literal
pub fn parse_int(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Value::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix("0b") {
        Value::from_str_radix(bin, 2).ok()
    } else {
        text.parse().ok()
    }
}

/// Unsigned decimal integer with optional units
#[derive(Debug, Clone, Default)]
pub struct IntDatatype {
    units: Option<String>,
}

impl IntDatatype {
    /// Plain integer
    pub fn new() -> Self {
        Self::default()
    }

    /// Integer rendered with a units suffix, e.g. `MHz`
    pub fn with_units(units: impl Into<String>) -> Self {
        Self {
            units: Some(units.into()),
        }
    }
}

impl Datatype for IntDatatype {
    fn evaluate(&self, value: Value) -> String {
        match &self.units {
            Some(units) => format!("{} {}", value, units),
            None => value.to_string(),
        }
    }

    fn parse(&self, text: &str) -> Option<Value> {
        let text = match &self.units {
            Some(units) => text.trim().strip_suffix(units.as_str()).unwrap_or(text),
            None => text,
        };
        parse_int(text)
    }
}

/// Hexadecimal integer, zero padded to a bit width
#[derive(Debug, Clone, Default)]
pub struct HexDatatype {
    bits: u32,
}

impl HexDatatype {
    /// Hex value padded to `bits` bits (0 for no padding)
    pub fn new(bits: u32) -> Self {
        Self { bits }
    }
}

impl Datatype for HexDatatype {
    fn evaluate(&self, value: Value) -> String {
        let digits = self.bits.div_ceil(4) as usize;
        format!("0x{:0width$x}", value, width = digits)
    }

    fn parse(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        Value::from_str_radix(digits, 16).ok()
    }
}

/// Boolean rendered with configurable words
#[derive(Debug, Clone)]
pub struct BoolDatatype {
    true_text: String,
    false_text: String,
}

impl Default for BoolDatatype {
    fn default() -> Self {
        Self::new("true", "false")
    }
}

impl BoolDatatype {
    /// Boolean with custom words, e.g. `enabled`/`disabled`
    pub fn new(true_text: impl Into<String>, false_text: impl Into<String>) -> Self {
        Self {
            true_text: true_text.into(),
            false_text: false_text.into(),
        }
    }
}

impl Datatype for BoolDatatype {
    fn evaluate(&self, value: Value) -> String {
        if value != 0 {
            self.true_text.clone()
        } else {
            self.false_text.clone()
        }
    }

    fn parse(&self, text: &str) -> Option<Value> {
        if text == self.true_text {
            Some(1)
        } else if text == self.false_text {
            Some(0)
        } else {
            parse_int(text).map(|v| (v != 0) as Value)
        }
    }
}

/// Named values
#[derive(Debug, Clone, Default)]
pub struct EnumDatatype {
    values: NameMap<Value>,
}

impl EnumDatatype {
    /// Empty enumeration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Name of a value, if defined
    pub fn name_of(&self, value: Value) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| **v == value)
            .map(|(name, _)| name.as_str())
    }
}

impl Datatype for EnumDatatype {
    fn evaluate(&self, value: Value) -> String {
        match self.name_of(value) {
            Some(name) => name.to_string(),
            None => format!("<unknown: {:#x}>", value),
        }
    }

    fn parse(&self, text: &str) -> Option<Value> {
        self.values.get(text).copied()
    }
}

/// Named bits of a value
#[derive(Debug, Clone, Default)]
pub struct BitmaskDatatype {
    bits: NameMap<u32>,
}

impl BitmaskDatatype {
    /// Empty bitmask
    pub fn new() -> Self {
        Self::default()
    }

    /// Name bit `position`
    pub fn with(mut self, name: impl Into<String>, position: u32) -> Self {
        self.bits.insert(name.into(), position);
        self
    }
}

impl Datatype for BitmaskDatatype {
    fn evaluate(&self, value: Value) -> String {
        let mut remaining = value;
        let mut names: Vec<String> = Vec::new();
        for (name, position) in &self.bits {
            let bit: Value = 1 << *position;
            if value & bit != 0 {
                names.push(name.clone());
                remaining &= !bit;
            }
        }
        if remaining != 0 {
            names.push(format!("{:#x}", remaining));
        }
        if names.is_empty() {
            return String::from("[ ]");
        }
        format!("[ {} ]", names.join(" "))
    }

    fn parse(&self, text: &str) -> Option<Value> {
        match self.bits.get(text) {
            Some(position) => Some(1 << *position),
            None => parse_int(text),
        }
    }
}
